//! Macro entity maintenance and sensitivity lookups.
//!
//! Macro entities are the anchors for `AFFECTED_BY` sensitivity edges and
//! `RELATES_TO_MACRO` event links; this module owns their upserts and the
//! company/factor lookups built on them.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::graph::error::GraphResult;
use crate::graph::store::GraphStore;
use crate::models::{clamp_unit, edge_types, node_types, Direction, GraphEdge, MacroEntity};

/// A company's sensitivity to one macro entity.
#[derive(Debug, Clone, Serialize)]
pub struct MacroSensitivity {
    pub symbol: String,
    pub entity_id: String,
    pub sensitivity: f64,
}

/// Upsert a macro entity node.
pub async fn upsert_macro_entity<S>(store: &S, entity: &MacroEntity) -> GraphResult<()>
where
    S: GraphStore + ?Sized,
{
    store.upsert_node(entity.to_node()).await
}

/// Record a company's sensitivity to a macro entity.
pub async fn link_company_sensitivity<S>(
    store: &S,
    symbol: &str,
    entity_id: &str,
    sensitivity: f64,
) -> GraphResult<()>
where
    S: GraphStore + ?Sized,
{
    let edge = GraphEdge::new(symbol, entity_id, edge_types::AFFECTED_BY)
        .with_property("sensitivity", Value::from(clamp_unit(sensitivity)));
    store.upsert_edge(edge).await
}

/// Companies affected by a macro entity, strongest sensitivity first.
pub async fn companies_affected_by_macro<S>(
    store: &S,
    entity_id: &str,
) -> GraphResult<Vec<MacroSensitivity>>
where
    S: GraphStore + ?Sized,
{
    let incident = store
        .neighbors(
            entity_id,
            Direction::Incoming,
            &[edge_types::AFFECTED_BY.to_string()],
        )
        .await?;

    let mut sensitivities: Vec<MacroSensitivity> = incident
        .into_iter()
        .filter(|(_, company)| company.node_type == node_types::COMPANY)
        .map(|(edge, company)| MacroSensitivity {
            symbol: company.id,
            entity_id: entity_id.to_string(),
            sensitivity: edge.f64_prop("sensitivity").unwrap_or(0.0),
        })
        .collect();
    sensitivities.sort_by(|a, b| {
        b.sensitivity
            .partial_cmp(&a.sensitivity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    debug!(entity = entity_id, companies = sensitivities.len(), "macro exposure lookup");
    Ok(sensitivities)
}

/// Macro factors a company is sensitive to, strongest first.
pub async fn macro_factors_for_company<S>(
    store: &S,
    symbol: &str,
) -> GraphResult<Vec<MacroSensitivity>>
where
    S: GraphStore + ?Sized,
{
    let incident = store
        .neighbors(
            symbol,
            Direction::Outgoing,
            &[edge_types::AFFECTED_BY.to_string()],
        )
        .await?;

    let mut sensitivities: Vec<MacroSensitivity> = incident
        .into_iter()
        .filter(|(_, entity)| entity.node_type == node_types::MACRO_ENTITY)
        .map(|(edge, entity)| MacroSensitivity {
            symbol: symbol.to_string(),
            entity_id: entity.id,
            sensitivity: edge.f64_prop("sensitivity").unwrap_or(0.0),
        })
        .collect();
    sensitivities.sort_by(|a, b| {
        b.sensitivity
            .partial_cmp(&a.sensitivity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });
    Ok(sensitivities)
}

/// Every macro entity in the graph.
pub async fn all_macro_entities<S>(store: &S) -> GraphResult<Vec<MacroEntity>>
where
    S: GraphStore + ?Sized,
{
    let nodes = store.get_nodes_by_type(node_types::MACRO_ENTITY).await?;
    let mut entities: Vec<MacroEntity> = nodes
        .iter()
        .map(|node| MacroEntity {
            entity_id: node.id.clone(),
            name: node.str_prop("name").unwrap_or_default().to_string(),
            frequency: match node.str_prop("frequency") {
                Some("MONTHLY") => crate::models::MacroFrequency::Monthly,
                Some("QUARTERLY") => crate::models::MacroFrequency::Quarterly,
                _ => crate::models::MacroFrequency::Irregular,
            },
        })
        .collect();
    entities.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::memory::MemoryGraph;
    use crate::models::{GraphNode, MacroFrequency};

    async fn seed(store: &MemoryGraph) {
        for (id, name, freq) in [
            ("macro_cpi", "Consumer Price Index", MacroFrequency::Monthly),
            ("macro_fed_policy", "Fed Policy Rate", MacroFrequency::Irregular),
        ] {
            upsert_macro_entity(
                store,
                &MacroEntity {
                    entity_id: id.to_string(),
                    name: name.to_string(),
                    frequency: freq,
                },
            )
            .await
            .unwrap();
        }
        for symbol in ["AAPL", "JPM"] {
            store
                .upsert_node(GraphNode::new(symbol, node_types::COMPANY))
                .await
                .unwrap();
        }
        link_company_sensitivity(store, "AAPL", "macro_cpi", 0.4).await.unwrap();
        link_company_sensitivity(store, "JPM", "macro_cpi", 0.8).await.unwrap();
        link_company_sensitivity(store, "JPM", "macro_fed_policy", 0.95).await.unwrap();
    }

    #[tokio::test]
    async fn exposure_lookup_orders_by_sensitivity() {
        let store = MemoryGraph::new();
        seed(&store).await;

        let affected = companies_affected_by_macro(&store, "macro_cpi").await.unwrap();
        let symbols: Vec<&str> = affected.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["JPM", "AAPL"]);
        assert_eq!(affected[0].sensitivity, 0.8);
    }

    #[tokio::test]
    async fn company_factor_lookup_and_catalogue() {
        let store = MemoryGraph::new();
        seed(&store).await;

        let factors = macro_factors_for_company(&store, "JPM").await.unwrap();
        let ids: Vec<&str> = factors.iter().map(|f| f.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["macro_fed_policy", "macro_cpi"]);

        let entities = all_macro_entities(&store).await.unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].entity_id, "macro_cpi");
        assert_eq!(entities[0].frequency, MacroFrequency::Monthly);
    }

    #[tokio::test]
    async fn sensitivity_clamps_and_non_companies_are_filtered() {
        let store = MemoryGraph::new();
        seed(&store).await;
        // An event node linked by the same edge type must not surface as
        // an affected company.
        store
            .upsert_node(GraphNode::new("ev-1", node_types::EXTERNAL_EVENT))
            .await
            .unwrap();
        link_company_sensitivity(&store, "ev-1", "macro_cpi", 2.0).await.unwrap();

        let affected = companies_affected_by_macro(&store, "macro_cpi").await.unwrap();
        assert!(affected.iter().all(|s| s.symbol != "ev-1"));

        let factors = macro_factors_for_company(&store, "ev-1").await.unwrap();
        assert_eq!(factors[0].sensitivity, 1.0, "clamped on write");
    }
}
