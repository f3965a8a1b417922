//! Company relationship graph construction.
//!
//! Sector/industry peers with correlated returns get `RELATED_TO` edges
//! weighted by |ρ|; externally-sourced supply-chain links become
//! `DEPENDS_ON` edges.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::debug;

use crate::graph::error::GraphResult;
use crate::graph::store::GraphStore;
use crate::ingest::batch::{batch_upsert_edges, BatchMutationResult, BatchOptions};
use crate::models::{edge_types, DependencyType, GraphEdge};
use crate::validation::returns::pearson_correlation;

/// Daily return history for one company.
#[derive(Debug, Clone)]
pub struct CompanyReturns {
    pub symbol: String,
    pub sector: String,
    pub industry: String,
    /// Daily simple returns, oldest first.
    pub returns: Vec<f64>,
}

/// Options for the correlation graph builder.
#[derive(Debug, Clone)]
pub struct CompanyGraphOptions {
    /// Trailing window of daily returns used per pair.
    pub lookback_days: usize,
    /// Absolute correlation floor for emitting an edge.
    pub min_correlation: f64,
    pub batch: BatchOptions,
}

impl Default for CompanyGraphOptions {
    fn default() -> Self {
        Self {
            lookback_days: 90,
            min_correlation: 0.7,
            batch: BatchOptions::default(),
        }
    }
}

/// An externally-sourced supply-chain relationship.
#[derive(Debug, Clone)]
pub struct SupplyChainLink {
    pub source_symbol: String,
    pub target_symbol: String,
    pub dependency_type: DependencyType,
    pub strength: f64,
}

/// Correlated `(a, b, ρ)` pairs within sector and industry groups.
///
/// Each unordered pair is computed once even when a sector group and an
/// industry group both contain it; |ρ| below the floor drops the pair.
pub fn correlated_pairs(
    companies: &[CompanyReturns],
    options: &CompanyGraphOptions,
) -> Vec<(String, String, f64)> {
    let mut groups: HashMap<String, Vec<&CompanyReturns>> = HashMap::new();
    for company in companies {
        groups
            .entry(format!("sector:{}", company.sector))
            .or_default()
            .push(company);
        groups
            .entry(format!("industry:{}", company.industry))
            .or_default()
            .push(company);
    }

    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut pairs = Vec::new();
    let mut group_keys: Vec<&String> = groups.keys().collect();
    group_keys.sort();

    for key in group_keys {
        let members = &groups[key];
        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                let (a, b) = (members[i], members[j]);
                let pair_key = if a.symbol <= b.symbol {
                    (a.symbol.clone(), b.symbol.clone())
                } else {
                    (b.symbol.clone(), a.symbol.clone())
                };
                if !seen.insert(pair_key) {
                    continue;
                }

                let window = options.lookback_days;
                let series_a = tail(&a.returns, window);
                let series_b = tail(&b.returns, window);
                let rho = pearson_correlation(series_a, series_b);
                if rho.abs() >= options.min_correlation {
                    pairs.push((a.symbol.clone(), b.symbol.clone(), rho));
                }
            }
        }
    }
    pairs
}

fn tail(series: &[f64], n: usize) -> &[f64] {
    if series.len() > n {
        &series[series.len() - n..]
    } else {
        series
    }
}

/// Build `RELATED_TO` edges for correlated peers, one edge per direction.
pub async fn build_company_graph<S>(
    store: &S,
    companies: &[CompanyReturns],
    options: &CompanyGraphOptions,
) -> GraphResult<BatchMutationResult>
where
    S: GraphStore + ?Sized,
{
    let pairs = correlated_pairs(companies, options);
    debug!(pairs = pairs.len(), "correlated company pairs found");

    let mut edges = Vec::with_capacity(pairs.len() * 2);
    for (a, b, rho) in pairs {
        for (src, dst) in [(a.clone(), b.clone()), (b, a)] {
            edges.push(
                GraphEdge::new(src, dst, edge_types::RELATED_TO)
                    .with_property("weight", Value::from(rho.abs()))
                    .with_property("correlation", Value::from(rho)),
            );
        }
    }
    batch_upsert_edges(store, edges, &options.batch).await
}

/// Emit `DEPENDS_ON` edges for supply-chain links.
pub async fn ingest_supply_chain<S>(
    store: &S,
    links: Vec<SupplyChainLink>,
    batch: &BatchOptions,
) -> GraphResult<BatchMutationResult>
where
    S: GraphStore + ?Sized,
{
    let edges: Vec<GraphEdge> = links
        .into_iter()
        .map(|link| {
            GraphEdge::new(
                link.source_symbol,
                link.target_symbol,
                edge_types::DEPENDS_ON,
            )
            .with_property("strength", Value::from(link.strength))
            .with_property(
                "dependency_type",
                Value::from(link.dependency_type.as_str()),
            )
        })
        .collect();
    batch_upsert_edges(store, edges, batch).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::memory::MemoryGraph;
    use crate::models::{Direction, GraphNode};

    fn company(symbol: &str, sector: &str, industry: &str, returns: Vec<f64>) -> CompanyReturns {
        CompanyReturns {
            symbol: symbol.to_string(),
            sector: sector.to_string(),
            industry: industry.to_string(),
            returns,
        }
    }

    #[test]
    fn correlated_peers_within_a_sector_are_paired() {
        let base = vec![0.01, -0.02, 0.015, 0.005, -0.01, 0.02, 0.0, -0.005];
        let correlated: Vec<f64> = base.iter().map(|r| r * 1.1 + 0.0005).collect();
        let unrelated = vec![0.02, 0.01, -0.02, 0.03, 0.01, -0.03, 0.02, 0.01];

        let companies = vec![
            company("AAA", "Tech", "Semis", base),
            company("BBB", "Tech", "Semis", correlated),
            company("CCC", "Tech", "Software", unrelated),
        ];
        let pairs = correlated_pairs(&companies, &CompanyGraphOptions::default());

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, "AAA");
        assert_eq!(pairs[0].1, "BBB");
        assert!(pairs[0].2 > 0.99);
    }

    #[test]
    fn pair_shared_by_sector_and_industry_is_computed_once() {
        let base = vec![0.01, -0.02, 0.015, 0.005, -0.01, 0.02];
        let twin = base.clone();
        let companies = vec![
            company("AAA", "Tech", "Semis", base),
            company("BBB", "Tech", "Semis", twin),
        ];
        let pairs = correlated_pairs(&companies, &CompanyGraphOptions::default());
        assert_eq!(pairs.len(), 1);
        assert!((pairs[0].2 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn different_groups_are_never_compared() {
        let series = vec![0.01, -0.02, 0.015, 0.005, -0.01, 0.02];
        let companies = vec![
            company("AAA", "Tech", "Semis", series.clone()),
            company("BBB", "Energy", "Oil", series),
        ];
        assert!(correlated_pairs(&companies, &CompanyGraphOptions::default()).is_empty());
    }

    #[tokio::test]
    async fn graph_builder_emits_bidirectional_weighted_edges() {
        let store = MemoryGraph::new();
        for symbol in ["AAA", "BBB"] {
            store.upsert_node(GraphNode::new(symbol, "Company")).await.unwrap();
        }
        let base = vec![0.01, -0.02, 0.015, 0.005, -0.01, 0.02];
        let inverse: Vec<f64> = base.iter().map(|r| -r).collect();
        let companies = vec![
            company("AAA", "Tech", "Semis", base),
            company("BBB", "Tech", "Semis", inverse),
        ];

        let result = build_company_graph(&store, &companies, &CompanyGraphOptions::default())
            .await
            .unwrap();
        assert_eq!(result.successful.len(), 2);

        let outgoing = store
            .neighbors("AAA", Direction::Outgoing, &[edge_types::RELATED_TO.to_string()])
            .await
            .unwrap();
        assert_eq!(outgoing.len(), 1);
        // Anti-correlated pair still relates, weighted by |ρ|.
        assert!((outgoing[0].0.f64_prop("weight").unwrap() - 1.0).abs() < 1e-9);
        assert!(outgoing[0].0.f64_prop("correlation").unwrap() < 0.0);
    }

    #[tokio::test]
    async fn supply_chain_links_become_depends_on_edges() {
        let store = MemoryGraph::new();
        for symbol in ["AAPL", "TSM"] {
            store.upsert_node(GraphNode::new(symbol, "Company")).await.unwrap();
        }
        let links = vec![SupplyChainLink {
            source_symbol: "AAPL".to_string(),
            target_symbol: "TSM".to_string(),
            dependency_type: DependencyType::Supplier,
            strength: 0.9,
        }];
        let result = ingest_supply_chain(&store, links, &BatchOptions::default())
            .await
            .unwrap();
        assert!(result.all_succeeded());

        let deps = store
            .neighbors("AAPL", Direction::Outgoing, &[edge_types::DEPENDS_ON.to_string()])
            .await
            .unwrap();
        assert_eq!(deps[0].0.str_prop("dependency_type"), Some("SUPPLIER"));
        assert_eq!(deps[0].0.f64_prop("strength"), Some(0.9));
    }
}
