//! News ingestion.

use std::time::Instant;

use serde_json::Value;
use tracing::debug;

use crate::embedding::EmbeddingProvider;
use crate::graph::error::GraphResult;
use crate::graph::store::GraphStore;
use crate::ingest::{IngestionOptions, IngestionReport};
use crate::models::{edge_types, node_types, GraphEdge, GraphNode, MentionType};

/// Body truncation length for embedding text.
pub const DEFAULT_MAX_BODY_LEN: usize = 500;

/// A raw news record.
#[derive(Debug, Clone)]
pub struct NewsDraft {
    pub news_id: String,
    pub headline: String,
    pub body: String,
    pub source: String,
    pub published_at: String,
    /// Companies this item mentions, with how they are referenced.
    pub mentions: Vec<(String, MentionType)>,
}

/// Embedding source text: headline plus truncated body.
pub fn news_embedding_text(headline: &str, body: &str, max_body_len: usize) -> String {
    let truncated: String = if body.chars().count() > max_body_len {
        let mut t: String = body.chars().take(max_body_len).collect();
        t.push('…');
        t
    } else {
        body.to_string()
    };
    format!("{}\n\n{}", headline, truncated)
}

/// Ingest a batch of news items, linking mentioned companies.
pub async fn ingest_news<S, E>(
    store: &S,
    embedder: &E,
    drafts: Vec<NewsDraft>,
    options: &IngestionOptions,
) -> GraphResult<IngestionReport>
where
    S: GraphStore + ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    let started = Instant::now();
    let mut report = IngestionReport::default();

    for draft in drafts {
        match ingest_one(store, embedder, &draft, options).await {
            Ok(updated) => {
                if updated {
                    report.updated.push(draft.news_id.clone());
                } else {
                    report.ingested.push(draft.news_id.clone());
                }
            }
            Err(err) if options.continue_on_error => {
                report
                    .errors
                    .push(format!("news '{}': {}", draft.news_id, err));
            }
            Err(err) => return Err(err),
        }
    }

    report.execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;
    debug!(
        ingested = report.ingested.len(),
        errors = report.errors.len(),
        "news ingestion complete"
    );
    Ok(report)
}

async fn ingest_one<S, E>(
    store: &S,
    embedder: &E,
    draft: &NewsDraft,
    options: &IngestionOptions,
) -> GraphResult<bool>
where
    S: GraphStore + ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    let exists = store.get_node(&draft.news_id).await?.is_some();

    let mut node = GraphNode::new(&draft.news_id, node_types::NEWS_ITEM)
        .with_property("headline", Value::from(draft.headline.clone()))
        .with_property("body", Value::from(draft.body.clone()))
        .with_property("source", Value::from(draft.source.clone()))
        .with_property("published_at", Value::from(draft.published_at.clone()));

    if options.generate_embeddings {
        let text = news_embedding_text(&draft.headline, &draft.body, DEFAULT_MAX_BODY_LEN);
        node.embedding = Some(embedder.embed(&text).await?);
    }
    store.upsert_node(node).await?;

    for (symbol, mention_type) in &draft.mentions {
        let edge = GraphEdge::new(symbol.clone(), draft.news_id.clone(), edge_types::MENTIONED_IN)
            .with_property("mention_type", Value::from(mention_type_tag(*mention_type)))
            .with_property("timestamp", Value::from(draft.published_at.clone()));
        store.upsert_edge(edge).await?;
    }
    Ok(exists)
}

fn mention_type_tag(mention_type: MentionType) -> &'static str {
    match mention_type {
        MentionType::Primary => "PRIMARY",
        MentionType::Secondary => "SECONDARY",
        MentionType::PeerComparison => "PEER_COMPARISON",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::graph::memory::MemoryGraph;
    use crate::models::Direction;

    #[test]
    fn embedding_text_truncates_long_bodies() {
        let body = "x".repeat(800);
        let text = news_embedding_text("Headline", &body, DEFAULT_MAX_BODY_LEN);
        assert!(text.starts_with("Headline\n\n"));
        assert!(text.ends_with('…'));
        assert_eq!(text.chars().count(), "Headline\n\n".chars().count() + 501);

        let short = news_embedding_text("H", "short body", DEFAULT_MAX_BODY_LEN);
        assert_eq!(short, "H\n\nshort body");
        assert!(!short.contains('…'));
    }

    #[tokio::test]
    async fn ingest_links_mentioned_companies() {
        let store = MemoryGraph::new();
        let embedder = HashEmbedder::default();
        store
            .upsert_node(GraphNode::new("AAPL", node_types::COMPANY))
            .await
            .unwrap();

        let draft = NewsDraft {
            news_id: "news-1".to_string(),
            headline: "Apple beats on services".to_string(),
            body: "Strong quarter driven by services margin.".to_string(),
            source: "wire".to_string(),
            published_at: "2026-02-01T12:00:00Z".to_string(),
            mentions: vec![("AAPL".to_string(), MentionType::Primary)],
        };
        let report = ingest_news(&store, &embedder, vec![draft], &IngestionOptions::default())
            .await
            .unwrap();

        assert_eq!(report.ingested, vec!["news-1".to_string()]);
        let mentions = store
            .neighbors("AAPL", Direction::Outgoing, &[edge_types::MENTIONED_IN.to_string()])
            .await
            .unwrap();
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].0.str_prop("mention_type"), Some("PRIMARY"));
        // The typed weight rule resolves PRIMARY to 1.0.
        assert_eq!(crate::graph::edge_scoring::edge_weight(&mentions[0].0), Some(1.0));
    }

    #[tokio::test]
    async fn re_ingest_reports_update() {
        let store = MemoryGraph::new();
        let embedder = HashEmbedder::default();
        let draft = NewsDraft {
            news_id: "news-1".to_string(),
            headline: "h".to_string(),
            body: "b".to_string(),
            source: "wire".to_string(),
            published_at: String::new(),
            mentions: vec![],
        };
        let options = IngestionOptions {
            generate_embeddings: false,
            ..Default::default()
        };
        ingest_news(&store, &embedder, vec![draft.clone()], &options).await.unwrap();
        let second = ingest_news(&store, &embedder, vec![draft], &options).await.unwrap();
        assert_eq!(second.updated, vec!["news-1".to_string()]);
        assert_eq!(store.node_count(), 1);
    }
}
