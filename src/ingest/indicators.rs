//! Indicator ingestion with staged deduplication.
//!
//! Order matters: an exact ID match becomes an update, a code-hash match
//! drops the record, a structural duplicate is rejected (near matches get
//! a SIMILAR_TO edge), and a semantic near-duplicate warns but still
//! lands.

use std::time::Instant;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use serde_json::Value;

use crate::embedding::EmbeddingProvider;
use crate::graph::error::GraphResult;
use crate::graph::store::GraphStore;
use crate::graph::vector::VectorSearchRequest;
use crate::ingest::{IngestionOptions, IngestionReport};
use crate::models::{edge_types, node_types, GraphEdge, Indicator};
use crate::validation::signature::{similarity, SimilarityDecision, StructuralSignature};

/// SHA-256 identity proxy for indicator source code.
pub fn code_hash(source: &str) -> String {
    hex::encode(Sha256::digest(source.as_bytes()))
}

/// How many nearest indicators the semantic dedupe inspects.
const SEMANTIC_PROBE_K: usize = 5;

/// Ingests indicator drafts into the graph.
pub struct IndicatorIngestor<'a, S: ?Sized, E: ?Sized> {
    store: &'a S,
    embedder: &'a E,
}

impl<'a, S, E> IndicatorIngestor<'a, S, E>
where
    S: GraphStore + ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    pub fn new(store: &'a S, embedder: &'a E) -> Self {
        Self { store, embedder }
    }

    /// Ingest a batch of drafts, reporting per-item outcomes.
    pub async fn ingest(
        &self,
        drafts: Vec<Indicator>,
        options: &IngestionOptions,
    ) -> GraphResult<IngestionReport> {
        let started = Instant::now();
        let mut report = IngestionReport::default();

        for draft in drafts {
            match self.ingest_one(draft, options, &mut report).await {
                Ok(()) => {}
                Err(err) if options.continue_on_error => {
                    report.errors.push(err.to_string());
                }
                Err(err) => return Err(err),
            }
        }

        report.execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        debug!(
            ingested = report.ingested.len(),
            updated = report.updated.len(),
            skipped = report.skipped.len(),
            warnings = report.warnings.len(),
            "indicator ingestion complete"
        );
        Ok(report)
    }

    async fn ingest_one(
        &self,
        mut draft: Indicator,
        options: &IngestionOptions,
        report: &mut IngestionReport,
    ) -> GraphResult<()> {
        let id = draft.indicator_id.clone();

        // Stage 1: exact ID. An existing node turns the insert into an
        // idempotent merge update.
        let exists = self.store.get_node(&id).await?.is_some();
        if exists {
            report
                .warnings
                .push(format!("indicator '{}' already exists, updating", id));
        }

        // Stage 2: code hash. A different indicator with identical source
        // drops the draft entirely.
        if options.deduplicate_by_code_hash && !exists {
            if let Some(hash) = &draft.code_hash {
                let peers = self.store.get_nodes_by_type(node_types::INDICATOR).await?;
                if let Some(dup) = peers
                    .iter()
                    .find(|n| n.id != id && n.str_prop("code_hash") == Some(hash.as_str()))
                {
                    warn!(indicator = %id, duplicate_of = %dup.id, "code hash duplicate, dropping");
                    report.warnings.push(format!(
                        "indicator '{}' duplicates code of '{}', dropped",
                        id, dup.id
                    ));
                    report.skipped.push(id);
                    return Ok(());
                }
            }
        }

        // Stage 3: structural similarity over stored signatures. A REJECT
        // drops the draft; a WARN records a SIMILAR_TO edge and continues.
        if !exists {
            if let Some(outcome) = self.check_structure(&draft).await? {
                match outcome.decision {
                    SimilarityDecision::Reject => {
                        warn!(indicator = %id, similar_to = %outcome.peer_id,
                              similarity = outcome.similarity, "structural duplicate, dropping");
                        report.warnings.push(format!(
                            "indicator '{}' structurally duplicates '{}' ({:.2}), dropped",
                            id, outcome.peer_id, outcome.similarity
                        ));
                        report.skipped.push(id);
                        return Ok(());
                    }
                    SimilarityDecision::Warn => {
                        report.warnings.push(format!(
                            "indicator '{}' structurally similar to '{}' ({:.2})",
                            id, outcome.peer_id, outcome.similarity
                        ));
                        let edge = GraphEdge::new(
                            id.clone(),
                            outcome.peer_id.clone(),
                            edge_types::SIMILAR_TO,
                        )
                        .with_property("weight", Value::from(outcome.similarity));
                        self.store.upsert_edge(edge).await?;
                    }
                    SimilarityDecision::Pass => {}
                }
            }
        }

        // Stage 4: embedding + semantic similarity. Near-duplicates warn
        // but still land; the caller decides what to do with the warning.
        if options.generate_embeddings {
            let embedding = self.embedder.embed(&draft.embedding_text()).await?;
            if !exists {
                let probe = VectorSearchRequest::new(embedding.clone())
                    .with_top_k(SEMANTIC_PROBE_K)
                    .with_min_similarity(options.similarity_threshold)
                    .with_node_type(node_types::INDICATOR);
                let near = self.store.vector_search(&probe).await?;
                for hit in near.results.iter().filter(|h| h.id != id) {
                    report.warnings.push(format!(
                        "indicator '{}' is semantically similar to '{}' ({:.2})",
                        id, hit.id, hit.similarity
                    ));
                }
            }
            draft.embedding = Some(embedding);
        }

        self.store.upsert_node(draft.to_node()).await?;
        if exists {
            report.updated.push(id);
        } else {
            report.ingested.push(id);
        }
        Ok(())
    }

    /// Compare the draft's structural signature against every stored
    /// indicator's; the strongest match decides.
    async fn check_structure(&self, draft: &Indicator) -> GraphResult<Option<StructureOutcome>> {
        let Some(raw) = &draft.ast_signature else {
            return Ok(None);
        };
        let Ok(candidate) = serde_json::from_str::<StructuralSignature>(raw) else {
            return Ok(None);
        };

        let peers = self.store.get_nodes_by_type(node_types::INDICATOR).await?;
        let mut best: Option<StructureOutcome> = None;
        for peer in peers.iter().filter(|p| p.id != draft.indicator_id) {
            let Some(peer_raw) = peer.str_prop("ast_signature") else {
                continue;
            };
            let Ok(peer_sig) = serde_json::from_str::<StructuralSignature>(peer_raw) else {
                continue;
            };
            let score = similarity(&candidate, &peer_sig);
            if best.as_ref().map(|b| score > b.similarity).unwrap_or(true) {
                best = Some(StructureOutcome {
                    peer_id: peer.id.clone(),
                    similarity: score,
                    decision: SimilarityDecision::from_similarity(score),
                });
            }
        }
        Ok(best)
    }
}

struct StructureOutcome {
    peer_id: String,
    similarity: f64,
    decision: SimilarityDecision,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::graph::memory::MemoryGraph;
    use crate::models::{IndicatorStatus, MetricEnvironment};

    fn draft(id: &str, hypothesis: &str, source: Option<&str>) -> Indicator {
        Indicator {
            indicator_id: id.to_string(),
            name: id.to_string(),
            category: "momentum".to_string(),
            status: IndicatorStatus::Staging,
            hypothesis: hypothesis.to_string(),
            economic_rationale: "flows persist".to_string(),
            code_hash: source.map(code_hash),
            ast_signature: None,
            deflated_sharpe: None,
            probability_of_overfit: None,
            information_coefficient: None,
            environment: MetricEnvironment::Backtest,
            embedding: None,
        }
    }

    #[test]
    fn code_hash_is_stable_and_content_sensitive() {
        let a = code_hash("fn alpha() { momentum(14) }");
        let b = code_hash("fn alpha() { momentum(14) }");
        let c = code_hash("fn alpha() { momentum(21) }");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn double_ingest_updates_once_and_warns_once() {
        let store = MemoryGraph::new();
        let embedder = HashEmbedder::default();
        let ingestor = IndicatorIngestor::new(&store, &embedder);
        let options = IngestionOptions {
            generate_embeddings: false,
            ..Default::default()
        };

        let first = ingestor
            .ingest(vec![draft("ind-1", "vol breakout", None)], &options)
            .await
            .unwrap();
        assert_eq!(first.ingested, vec!["ind-1".to_string()]);
        assert!(first.warnings.is_empty());

        let second = ingestor
            .ingest(vec![draft("ind-1", "vol breakout", None)], &options)
            .await
            .unwrap();
        assert!(second.ingested.is_empty());
        assert_eq!(second.updated, vec!["ind-1".to_string()]);
        assert_eq!(second.warnings.len(), 1);
        assert_eq!(store.node_count(), 1);
    }

    #[tokio::test]
    async fn code_hash_duplicate_is_dropped() {
        let store = MemoryGraph::new();
        let embedder = HashEmbedder::default();
        let ingestor = IndicatorIngestor::new(&store, &embedder);
        let options = IngestionOptions {
            generate_embeddings: false,
            ..Default::default()
        };

        let source = "fn signal() { rsi(14) < 30 }";
        ingestor
            .ingest(vec![draft("ind-a", "oversold bounce", Some(source))], &options)
            .await
            .unwrap();
        let report = ingestor
            .ingest(vec![draft("ind-b", "dip buying", Some(source))], &options)
            .await
            .unwrap();

        assert_eq!(report.skipped, vec!["ind-b".to_string()]);
        assert!(report.ingested.is_empty());
        assert_eq!(store.node_count(), 1);
    }

    #[tokio::test]
    async fn semantic_near_duplicate_warns_but_still_lands() {
        let store = MemoryGraph::new();
        let embedder = HashEmbedder::default();
        let ingestor = IndicatorIngestor::new(&store, &embedder);
        let options = IngestionOptions::default();

        ingestor
            .ingest(vec![draft("ind-a", "term structure rolldown", None)], &options)
            .await
            .unwrap();
        // Identical hypothesis text embeds identically, similarity 1.0.
        let report = ingestor
            .ingest(vec![draft("ind-b", "term structure rolldown", None)], &options)
            .await
            .unwrap();

        assert_eq!(report.ingested, vec!["ind-b".to_string()]);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("semantically similar to 'ind-a'")));
        assert_eq!(store.node_count(), 2);
    }

    #[tokio::test]
    async fn structural_duplicate_is_rejected_and_near_match_records_edge() {
        use crate::models::Direction;
        use crate::validation::signature::signature_from_source;

        let store = MemoryGraph::new();
        let embedder = HashEmbedder::default();
        let ingestor = IndicatorIngestor::new(&store, &embedder);
        let options = IngestionOptions {
            generate_embeddings: false,
            ..Default::default()
        };

        let sig = |source: &str| serde_json::to_string(&signature_from_source(source)).unwrap();

        let mut base = draft("ind-base", "mean reversion", None);
        base.ast_signature = Some(sig("function f(a) { return a + 1; }"));
        ingestor.ingest(vec![base], &options).await.unwrap();

        // Identical structure under renames: hash-equal, rejected.
        let mut clone = draft("ind-clone", "renamed copy", None);
        clone.ast_signature = Some(sig("function g(b) { return b + 2; }"));
        let report = ingestor.ingest(vec![clone], &options).await.unwrap();
        assert_eq!(report.skipped, vec!["ind-clone".to_string()]);
        assert_eq!(store.node_count(), 1);

        // Superset structure: half the tokens line up, warns and links.
        let mut cousin = draft("ind-cousin", "extended variant", None);
        cousin.ast_signature = Some(sig(
            "function g(x) { const y = x * 2; const z = y - 1; return z; }",
        ));
        let report = ingestor.ingest(vec![cousin], &options).await.unwrap();
        assert_eq!(report.ingested, vec!["ind-cousin".to_string()]);
        assert!(report.warnings.iter().any(|w| w.contains("structurally similar")));

        let links = store
            .neighbors("ind-cousin", Direction::Outgoing, &[edge_types::SIMILAR_TO.to_string()])
            .await
            .unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].1.id, "ind-base");
    }

    #[tokio::test]
    async fn code_hash_dedupe_can_be_disabled() {
        let store = MemoryGraph::new();
        let embedder = HashEmbedder::default();
        let ingestor = IndicatorIngestor::new(&store, &embedder);
        let options = IngestionOptions {
            generate_embeddings: false,
            deduplicate_by_code_hash: false,
            ..Default::default()
        };

        let source = "fn f() { 1 }";
        ingestor
            .ingest(vec![draft("ind-a", "h1", Some(source))], &options)
            .await
            .unwrap();
        let report = ingestor
            .ingest(vec![draft("ind-b", "h2", Some(source))], &options)
            .await
            .unwrap();
        assert_eq!(report.ingested, vec!["ind-b".to_string()]);
        assert_eq!(store.node_count(), 2);
    }
}
