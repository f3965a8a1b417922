//! Graph snapshot and incremental export, validation, merge, and import.
//!
//! Exports are versioned JSON documents; compatibility is same-major-only.
//! Incremental exports classify records as added or modified against a
//! `since` watermark and carry the next watermark forward.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::graph::error::{GraphError, GraphResult};
use crate::graph::store::GraphStore;
use crate::models::{GraphEdge, GraphNode};

pub const EXPORT_FORMAT_VERSION: &str = "1.0.0";

/// Default import batch size.
pub const DEFAULT_IMPORT_BATCH_SIZE: usize = 100;

/// Counts of what an incremental export picked up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementalChanges {
    pub nodes_added: usize,
    pub nodes_modified: usize,
    pub edges_added: usize,
    pub edges_modified: usize,
}

/// Export document metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub node_count: usize,
    pub edge_count: usize,
    pub node_types: Vec<String>,
    pub edge_types: Vec<String>,
}

/// A full or incremental graph export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphExport {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub source: String,
    /// Nodes grouped by type.
    pub nodes: BTreeMap<String, Vec<GraphNode>>,
    /// Edges grouped by type.
    pub edges: BTreeMap<String, Vec<GraphEdge>>,
    pub metadata: ExportMetadata,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub incremental: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_since_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<IncrementalChanges>,
}

/// Import outcome with per-batch fault isolation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportResult {
    pub nodes_imported: usize,
    pub edges_imported: usize,
    pub nodes_skipped: usize,
    pub edges_skipped: usize,
    pub errors: Vec<String>,
}

fn build_export(
    source: &str,
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    exported_at: DateTime<Utc>,
) -> GraphExport {
    let mut nodes_by_type: BTreeMap<String, Vec<GraphNode>> = BTreeMap::new();
    for node in nodes {
        nodes_by_type.entry(node.node_type.clone()).or_default().push(node);
    }
    let mut edges_by_type: BTreeMap<String, Vec<GraphEdge>> = BTreeMap::new();
    for edge in edges {
        edges_by_type.entry(edge.edge_type.clone()).or_default().push(edge);
    }
    // Deterministic record order inside each type bucket.
    for nodes in nodes_by_type.values_mut() {
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
    }
    for edges in edges_by_type.values_mut() {
        edges.sort_by(|a, b| a.edge_id().cmp(&b.edge_id()));
    }

    let metadata = ExportMetadata {
        node_count: nodes_by_type.values().map(Vec::len).sum(),
        edge_count: edges_by_type.values().map(Vec::len).sum(),
        node_types: nodes_by_type.keys().cloned().collect(),
        edge_types: edges_by_type.keys().cloned().collect(),
    };

    GraphExport {
        version: EXPORT_FORMAT_VERSION.to_string(),
        exported_at,
        source: source.to_string(),
        nodes: nodes_by_type,
        edges: edges_by_type,
        metadata,
        incremental: false,
        next_since_timestamp: None,
        changes: None,
    }
}

/// Export the full graph.
pub async fn export_snapshot<S>(store: &S, source: &str) -> GraphResult<GraphExport>
where
    S: GraphStore + ?Sized,
{
    let nodes = store.export_nodes(None).await?;
    let edges = store.export_edges(None).await?;
    let export = build_export(source, nodes, edges, Utc::now());
    info!(
        nodes = export.metadata.node_count,
        edges = export.metadata.edge_count,
        "snapshot export complete"
    );
    Ok(export)
}

/// Export only records changed since the watermark.
///
/// A record counts as *added* when it was created at or after `since`,
/// and *modified* when it predates `since` but was updated at or after
/// it.
pub async fn export_incremental<S>(
    store: &S,
    source: &str,
    since: DateTime<Utc>,
) -> GraphResult<GraphExport>
where
    S: GraphStore + ?Sized,
{
    let exported_at = Utc::now();
    let nodes = store.export_nodes(Some(since)).await?;
    let edges = store.export_edges(Some(since)).await?;

    let is_added = |created: Option<DateTime<Utc>>| created.map(|t| t >= since).unwrap_or(false);
    let changes = IncrementalChanges {
        nodes_added: nodes.iter().filter(|n| is_added(n.created_at)).count(),
        nodes_modified: nodes.iter().filter(|n| !is_added(n.created_at)).count(),
        edges_added: edges.iter().filter(|e| is_added(e.created_at)).count(),
        edges_modified: edges.iter().filter(|e| !is_added(e.created_at)).count(),
    };

    let mut export = build_export(source, nodes, edges, exported_at);
    export.incremental = true;
    export.next_since_timestamp = Some(exported_at);
    export.changes = Some(changes);
    debug!(?export.changes, "incremental export classified");
    Ok(export)
}

/// Structural validation of a raw export document. Returns one message
/// per missing field; an empty list means the document is well-formed.
pub fn validate_export_document(document: &Value) -> Vec<String> {
    let mut errors = Vec::new();
    for field in ["version", "exportedAt", "source", "nodes", "edges", "metadata"] {
        if document.get(field).is_none() {
            errors.push(format!("missing required field '{}'", field));
        }
    }
    if let Some(metadata) = document.get("metadata") {
        for field in ["nodeCount", "edgeCount", "nodeTypes", "edgeTypes"] {
            if metadata.get(field).is_none() {
                errors.push(format!("missing required field 'metadata.{}'", field));
            }
        }
    }
    errors
}

fn major_version(version: &str) -> Option<u64> {
    version.split('.').next()?.parse().ok()
}

/// Reject documents whose major version differs from ours.
pub fn check_version_compatibility(version: &str) -> GraphResult<()> {
    let ours = major_version(EXPORT_FORMAT_VERSION);
    let theirs = major_version(version);
    match (ours, theirs) {
        (Some(a), Some(b)) if a == b => Ok(()),
        _ => Err(GraphError::SchemaError {
            query: "importNodes".to_string(),
            message: format!(
                "incompatible export version '{}', expected major version of '{}'",
                version, EXPORT_FORMAT_VERSION
            ),
        }),
    }
}

/// Merge an incremental export over a base snapshot.
///
/// Nodes overwrite on ID equality; edges on `(source, target, type)`.
pub fn merge_exports(base: GraphExport, incremental: &GraphExport) -> GraphExport {
    let mut merged = base;

    for (node_type, nodes) in &incremental.nodes {
        let slot = merged.nodes.entry(node_type.clone()).or_default();
        for node in nodes {
            match slot.iter_mut().find(|n| n.id == node.id) {
                Some(existing) => *existing = node.clone(),
                None => slot.push(node.clone()),
            }
        }
    }
    for (edge_type, edges) in &incremental.edges {
        let slot = merged.edges.entry(edge_type.clone()).or_default();
        for edge in edges {
            let same = |e: &GraphEdge| {
                e.source_id == edge.source_id
                    && e.target_id == edge.target_id
                    && e.edge_type == edge.edge_type
            };
            match slot.iter_mut().find(|e| same(e)) {
                Some(existing) => *existing = edge.clone(),
                None => slot.push(edge.clone()),
            }
        }
    }

    merged.metadata = ExportMetadata {
        node_count: merged.nodes.values().map(Vec::len).sum(),
        edge_count: merged.edges.values().map(Vec::len).sum(),
        node_types: merged.nodes.keys().cloned().collect(),
        edge_types: merged.edges.keys().cloned().collect(),
    };
    merged.exported_at = incremental.exported_at;
    merged
}

/// Import an export document in batches.
///
/// A failing record is skipped and reported; the batch around it still
/// lands. Incompatible versions reject the whole document up front.
pub async fn import_export<S>(
    store: &S,
    export: &GraphExport,
    batch_size: usize,
) -> GraphResult<ImportResult>
where
    S: GraphStore + ?Sized,
{
    check_version_compatibility(&export.version)?;
    let batch_size = batch_size.max(1);
    let mut result = ImportResult::default();

    let all_nodes: Vec<&GraphNode> = export.nodes.values().flatten().collect();
    for batch in all_nodes.chunks(batch_size) {
        for node in batch {
            match store.upsert_node((*node).clone()).await {
                Ok(()) => result.nodes_imported += 1,
                Err(err) => {
                    warn!(node = %node.id, error = %err, "node import failed");
                    result.nodes_skipped += 1;
                    result.errors.push(format!("node '{}': {}", node.id, err));
                }
            }
        }
    }

    let all_edges: Vec<&GraphEdge> = export.edges.values().flatten().collect();
    for batch in all_edges.chunks(batch_size) {
        for edge in batch {
            match store.upsert_edge((*edge).clone()).await {
                Ok(()) => result.edges_imported += 1,
                Err(err) => {
                    warn!(edge = %edge.edge_id(), error = %err, "edge import failed");
                    result.edges_skipped += 1;
                    result
                        .errors
                        .push(format!("edge '{}': {}", edge.edge_id(), err));
                }
            }
        }
    }

    info!(
        nodes = result.nodes_imported,
        edges = result.edges_imported,
        skipped = result.nodes_skipped + result.edges_skipped,
        "import complete"
    );
    Ok(result)
}

/// Serialize an export to a JSON file.
pub fn write_export_file(export: &GraphExport, path: &Path) -> GraphResult<()> {
    let json = serde_json::to_string_pretty(export).map_err(|e| GraphError::ParseError {
        context: "export serialization".to_string(),
        message: e.to_string(),
    })?;
    std::fs::write(path, json).map_err(|e| GraphError::QueryFailed {
        query: "exportNodes".to_string(),
        message: format!("write {}: {}", path.display(), e),
    })
}

/// Read and structurally validate an export file.
pub fn read_export_file(path: &Path) -> GraphResult<GraphExport> {
    let raw = std::fs::read_to_string(path).map_err(|e| GraphError::QueryFailed {
        query: "importNodes".to_string(),
        message: format!("read {}: {}", path.display(), e),
    })?;
    let document: Value = serde_json::from_str(&raw).map_err(|e| GraphError::ParseError {
        context: "export file".to_string(),
        message: e.to_string(),
    })?;

    let problems = validate_export_document(&document);
    if !problems.is_empty() {
        return Err(GraphError::SchemaError {
            query: "importNodes".to_string(),
            message: problems.join("; "),
        });
    }
    serde_json::from_value(document).map_err(|e| GraphError::ParseError {
        context: "export file".to_string(),
        message: e.to_string(),
    })
}
