//! Cross-type graph context search.
//!
//! One entry point that fans a query across filings, transcripts, news,
//! and external events, and returns the companies connected to whatever
//! matched, deduplicated by symbol with their discovery source.

use std::collections::HashSet;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::graph::error::GraphResult;
use crate::graph::store::GraphStore;
use crate::graph::wire::{unwrap_f64, unwrap_string, QueryParams};

/// Where a company entered the result set. Earlier variants win the
/// symbol-level dedupe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanySource {
    Primary,
    Filing,
    Transcript,
    News,
    Related,
    Dependent,
}

impl CompanySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanySource::Primary => "primary",
            CompanySource::Filing => "filing",
            CompanySource::Transcript => "transcript",
            CompanySource::News => "news",
            CompanySource::Related => "related",
            CompanySource::Dependent => "dependent",
        }
    }
}

/// A content-bearing chunk hit.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    pub symbol: String,
    pub company_name: String,
    pub score: f64,
}

/// An external event hit.
#[derive(Debug, Clone, Serialize)]
pub struct ContextEvent {
    pub id: String,
    pub event_type: String,
    pub text_summary: String,
    pub event_time: String,
}

/// A company with its discovery source.
#[derive(Debug, Clone, Serialize)]
pub struct TaggedCompany {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub source: CompanySource,
}

/// Cross-type search output.
#[derive(Debug, Clone, Serialize)]
pub struct GraphContext {
    pub filing_chunks: Vec<DocumentChunk>,
    pub transcript_chunks: Vec<DocumentChunk>,
    pub news_items: Vec<DocumentChunk>,
    pub external_events: Vec<ContextEvent>,
    pub companies: Vec<TaggedCompany>,
    pub execution_time_ms: f64,
}

/// Options for `search_graph_context`.
#[derive(Debug, Clone)]
pub struct GraphContextOptions {
    pub limit: usize,
    /// Scope the search to one company; switches to the company-scoped
    /// backend query, which adds related/dependent companies and drops
    /// external events.
    pub symbol: Option<String>,
}

impl Default for GraphContextOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            symbol: None,
        }
    }
}

/// Search all content types connected to the query.
pub async fn search_graph_context<S>(
    store: &S,
    query: &str,
    options: &GraphContextOptions,
) -> GraphResult<GraphContext>
where
    S: GraphStore + ?Sized,
{
    let started = Instant::now();
    let (query_name, params) = match &options.symbol {
        Some(symbol) => (
            "SearchGraphContextByCompany",
            QueryParams::new()
                .set("query", query)
                .set("limit", options.limit as u64)
                .set("symbol", symbol.clone()),
        ),
        None => (
            "SearchGraphContext",
            QueryParams::new()
                .set("query", query)
                .set("limit", options.limit as u64),
        ),
    };

    let output = store.query(query_name, params).await?;
    let mut context = parse_graph_context(&output.data, options.symbol.is_some());
    context.execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;
    debug!(
        query = query_name,
        companies = context.companies.len(),
        ms = context.execution_time_ms,
        "graph context search complete"
    );
    Ok(context)
}

/// Decode the store's response. Scalars may arrive wrapped or naked; the
/// company list is deduplicated by symbol preferring the earliest source
/// in primary → filing → transcript → news → related → dependent order.
pub fn parse_graph_context(data: &Value, company_scoped: bool) -> GraphContext {
    let filing_chunks = parse_chunks(data, "filing_chunks");
    let transcript_chunks = parse_chunks(data, "transcript_chunks");
    let news_items = parse_chunks(data, "news_items");
    let external_events = if company_scoped {
        Vec::new()
    } else {
        parse_events(data, "external_events")
    };

    let mut companies: Vec<TaggedCompany> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    let mut push = |symbol: String, name: String, sector: String, source: CompanySource| {
        if symbol.is_empty() || !seen.insert(symbol.clone()) {
            return;
        }
        companies.push(TaggedCompany {
            symbol,
            name,
            sector,
            source,
        });
    };

    if let Some(items) = data.get("companies").and_then(Value::as_array) {
        for item in items {
            push(
                unwrap_string(item, "symbol"),
                unwrap_string(item, "name"),
                unwrap_string(item, "sector"),
                CompanySource::Primary,
            );
        }
    }
    for chunk in &filing_chunks {
        push(
            chunk.symbol.clone(),
            chunk.company_name.clone(),
            String::new(),
            CompanySource::Filing,
        );
    }
    for chunk in &transcript_chunks {
        push(
            chunk.symbol.clone(),
            chunk.company_name.clone(),
            String::new(),
            CompanySource::Transcript,
        );
    }
    for chunk in &news_items {
        push(
            chunk.symbol.clone(),
            chunk.company_name.clone(),
            String::new(),
            CompanySource::News,
        );
    }
    for (key, source) in [
        ("related_companies", CompanySource::Related),
        ("dependent_companies", CompanySource::Dependent),
    ] {
        if let Some(items) = data.get(key).and_then(Value::as_array) {
            for item in items {
                push(
                    unwrap_string(item, "symbol"),
                    unwrap_string(item, "name"),
                    unwrap_string(item, "sector"),
                    source,
                );
            }
        }
    }

    GraphContext {
        filing_chunks,
        transcript_chunks,
        news_items,
        external_events,
        companies,
        execution_time_ms: 0.0,
    }
}

fn parse_chunks(data: &Value, key: &str) -> Vec<DocumentChunk> {
    data.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| DocumentChunk {
                    id: unwrap_string(item, "id"),
                    text: unwrap_string(item, "text"),
                    symbol: unwrap_string(item, "symbol"),
                    company_name: unwrap_string(item, "company_name"),
                    score: unwrap_f64(item, "score"),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_events(data: &Value, key: &str) -> Vec<ContextEvent> {
    data.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| ContextEvent {
                    id: unwrap_string(item, "id"),
                    event_type: unwrap_string(item, "event_type"),
                    text_summary: unwrap_string(item, "text_summary"),
                    event_time: unwrap_string(item, "event_time"),
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_mixed_wrapped_and_naked_fields() {
        let data = json!({
            "filing_chunks": [
                {"id": {"String": "f1"}, "text": "10-K risk factors", "symbol": {"String": "AAPL"},
                 "company_name": "Apple Inc", "score": {"F64": 0.91}}
            ],
            "transcript_chunks": [],
            "news_items": [
                {"id": "n1", "text": "chip supply update", "symbol": "TSM",
                 "company_name": {"String": "TSMC"}, "score": 0.62}
            ],
            "external_events": [
                {"id": "e1", "event_type": {"String": "MACRO"},
                 "text_summary": "CPI release", "event_time": "2026-03-01T13:30:00Z"}
            ],
            "companies": []
        });
        let context = parse_graph_context(&data, false);
        assert_eq!(context.filing_chunks.len(), 1);
        assert_eq!(context.filing_chunks[0].id, "f1");
        assert!((context.filing_chunks[0].score - 0.91).abs() < 1e-12);
        assert_eq!(context.news_items[0].company_name, "TSMC");
        assert_eq!(context.external_events.len(), 1);
        assert_eq!(context.external_events[0].event_type, "MACRO");
    }

    #[test]
    fn company_dedupe_prefers_earliest_source() {
        let data = json!({
            "companies": [{"symbol": "AAPL", "name": "Apple Inc", "sector": "Tech"}],
            "filing_chunks": [
                {"id": "f1", "text": "…", "symbol": "AAPL", "company_name": "Apple Inc", "score": 0.9},
                {"id": "f2", "text": "…", "symbol": "MSFT", "company_name": "Microsoft", "score": 0.8}
            ],
            "transcript_chunks": [
                {"id": "t1", "text": "…", "symbol": "MSFT", "company_name": "Microsoft", "score": 0.7}
            ],
            "news_items": [
                {"id": "n1", "text": "…", "symbol": "NVDA", "company_name": "NVIDIA", "score": 0.6}
            ],
            "related_companies": [
                {"symbol": "NVDA", "name": "NVIDIA", "sector": "Tech"},
                {"symbol": "AMD", "name": "AMD", "sector": "Tech"}
            ],
            "dependent_companies": [
                {"symbol": "AMD", "name": "AMD", "sector": "Tech"},
                {"symbol": "TSM", "name": "TSMC", "sector": "Semis"}
            ]
        });
        let context = parse_graph_context(&data, true);

        let sources: Vec<(&str, CompanySource)> = context
            .companies
            .iter()
            .map(|c| (c.symbol.as_str(), c.source))
            .collect();
        assert_eq!(
            sources,
            vec![
                ("AAPL", CompanySource::Primary),
                ("MSFT", CompanySource::Filing),
                ("NVDA", CompanySource::News),
                ("AMD", CompanySource::Related),
                ("TSM", CompanySource::Dependent),
            ]
        );
    }

    #[test]
    fn company_scoped_parse_drops_external_events() {
        let data = json!({
            "external_events": [
                {"id": "e1", "event_type": "NEWS", "text_summary": "…", "event_time": ""}
            ]
        });
        let context = parse_graph_context(&data, true);
        assert!(context.external_events.is_empty());

        let unscoped = parse_graph_context(&data, false);
        assert_eq!(unscoped.external_events.len(), 1);
    }

    #[test]
    fn empty_symbols_never_enter_the_company_list() {
        let data = json!({
            "news_items": [
                {"id": "n1", "text": "…", "symbol": null, "company_name": "?", "score": 0.5}
            ]
        });
        let context = parse_graph_context(&data, false);
        assert!(context.companies.is_empty());
    }
}
