//! Core data model for the trading-memory graph.
//!
//! Nodes live in a typed property graph; the structs here are the typed
//! views the services work with, convertible to and from the generic
//! property-map representation the graph store speaks.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Node type names as stored in the graph.
pub mod node_types {
    pub const TRADE_DECISION: &str = "TradeDecision";
    pub const TRADE_LIFECYCLE_EVENT: &str = "TradeLifecycleEvent";
    pub const EXTERNAL_EVENT: &str = "ExternalEvent";
    pub const NEWS_ITEM: &str = "NewsItem";
    pub const FILING_CHUNK: &str = "FilingChunk";
    pub const TRANSCRIPT_CHUNK: &str = "TranscriptChunk";
    pub const COMPANY: &str = "Company";
    pub const MACRO_ENTITY: &str = "MacroEntity";
    pub const INDICATOR: &str = "Indicator";
}

/// Edge type names as stored in the graph.
pub mod edge_types {
    pub const INFLUENCED_DECISION: &str = "INFLUENCED_DECISION";
    pub const HAS_EVENT: &str = "HAS_EVENT";
    pub const DEPENDS_ON: &str = "DEPENDS_ON";
    pub const AFFECTED_BY: &str = "AFFECTED_BY";
    pub const MENTIONED_IN: &str = "MENTIONED_IN";
    pub const RELATES_TO_MACRO: &str = "RELATES_TO_MACRO";
    pub const THESIS_INCLUDES: &str = "THESIS_INCLUDES";
    pub const MENTIONS_COMPANY: &str = "MENTIONS_COMPANY";
    pub const IN_SECTOR: &str = "IN_SECTOR";
    pub const RELATED_TO: &str = "RELATED_TO";
    pub const SIMILAR_TO: &str = "SIMILAR_TO";
}

/// Trade decision action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
    Close,
    Increase,
    Reduce,
    NoTrade,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
            TradeAction::Hold => "HOLD",
            TradeAction::Close => "CLOSE",
            TradeAction::Increase => "INCREASE",
            TradeAction::Reduce => "REDUCE",
            TradeAction::NoTrade => "NO_TRADE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(TradeAction::Buy),
            "SELL" => Some(TradeAction::Sell),
            "HOLD" => Some(TradeAction::Hold),
            "CLOSE" => Some(TradeAction::Close),
            "INCREASE" => Some(TradeAction::Increase),
            "REDUCE" => Some(TradeAction::Reduce),
            "NO_TRADE" => Some(TradeAction::NoTrade),
            _ => None,
        }
    }
}

/// External event classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExternalEventType {
    Earnings,
    Macro,
    News,
}

impl ExternalEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalEventType::Earnings => "EARNINGS",
            ExternalEventType::Macro => "MACRO",
            ExternalEventType::News => "NEWS",
        }
    }
}

/// Market-capitalization bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketCapBucket {
    Micro,
    Small,
    Mid,
    Large,
    Mega,
}

impl MarketCapBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketCapBucket::Micro => "MICRO",
            MarketCapBucket::Small => "SMALL",
            MarketCapBucket::Mid => "MID",
            MarketCapBucket::Large => "LARGE",
            MarketCapBucket::Mega => "MEGA",
        }
    }

    /// Derive the bucket from a market cap in dollars.
    ///
    /// Unknown market cap maps to SMALL so screens that exclude micro caps
    /// keep unrated names in play.
    pub fn from_market_cap(market_cap: Option<f64>) -> Self {
        match market_cap {
            None => MarketCapBucket::Small,
            Some(cap) if cap >= 200e9 => MarketCapBucket::Mega,
            Some(cap) if cap >= 10e9 => MarketCapBucket::Large,
            Some(cap) if cap >= 2e9 => MarketCapBucket::Mid,
            Some(cap) if cap >= 300e6 => MarketCapBucket::Small,
            Some(_) => MarketCapBucket::Micro,
        }
    }
}

/// How a company is referenced by a content node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MentionType {
    Primary,
    Secondary,
    PeerComparison,
}

impl MentionType {
    pub fn weight(&self) -> f64 {
        match self {
            MentionType::Primary => 1.0,
            MentionType::Secondary => 0.7,
            MentionType::PeerComparison => 0.5,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PRIMARY" => Some(MentionType::Primary),
            "SECONDARY" => Some(MentionType::Secondary),
            "PEER_COMPARISON" => Some(MentionType::PeerComparison),
            _ => None,
        }
    }
}

/// Macro entity release cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MacroFrequency {
    Irregular,
    Monthly,
    Quarterly,
}

impl MacroFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            MacroFrequency::Irregular => "IRREGULAR",
            MacroFrequency::Monthly => "MONTHLY",
            MacroFrequency::Quarterly => "QUARTERLY",
        }
    }
}

/// Indicator lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorStatus {
    Staging,
    Paper,
    Production,
    Retired,
}

impl IndicatorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorStatus::Staging => "staging",
            IndicatorStatus::Paper => "paper",
            IndicatorStatus::Production => "production",
            IndicatorStatus::Retired => "retired",
        }
    }
}

/// Environment an indicator's metrics were measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricEnvironment {
    Backtest,
    Paper,
    Live,
}

/// Supply-chain dependency classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyType {
    Supplier,
    Customer,
    Partner,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyType::Supplier => "SUPPLIER",
            DependencyType::Customer => "CUSTOMER",
            DependencyType::Partner => "PARTNER",
        }
    }
}

// ============================================================================
// Generic graph representation
// ============================================================================

/// A node as the graph store sees it: opaque ID, type tag, property map,
/// optional embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub node_type: String,
    pub properties: HashMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            properties: HashMap::new(),
            embedding: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_property(mut self, key: &str, value: Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// String property accessor; absent and null both read as `None`.
    pub fn str_prop(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    pub fn f64_prop(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(Value::as_f64)
    }
}

/// A directed edge. Identity is `(source_id, target_id, edge_type)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source_id: String,
    pub target_id: String,
    pub edge_type: String,
    pub properties: HashMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl GraphEdge {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        edge_type: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            edge_type: edge_type.into(),
            properties: HashMap::new(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_property(mut self, key: &str, value: Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    /// Stable identifier used for path deduplication during traversal.
    pub fn edge_id(&self) -> String {
        format!("{}|{}|{}", self.source_id, self.edge_type, self.target_id)
    }

    pub fn f64_prop(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(Value::as_f64)
    }

    pub fn str_prop(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

/// Traversal direction relative to the expanded node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// Clamp a weight-like value to [0, 1]. Applied to weights, sensitivities,
/// and probabilities on every write path.
#[inline]
pub fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

// ============================================================================
// Typed node views
// ============================================================================

/// A recorded trade decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeDecision {
    pub decision_id: String,
    pub action: TradeAction,
    pub instrument_id: String,
    pub underlying_symbol: Option<String>,
    pub regime_label: String,
    pub rationale_text: String,
    /// JSON string `{pnl?, return_pct?, holding_hours?}`; parsed lazily.
    pub realized_outcome: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub embedding_model: Option<String>,
}

impl TradeDecision {
    pub fn to_node(&self) -> GraphNode {
        let mut node = GraphNode::new(&self.decision_id, node_types::TRADE_DECISION)
            .with_property("decision_id", Value::from(self.decision_id.clone()))
            .with_property("action", Value::from(self.action.as_str()))
            .with_property("instrument_id", Value::from(self.instrument_id.clone()))
            .with_property("regime_label", Value::from(self.regime_label.clone()))
            .with_property("rationale_text", Value::from(self.rationale_text.clone()));
        if let Some(sym) = &self.underlying_symbol {
            node = node.with_property("underlying_symbol", Value::from(sym.clone()));
        }
        if let Some(outcome) = &self.realized_outcome {
            node = node.with_property("realized_outcome", Value::from(outcome.clone()));
        }
        if let Some(model) = &self.embedding_model {
            node = node.with_property("embedding_model", Value::from(model.clone()));
        }
        node.embedding = self.embedding.clone();
        node
    }

    pub fn from_node(node: &GraphNode) -> Option<Self> {
        Some(Self {
            decision_id: node.str_prop("decision_id").unwrap_or(&node.id).to_string(),
            action: TradeAction::parse(node.str_prop("action")?)?,
            instrument_id: node.str_prop("instrument_id").unwrap_or_default().to_string(),
            underlying_symbol: node.str_prop("underlying_symbol").map(String::from),
            regime_label: node.str_prop("regime_label").unwrap_or_default().to_string(),
            rationale_text: node.str_prop("rationale_text").unwrap_or_default().to_string(),
            realized_outcome: node.str_prop("realized_outcome").map(String::from),
            embedding: node.embedding.clone(),
            embedding_model: node.str_prop("embedding_model").map(String::from),
        })
    }
}

/// Parsed realized outcome of a closed decision.
///
/// The stored field is a JSON string; malformed payloads are treated as
/// absent rather than failing the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RealizedOutcome {
    pub pnl: Option<f64>,
    pub return_pct: Option<f64>,
    pub holding_hours: Option<f64>,
}

impl RealizedOutcome {
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str::<RealizedOutcome>(raw).ok()
    }

    pub fn has_any(&self) -> bool {
        self.pnl.is_some() || self.return_pct.is_some() || self.holding_hours.is_some()
    }
}

/// An external market event (earnings, macro release, news).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalEvent {
    pub event_id: String,
    pub event_type: ExternalEventType,
    pub event_time: DateTime<Utc>,
    pub payload: Value,
    pub text_summary: String,
    pub related_instrument_ids: Vec<String>,
    pub embedding: Option<Vec<f32>>,
}

impl ExternalEvent {
    pub fn to_node(&self) -> GraphNode {
        let mut node = GraphNode::new(&self.event_id, node_types::EXTERNAL_EVENT)
            .with_property("event_id", Value::from(self.event_id.clone()))
            .with_property("event_type", Value::from(self.event_type.as_str()))
            .with_property("event_time", Value::from(self.event_time.to_rfc3339()))
            .with_property("payload", Value::from(self.payload.to_string()))
            .with_property("text_summary", Value::from(self.text_summary.clone()))
            .with_property(
                "related_instrument_ids",
                Value::from(
                    serde_json::to_string(&self.related_instrument_ids).unwrap_or_default(),
                ),
            );
        node.embedding = self.embedding.clone();
        node
    }
}

/// A listed company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub industry: String,
    pub market_cap_bucket: MarketCapBucket,
}

impl Company {
    pub fn to_node(&self) -> GraphNode {
        GraphNode::new(&self.symbol, node_types::COMPANY)
            .with_property("symbol", Value::from(self.symbol.clone()))
            .with_property("name", Value::from(self.name.clone()))
            .with_property("sector", Value::from(self.sector.clone()))
            .with_property("industry", Value::from(self.industry.clone()))
            .with_property(
                "market_cap_bucket",
                Value::from(self.market_cap_bucket.as_str()),
            )
    }

    pub fn from_node(node: &GraphNode) -> Self {
        Self {
            symbol: node.str_prop("symbol").unwrap_or(&node.id).to_string(),
            name: node.str_prop("name").unwrap_or_default().to_string(),
            sector: node.str_prop("sector").unwrap_or_default().to_string(),
            industry: node.str_prop("industry").unwrap_or_default().to_string(),
            market_cap_bucket: node
                .str_prop("market_cap_bucket")
                .and_then(|s| match s {
                    "MEGA" => Some(MarketCapBucket::Mega),
                    "LARGE" => Some(MarketCapBucket::Large),
                    "MID" => Some(MarketCapBucket::Mid),
                    "SMALL" => Some(MarketCapBucket::Small),
                    "MICRO" => Some(MarketCapBucket::Micro),
                    _ => None,
                })
                .unwrap_or(MarketCapBucket::Small),
        }
    }
}

/// A macroeconomic entity (rate, index, release series).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroEntity {
    pub entity_id: String,
    pub name: String,
    pub frequency: MacroFrequency,
}

impl MacroEntity {
    pub fn to_node(&self) -> GraphNode {
        GraphNode::new(&self.entity_id, node_types::MACRO_ENTITY)
            .with_property("entity_id", Value::from(self.entity_id.clone()))
            .with_property("name", Value::from(self.name.clone()))
            .with_property("frequency", Value::from(self.frequency.as_str()))
    }
}

/// A synthesized trading indicator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Indicator {
    pub indicator_id: String,
    pub name: String,
    pub category: String,
    pub status: IndicatorStatus,
    pub hypothesis: String,
    pub economic_rationale: String,
    pub code_hash: Option<String>,
    pub ast_signature: Option<String>,
    pub deflated_sharpe: Option<f64>,
    pub probability_of_overfit: Option<f64>,
    pub information_coefficient: Option<f64>,
    pub environment: MetricEnvironment,
    pub embedding: Option<Vec<f32>>,
}

impl Indicator {
    /// Text used as the embedding source for semantic dedupe.
    pub fn embedding_text(&self) -> String {
        format!("{}\n\n{}", self.hypothesis, self.economic_rationale)
    }

    pub fn to_node(&self) -> GraphNode {
        let mut node = GraphNode::new(&self.indicator_id, node_types::INDICATOR)
            .with_property("indicator_id", Value::from(self.indicator_id.clone()))
            .with_property("name", Value::from(self.name.clone()))
            .with_property("category", Value::from(self.category.clone()))
            .with_property("status", Value::from(self.status.as_str()))
            .with_property("hypothesis", Value::from(self.hypothesis.clone()))
            .with_property(
                "economic_rationale",
                Value::from(self.economic_rationale.clone()),
            )
            .with_property("embedding_text", Value::from(self.embedding_text()));
        if let Some(hash) = &self.code_hash {
            node = node.with_property("code_hash", Value::from(hash.clone()));
        }
        if let Some(sig) = &self.ast_signature {
            node = node.with_property("ast_signature", Value::from(sig.clone()));
        }
        if let Some(dsr) = self.deflated_sharpe {
            node = node.with_property("deflated_sharpe", Value::from(dsr));
        }
        if let Some(pbo) = self.probability_of_overfit {
            node = node.with_property("probability_of_overfit", Value::from(clamp_unit(pbo)));
        }
        if let Some(ic) = self.information_coefficient {
            node = node.with_property("information_coefficient", Value::from(ic));
        }
        node.embedding = self.embedding.clone();
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_cap_bucket_boundaries() {
        let cases = [
            (Some(2.0e11), MarketCapBucket::Mega),
            (Some(1.999e11), MarketCapBucket::Large),
            (Some(1.0e10), MarketCapBucket::Large),
            (Some(9.999e9), MarketCapBucket::Mid),
            (Some(2.0e9), MarketCapBucket::Mid),
            (Some(1.999e9), MarketCapBucket::Small),
            (Some(3.0e8), MarketCapBucket::Small),
            (Some(2.99e8), MarketCapBucket::Micro),
            (None, MarketCapBucket::Small),
        ];
        for (cap, expected) in cases {
            assert_eq!(MarketCapBucket::from_market_cap(cap), expected, "cap={cap:?}");
        }
    }

    #[test]
    fn market_cap_bucket_monotone() {
        let caps = [1e6, 2.99e8, 3.0e8, 1.9e9, 2e9, 9e9, 1e10, 1.9e11, 2e11, 1e12];
        let buckets: Vec<_> = caps
            .iter()
            .map(|c| MarketCapBucket::from_market_cap(Some(*c)))
            .collect();
        for pair in buckets.windows(2) {
            assert!(pair[0] <= pair[1], "bucketing must be monotone in cap");
        }
    }

    #[test]
    fn realized_outcome_parses_partial_fields() {
        let outcome = RealizedOutcome::parse(r#"{"pnl": 120.5}"#).unwrap();
        assert_eq!(outcome.pnl, Some(120.5));
        assert_eq!(outcome.return_pct, None);
        assert!(outcome.has_any());

        // Malformed payloads read as absent, never as errors.
        assert!(RealizedOutcome::parse("not json").is_none());
        assert!(RealizedOutcome::parse("").is_none());
    }

    #[test]
    fn trade_action_round_trips() {
        for action in [
            TradeAction::Buy,
            TradeAction::Sell,
            TradeAction::Hold,
            TradeAction::Close,
            TradeAction::Increase,
            TradeAction::Reduce,
            TradeAction::NoTrade,
        ] {
            assert_eq!(TradeAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(TradeAction::parse("SHORT"), None);
    }

    #[test]
    fn mention_type_weights() {
        assert_eq!(MentionType::Primary.weight(), 1.0);
        assert_eq!(MentionType::Secondary.weight(), 0.7);
        assert_eq!(MentionType::PeerComparison.weight(), 0.5);
    }

    #[test]
    fn trade_decision_node_round_trip() {
        let decision = TradeDecision {
            decision_id: "dec-1".into(),
            action: TradeAction::Buy,
            instrument_id: "AAPL-2026C".into(),
            underlying_symbol: Some("AAPL".into()),
            regime_label: "risk_on".into(),
            rationale_text: "momentum continuation".into(),
            realized_outcome: Some(r#"{"pnl": 10.0}"#.into()),
            embedding: Some(vec![0.1, 0.2]),
            embedding_model: Some("text-embed-1".into()),
        };
        let node = decision.to_node();
        assert_eq!(node.node_type, node_types::TRADE_DECISION);
        let back = TradeDecision::from_node(&node).unwrap();
        assert_eq!(back.decision_id, decision.decision_id);
        assert_eq!(back.action, decision.action);
        assert_eq!(back.underlying_symbol, decision.underlying_symbol);
        assert_eq!(back.realized_outcome, decision.realized_outcome);
    }
}
