//! Typed errors for the graph-store boundary.

/// Error kinds surfaced by the graph adapter.
///
/// Retryability is a property of the kind, not of message text; callers
/// must never string-match.
#[derive(Debug, Clone)]
pub enum GraphError {
    /// Initial handshake with the store failed.
    ConnectionFailed { message: String },
    /// The store returned an execution error.
    QueryFailed { query: String, message: String },
    /// The configured timeout elapsed before the store answered.
    Timeout { query: String, timeout_ms: u64 },
    /// Malformed parameters; surfaced to the caller unchanged.
    InvalidQuery { query: String, message: String },
    /// Targeted entity absent; callers usually map this to an empty result.
    NotFound { query: String, entity: String },
    /// The store rejected the shape of the request or response.
    SchemaError { query: String, message: String },
    /// Embedded JSON (e.g. a realized outcome) failed to parse.
    ParseError { context: String, message: String },
}

impl GraphError {
    /// Whether the retry loop may re-issue the query.
    pub fn retryable(&self) -> bool {
        !matches!(
            self,
            GraphError::SchemaError { .. }
                | GraphError::InvalidQuery { .. }
                | GraphError::NotFound { .. }
        )
    }

    /// Short machine-readable tag, mirrored in logs and health reports.
    pub fn kind(&self) -> &'static str {
        match self {
            GraphError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            GraphError::QueryFailed { .. } => "QUERY_FAILED",
            GraphError::Timeout { .. } => "TIMEOUT",
            GraphError::InvalidQuery { .. } => "INVALID_QUERY",
            GraphError::NotFound { .. } => "NOT_FOUND",
            GraphError::SchemaError { .. } => "SCHEMA_ERROR",
            GraphError::ParseError { .. } => "PARSE_ERROR",
        }
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::ConnectionFailed { message } => {
                write!(f, "connection failed: {}", message)
            }
            GraphError::QueryFailed { query, message } => {
                write!(f, "query '{}' failed: {}", query, message)
            }
            GraphError::Timeout { query, timeout_ms } => {
                write!(f, "query '{}' timed out after {}ms", query, timeout_ms)
            }
            GraphError::InvalidQuery { query, message } => {
                write!(f, "invalid query '{}': {}", query, message)
            }
            GraphError::NotFound { query, entity } => {
                write!(f, "query '{}': '{}' not found", query, entity)
            }
            GraphError::SchemaError { query, message } => {
                write!(f, "schema error in '{}': {}", query, message)
            }
            GraphError::ParseError { context, message } => {
                write!(f, "parse error ({}): {}", context, message)
            }
        }
    }
}

impl std::error::Error for GraphError {}

pub type GraphResult<T> = Result<T, GraphError>;
