//! Error types for the MCP server.
//!
//! Maps store and validation errors to MCP-friendly error responses.

use crate::store::StoreError;

/// MCP server errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServerError {
    /// Error from the underlying document store.
    #[error("database error: {0}")]
    Store(String),

    /// Unknown tool requested.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Missing required argument.
    #[error("missing required argument: {0}")]
    MissingArg(String),

    /// Invalid argument value. `name` is the path of the offending field,
    /// e.g. `filters[2].operator`.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArg {
        /// Path of the offending argument
        name: String,
        /// Reason why it's invalid
        reason: String,
    },

    /// No project registered under the requested id.
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    /// Startup configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON-RPC protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        ServerError::Store(err.to_string())
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::Protocol(format!("JSON error: {}", err))
    }
}

/// JSON-RPC error codes.
pub mod rpc_codes {
    /// Parse error - Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid Request - The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found - The method does not exist / is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params - Invalid method parameter(s).
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error - Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;
}

impl ServerError {
    /// Convert to JSON-RPC error code.
    ///
    /// Only protocol-level failures ever become JSON-RPC errors; tool-level
    /// failures are rendered as `{"error": ...}` payloads inside the success
    /// envelope by the dispatcher.
    pub fn rpc_code(&self) -> i32 {
        match self {
            ServerError::UnknownTool(_) => rpc_codes::METHOD_NOT_FOUND,
            ServerError::MissingArg(_)
            | ServerError::InvalidArg { .. }
            | ServerError::ProjectNotFound(_) => rpc_codes::INVALID_PARAMS,
            ServerError::Protocol(_) => rpc_codes::INVALID_REQUEST,
            _ => rpc_codes::INTERNAL_ERROR,
        }
    }
}

/// Result type for MCP operations.
pub type Result<T> = std::result::Result<T, ServerError>;
