//! Error types for the engine's trait families and the public envelope.

use serde::Serialize;
use thiserror::Error;

/// Structural and infrastructure failures detected before or while
/// assembling a workflow for execution. These indicate malformed persisted
/// state and surface to callers as `INTERNAL_ERROR`, never as a business
/// outcome inside an execution report.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("invalid {kind} metadata: {source}")]
    Metadata {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to construct node \"{id}\": {source}")]
    NodeConstruction {
        id: String,
        #[source]
        source: Box<GraphError>,
    },

    #[error("node \"{id}\" failed validation: {source}")]
    NodeValidation {
        id: String,
        #[source]
        source: NodeError,
    },

    #[error("duplicate node ID \"{0}\"")]
    DuplicateNodeId(String),

    #[error("workflow has no start node")]
    MissingStart,

    #[error("edge references non-existent source node \"{0}\"")]
    DanglingSource(String),

    #[error("edge references non-existent target node \"{0}\"")]
    DanglingTarget(String),

    #[error("start node \"{0}\" must not have incoming edges")]
    EdgeIntoStart(String),
}

/// Failures raised by a node variant, either rejecting its configuration at
/// validation time or failing during execution. The walker folds these into
/// the execution report as business outcomes.
#[derive(Debug, Error)]
pub enum NodeError {
    /// A configuration invariant does not hold. Raised by `validate()`.
    #[error("{0}")]
    Invalid(String),

    /// The node could not complete its work at execute time.
    #[error("{0}")]
    Failed(String),

    /// The per-node deadline elapsed before `execute` returned.
    #[error("execution timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl NodeError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Errors from capability adapters (weather, flood, email, SMS).
#[derive(Debug, Error)]
pub enum PortError {
    #[error("request failed: {message}")]
    Request { message: String },

    #[error("unexpected payload: {message}")]
    Payload { message: String },

    #[error("cancelled")]
    Cancelled,
}

/// Errors from the persistence layer. Missing rows are reported through
/// `Option` / `bool` returns rather than an error variant.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A saved node references a type with no library blueprint.
    #[error("node type {0} not found in node_library")]
    UnknownLibraryType(String),

    /// Stored bytes that should be JSON failed to parse.
    #[error("corrupt stored data: {message}")]
    Data { message: String },

    #[error("store error: {message}")]
    Backend { message: String },
}

impl StoreError {
    pub fn backend(e: impl std::fmt::Display) -> Self {
        Self::Backend {
            message: e.to_string(),
        }
    }

    pub fn data(e: impl std::fmt::Display) -> Self {
        Self::Data {
            message: e.to_string(),
        }
    }
}

/// Machine-readable error codes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidId,
    InvalidBody,
    NotFound,
    InternalError,
}

/// The structured error envelope: a code clients can branch on plus a
/// human-readable message.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

/// Failures of the public service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid workflow id")]
    InvalidId,

    #[error("invalid request body")]
    InvalidBody,

    #[error("workflow not found")]
    NotFound,

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// The envelope shown to callers. Internal detail stays in logs; the
    /// message here is intentionally generic for server-side failures.
    pub fn envelope(&self) -> ErrorBody {
        let (code, message) = match self {
            Self::InvalidId => (ErrorCode::InvalidId, "invalid workflow id"),
            Self::InvalidBody => (ErrorCode::InvalidBody, "invalid request body"),
            Self::NotFound => (ErrorCode::NotFound, "workflow not found"),
            Self::Graph(_) | Self::Store(_) => {
                (ErrorCode::InternalError, "internal server error")
            }
        };
        ErrorBody {
            code,
            message: message.to_string(),
        }
    }
}
