use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Request validation failures; always the caller's to repair, never retried
/// and never counted as a failure of the service itself.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("batch item {index} missing required field: {field}")]
    InvalidItem { index: usize, field: &'static str },

    #[error("batch must contain at least one request")]
    EmptyBatch,

    #[error("batch size {count} exceeds maximum of {max}")]
    BatchTooLarge { count: usize, max: usize },

    #[error("{field} JSON structure too deeply nested")]
    TooDeep { field: &'static str },

    #[error("malformed request body: {reason}")]
    MalformedBody { reason: String },
}

/// Failures talking to the rule-evaluation engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("evaluation engine timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u128 },

    #[error("evaluation engine unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("evaluation engine returned HTTP {status}")]
    Status { status: u16 },

    #[error("evaluation engine response malformed: {reason}")]
    Malformed { reason: String },
}

/// Failures against the version-controlled policy store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("git {operation} failed: {stderr}")]
    Git {
        operation: &'static str,
        stderr: String,
    },

    #[error("git {operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u128,
    },

    #[error("policy not found: {id}")]
    PolicyNotFound { id: String },

    #[error("workspace I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid repository URL: {url}")]
    InvalidUrl { url: String },
}

impl StoreError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required configuration: {key}")]
    MissingRequired { key: String },

    #[error("invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("internal server error: {context}")]
    Internal { context: String },

    #[error("service unavailable: {reason}")]
    ServiceUnavailable { reason: String },
}

impl AppError {
    pub fn internal(context: impl Into<String>) -> Self {
        Self::Internal {
            context: context.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,

            AppError::Store(StoreError::PolicyNotFound { .. }) => StatusCode::NOT_FOUND,

            AppError::Engine(_)
            | AppError::Store(_)
            | AppError::Config(_)
            | AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,

            AppError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::Engine(_) => "engine_error",
            AppError::Store(StoreError::PolicyNotFound { .. }) => "policy_not_found",
            AppError::Store(_) => "store_error",
            AppError::Config(_) => "configuration_error",
            AppError::Internal { .. } => "internal_error",
            AppError::ServiceUnavailable { .. } => "service_unavailable",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_type = self.error_type();
        let error_message = self.to_string();

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": error_message,
                "status": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}
