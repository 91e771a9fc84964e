//! Per-request correlation context and evaluation input assembly

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};

use crate::models::AuthorizationRequest;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation and audit metadata for one in-flight request.
///
/// Generated per request, threaded through every log line, and discarded
/// after the response is sent; nothing here is persisted.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub received_at: DateTime<Utc>,
    pub client_address: String,
    pub user_agent: String,
}

impl RequestContext {
    /// Build a context from inbound headers, honoring a caller-supplied
    /// `x-request-id` and generating one otherwise.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_string())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let client_address = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let user_agent = headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            request_id,
            received_at: Utc::now(),
            client_address,
            user_agent,
        }
    }

    /// Derive the per-item context for batch position `index`, so each
    /// decision in a batch is independently traceable (`id-0`, `id-1`, ...).
    pub fn batch_item(&self, index: usize) -> Self {
        Self {
            request_id: format!("{}-{}", self.request_id, index),
            received_at: self.received_at,
            client_address: self.client_address.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Assemble the evaluation input document for the rule-evaluation engine.
///
/// The caller-supplied context map is copied into the document untouched;
/// the request itself is never mutated. The document is deterministic for
/// identical requests, which is what makes it usable as a cache key.
pub fn build_evaluation_input(request: &AuthorizationRequest) -> serde_json::Value {
    let context = request
        .context
        .clone()
        .unwrap_or_default();

    serde_json::json!({
        "subject": request.user,
        "resource": request.resource,
        "action": request.action,
        "context": context,
    })
}
