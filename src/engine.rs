//! HTTP client for the rule-evaluation engine.
//!
//! The engine is an external black box speaking the OPA data API: the input
//! document goes to `POST {base}/v1/data/{decision_path}` and the verdict
//! comes back under `result`. This client propagates `x-request-id`, times
//! every call, and never parses policy source itself.

use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::context::REQUEST_ID_HEADER;
use crate::errors::EngineError;
use crate::models::AuthorizationDecision;

#[derive(Clone)]
pub struct EngineClient {
    http: reqwest::Client,
    base_url: String,
    decision_path: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct EngineResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
}

impl EngineClient {
    pub fn new(
        base_url: &str,
        decision_path: &str,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Unreachable {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            decision_path: decision_path.trim_matches('/').to_string(),
            timeout,
        })
    }

    /// Evaluate one input document, returning the engine's verdict.
    pub async fn evaluate(
        &self,
        input: &serde_json::Value,
        request_id: &str,
    ) -> Result<AuthorizationDecision, EngineError> {
        let url = format!("{}/v1/data/{}", self.base_url, self.decision_path);
        let start = Instant::now();

        let response = self
            .http
            .post(url)
            .header(REQUEST_ID_HEADER, request_id)
            .json(&serde_json::json!({ "input": input }))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                request_id = %request_id,
                status = status.as_u16(),
                "evaluation engine returned error status"
            );
            return Err(EngineError::Status {
                status: status.as_u16(),
            });
        }

        let body: EngineResponse =
            response
                .json()
                .await
                .map_err(|e| EngineError::Malformed {
                    reason: e.to_string(),
                })?;

        let decision = parse_result(body.result)?;

        tracing::debug!(
            request_id = %request_id,
            allow = decision.allow,
            latency_ms = %start.elapsed().as_millis(),
            "evaluation completed"
        );

        Ok(decision)
    }

    /// Probe the engine's health endpoint; used by `/health` to surface
    /// dependency failure as 503.
    pub async fn healthy(&self) -> Result<(), EngineError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(EngineError::Status {
                status: response.status().as_u16(),
            })
        }
    }

    fn map_send_error(&self, error: reqwest::Error) -> EngineError {
        if error.is_timeout() {
            EngineError::Timeout {
                timeout_ms: self.timeout.as_millis(),
            }
        } else {
            EngineError::Unreachable {
                reason: error.to_string(),
            }
        }
    }
}

/// Map the engine's `result` document onto a decision.
///
/// Accepts either a bare boolean or an object carrying `allow` with optional
/// `reason` and `policy_id`. A missing result means the decision path does
/// not exist on the engine, which is a deployment fault, not a deny.
fn parse_result(result: Option<serde_json::Value>) -> Result<AuthorizationDecision, EngineError> {
    let result = result.ok_or_else(|| EngineError::Malformed {
        reason: "engine response has no result document".to_string(),
    })?;

    match result {
        serde_json::Value::Bool(allow) => Ok(AuthorizationDecision {
            allow,
            reason: default_reason(allow).to_string(),
            policy_id: None,
        }),
        serde_json::Value::Object(obj) => {
            let allow = obj
                .get("allow")
                .and_then(serde_json::Value::as_bool)
                .ok_or_else(|| EngineError::Malformed {
                    reason: "result object has no boolean allow".to_string(),
                })?;
            let reason = obj
                .get("reason")
                .and_then(serde_json::Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or(default_reason(allow))
                .to_string();
            let policy_id = obj
                .get("policy_id")
                .and_then(serde_json::Value::as_str)
                .map(|s| s.to_string());
            Ok(AuthorizationDecision {
                allow,
                reason,
                policy_id,
            })
        }
        other => Err(EngineError::Malformed {
            reason: format!("unexpected result type: {other}"),
        }),
    }
}

fn default_reason(allow: bool) -> &'static str {
    if allow {
        "request allowed by policy"
    } else {
        "request denied by policy"
    }
}
