//! HTTP request handlers for the policy control plane

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;

use crate::context::RequestContext;
use crate::documentation::{
    BulkDecisionResponse, HealthCheckResponse, LifecycleResponse, PolicyInventoryResponse,
};
use crate::errors::AppError;
use crate::metrics::MetricsHelper;
use crate::models::{AuthorizationDecision, AuthorizationRequest, SyncTarget};
use crate::AppState;

#[utoipa::path(
    post,
    path = "/authorize",
    tag = "authorization",
    request_body = AuthorizationRequest,
    responses(
        (status = 200, description = "Authorization decision made", body = AuthorizationDecision),
        (status = 400, description = "Invalid request, the missing field is named", body = crate::documentation::ErrorResponse),
        (status = 500, description = "Evaluation failure", body = crate::documentation::ErrorResponse)
    )
)]
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<AuthorizationRequest>,
) -> Result<Json<AuthorizationDecision>, AppError> {
    let ctx = RequestContext::from_headers(&headers);
    let start = Instant::now();

    let result = state.decisions.decide(&body, &ctx).await;

    // Audit trail: one line per request on every path, validation failures
    // included.
    match &result {
        Ok(decision) => {
            let outcome = if decision.allow { "allow" } else { "deny" };
            MetricsHelper::record_decision(outcome);
            MetricsHelper::record_decision_duration(outcome, start.elapsed());
            tracing::info!(
                request_id = %ctx.request_id,
                client = %ctx.client_address,
                user = %body.user.id,
                resource = %body.resource.id,
                action = %body.action.name,
                allow = decision.allow,
                "authorization decision"
            );
        }
        Err(e) => {
            let outcome = match e {
                AppError::Validation(_) => "rejected",
                _ => "error",
            };
            if !matches!(e, AppError::Validation(_)) {
                MetricsHelper::record_decision("error");
                MetricsHelper::record_decision_duration("error", start.elapsed());
            }
            tracing::info!(
                request_id = %ctx.request_id,
                client = %ctx.client_address,
                outcome = outcome,
                error = %e,
                "authorization request not decided"
            );
        }
    }

    result.map(Json)
}

#[utoipa::path(
    post,
    path = "/authorize/bulk",
    tag = "authorization",
    request_body = Vec<AuthorizationRequest>,
    responses(
        (status = 200, description = "One decision per item, same order", body = BulkDecisionResponse),
        (status = 400, description = "Empty batch, oversized batch, or invalid item (index named)", body = crate::documentation::ErrorResponse)
    )
)]
pub async fn authorize_bulk(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Vec<AuthorizationRequest>>,
) -> Result<Json<BulkDecisionResponse>, AppError> {
    let ctx = RequestContext::from_headers(&headers);

    let result = state.decisions.decide_batch(&body, &ctx).await;

    match &result {
        Ok(decisions) => {
            tracing::info!(
                request_id = %ctx.request_id,
                client = %ctx.client_address,
                items = decisions.len(),
                allowed = decisions.iter().filter(|d| d.allow).count(),
                "bulk authorization decided"
            );
        }
        Err(e) => {
            tracing::info!(
                request_id = %ctx.request_id,
                client = %ctx.client_address,
                items = body.len(),
                error = %e,
                "bulk authorization rejected"
            );
        }
    }

    result.map(|decisions| Json(BulkDecisionResponse { decisions }))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service and dependencies healthy", body = HealthCheckResponse),
        (status = 503, description = "A dependency is down", body = HealthCheckResponse)
    )
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthCheckResponse>) {
    let (status, status_text) = match state.decisions.engine_healthy().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::warn!(error = %e, "health check found evaluation engine down");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded")
        }
    };
    (
        status,
        Json(HealthCheckResponse {
            status: status_text.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            service: env!("CARGO_PKG_NAME").to_string(),
        }),
    )
}

#[utoipa::path(
    get,
    path = "/policies",
    tag = "policies",
    responses(
        (status = 200, description = "Full policy inventory", body = PolicyInventoryResponse),
        (status = 500, description = "Store failure", body = crate::documentation::ErrorResponse)
    )
)]
pub async fn list_policies(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PolicyInventoryResponse>, AppError> {
    let (policies, revision) = state.lifecycle.scan_all().await?;
    Ok(Json(PolicyInventoryResponse { policies, revision }))
}

#[derive(Debug, Default, Deserialize)]
pub struct LifecycleBody {
    pub message: Option<String>,
}

/// Lifecycle endpoints take an optional JSON body carrying a commit message.
fn parse_lifecycle_body(body: &axum::body::Bytes) -> Result<LifecycleBody, AppError> {
    if body.is_empty() {
        return Ok(LifecycleBody::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        crate::errors::ValidationError::MalformedBody {
            reason: e.to_string(),
        }
        .into()
    })
}

#[utoipa::path(
    post,
    path = "/policies/{policy_id}/enable",
    tag = "policies",
    params(("policy_id" = String, Path, description = "Policy identifier")),
    responses(
        (status = 200, description = "Policy enabled", body = LifecycleResponse),
        (status = 404, description = "Unknown policy", body = crate::documentation::ErrorResponse),
        (status = 500, description = "Store failure, remote unchanged", body = crate::documentation::ErrorResponse)
    )
)]
pub async fn enable_policy(
    State(state): State<Arc<AppState>>,
    Path(policy_id): Path<String>,
    body: axum::body::Bytes,
) -> Result<Json<LifecycleResponse>, AppError> {
    let body = parse_lifecycle_body(&body)?;
    let result = state.lifecycle.enable(&policy_id, body.message.as_deref()).await;
    MetricsHelper::record_lifecycle("enable", if result.is_ok() { "success" } else { "failure" });
    let outcome = result?;
    Ok(Json(LifecycleResponse {
        message: format!("policy {} enabled at revision {}", outcome.policy_id, outcome.revision),
        policy_id: outcome.policy_id,
        status: outcome.state.as_str().to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/policies/{policy_id}/disable",
    tag = "policies",
    params(("policy_id" = String, Path, description = "Policy identifier")),
    responses(
        (status = 200, description = "Policy disabled", body = LifecycleResponse),
        (status = 404, description = "Unknown policy", body = crate::documentation::ErrorResponse),
        (status = 500, description = "Store failure, remote unchanged", body = crate::documentation::ErrorResponse)
    )
)]
pub async fn disable_policy(
    State(state): State<Arc<AppState>>,
    Path(policy_id): Path<String>,
    body: axum::body::Bytes,
) -> Result<Json<LifecycleResponse>, AppError> {
    let body = parse_lifecycle_body(&body)?;
    let result = state
        .lifecycle
        .disable(&policy_id, body.message.as_deref())
        .await;
    MetricsHelper::record_lifecycle("disable", if result.is_ok() { "success" } else { "failure" });
    let outcome = result?;
    Ok(Json(LifecycleResponse {
        message: format!(
            "policy {} disabled at revision {}",
            outcome.policy_id, outcome.revision
        ),
        policy_id: outcome.policy_id,
        status: outcome.state.as_str().to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct RevisionQuery {
    /// Identifier of the polling enforcement point; registers it on first contact
    pub target: Option<String>,
}

#[derive(serde::Serialize)]
pub struct RevisionResponse {
    pub revision: Option<String>,
}

/// Polled by enforcement points; the pull loop is the authoritative sync
/// mechanism.
pub async fn sync_revision(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RevisionQuery>,
) -> Json<RevisionResponse> {
    if let Some(target) = query.target.as_deref().filter(|t| !t.is_empty()) {
        state.sync.record_poll(target);
    }
    Json(RevisionResponse {
        revision: state.sync.current_revision(),
    })
}

#[derive(Debug, Deserialize)]
pub struct SyncAck {
    pub target_id: String,
    pub revision: String,
}

pub async fn sync_ack(
    State(state): State<Arc<AppState>>,
    Json(ack): Json<SyncAck>,
) -> Result<Json<SyncTarget>, AppError> {
    if ack.target_id.trim().is_empty() {
        return Err(crate::errors::ValidationError::MissingField {
            field: "target_id",
        }
        .into());
    }
    let target = state.sync.record_ack(&ack.target_id, &ack.revision);
    MetricsHelper::set_stale_targets(state.sync.stale_count());
    Ok(Json(target))
}

/// Webhook-style hint that the rule set changed; at most accelerates the
/// next poll, delivery is never assumed.
pub async fn sync_nudge(State(state): State<Arc<AppState>>) -> StatusCode {
    state.sync.record_nudge();
    StatusCode::ACCEPTED
}

pub async fn sync_targets(State(state): State<Arc<AppState>>) -> Json<Vec<SyncTarget>> {
    Json(state.sync.targets())
}
