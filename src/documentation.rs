use utoipa::OpenApi;

use crate::models::{
    ActionSpec, AuthorizationDecision, AuthorizationRequest, PolicyRecord, PolicyState, Principal,
    Resource, SyncState, SyncTarget,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Policy Control Plane API",
        version = "1.0.0",
        description = "Authorization decisions, policy lifecycle, and enforcement-point sync"
    ),
    paths(
        crate::handlers::authorize,
        crate::handlers::authorize_bulk,
        crate::handlers::health_check,
        crate::handlers::list_policies,
        crate::handlers::enable_policy,
        crate::handlers::disable_policy,
    ),
    components(
        schemas(
            AuthorizationRequest,
            AuthorizationDecision,
            Principal,
            Resource,
            ActionSpec,
            PolicyRecord,
            PolicyState,
            SyncTarget,
            SyncState,
            BulkDecisionResponse,
            HealthCheckResponse,
            PolicyInventoryResponse,
            LifecycleResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "authorization", description = "Authorization decisions"),
        (name = "policies", description = "Policy lifecycle operations"),
        (name = "sync", description = "Enforcement-point sync"),
        (name = "health", description = "Health checks")
    )
)]
pub struct ApiDoc;

#[derive(serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct BulkDecisionResponse {
    pub decisions: Vec<AuthorizationDecision>,
}

#[derive(serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct HealthCheckResponse {
    pub status: String,
    pub timestamp: String,
    pub service: String,
}

#[derive(serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct PolicyInventoryResponse {
    pub policies: Vec<PolicyRecord>,
    pub revision: String,
}

#[derive(serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct LifecycleResponse {
    pub message: String,
    pub policy_id: String,
    pub status: String,
}

#[derive(serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorDetails {
    #[schema(example = "validation_error")]
    pub r#type: String,
    #[schema(example = "missing required field: user.id")]
    pub message: String,
    #[schema(example = 400)]
    pub status: u16,
}
