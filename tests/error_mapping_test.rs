use axum::http::StatusCode;
use policy_control_plane::errors::{
    AppError, ConfigError, EngineError, StoreError, ValidationError,
};

#[test]
fn validation_group_maps_to_400() {
    let e1 = AppError::from(ValidationError::MissingField { field: "user.id" });
    let e2 = AppError::from(ValidationError::EmptyBatch);
    let e3 = AppError::from(ValidationError::BatchTooLarge { count: 51, max: 50 });
    let e4 = AppError::from(ValidationError::InvalidItem {
        index: 3,
        field: "action.name",
    });
    assert_eq!(e1.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(e2.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(e3.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(e4.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(e1.error_type(), "validation_error");
}

#[test]
fn missing_policy_maps_to_404() {
    let e = AppError::from(StoreError::PolicyNotFound { id: "p1".into() });
    assert_eq!(e.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(e.error_type(), "policy_not_found");
}

#[test]
fn dependency_failures_map_to_500() {
    let e1 = AppError::from(EngineError::Timeout { timeout_ms: 3000 });
    let e2 = AppError::from(EngineError::Unreachable {
        reason: "connection refused".into(),
    });
    let e3 = AppError::from(StoreError::Git {
        operation: "push",
        stderr: "non-fast-forward".into(),
    });
    let e4 = AppError::from(StoreError::Timeout {
        operation: "clone",
        timeout_ms: 30_000,
    });
    assert_eq!(e1.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(e2.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(e3.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(e4.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(e1.error_type(), "engine_error");
    assert_eq!(e3.error_type(), "store_error");
}

#[test]
fn internal_group_maps_to_500() {
    let e1 = AppError::internal("oops");
    let e2 = AppError::from(ConfigError::MissingRequired {
        key: "POLICY_REPO_URL".into(),
    });
    assert_eq!(e1.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(e2.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(e2.error_type(), "configuration_error");
}

#[test]
fn unavailable_maps_to_503() {
    let e = AppError::ServiceUnavailable {
        reason: "engine down".into(),
    };
    assert_eq!(e.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(e.error_type(), "service_unavailable");
}

#[test]
fn messages_name_the_offending_field() {
    let e = AppError::from(ValidationError::MissingField { field: "user.id" });
    assert_eq!(e.to_string(), "missing required field: user.id");
    let e = AppError::from(ValidationError::InvalidItem {
        index: 1,
        field: "resource.type",
    });
    assert_eq!(
        e.to_string(),
        "batch item 1 missing required field: resource.type"
    );
}
