//! Request correlation middleware

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Level;

use crate::context::REQUEST_ID_HEADER;

/// Ensures an `x-request-id` header exists, propagates it to the response,
/// and emits a concise access log with latency.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let req_id_val = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    // Insert/overwrite header for downstream use
    if let Ok(hv) = HeaderValue::from_str(&req_id_val) {
        request.headers_mut().insert(REQUEST_ID_HEADER, hv);
    }

    let start = std::time::Instant::now();
    let mut response = next.run(request).await;
    let latency = start.elapsed();

    // Attach request id to response for propagation
    if let Ok(hv) = HeaderValue::from_str(&req_id_val) {
        response.headers_mut().insert(REQUEST_ID_HEADER, hv);
    }

    tracing::event!(
        Level::INFO,
        req_id = %req_id_val,
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        latency_ms = %latency.as_millis(),
        "request_completed"
    );

    response
}
