#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, future_incompatible)]

use std::sync::Arc;

use axum::{
    http,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod cache;
pub mod config;
pub mod context;
pub mod decision;
pub mod documentation;
pub mod engine;
pub mod errors;
pub mod handlers;
pub mod lifecycle;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod store;
pub mod sync;
pub mod validation;

use cache::DecisionCache;
use decision::DecisionService;
use engine::EngineClient;
use lifecycle::LifecycleManager;
use store::{GitPolicyStore, PolicyStore};
use sync::SyncCoordinator;

pub use config::AppConfig;
pub use documentation::ApiDoc;
pub use errors::AppError;
pub use models::{AuthorizationDecision, AuthorizationRequest, PolicyRecord, PolicyState};

pub struct AppState {
    pub decisions: DecisionService,
    pub lifecycle: LifecycleManager,
    pub sync: Arc<SyncCoordinator>,
}

impl AppState {
    /// Wire every component from the startup configuration.
    pub async fn build(config: &AppConfig) -> Result<Arc<Self>, AppError> {
        let engine = EngineClient::new(
            &config.engine_url,
            &config.engine_decision_path,
            config.engine_timeout,
        )?;
        let cache = config
            .cache_enabled
            .then(|| DecisionCache::new(config.cache_ttl));
        let decisions = DecisionService::new(engine, cache);

        let store: Arc<dyn PolicyStore> = Arc::new(GitPolicyStore::new(
            &config.repo_url,
            config.repo_token.as_deref(),
            &config.repo_branch,
            &config.environment,
            config.git_timeout,
        )?);

        let sync = Arc::new(SyncCoordinator::new(config.sync_stale_after));

        // Seed the sync revision from the remote so enforcement points get a
        // meaningful answer before the first lifecycle operation. Best
        // effort: an empty or unreachable remote is reported on first use.
        match store.remote_revision().await {
            Ok(revision) => sync.advance_revision(&revision),
            Err(e) => {
                tracing::warn!(error = %e, "could not read initial policy store revision");
            }
        }

        let lifecycle = LifecycleManager::new(store, Arc::clone(&sync));

        Ok(Arc::new(Self {
            decisions,
            lifecycle,
            sync,
        }))
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    let cors = match std::env::var("ALLOWED_ORIGINS") {
        Ok(origins) if !origins.trim().is_empty() => {
            let mut layer = CorsLayer::new();
            for o in origins.split(',') {
                if let Ok(origin) = o.trim().parse::<http::HeaderValue>() {
                    layer = layer.allow_origin(origin);
                }
            }
            layer
        }
        // No origins unless explicitly configured
        _ => CorsLayer::new(),
    };

    Router::new()
        .route("/authorize", post(handlers::authorize))
        .route("/authorize/bulk", post(handlers::authorize_bulk))
        .route("/health", get(handlers::health_check))
        .route("/policies", get(handlers::list_policies))
        .route("/policies/{policy_id}/enable", post(handlers::enable_policy))
        .route(
            "/policies/{policy_id}/disable",
            post(handlers::disable_policy),
        )
        .route("/sync/revision", get(handlers::sync_revision))
        .route("/sync/ack", post(handlers::sync_ack))
        .route("/sync/nudge", post(handlers::sync_nudge))
        .route("/sync/targets", get(handlers::sync_targets))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(axum::middleware::from_fn(metrics::http_metrics_middleware))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
