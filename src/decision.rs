//! The decision service: single and batched authorization.

use futures::future::join_all;
use tracing::{error, info};

use crate::cache::DecisionCache;
use crate::context::{build_evaluation_input, RequestContext};
use crate::engine::EngineClient;
use crate::errors::AppError;
use crate::metrics::MetricsHelper;
use crate::models::{AuthorizationDecision, AuthorizationRequest};
use crate::validation;

pub struct DecisionService {
    engine: EngineClient,
    cache: Option<DecisionCache>,
}

impl DecisionService {
    pub fn new(engine: EngineClient, cache: Option<DecisionCache>) -> Self {
        Self { engine, cache }
    }

    /// Evaluate one request. Validation failures are the caller's to repair;
    /// engine failures surface as this operation's failure.
    pub async fn decide(
        &self,
        request: &AuthorizationRequest,
        ctx: &RequestContext,
    ) -> Result<AuthorizationDecision, AppError> {
        validation::validate_request(request)?;
        let decision = self.evaluate(request, ctx).await?;
        Ok(decision)
    }

    /// Evaluate up to [`validation::MAX_BATCH_SIZE`] requests.
    ///
    /// Every item is validated before any evaluation begins and one invalid
    /// item rejects the whole batch. Past validation, items are isolated: an
    /// evaluation failure degrades that single item to a deny with reason
    /// "internal error" instead of failing the batch. This asymmetry is
    /// deliberate.
    pub async fn decide_batch(
        &self,
        requests: &[AuthorizationRequest],
        ctx: &RequestContext,
    ) -> Result<Vec<AuthorizationDecision>, AppError> {
        validation::validate_batch(requests)?;

        let evaluations = requests.iter().enumerate().map(|(index, request)| {
            let item_ctx = ctx.batch_item(index);
            async move {
                match self.evaluate(request, &item_ctx).await {
                    Ok(decision) => decision,
                    Err(e) => {
                        error!(
                            request_id = %item_ctx.request_id,
                            error = %e,
                            "batch item evaluation failed, degrading to deny"
                        );
                        MetricsHelper::record_decision("error");
                        AuthorizationDecision::internal_error()
                    }
                }
            }
        });

        Ok(join_all(evaluations).await)
    }

    /// Reachability of the evaluation engine, for health reporting.
    pub async fn engine_healthy(&self) -> Result<(), AppError> {
        self.engine.healthy().await.map_err(AppError::from)
    }

    async fn evaluate(
        &self,
        request: &AuthorizationRequest,
        ctx: &RequestContext,
    ) -> Result<AuthorizationDecision, AppError> {
        let input = build_evaluation_input(request);

        if let Some(cache) = &self.cache {
            let key = DecisionCache::key(&input);
            if let Some(decision) = cache.get(&key) {
                MetricsHelper::record_cache("hit");
                info!(
                    request_id = %ctx.request_id,
                    allow = decision.allow,
                    "decision served from cache"
                );
                return Ok(decision);
            }
            MetricsHelper::record_cache("miss");
            let decision = self.engine.evaluate(&input, &ctx.request_id).await?;
            cache.put(key, decision.clone());
            return Ok(decision);
        }

        self.engine
            .evaluate(&input, &ctx.request_id)
            .await
            .map_err(AppError::from)
    }
}
