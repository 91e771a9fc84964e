//! Policy lifecycle state machine.
//!
//! A policy's logical state and its physical location in the store must
//! always agree. Enable/disable therefore run as a single all-or-nothing
//! sequence against a fresh working copy: move the file, commit, push.
//! If the push fails the remote is untouched and the clone is discarded,
//! so the caller observes either the complete transition or none of it.
//! Push failures are reported, never retried here: a blind retry of a
//! state-mutating git operation can duplicate commits.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::errors::{AppError, StoreError};
use crate::models::{PolicyRecord, PolicyState};
use crate::store::PolicyStore;
use crate::sync::SyncCoordinator;

pub struct LifecycleManager {
    store: Arc<dyn PolicyStore>,
    sync: Arc<SyncCoordinator>,
    // Serializes operations per policy id; operations on distinct policies
    // proceed in parallel on their own clones.
    policy_locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Result of a successful lifecycle transition.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub policy_id: String,
    pub state: PolicyState,
    pub revision: String,
}

impl LifecycleManager {
    pub fn new(store: Arc<dyn PolicyStore>, sync: Arc<SyncCoordinator>) -> Self {
        Self {
            store,
            sync,
            policy_locks: DashMap::new(),
        }
    }

    pub async fn enable(
        &self,
        policy_id: &str,
        commit_message: Option<&str>,
    ) -> Result<TransitionOutcome, AppError> {
        self.transition(policy_id, PolicyState::Enabled, commit_message)
            .await
    }

    pub async fn disable(
        &self,
        policy_id: &str,
        commit_message: Option<&str>,
    ) -> Result<TransitionOutcome, AppError> {
        self.transition(policy_id, PolicyState::Disabled, commit_message)
            .await
    }

    /// Walk one temporary clone and return the full policy inventory with
    /// the revision it was read at. Read-only with respect to the remote.
    pub async fn scan_all(&self) -> Result<(Vec<PolicyRecord>, String), AppError> {
        let workspace = self.store.checkout().await?;
        let records = workspace.list_policies().await?;
        let revision = workspace.revision().await?;
        Ok((records, revision))
    }

    async fn transition(
        &self,
        policy_id: &str,
        target: PolicyState,
        commit_message: Option<&str>,
    ) -> Result<TransitionOutcome, AppError> {
        if policy_id.trim().is_empty() {
            return Err(StoreError::PolicyNotFound {
                id: "(empty)".to_string(),
            }
            .into());
        }

        let lock = self
            .policy_locks
            .entry(policy_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Fresh clone per operation; dropping `workspace` deletes it on
        // every exit path below.
        let mut workspace = self.store.checkout().await?;

        let previous = workspace.move_policy(policy_id, target).await?;
        if previous == target {
            let revision = workspace.revision().await?;
            info!(
                policy_id = %policy_id,
                state = %target,
                "policy already in target state, nothing to commit"
            );
            return Ok(TransitionOutcome {
                policy_id: policy_id.to_string(),
                state: target,
                revision,
            });
        }

        let message = commit_message
            .filter(|m| !m.trim().is_empty())
            .map(|m| m.to_string())
            .unwrap_or_else(|| match target {
                PolicyState::Enabled => format!("enable policy {policy_id}"),
                PolicyState::Disabled => format!("disable policy {policy_id}"),
                PolicyState::Draft => format!("move policy {policy_id} to draft"),
            });

        let revision = workspace.commit(&message).await?;

        if let Err(e) = workspace.push().await {
            error!(
                policy_id = %policy_id,
                target = %target,
                error = %e,
                "lifecycle push failed, remote left unchanged"
            );
            return Err(e.into());
        }

        info!(
            policy_id = %policy_id,
            from = %previous,
            to = %target,
            revision = %revision,
            "policy transition committed"
        );

        // Propagation: enforcement points observe the new revision on their
        // next poll.
        self.sync.advance_revision(&revision);

        Ok(TransitionOutcome {
            policy_id: policy_id.to_string(),
            state: target,
            revision,
        })
    }
}
