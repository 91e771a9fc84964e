//! Sync/propagation coordinator.
//!
//! Enforcement points pull: each one polls the current revision, refreshes
//! its bundle when the revision differs from its own, and confirms with an
//! ack that updates its tracked state. A push-style nudge can request an
//! out-of-cycle poll, but the pull loop stays the source of truth; a nudge
//! is never assumed delivered. Targets that stop acking go Stale and stay
//! listed for alerting; they keep serving their last-known-good bundle.

use std::sync::RwLock;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::models::{SyncState, SyncTarget};

pub struct SyncCoordinator {
    targets: DashMap<String, SyncTarget>,
    current_revision: RwLock<Option<String>>,
    stale_after: chrono::Duration,
}

impl SyncCoordinator {
    pub fn new(stale_after: Duration) -> Self {
        let stale_after = chrono::Duration::seconds(
            i64::try_from(stale_after.as_secs()).unwrap_or(i64::MAX),
        );
        Self {
            targets: DashMap::new(),
            current_revision: RwLock::new(None),
            stale_after,
        }
    }

    /// Record the revision produced by a successful lifecycle operation.
    pub fn advance_revision(&self, revision: &str) {
        let mut current = self
            .current_revision
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if current.as_deref() != Some(revision) {
            info!(revision = %revision, "rule set revision advanced");
            *current = Some(revision.to_string());
        }
    }

    pub fn current_revision(&self) -> Option<String> {
        self.current_revision
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// A target polled the revision endpoint. First contact registers it in
    /// the Unknown state; only a confirmed sync moves it to Synced.
    pub fn record_poll(&self, target_id: &str) {
        self.targets
            .entry(target_id.to_string())
            .or_insert_with(|| {
                debug!(target = %target_id, "new sync target observed");
                SyncTarget {
                    id: target_id.to_string(),
                    last_synced_revision: None,
                    last_heartbeat: None,
                    state: SyncState::Unknown,
                }
            });
    }

    /// A target confirmed it activated `revision`. This is the only place
    /// heartbeat and synced-revision move forward.
    pub fn record_ack(&self, target_id: &str, revision: &str) -> SyncTarget {
        let mut entry = self
            .targets
            .entry(target_id.to_string())
            .or_insert_with(|| SyncTarget {
                id: target_id.to_string(),
                last_synced_revision: None,
                last_heartbeat: None,
                state: SyncState::Unknown,
            });
        entry.last_synced_revision = Some(revision.to_string());
        entry.last_heartbeat = Some(Utc::now());
        if entry.state != SyncState::Synced {
            info!(target = %target_id, revision = %revision, "sync target confirmed");
        }
        entry.state = SyncState::Synced;
        entry.clone()
    }

    /// Record an out-of-cycle poll request. Purely advisory: polling remains
    /// the authoritative mechanism.
    pub fn record_nudge(&self) {
        debug!("sync nudge received, next polls will pick up the current revision");
    }

    /// Flag targets whose heartbeat is older than the threshold. Stale
    /// targets are observable, never removed, and flip back to Synced on
    /// their next ack.
    pub fn mark_stale_targets(&self) -> usize {
        let now = Utc::now();
        let mut newly_stale = 0;
        for mut entry in self.targets.iter_mut() {
            if entry.state != SyncState::Synced {
                continue;
            }
            let missed = entry
                .last_heartbeat
                .map(|hb| now.signed_duration_since(hb) > self.stale_after)
                .unwrap_or(true);
            if missed {
                warn!(target = %entry.id, "sync target went stale");
                entry.state = SyncState::Stale;
                newly_stale += 1;
            }
        }
        newly_stale
    }

    pub fn targets(&self) -> Vec<SyncTarget> {
        let mut targets: Vec<_> = self.targets.iter().map(|e| e.value().clone()).collect();
        targets.sort_by(|a, b| a.id.cmp(&b.id));
        targets
    }

    pub fn stale_count(&self) -> usize {
        self.targets
            .iter()
            .filter(|e| e.state == SyncState::Stale)
            .count()
    }

    /// Background sweeper that periodically flags stale targets.
    pub fn spawn_staleness_sweeper(
        self: std::sync::Arc<Self>,
        period: Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                self.mark_stale_targets();
            }
        })
    }
}
