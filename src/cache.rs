//! Optional TTL-bound cache of authorization decisions.
//!
//! Keyed by a deterministic digest of the full evaluation input, so a hit is
//! indistinguishable from a fresh evaluation. Caches decisions only; policy
//! source never passes through here.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::models::AuthorizationDecision;

pub struct DecisionCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

struct CacheEntry {
    decision: AuthorizationDecision,
    inserted_at: Instant,
}

impl DecisionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Deterministic cache key for an evaluation input document.
    ///
    /// `serde_json` keeps object keys sorted, so identical requests always
    /// serialize identically.
    pub fn key(input: &serde_json::Value) -> String {
        let mut hasher = Sha256::new();
        hasher.update(input.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn get(&self, key: &str) -> Option<AuthorizationDecision> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() <= self.ttl => {
                return Some(entry.decision.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    pub fn put(&self, key: String, decision: AuthorizationDecision) {
        self.entries.insert(
            key,
            CacheEntry {
                decision,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
