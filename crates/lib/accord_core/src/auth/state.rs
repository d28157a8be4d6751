//! One-time login nonces bound to a pending OAuth redirect.
//!
//! A nonce is minted when the caller is sent to the provider and consumed
//! when the provider sends them back. It travels as the OAuth `state`
//! parameter, in the caller's session cookie, and (for OIDC providers) as the
//! ID token `nonce` claim.

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use dashmap::DashMap;
use rand::RngCore;
use tracing::debug;

use crate::oauth::Provider;

/// Lifetime of a pending login (10 minutes).
pub const STATE_TTL: Duration = Duration::from_secs(600);

/// Interval between sweeps of expired entries.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Generate a cryptographically random nonce (24 bytes, URL-safe base64).
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// A login redirect waiting for its callback.
#[derive(Debug, Clone)]
pub struct PendingLogin {
    pub provider: Provider,
    pub created_at: Instant,
}

/// In-memory store of pending logins keyed by nonce.
#[derive(Debug)]
pub struct OAuthStateStore {
    states: DashMap<String, PendingLogin>,
    ttl: Duration,
}

impl OAuthStateStore {
    pub fn new() -> Self {
        Self::with_ttl(STATE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            states: DashMap::new(),
            ttl,
        }
    }

    /// Record a fresh nonce for `provider`.
    pub fn insert(&self, nonce: String, provider: Provider) {
        self.states.insert(
            nonce,
            PendingLogin {
                provider,
                created_at: Instant::now(),
            },
        );
    }

    /// Remove and return the pending login for `nonce`.
    /// Returns `None` if unknown, already consumed, or expired.
    pub fn take(&self, nonce: &str) -> Option<PendingLogin> {
        let (_, pending) = self.states.remove(nonce)?;
        if pending.created_at.elapsed() > self.ttl {
            return None;
        }
        Some(pending)
    }

    /// Evict expired entries.
    pub fn cleanup(&self) {
        let before = self.states.len();
        self.states
            .retain(|_, v| v.created_at.elapsed() <= self.ttl);
        let evicted = before.saturating_sub(self.states.len());
        if evicted > 0 {
            debug!(evicted, "evicted expired OAuth states");
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Spawn a periodic cleanup task.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                store.cleanup();
            }
        })
    }
}

impl Default for OAuthStateStore {
    fn default() -> Self {
        Self::new()
    }
}
