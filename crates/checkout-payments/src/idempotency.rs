//! Idempotent Create Requests
//!
//! The checkout sends one `Idempotency-Key` per payment attempt. The first
//! request with a key reserves it; when it finishes, its response body is
//! stored and every later request with the same key gets that body back
//! without touching the gateway.
//!
//! ```text
//! begin(key, fp) ──▶ Fresh ──▶ gateway call ──┬─ ok ──────────▶ complete(key, body)
//!      │                                      └─ err / dropped ─▶ release(key)
//!      ├──▶ Replay(body)     (same key, same request, finished)
//!      ├──▶ InFlight         (same key, first request still running)
//!      └──▶ Conflict         (same key, different request)
//! ```
//!
//! A [`Reservation`] releases its key on drop unless it was completed, so a
//! request whose handler is cancelled mid-call does not hold the key. A
//! reservation older than the pending timeout is treated as abandoned and
//! handed to the next request.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{PaymentError, Result};

/// How long a reservation may stay pending before another request takes it over
pub const DEFAULT_PENDING_TIMEOUT: Duration = Duration::minutes(2);

/// How long completed responses are kept for replay
pub const DEFAULT_RETENTION: Duration = Duration::hours(24);

/// SHA-256 of the canonical JSON of a request body
pub fn fingerprint<T: Serialize>(request: &T) -> Result<String> {
    let bytes = serde_json::to_vec(request)
        .map_err(|e| PaymentError::InvalidRequest(format!("unserialisable request: {e}")))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// What to do with an incoming keyed request
#[derive(Clone, Debug, PartialEq)]
pub enum Begin {
    /// First time this key is seen; the caller now owns it
    Fresh,
    /// Already completed; return this body unchanged
    Replay(serde_json::Value),
}

#[derive(Clone, Debug)]
enum Slot {
    Pending,
    Done(serde_json::Value),
}

#[derive(Clone, Debug)]
struct Entry {
    fingerprint: String,
    slot: Slot,
    created_at: DateTime<Utc>,
}

/// Idempotency record storage
pub trait IdempotencyStore: Send + Sync {
    /// Reserve `key`, or report what an earlier request with it did
    fn begin(&self, key: &str, fingerprint: &str) -> Result<Begin>;

    /// Store the response of a reserved key
    fn complete(&self, key: &str, response: serde_json::Value) -> Result<()>;

    /// Drop a reservation whose request failed, so the client may retry
    fn release(&self, key: &str) -> Result<()>;
}

/// A reserved key, released on drop unless completed
pub struct Reservation<'a, S: IdempotencyStore + ?Sized> {
    store: &'a S,
    key: &'a str,
    settled: bool,
}

impl<'a, S: IdempotencyStore + ?Sized> Reservation<'a, S> {
    /// Guard a key that `begin` just returned [`Begin::Fresh`] for
    pub const fn new(store: &'a S, key: &'a str) -> Self {
        Self {
            store,
            key,
            settled: false,
        }
    }

    pub const fn key(&self) -> &str {
        self.key
    }

    /// Store the response; later requests with the key replay it
    pub fn complete(mut self, response: serde_json::Value) -> Result<()> {
        let result = self.store.complete(self.key, response);
        self.settled = result.is_ok();
        result
    }
}

impl<S: IdempotencyStore + ?Sized> Drop for Reservation<'_, S> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        match self.store.release(self.key) {
            Ok(()) => tracing::debug!(idempotency_key = %self.key, "Released idempotency key"),
            Err(e) => {
                tracing::warn!(idempotency_key = %self.key, error = %e, "Could not release idempotency key");
            }
        }
    }
}

/// In-memory idempotency store (for development)
pub struct MemoryIdempotencyStore {
    entries: RwLock<HashMap<String, Entry>>,
    pending_timeout: Duration,
    retention: Duration,
}

impl Default for MemoryIdempotencyStore {
    fn default() -> Self {
        Self {
            entries: RwLock::default(),
            pending_timeout: DEFAULT_PENDING_TIMEOUT,
            retention: DEFAULT_RETENTION,
        }
    }
}

impl MemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_pending_timeout(mut self, timeout: Duration) -> Self {
        self.pending_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    fn is_abandoned(&self, entry: &Entry, now: DateTime<Utc>) -> bool {
        matches!(entry.slot, Slot::Pending) && now - entry.created_at >= self.pending_timeout
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget entries older than `cutoff`. Pending entries survive until
    /// they are also abandoned.
    pub fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let now = Utc::now();
        let mut entries = self.entries.write()?;
        let before = entries.len();
        entries.retain(|_, e| {
            e.created_at >= cutoff || (matches!(e.slot, Slot::Pending) && !self.is_abandoned(e, now))
        });
        Ok(before - entries.len())
    }

    /// Forget entries past the retention window
    pub fn purge_expired(&self) -> Result<usize> {
        self.purge_before(Utc::now() - self.retention)
    }
}

impl IdempotencyStore for MemoryIdempotencyStore {
    fn begin(&self, key: &str, fingerprint: &str) -> Result<Begin> {
        let now = Utc::now();
        let mut entries = self.entries.write()?;

        match entries.get(key) {
            Some(entry) if self.is_abandoned(entry, now) => {
                tracing::warn!(
                    idempotency_key = %key,
                    reserved_at = %entry.created_at,
                    "Taking over abandoned idempotency key"
                );
                entries.insert(
                    key.to_string(),
                    Entry {
                        fingerprint: fingerprint.to_string(),
                        slot: Slot::Pending,
                        created_at: now,
                    },
                );
                Ok(Begin::Fresh)
            }
            None => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        fingerprint: fingerprint.to_string(),
                        slot: Slot::Pending,
                        created_at: now,
                    },
                );
                Ok(Begin::Fresh)
            }
            Some(entry) if entry.fingerprint != fingerprint => {
                Err(PaymentError::IdempotencyConflict(key.to_string()))
            }
            Some(Entry { slot: Slot::Pending, .. }) => Err(PaymentError::InFlight(key.to_string())),
            Some(Entry {
                slot: Slot::Done(body), ..
            }) => {
                tracing::debug!(idempotency_key = %key, "Replaying stored response");
                Ok(Begin::Replay(body.clone()))
            }
        }
    }

    fn complete(&self, key: &str, response: serde_json::Value) -> Result<()> {
        let mut entries = self.entries.write()?;
        let entry = entries
            .get_mut(key)
            .ok_or_else(|| PaymentError::Storage(format!("idempotency key {key} was never reserved")))?;
        entry.slot = Slot::Done(response);
        Ok(())
    }

    fn release(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write()?;
        if matches!(entries.get(key).map(|e| &e.slot), Some(Slot::Pending)) {
            entries.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_replay_after_completion() {
        let store = MemoryIdempotencyStore::new();
        assert_eq!(store.begin("k1", "fp").unwrap(), Begin::Fresh);
        store.complete("k1", json!({"id": "order_1"})).unwrap();

        assert_eq!(
            store.begin("k1", "fp").unwrap(),
            Begin::Replay(json!({"id": "order_1"}))
        );
    }

    #[test]
    fn test_pending_key_is_in_flight() {
        let store = MemoryIdempotencyStore::new();
        store.begin("k1", "fp").unwrap();
        assert!(matches!(store.begin("k1", "fp"), Err(PaymentError::InFlight(_))));
    }

    #[test]
    fn test_different_body_conflicts() {
        let store = MemoryIdempotencyStore::new();
        store.begin("k1", "fp-a").unwrap();
        store.complete("k1", json!({})).unwrap();
        assert!(matches!(
            store.begin("k1", "fp-b"),
            Err(PaymentError::IdempotencyConflict(_))
        ));
    }

    #[test]
    fn test_release_allows_retry() {
        let store = MemoryIdempotencyStore::new();
        store.begin("k1", "fp").unwrap();
        store.release("k1").unwrap();
        assert_eq!(store.begin("k1", "fp").unwrap(), Begin::Fresh);
    }

    #[test]
    fn test_release_keeps_completed_entries() {
        let store = MemoryIdempotencyStore::new();
        store.begin("k1", "fp").unwrap();
        store.complete("k1", json!({"id": 1})).unwrap();
        store.release("k1").unwrap();
        assert!(matches!(store.begin("k1", "fp").unwrap(), Begin::Replay(_)));
    }

    #[test]
    fn test_fingerprint_tracks_body() {
        let a = fingerprint(&json!({"amount": 100})).unwrap();
        let b = fingerprint(&json!({"amount": 101})).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, fingerprint(&json!({"amount": 100})).unwrap());
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_purge_keeps_live_pending() {
        let store = MemoryIdempotencyStore::new();
        store.begin("done", "fp").unwrap();
        store.complete("done", json!({})).unwrap();
        store.begin("pending", "fp").unwrap();

        let purged = store.purge_before(Utc::now() + Duration::seconds(1)).unwrap();
        assert_eq!(purged, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_purge_drops_abandoned_pending() {
        let store = MemoryIdempotencyStore::new().with_pending_timeout(Duration::zero());
        store.begin("pending", "fp").unwrap();

        assert_eq!(store.purge_before(Utc::now() + Duration::seconds(1)).unwrap(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_purge_expired_respects_retention() {
        let store = MemoryIdempotencyStore::new();
        store.begin("k1", "fp").unwrap();
        store.complete("k1", json!({})).unwrap();
        assert_eq!(store.purge_expired().unwrap(), 0);

        let store = MemoryIdempotencyStore::new().with_retention(Duration::seconds(-1));
        store.begin("k1", "fp").unwrap();
        store.complete("k1", json!({})).unwrap();
        assert_eq!(store.purge_expired().unwrap(), 1);
    }

    #[test]
    fn test_abandoned_pending_is_taken_over() {
        let store = MemoryIdempotencyStore::new().with_pending_timeout(Duration::zero());
        store.begin("k1", "fp").unwrap();

        assert_eq!(store.begin("k1", "fp").unwrap(), Begin::Fresh);
        store.complete("k1", json!({"id": 2})).unwrap();
        assert_eq!(store.begin("k1", "fp").unwrap(), Begin::Replay(json!({"id": 2})));
    }

    #[test]
    fn test_dropped_reservation_releases_key() {
        let store = MemoryIdempotencyStore::new();
        assert_eq!(store.begin("k1", "fp").unwrap(), Begin::Fresh);
        {
            let reservation = Reservation::new(&store, "k1");
            assert_eq!(reservation.key(), "k1");
        }
        assert_eq!(store.begin("k1", "fp").unwrap(), Begin::Fresh);
    }

    #[test]
    fn test_completed_reservation_is_kept() {
        let store = MemoryIdempotencyStore::new();
        store.begin("k1", "fp").unwrap();
        Reservation::new(&store, "k1").complete(json!({"id": 1})).unwrap();

        assert_eq!(store.begin("k1", "fp").unwrap(), Begin::Replay(json!({"id": 1})));
    }

    #[tokio::test]
    async fn test_cancelled_request_releases_key() {
        let store = MemoryIdempotencyStore::new();
        store.begin("k1", "fp").unwrap();

        let request = async {
            let _reservation = Reservation::new(&store, "k1");
            std::future::pending::<()>().await;
        };
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(10), request).await;

        assert!(timed_out.is_err());
        assert_eq!(store.begin("k1", "fp").unwrap(), Begin::Fresh);
    }
}
