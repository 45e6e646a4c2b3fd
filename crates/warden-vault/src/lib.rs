//! Session vault - time-boxed, in-memory secret storage
//!
//! Secrets live only in process memory, scoped to a session with an
//! explicit expiry. Sessions may auto-renew via a scheduled tokio task
//! that re-arms the expiry shortly before it elapses; the task is a
//! cancellable handle, aborted whenever its session is cleared or purged,
//! so no background work outlives the session.
//!
//! Operations on unknown ids return `None` / `false`, never an error.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Session metadata, without the secret
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    /// Session id
    pub id: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Current expiry; renewal re-arms this
    pub expires_at: DateTime<Utc>,
    /// Whether a renewal task is keeping this session alive
    pub auto_renew: bool,
    /// Fraction of the TTL remaining at which renewal fires
    pub renew_threshold: f64,
}

struct Slot {
    secret: Vec<u8>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    ttl: Duration,
    auto_renew: bool,
    renew_threshold: f64,
    renewal: Option<JoinHandle<()>>,
}

impl Slot {
    /// Zero the secret bytes in place before the slot is dropped.
    fn scrub(&mut self) {
        for b in self.secret.iter_mut() {
            *b = 0;
        }
        self.secret.clear();
        if let Some(handle) = self.renewal.take() {
            handle.abort();
        }
    }
}

type SlotMap = Arc<Mutex<HashMap<String, Slot>>>;

/// In-memory vault of expiring credential sessions
///
/// Cloning shares the underlying store.
#[derive(Clone, Default)]
pub struct SessionVault {
    slots: SlotMap,
}

impl SessionVault {
    /// Create an empty vault
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a secret under `id`, expiring after `ttl`
    ///
    /// When `auto_renew` is set, a renewal task is scheduled to fire at
    /// `ttl * (1 - renew_threshold)`, reset the expiry to a full TTL from
    /// that moment, and reschedule itself. Storing over an existing id
    /// scrubs and replaces the previous session.
    ///
    /// Requires a tokio runtime when `auto_renew` is set.
    pub fn store(
        &self,
        id: impl Into<String>,
        secret: &str,
        ttl: Duration,
        auto_renew: bool,
        renew_threshold: f64,
    ) {
        let id = id.into();
        let now = Utc::now();
        let renew_threshold = renew_threshold.clamp(0.0, 1.0);

        let renewal = if auto_renew {
            Some(spawn_renewal(
                Arc::clone(&self.slots),
                id.clone(),
                ttl,
                renew_threshold,
            ))
        } else {
            None
        };

        let slot = Slot {
            secret: secret.as_bytes().to_vec(),
            created_at: now,
            expires_at: now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            ttl,
            auto_renew,
            renew_threshold,
            renewal,
        };

        let mut guard = self.slots.lock();
        if let Some(mut previous) = guard.insert(id.clone(), slot) {
            previous.scrub();
        }
        tracing::debug!(session = %id, ttl_secs = ttl.as_secs_f64(), auto_renew, "session stored");
    }

    /// Fetch the secret for `id`, or `None` if unknown or expired
    ///
    /// An expired session is purged on access: secret scrubbed, renewal
    /// task aborted, entry removed.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<String> {
        let mut guard = self.slots.lock();
        let expired = match guard.get(id) {
            Some(slot) => Utc::now() > slot.expires_at,
            None => return None,
        };

        if expired {
            if let Some(mut slot) = guard.remove(id) {
                slot.scrub();
            }
            tracing::debug!(session = %id, "session expired; purged on access");
            return None;
        }

        guard
            .get(id)
            .map(|slot| String::from_utf8_lossy(&slot.secret).into_owned())
    }

    /// Session metadata for `id`, if present (does not purge)
    #[must_use]
    pub fn session(&self, id: &str) -> Option<SessionInfo> {
        self.slots.lock().get(id).map(|slot| SessionInfo {
            id: id.to_string(),
            created_at: slot.created_at,
            expires_at: slot.expires_at,
            auto_renew: slot.auto_renew,
            renew_threshold: slot.renew_threshold,
        })
    }

    /// Reset expiry to `extra_ttl` from now and re-arm the renewal schedule
    ///
    /// Returns `false` for unknown ids.
    pub fn extend(&self, id: &str, extra_ttl: Duration) -> bool {
        let mut guard = self.slots.lock();
        let Some(slot) = guard.get_mut(id) else {
            return false;
        };

        slot.expires_at =
            Utc::now() + chrono::Duration::from_std(extra_ttl).unwrap_or(chrono::Duration::MAX);
        slot.ttl = extra_ttl;
        if let Some(handle) = slot.renewal.take() {
            handle.abort();
        }
        if slot.auto_renew {
            slot.renewal = Some(spawn_renewal(
                Arc::clone(&self.slots),
                id.to_string(),
                extra_ttl,
                slot.renew_threshold,
            ));
        }
        true
    }

    /// Scrub and remove the session for `id`
    ///
    /// Returns `false` for unknown ids. Removal and renewal cancellation
    /// happen under the map lock, so a renewal firing concurrently cannot
    /// resurrect the session.
    pub fn clear(&self, id: &str) -> bool {
        let mut guard = self.slots.lock();
        match guard.remove(id) {
            Some(mut slot) => {
                slot.scrub();
                tracing::debug!(session = %id, "session cleared");
                true
            }
            None => false,
        }
    }

    /// Scrub and remove every session
    pub fn clear_all(&self) {
        let mut guard = self.slots.lock();
        for (_, slot) in guard.iter_mut() {
            slot.scrub();
        }
        guard.clear();
        tracing::debug!("all sessions cleared");
    }

    /// Number of stored sessions, including any not yet purged as expired
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether the vault holds no sessions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

/// Renewal task: sleeps to the renewal point, re-arms the expiry, repeats.
///
/// The task revalidates the session's presence under the map lock on every
/// firing; once the entry is gone (cleared or purged) the loop exits, so a
/// late firing can never re-create state for a destroyed session.
fn spawn_renewal(
    slots: SlotMap,
    id: String,
    ttl: Duration,
    renew_threshold: f64,
) -> JoinHandle<()> {
    let delay = ttl.mul_f64((1.0 - renew_threshold).clamp(0.0, 1.0));
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(delay).await;
            let mut guard = slots.lock();
            match guard.get_mut(&id) {
                Some(slot) if slot.auto_renew => {
                    slot.expires_at = Utc::now()
                        + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
                    tracing::debug!(session = %id, "session auto-renewed");
                }
                _ => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_secret_before_expiry() {
        let vault = SessionVault::new();
        vault.store("s1", "hunter2", Duration::from_secs(60), false, 0.2);

        assert_eq!(vault.get("s1").as_deref(), Some("hunter2"));
    }

    #[tokio::test]
    async fn get_unknown_id_is_none() {
        let vault = SessionVault::new();
        assert!(vault.get("missing").is_none());
        assert!(!vault.clear("missing"));
        assert!(!vault.extend("missing", Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn expired_session_is_purged_on_access() {
        let vault = SessionVault::new();
        vault.store("s1", "secret", Duration::from_millis(30), false, 0.2);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(vault.get("s1").is_none());
        assert_eq!(vault.len(), 0);
    }

    #[tokio::test]
    async fn auto_renew_keeps_session_alive_past_original_ttl() {
        let vault = SessionVault::new();
        // Renewal fires at 100ms and re-arms expiry to t+300ms.
        vault.store("s1", "secret", Duration::from_millis(200), true, 0.5);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(vault.get("s1").as_deref(), Some("secret"));
        vault.clear("s1");
    }

    #[tokio::test]
    async fn clear_cancels_renewal() {
        let vault = SessionVault::new();
        vault.store("s1", "secret", Duration::from_millis(100), true, 0.5);

        assert!(vault.clear("s1"));
        // A late renewal firing must not re-create the entry.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(vault.get("s1").is_none());
        assert_eq!(vault.len(), 0);
    }

    #[tokio::test]
    async fn extend_resets_expiry() {
        let vault = SessionVault::new();
        vault.store("s1", "secret", Duration::from_millis(50), false, 0.2);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(vault.extend("s1", Duration::from_millis(300)));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(vault.get("s1").as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn store_over_existing_id_replaces_secret() {
        let vault = SessionVault::new();
        vault.store("s1", "old", Duration::from_secs(60), false, 0.2);
        vault.store("s1", "new", Duration::from_secs(60), false, 0.2);

        assert_eq!(vault.get("s1").as_deref(), Some("new"));
        assert_eq!(vault.len(), 1);
    }

    #[tokio::test]
    async fn clear_all_empties_vault() {
        let vault = SessionVault::new();
        vault.store("a", "1", Duration::from_secs(60), false, 0.2);
        vault.store("b", "2", Duration::from_secs(60), false, 0.2);

        vault.clear_all();
        assert!(vault.is_empty());
        assert!(vault.get("a").is_none());
    }
}
