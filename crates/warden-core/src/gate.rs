//! Authorization gate and signed write tokens
//!
//! The gate is a single process-wide flag permitting mutating writes. It
//! defaults to closed on startup, is never persisted, and opens only for
//! a [`WriteToken`] whose Ed25519 signature verifies against the key the
//! gate was constructed with. Every denied check is recorded so blocked
//! write attempts are visible to the audit report.

use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// A signed authorization token
///
/// The signature covers the subject and issue timestamp; verification
/// requires the signer's public key, so an empty or fabricated token can
/// never open the gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteToken {
    /// Who or what the token was issued for
    pub subject: String,
    /// Issue time, covered by the signature
    pub issued_at: DateTime<Utc>,
    /// Detached Ed25519 signature over the canonical message
    pub signature: Signature,
}

impl WriteToken {
    /// Issue a token for `subject`, signed with `key`
    #[must_use]
    pub fn issue(subject: impl Into<String>, key: &SigningKey) -> Self {
        let subject = subject.into();
        let issued_at = Utc::now();
        let signature = key.sign(&token_message(&subject, issued_at));
        Self {
            subject,
            issued_at,
            signature,
        }
    }

    /// Verify this token against the issuer's public key
    #[must_use]
    pub fn verify(&self, key: &VerifyingKey) -> bool {
        key.verify(&token_message(&self.subject, self.issued_at), &self.signature)
            .is_ok()
    }
}

fn token_message(subject: &str, issued_at: DateTime<Utc>) -> Vec<u8> {
    let mut msg = Vec::with_capacity(subject.len() + 1 + 8);
    msg.extend_from_slice(subject.as_bytes());
    msg.push(0);
    msg.extend_from_slice(&issued_at.timestamp_millis().to_le_bytes());
    msg
}

/// One denied write attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeniedAttempt {
    /// Operation that was attempted
    pub operation: String,
    /// Target of the attempt
    pub target: String,
    /// When the attempt was denied
    pub timestamp: DateTime<Utc>,
}

/// The process-wide write-authorization flag
pub struct AuthorizationGate {
    authorized: AtomicBool,
    verifying_key: VerifyingKey,
    denied: Mutex<Vec<DeniedAttempt>>,
}

impl AuthorizationGate {
    /// Gate verifying tokens against `verifying_key`; starts closed
    #[must_use]
    pub fn new(verifying_key: VerifyingKey) -> Self {
        Self {
            authorized: AtomicBool::new(false),
            verifying_key,
            denied: Mutex::new(Vec::new()),
        }
    }

    /// Generate a fresh signing key (issuance side of the token scheme)
    #[must_use]
    pub fn generate_signing_key() -> SigningKey {
        SigningKey::generate(&mut rand::rngs::OsRng)
    }

    /// Whether `operation` on `target` may proceed
    ///
    /// A denied check appends to the attempted-writes list.
    pub fn is_authorized(&self, operation: &str, target: &str) -> bool {
        if self.authorized.load(Ordering::SeqCst) {
            return true;
        }

        self.denied.lock().push(DeniedAttempt {
            operation: operation.to_string(),
            target: target.to_string(),
            timestamp: Utc::now(),
        });
        tracing::warn!(operation, target, "write denied: gate closed");
        false
    }

    /// Open the gate iff `token` verifies
    pub fn authorize(&self, token: &WriteToken) -> bool {
        if token.verify(&self.verifying_key) {
            self.authorized.store(true, Ordering::SeqCst);
            tracing::info!(subject = %token.subject, "authorization granted");
            true
        } else {
            tracing::warn!(subject = %token.subject, "authorization token rejected");
            false
        }
    }

    /// Close the gate
    pub fn revoke(&self) {
        self.authorized.store(false, Ordering::SeqCst);
        tracing::info!("authorization revoked");
    }

    /// Whether the gate is currently open (no attempt is recorded)
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }

    /// Snapshot of denied attempts, oldest first
    #[must_use]
    pub fn denied_attempts(&self) -> Vec<DeniedAttempt> {
        self.denied.lock().clone()
    }

    /// Drop the denied-attempt history
    pub fn clear_denied(&self) {
        self.denied.lock().clear();
    }
}
