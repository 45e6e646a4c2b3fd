//! Append-only audit trail for the change-governance core
//!
//! Provides:
//! - [`AuditEvent`] - one structured record per observed action
//! - [`AuditLedger`] - session-scoped, append-only event store with an
//!   optional JSONL sink (one JSON object per line)
//! - [`AuditReport`] - derived, read-only aggregate over the ledger
//!
//! Events are never mutated or deleted; ordering is log order.

mod event;
mod ledger;

pub use event::{AuditAction, AuditEvent};
pub use ledger::{AuditError, AuditLedger, AuditReport, AuditSummary};
