//! Achievement reconciliation core for civic report badges.
//!
//! Data flow:
//!   oracle count -> SyncScheduler -> ReconcileGate -> Ledger::reconcile
//!   -> UnlockNotifier -> (view) -> CertificateExporter
//!
//! RULES:
//!   - Only the oracle's count is authoritative input to the ledger.
//!   - Every reconciliation goes through the gate; passes never interleave.
//!   - Storage is reached only through the BadgeStore port.

pub mod certificate;
pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod layout;
pub mod ledger;
pub mod notifier;
pub mod oracle;
pub mod render;
pub mod resolver;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod threshold;
pub mod types;
