//! Shared primitive types used across the achievement core.

use chrono::{DateTime, Utc};

/// Authoritative cumulative report count for one identity.
/// Not assumed monotonic across oracle calls.
pub type ReportCount = u64;

/// The active identity a ledger belongs to (account id from the auth layer).
pub type IdentityId = String;

/// Wall-clock instant used for `earned_at` and certificate issue dates.
pub type Timestamp = DateTime<Utc>;
