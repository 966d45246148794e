use thiserror::Error;

#[derive(Error, Debug)]
pub enum BadgeError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid threshold config: {reason}")]
    InvalidThresholdConfig { reason: String },

    #[error("Report count oracle unavailable: {reason}")]
    OracleUnavailable { reason: String },

    #[error("Certificate render target is not mounted")]
    RenderTargetUnavailable,

    #[error("Badge store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BadgeError {
    /// Failures that skip a sync cycle without touching the ledger.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::OracleUnavailable { .. })
    }
}

pub type BadgeResult<T> = Result<T, BadgeError>;
