//! Certificate value object: sanitized recipient, tier, issue date and
//! a deterministic id. Never persisted; built per export request.

use crate::{
    clock::Clock,
    config::CertificateConfig,
    threshold::ThresholdDef,
    types::Timestamp,
};
use serde::Serialize;

/// Default for `CertificateConfig::fallback_recipient`.
pub const FALLBACK_RECIPIENT: &str = "Citizen";

/// Extension of the exported document.
pub const DOCUMENT_EXTENSION: &str = "pdf";

/// Strip control characters and markup brackets, trim, and fall back
/// to `fallback` when nothing is left. Never fails.
pub fn sanitize_name(raw: &str, fallback: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control() && *c != '<' && *c != '>')
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Recipient name from an account email: the local part, sanitized.
pub fn recipient_from_email(email: Option<&str>, fallback: &str) -> String {
    let local = email
        .and_then(|e| e.split('@').next())
        .unwrap_or_default();
    sanitize_name(local, fallback)
}

/// `<PREFIX>-<TIERNAME_UPPERCASE_NO_SPACES>-<epoch millis>`.
pub fn certificate_id(prefix: &str, tier_name: &str, issued: Timestamp) -> String {
    let tier: String = tier_name
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    format!("{prefix}-{tier}-{}", issued.timestamp_millis())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Certificate {
    pub recipient_name: String,
    pub tier: ThresholdDef,
    pub issued_date: Timestamp,
    pub certificate_id: String,
}

impl Certificate {
    /// Id prefix and recipient fallback come from `config`.
    pub fn new(
        config: &CertificateConfig,
        recipient: &str,
        tier: &ThresholdDef,
        issued: Timestamp,
    ) -> Self {
        Self {
            recipient_name: sanitize_name(recipient, &config.fallback_recipient),
            tier: tier.clone(),
            issued_date: issued,
            certificate_id: certificate_id(&config.id_prefix, &tier.tier_name, issued),
        }
    }

    /// Issue dated `issued`, or now when the caller has no date.
    pub fn issue(
        config: &CertificateConfig,
        recipient: &str,
        tier: &ThresholdDef,
        issued: Option<Timestamp>,
        clock: &dyn Clock,
    ) -> Self {
        Self::new(config, recipient, tier, issued.unwrap_or_else(|| clock.now()))
    }

    /// `Jane_Doe_Silver_Certificate.pdf`
    pub fn filename(&self) -> String {
        let name = self
            .recipient_name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_");
        format!("{name}_{}_Certificate.{DOCUMENT_EXTENSION}", self.tier.tier_name)
    }

    /// Footer date, e.g. "18 October 2026".
    pub fn display_date(&self) -> String {
        self.issued_date.format("%d %B %Y").to_string()
    }

    /// "in recognition of filing 20+ civic reports ..."
    pub fn count_phrase(&self) -> String {
        format!(
            "in recognition of filing {}+ civic reports and contributing to a cleaner city.",
            self.tier.min_count
        )
    }
}
