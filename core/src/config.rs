use crate::{
    certificate::FALLBACK_RECIPIENT,
    error::BadgeResult,
    render::PageFormat,
    threshold::{ThresholdDef, ThresholdTable},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Poll period while the achievement view is mounted.
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
    /// A fetch slower than this counts as OracleUnavailable.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

fn default_period_ms() -> u64 {
    5_000
}

fn default_fetch_timeout_ms() -> u64 {
    4_000
}

impl SchedulerConfig {
    pub fn period(&self) -> Duration {
        // interval() panics on a zero period.
        Duration::from_millis(self.period_ms.max(1))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CertificateConfig {
    /// First segment of every certificate id.
    pub id_prefix: String,
    pub title: String,
    pub presented_by: String,
    /// Issuer marks shown top-left / top-right.
    pub left_mark: String,
    pub right_mark: String,
    /// Logical layout canvas, in px.
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Device-pixel multiplier for rasterization.
    pub raster_scale: u32,
    pub page_format: PageFormat,
    /// Recipient used when a name sanitizes to nothing.
    pub fallback_recipient: String,
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            id_prefix: "CCAI".into(),
            title: "Certificate of Civic Achievement".into(),
            presented_by: "Presented by UP Swachhta Mitra and Government of Uttar Pradesh".into(),
            left_mark: "Government of Uttar Pradesh".into(),
            right_mark: "UP Swachhta Mitra".into(),
            canvas_width: 960,
            canvas_height: 640,
            raster_scale: 2,
            page_format: PageFormat::A4Landscape,
            fallback_recipient: FALLBACK_RECIPIENT.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct AchievementFile {
    thresholds: Vec<ThresholdDef>,
    #[serde(default)]
    scheduler: SchedulerConfig,
    #[serde(default)]
    certificate: Option<CertificateConfig>,
}

#[derive(Debug, Clone)]
pub struct AchievementConfig {
    pub thresholds: Vec<ThresholdDef>,
    pub scheduler: SchedulerConfig,
    pub certificate: CertificateConfig,
}

impl AchievementConfig {
    /// Load from the data/ directory.
    /// In tests, use AchievementConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/achievements.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: AchievementFile = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        let config = Self {
            thresholds: file.thresholds,
            scheduler: file.scheduler,
            certificate: file.certificate.unwrap_or_default(),
        };
        // Refuse to start on a bad table rather than at first lookup.
        config.threshold_table()?;
        Ok(config)
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self {
            thresholds: ThresholdTable::civic_default().tiers().to_vec(),
            scheduler: SchedulerConfig::default(),
            certificate: CertificateConfig::default(),
        }
    }

    pub fn threshold_table(&self) -> BadgeResult<ThresholdTable> {
        ThresholdTable::new(self.thresholds.clone())
    }
}
