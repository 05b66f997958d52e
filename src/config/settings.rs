//! User settings for taxbox
//!
//! Holds tax defaults, filing deadlines, dashboard weighting and the options
//! used when delivering notifications.

use serde::{Deserialize, Serialize};

use super::paths::TaxboxPaths;
use crate::error::TaxboxError;
use crate::models::ExportTarget;

/// Weights applied to each risk count when scoring a client's health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthWeights {
    /// Points lost per box with overdue withholding tax
    pub overdue_wht: u32,
    /// Points lost per box waiting on documents
    pub pending_docs: u32,
    /// Points lost per overdue task
    pub overdue_tasks: u32,
}

impl Default for HealthWeights {
    fn default() -> Self {
        Self {
            overdue_wht: 15,
            pending_docs: 5,
            overdue_tasks: 10,
        }
    }
}

/// Settings for taxbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Currency symbol used in terminal output
    #[serde(default = "default_currency")]
    pub currency_symbol: String,

    /// Date format preference (strftime format)
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// VAT rate applied to new boxes, in basis points
    #[serde(default = "default_vat_rate")]
    pub default_vat_rate_bp: u32,

    /// Day of the following month on which PND.3/PND.53 are due
    #[serde(default = "default_wht_filing_day")]
    pub wht_filing_day: u32,

    /// Day of the following month on which PP.30 is due
    #[serde(default = "default_vat_filing_day")]
    pub vat_filing_day: u32,

    /// Firm dashboard health score weights
    #[serde(default)]
    pub health_weights: HealthWeights,

    /// Target used when an export names no profile
    #[serde(default)]
    pub default_export_target: ExportTarget,

    /// HTTP endpoint that relays e-mail notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_relay_url: Option<String>,

    /// Timeout for outbound notification requests
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// E-mail of the user to act as when `--user` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_user: Option<String>,
}

fn default_schema_version() -> u32 {
    1
}

fn default_currency() -> String {
    "฿".to_string()
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_vat_rate() -> u32 {
    700
}

fn default_wht_filing_day() -> u32 {
    7
}

fn default_vat_filing_day() -> u32 {
    15
}

fn default_http_timeout() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            currency_symbol: default_currency(),
            date_format: default_date_format(),
            default_vat_rate_bp: default_vat_rate(),
            wht_filing_day: default_wht_filing_day(),
            vat_filing_day: default_vat_filing_day(),
            health_weights: HealthWeights::default(),
            default_export_target: ExportTarget::default(),
            email_relay_url: None,
            http_timeout_secs: default_http_timeout(),
            default_user: None,
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &TaxboxPaths) -> Result<Self, TaxboxError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| TaxboxError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                TaxboxError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            settings.validate()?;
            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &TaxboxPaths) -> Result<(), TaxboxError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| TaxboxError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| TaxboxError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    /// Reject values the tax calculations cannot work with
    pub fn validate(&self) -> Result<(), TaxboxError> {
        for (name, day) in [
            ("wht_filing_day", self.wht_filing_day),
            ("vat_filing_day", self.vat_filing_day),
        ] {
            if !(1..=28).contains(&day) {
                return Err(TaxboxError::Config(format!(
                    "{} must be between 1 and 28, got {}",
                    name, day
                )));
            }
        }

        if self.default_vat_rate_bp > 10_000 {
            return Err(TaxboxError::Config(format!(
                "default_vat_rate_bp must not exceed 10000, got {}",
                self.default_vat_rate_bp
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.default_vat_rate_bp, 700);
        assert_eq!(settings.wht_filing_day, 7);
        assert_eq!(settings.vat_filing_day, 15);
        assert_eq!(settings.health_weights.overdue_wht, 15);
        assert_eq!(settings.default_export_target, ExportTarget::Generic);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TaxboxPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.default_export_target = ExportTarget::Peak;
        settings.email_relay_url = Some("https://relay.example.com/send".into());
        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.default_export_target, ExportTarget::Peak);
        assert_eq!(
            loaded.email_relay_url.as_deref(),
            Some("https://relay.example.com/send")
        );
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"currency_symbol": "THB "}"#).unwrap();
        assert_eq!(settings.currency_symbol, "THB ");
        assert_eq!(settings.wht_filing_day, 7);
        assert_eq!(settings.http_timeout_secs, 10);
    }

    #[test]
    fn test_invalid_filing_day_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TaxboxPaths::with_base_dir(temp_dir.path().to_path_buf());
        paths.ensure_directories().unwrap();
        std::fs::write(paths.settings_file(), r#"{"wht_filing_day": 31}"#).unwrap();

        let err = Settings::load_or_create(&paths).unwrap_err();
        assert!(matches!(err, TaxboxError::Config(_)));
    }
}
