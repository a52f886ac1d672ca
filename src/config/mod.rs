//! Configuration for the risk scoring engine.
//!
//! All calibration is static: loaded once at startup, validated strictly, and
//! injected into the engine as an immutable value. Weight tables that fail to
//! sum to 1.0 are rejected outright and never renormalized.

use crate::error::{Error, Result};
use crate::model::FactorName;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Tolerance for weight-table sum validation
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub weights: WeightConfig,
    pub calibration: CalibrationConfig,
    pub window: WindowConfig,
    pub bands: BandConfig,
    pub confidence: ConfidenceConfig,
}

/// Per-dimension and combination weight tables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    pub credit: CreditWeights,
    pub aml: AmlWeights,
    pub combined: CombinedWeights,
}

/// Credit dimension factor weights (must sum to 1.0)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditWeights {
    pub payment_history: f64,
    pub credit_utilization: f64,
    pub account_age: f64,
    pub transaction_frequency: f64,
    pub amount_consistency: f64,
}

/// AML dimension factor weights (must sum to 1.0)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmlWeights {
    pub structuring_patterns: f64,
    pub high_risk_merchants: f64,
    pub offshore_transactions: f64,
    pub cash_equivalents: f64,
    pub amount_frequency: f64,
    pub time_patterns: f64,
}

/// Credit/AML combination policy (must sum to 1.0).
///
/// AML is weighted higher by default policy; this is configuration, not an
/// intrinsic law.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombinedWeights {
    pub credit: f64,
    pub aml: f64,
}

/// Fixed calibration constants and the merchant denylist
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Simulated credit limit used for the utilization ratio
    pub credit_limit: f64,
    /// Default payment history when no external signal supplies one
    pub default_payment_history: f64,
    /// High-risk merchant denylist
    pub high_risk_merchants: Vec<String>,
    /// Structuring band: amounts in [low, high] count toward the pattern
    pub structuring_low: f64,
    pub structuring_high: f64,
    /// Round amounts above this threshold count toward amount_frequency
    pub round_amount_step: f64,
    /// Hours outside (morning_cutoff, evening_cutoff) count as night activity
    pub night_morning_cutoff: u32,
    pub night_evening_cutoff: u32,
    /// Normalization denominators for the counted AML factors
    pub structuring_denominator: f64,
    pub merchant_denominator: f64,
    pub offshore_denominator: f64,
    pub cash_denominator: f64,
    pub round_amount_denominator: f64,
    pub night_denominator: f64,
    /// Normalization denominator for credit transaction frequency
    pub frequency_denominator: f64,
}

/// Lookback window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Trailing interval over which activity is considered
    pub lookback_days: i64,
    /// Length of one averaging period within the window
    pub period_days: i64,
}

impl WindowConfig {
    /// Number of averaging periods in the window, at least 1
    pub fn periods(&self) -> i64 {
        (self.lookback_days / self.period_days).max(1)
    }
}

/// Severity band thresholds, inclusive lower bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BandConfig {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
}

/// Per-dimension confidence constants, used verbatim
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub credit: f64,
    pub aml: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            weights: WeightConfig::default(),
            calibration: CalibrationConfig::default(),
            window: WindowConfig::default(),
            bands: BandConfig::default(),
            confidence: ConfidenceConfig::default(),
        }
    }
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            credit: CreditWeights::default(),
            aml: AmlWeights::default(),
            combined: CombinedWeights::default(),
        }
    }
}

impl Default for CreditWeights {
    fn default() -> Self {
        Self {
            payment_history: 0.35,
            credit_utilization: 0.30,
            account_age: 0.15,
            transaction_frequency: 0.10,
            amount_consistency: 0.10,
        }
    }
}

impl Default for AmlWeights {
    fn default() -> Self {
        Self {
            structuring_patterns: 0.25,
            high_risk_merchants: 0.20,
            offshore_transactions: 0.20,
            cash_equivalents: 0.15,
            amount_frequency: 0.10,
            time_patterns: 0.10,
        }
    }
}

impl Default for CombinedWeights {
    fn default() -> Self {
        Self {
            credit: 0.4,
            aml: 0.6,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            credit_limit: 10_000.0,
            default_payment_history: 0.2,
            high_risk_merchants: vec![
                "Offshore Trading Co".to_string(),
                "Crypto Exchange".to_string(),
                "Casino Royale".to_string(),
            ],
            structuring_low: 900.0,
            structuring_high: 999.0,
            round_amount_step: 1000.0,
            night_morning_cutoff: 6,
            night_evening_cutoff: 22,
            structuring_denominator: 10.0,
            merchant_denominator: 5.0,
            offshore_denominator: 3.0,
            cash_denominator: 5.0,
            round_amount_denominator: 5.0,
            night_denominator: 10.0,
            frequency_denominator: 30.0,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            lookback_days: 90,
            period_days: 30,
        }
    }
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            critical: 0.8,
            high: 0.6,
            medium: 0.4,
        }
    }
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            credit: 0.85,
            aml: 0.90,
        }
    }
}

impl CreditWeights {
    /// Weight for a credit factor, None for names outside this dimension
    pub fn weight(&self, name: FactorName) -> Option<f64> {
        match name {
            FactorName::PaymentHistory => Some(self.payment_history),
            FactorName::CreditUtilization => Some(self.credit_utilization),
            FactorName::AccountAge => Some(self.account_age),
            FactorName::TransactionFrequency => Some(self.transaction_frequency),
            FactorName::AmountConsistency => Some(self.amount_consistency),
            _ => None,
        }
    }

    fn sum(&self) -> f64 {
        self.payment_history
            + self.credit_utilization
            + self.account_age
            + self.transaction_frequency
            + self.amount_consistency
    }

    fn values(&self) -> [f64; 5] {
        [
            self.payment_history,
            self.credit_utilization,
            self.account_age,
            self.transaction_frequency,
            self.amount_consistency,
        ]
    }
}

impl AmlWeights {
    /// Weight for an AML factor, None for names outside this dimension
    pub fn weight(&self, name: FactorName) -> Option<f64> {
        match name {
            FactorName::StructuringPatterns => Some(self.structuring_patterns),
            FactorName::HighRiskMerchants => Some(self.high_risk_merchants),
            FactorName::OffshoreTransactions => Some(self.offshore_transactions),
            FactorName::CashEquivalents => Some(self.cash_equivalents),
            FactorName::AmountFrequency => Some(self.amount_frequency),
            FactorName::TimePatterns => Some(self.time_patterns),
            _ => None,
        }
    }

    fn sum(&self) -> f64 {
        self.structuring_patterns
            + self.high_risk_merchants
            + self.offshore_transactions
            + self.cash_equivalents
            + self.amount_frequency
            + self.time_patterns
    }

    fn values(&self) -> [f64; 6] {
        [
            self.structuring_patterns,
            self.high_risk_merchants,
            self.offshore_transactions,
            self.cash_equivalents,
            self.amount_frequency,
            self.time_patterns,
        ]
    }
}

impl RiskConfig {
    /// Load configuration from file and environment.
    ///
    /// Uses defaults when `UNIRISK_CONFIG` does not point at a file, applies
    /// `UNIRISK_*` environment overrides, then validates. A configuration that
    /// fails validation never reaches an engine.
    pub fn load() -> Result<Self> {
        let mut config = match env::var("UNIRISK_CONFIG") {
            Ok(path) => Self::load_from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };

        config.override_from_env()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: RiskConfig = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Override configuration with environment variables
    fn override_from_env(&mut self) -> Result<()> {
        if let Ok(val) = env::var("UNIRISK_LOOKBACK_DAYS") {
            self.window.lookback_days = val
                .parse()
                .map_err(|_| Error::Config("Invalid lookback days".to_string()))?;
        }

        if let Ok(val) = env::var("UNIRISK_CREDIT_LIMIT") {
            self.calibration.credit_limit = val
                .parse()
                .map_err(|_| Error::Config("Invalid credit limit".to_string()))?;
        }

        if let Ok(val) = env::var("UNIRISK_COMBINED_CREDIT_WEIGHT") {
            self.weights.combined.credit = val
                .parse()
                .map_err(|_| Error::Config("Invalid combined credit weight".to_string()))?;
        }

        if let Ok(val) = env::var("UNIRISK_COMBINED_AML_WEIGHT") {
            self.weights.combined.aml = val
                .parse()
                .map_err(|_| Error::Config("Invalid combined AML weight".to_string()))?;
        }

        Ok(())
    }

    /// Validate configuration values.
    ///
    /// Weight tables that do not sum to 1.0 within tolerance are a fatal
    /// `InvalidWeightConfiguration` at startup.
    pub fn validate(&self) -> Result<()> {
        Self::validate_weight_table("credit", self.weights.credit.sum(), &self.weights.credit.values())?;
        Self::validate_weight_table("aml", self.weights.aml.sum(), &self.weights.aml.values())?;
        Self::validate_weight_table(
            "combined",
            self.weights.combined.credit + self.weights.combined.aml,
            &[self.weights.combined.credit, self.weights.combined.aml],
        )?;

        // Band thresholds must be strictly descending within (0, 1)
        let bands = &self.bands;
        if !(bands.medium > 0.0 && bands.medium < bands.high && bands.high < bands.critical && bands.critical < 1.0)
        {
            return Err(Error::Config(format!(
                "Band thresholds must satisfy 0 < medium < high < critical < 1, got {}/{}/{}",
                bands.medium, bands.high, bands.critical
            )));
        }

        if self.calibration.credit_limit <= 0.0 {
            return Err(Error::Config("Credit limit must be > 0".to_string()));
        }

        if !(0.0..=1.0).contains(&self.calibration.default_payment_history) {
            return Err(Error::Config(
                "Default payment history must be within [0, 1]".to_string(),
            ));
        }

        if self.calibration.structuring_low > self.calibration.structuring_high {
            return Err(Error::Config(
                "Structuring band low bound exceeds high bound".to_string(),
            ));
        }

        for (label, denom) in [
            ("structuring", self.calibration.structuring_denominator),
            ("merchant", self.calibration.merchant_denominator),
            ("offshore", self.calibration.offshore_denominator),
            ("cash", self.calibration.cash_denominator),
            ("round amount", self.calibration.round_amount_denominator),
            ("night", self.calibration.night_denominator),
            ("frequency", self.calibration.frequency_denominator),
        ] {
            if denom <= 0.0 {
                return Err(Error::Config(format!(
                    "{} denominator must be > 0",
                    label
                )));
            }
        }

        if self.window.lookback_days <= 0 || self.window.period_days <= 0 {
            return Err(Error::Config(
                "Lookback window and period must be > 0 days".to_string(),
            ));
        }

        for (label, confidence) in [
            ("credit", self.confidence.credit),
            ("aml", self.confidence.aml),
        ] {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(Error::Config(format!(
                    "{} confidence must be within [0, 1]",
                    label
                )));
            }
        }

        Ok(())
    }

    fn validate_weight_table(dimension: &str, sum: f64, values: &[f64]) -> Result<()> {
        if values.iter().any(|w| *w < 0.0) {
            return Err(Error::InvalidWeightConfiguration(format!(
                "{} weights contain a negative entry",
                dimension
            )));
        }

        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::InvalidWeightConfiguration(format!(
                "{} weights must sum to 1.0, got {}",
                dimension, sum
            )));
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, contents)
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RiskConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_weight_sums() {
        let config = RiskConfig::default();
        assert!((config.weights.credit.sum() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE);
        assert!((config.weights.aml.sum() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE);
        assert!(
            (config.weights.combined.credit + config.weights.combined.aml - 1.0).abs()
                <= WEIGHT_SUM_TOLERANCE
        );
    }

    #[test]
    fn test_rejects_bad_weight_sum() {
        let mut config = RiskConfig::default();
        config.weights.credit.payment_history = 0.5;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidWeightConfiguration(_)));
    }

    #[test]
    fn test_rejects_negative_weight() {
        let mut config = RiskConfig::default();
        config.weights.aml.time_patterns = -0.1;
        config.weights.aml.structuring_patterns = 0.45;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidWeightConfiguration(_)));
    }

    #[test]
    fn test_rejects_non_descending_bands() {
        let mut config = RiskConfig::default();
        config.bands.medium = 0.7;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_weight_lookup_scoped_to_dimension() {
        let weights = WeightConfig::default();
        assert_eq!(weights.credit.weight(FactorName::PaymentHistory), Some(0.35));
        assert_eq!(weights.credit.weight(FactorName::TimePatterns), None);
        assert_eq!(weights.aml.weight(FactorName::StructuringPatterns), Some(0.25));
        assert_eq!(weights.aml.weight(FactorName::PaymentHistory), None);
    }

    #[test]
    fn test_periods_at_least_one() {
        let window = WindowConfig {
            lookback_days: 7,
            period_days: 30,
        };
        assert_eq!(window.periods(), 1);

        let window = WindowConfig::default();
        assert_eq!(window.periods(), 3);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = RiskConfig::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: RiskConfig = toml::from_str(&toml).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.weights.combined.aml, 0.6);
    }
}
