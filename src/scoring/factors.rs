//! Factor extraction for the credit and AML risk dimensions.
//!
//! Every factor is a normalized [0,1] value derived from the entity's activity
//! inside an explicit lookback window. Degenerate inputs never fail extraction:
//! an empty window yields zero counts and a zero-mean amount set forces
//! amount_consistency to 1.0 instead of dividing by zero.

use crate::config::{CalibrationConfig, WindowConfig};
use crate::model::{ActivityRecord, Dimension, Entity, FactorName, FactorSet};
use chrono::{DateTime, Duration, Timelike, Utc};

/// Explicit lookback window for one scoring run.
///
/// Passed into extraction rather than hidden behind a constant so runs are
/// deterministic across window sizes.
#[derive(Debug, Clone, Copy)]
pub struct LookbackWindow {
    /// Records at or after this instant are in scope
    pub cutoff: DateTime<Utc>,
    /// Window length in days
    pub days: i64,
    /// Number of averaging periods in the window
    pub periods: i64,
}

impl LookbackWindow {
    /// Build the window ending at `now` from the configured lengths
    pub fn ending_at(now: DateTime<Utc>, window: &WindowConfig) -> Self {
        Self {
            cutoff: now - Duration::days(window.lookback_days),
            days: window.lookback_days,
            periods: window.periods(),
        }
    }

    /// Whether a record falls inside the window
    pub fn contains(&self, record: &ActivityRecord) -> bool {
        record.timestamp >= self.cutoff
    }
}

/// Clamp a value into [0, 1]
pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Extract credit dimension factors.
///
/// `payment_history` is an opaque external input: taken from the intelligence
/// signal when present, otherwise the configured default.
pub fn extract_credit_factors(
    entity: &Entity,
    records: &[ActivityRecord],
    window: &LookbackWindow,
    calibration: &CalibrationConfig,
    payment_history: Option<f64>,
    now: DateTime<Utc>,
) -> FactorSet {
    let mut factors = FactorSet::new(Dimension::Credit);

    let windowed: Vec<&ActivityRecord> = records.iter().filter(|r| window.contains(r)).collect();

    factors.push(
        FactorName::PaymentHistory,
        clamp01(payment_history.unwrap_or(calibration.default_payment_history)),
    );

    // Average per-period spend against the calibrated credit limit
    let total_amount: f64 = windowed.iter().map(|r| r.amount).sum();
    let avg_period_amount = total_amount / window.periods as f64;
    factors.push(
        FactorName::CreditUtilization,
        clamp01(avg_period_amount / calibration.credit_limit),
    );

    // Newer accounts score riskier
    let age_days = (now - entity.created_at).num_days().max(0);
    factors.push(
        FactorName::AccountAge,
        clamp01(1.0 - age_days as f64 / 365.0),
    );

    factors.push(
        FactorName::TransactionFrequency,
        clamp01(windowed.len() as f64 / calibration.frequency_denominator),
    );

    factors.push(
        FactorName::AmountConsistency,
        amount_consistency(&windowed),
    );

    factors
}

/// Coefficient of variation of the windowed amounts, clamped to [0, 1].
///
/// Defined as 0.5 when fewer than two records exist and 1.0 when the mean is
/// not positive.
fn amount_consistency(records: &[&ActivityRecord]) -> f64 {
    if records.len() < 2 {
        return 0.5;
    }

    let amounts: Vec<f64> = records.iter().map(|r| r.amount).collect();
    let mean = amounts.iter().sum::<f64>() / amounts.len() as f64;
    if mean <= 0.0 {
        return 1.0;
    }

    let variance =
        amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / amounts.len() as f64;
    let std_dev = variance.sqrt();

    clamp01(std_dev / mean)
}

/// Extract AML dimension factors.
///
/// Each factor is a count of red-flag records in the window, normalized by a
/// fixed calibration denominator.
pub fn extract_aml_factors(
    records: &[ActivityRecord],
    window: &LookbackWindow,
    calibration: &CalibrationConfig,
) -> FactorSet {
    let mut factors = FactorSet::new(Dimension::Aml);

    let windowed: Vec<&ActivityRecord> = records.iter().filter(|r| window.contains(r)).collect();

    // Amounts just under the reporting threshold
    let structuring_count = windowed
        .iter()
        .filter(|r| r.amount >= calibration.structuring_low && r.amount <= calibration.structuring_high)
        .count();
    factors.push(
        FactorName::StructuringPatterns,
        clamp01(structuring_count as f64 / calibration.structuring_denominator),
    );

    let denylist_count = windowed
        .iter()
        .filter(|r| {
            calibration
                .high_risk_merchants
                .iter()
                .any(|m| m == &r.merchant)
        })
        .count();
    factors.push(
        FactorName::HighRiskMerchants,
        clamp01(denylist_count as f64 / calibration.merchant_denominator),
    );

    let offshore_count = windowed.iter().filter(|r| r.is_offshore).count();
    factors.push(
        FactorName::OffshoreTransactions,
        clamp01(offshore_count as f64 / calibration.offshore_denominator),
    );

    let cash_count = windowed.iter().filter(|r| r.is_cash_equivalent).count();
    factors.push(
        FactorName::CashEquivalents,
        clamp01(cash_count as f64 / calibration.cash_denominator),
    );

    // Suspiciously round amounts above the step threshold
    let round_count = windowed
        .iter()
        .filter(|r| {
            r.amount > calibration.round_amount_step
                && (r.amount % calibration.round_amount_step).abs() < f64::EPSILON
        })
        .count();
    factors.push(
        FactorName::AmountFrequency,
        clamp01(round_count as f64 / calibration.round_amount_denominator),
    );

    let night_count = windowed
        .iter()
        .filter(|r| {
            let hour = r.timestamp.hour();
            hour < calibration.night_morning_cutoff || hour > calibration.night_evening_cutoff
        })
        .count();
    factors.push(
        FactorName::TimePatterns,
        clamp01(night_count as f64 / calibration.night_denominator),
    );

    factors
}
