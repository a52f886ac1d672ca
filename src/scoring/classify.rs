//! Band classification, deterministic explanations, and recommended actions.

use crate::config::BandConfig;
use crate::model::{RecommendedAction, RiskBand};
use crate::scoring::aggregate::DimensionScore;

/// Number of dominant factors named in an explanation
const EXPLAINED_FACTORS: usize = 3;

/// Map a combined score to a severity band.
///
/// Thresholds are inclusive lower bounds evaluated top-down.
pub fn classify(score: f64, bands: &BandConfig) -> RiskBand {
    if score >= bands.critical {
        RiskBand::Critical
    } else if score >= bands.high {
        RiskBand::High
    } else if score >= bands.medium {
        RiskBand::Medium
    } else {
        RiskBand::Low
    }
}

/// Deterministic, template-generated explanation naming the dominant factor
/// magnitudes. Same inputs always render the same string.
pub fn explain(score: &DimensionScore) -> String {
    if score.factors.is_empty() {
        return format!(
            "{} risk {:.3} with no contributing factors",
            score.dimension.as_str(),
            score.score
        );
    }

    let dominant: Vec<String> = score
        .factors
        .dominant()
        .into_iter()
        .take(EXPLAINED_FACTORS)
        .map(|f| format!("{}={:.3}", f.name.as_str(), f.value))
        .collect();

    format!(
        "{} risk {:.3} driven by {}",
        score.dimension.as_str(),
        score.score,
        dominant.join(", ")
    )
}

/// Deterministic follow-up actions for a band
pub fn recommended_actions(band: RiskBand) -> Vec<RecommendedAction> {
    match band {
        RiskBand::Critical => vec![
            RecommendedAction::ManualReview,
            RecommendedAction::FileSar,
            RecommendedAction::EnhancedMonitoring,
        ],
        RiskBand::High => vec![
            RecommendedAction::ManualReview,
            RecommendedAction::EnhancedMonitoring,
        ],
        RiskBand::Medium => vec![
            RecommendedAction::EnhancedMonitoring,
            RecommendedAction::AdditionalVerification,
        ],
        RiskBand::Low => vec![RecommendedAction::Allow],
    }
}
