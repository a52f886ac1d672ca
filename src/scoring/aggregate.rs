//! Weighted aggregation of factor sets into dimension and combined scores.

use crate::config::{CombinedWeights, WeightConfig};
use crate::error::{Error, Result};
use crate::model::{Dimension, FactorName, FactorSet};
use crate::scoring::factors::clamp01;

/// A scored dimension with the factors that produced it
#[derive(Debug, Clone)]
pub struct DimensionScore {
    pub dimension: Dimension,
    pub score: f64,
    pub confidence: f64,
    pub factors: FactorSet,
}

/// Weighted sum of a factor set, clamped to [0, 1].
///
/// Every factor in the set must have a weight in its dimension's table; a
/// missing weight means the extractor and the weight table disagree on the
/// factor vocabulary, which is an internal fault rather than a data problem.
pub fn aggregate_dimension(
    factors: &FactorSet,
    weight_for: impl Fn(FactorName) -> Option<f64>,
) -> Result<f64> {
    let mut score = 0.0;
    for factor in &factors.factors {
        let weight = weight_for(factor.name).ok_or_else(|| {
            Error::Internal(format!(
                "no {} weight configured for factor {}",
                factors.dimension.as_str(),
                factor.name.as_str()
            ))
        })?;
        score += factor.value * weight;
    }
    Ok(clamp01(score))
}

/// Score the credit dimension
pub fn score_credit(
    factors: FactorSet,
    weights: &WeightConfig,
    confidence: f64,
) -> Result<DimensionScore> {
    let score = aggregate_dimension(&factors, |name| weights.credit.weight(name))?;
    Ok(DimensionScore {
        dimension: Dimension::Credit,
        score,
        confidence,
        factors,
    })
}

/// Score the AML dimension
pub fn score_aml(
    factors: FactorSet,
    weights: &WeightConfig,
    confidence: f64,
) -> Result<DimensionScore> {
    let score = aggregate_dimension(&factors, |name| weights.aml.weight(name))?;
    Ok(DimensionScore {
        dimension: Dimension::Aml,
        score,
        confidence,
        factors,
    })
}

/// Combine the two dimension scores under the configured policy.
///
/// The combined factor set records each dimension's contribution so the audit
/// record can explain the blend. Combined confidence is the mean of the two
/// dimension confidences.
pub fn combine(
    credit: &DimensionScore,
    aml: &DimensionScore,
    weights: &CombinedWeights,
) -> DimensionScore {
    let credit_contribution = credit.score * weights.credit;
    let aml_contribution = aml.score * weights.aml;
    let score = clamp01(credit_contribution + aml_contribution);
    let confidence = (credit.confidence + aml.confidence) / 2.0;

    let mut factors = FactorSet::new(Dimension::Combined);
    factors.push(FactorName::CreditContribution, clamp01(credit_contribution));
    factors.push(FactorName::AmlContribution, clamp01(aml_contribution));

    DimensionScore {
        dimension: Dimension::Combined,
        score,
        confidence,
        factors,
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn dimension_scores_stay_in_unit_interval(
            values in proptest::collection::vec(0.0f64..=1.0, 6),
        ) {
            let weights = WeightConfig::default();
            let mut factors = FactorSet::new(Dimension::Aml);
            for (name, value) in [
                FactorName::StructuringPatterns,
                FactorName::HighRiskMerchants,
                FactorName::OffshoreTransactions,
                FactorName::CashEquivalents,
                FactorName::AmountFrequency,
                FactorName::TimePatterns,
            ]
            .into_iter()
            .zip(values)
            {
                factors.push(name, value);
            }

            let score = aggregate_dimension(&factors, |n| weights.aml.weight(n)).unwrap();
            prop_assert!((0.0..=1.0).contains(&score));
        }

        #[test]
        fn combined_score_matches_policy_exactly(
            credit_score in 0.0f64..=1.0,
            aml_score in 0.0f64..=1.0,
        ) {
            let weights = CombinedWeights::default();
            let credit = DimensionScore {
                dimension: Dimension::Credit,
                score: credit_score,
                confidence: 0.85,
                factors: FactorSet::new(Dimension::Credit),
            };
            let aml = DimensionScore {
                dimension: Dimension::Aml,
                score: aml_score,
                confidence: 0.90,
                factors: FactorSet::new(Dimension::Aml),
            };

            let combined = combine(&credit, &aml, &weights);
            let expected = (0.4 * credit_score + 0.6 * aml_score).clamp(0.0, 1.0);
            prop_assert_eq!(combined.score, expected);
        }
    }
}
