//! Core data model for risk scoring.
//!
//! Entities and activity records are consumed from the storage collaborator;
//! risk score records form the append-only audit trail produced by each run.
//! Factors are tagged typed records rather than freeform key-value maps so the
//! engine gets structural guarantees over what it aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Risk axis a score or factor belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Dimension {
    Credit,
    Aml,
    Combined,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Credit => "CREDIT",
            Dimension::Aml => "AML",
            Dimension::Combined => "COMBINED",
        }
    }
}

/// Categorical severity band, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskBand {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBand::Low => "LOW",
            RiskBand::Medium => "MEDIUM",
            RiskBand::High => "HIGH",
            RiskBand::Critical => "CRITICAL",
        }
    }

    /// Parse a stored band label
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "LOW" => Some(RiskBand::Low),
            "MEDIUM" => Some(RiskBand::Medium),
            "HIGH" => Some(RiskBand::High),
            "CRITICAL" => Some(RiskBand::Critical),
            _ => None,
        }
    }
}

/// Named risk factor within a dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorName {
    // Credit dimension
    PaymentHistory,
    CreditUtilization,
    AccountAge,
    TransactionFrequency,
    AmountConsistency,
    // AML dimension
    StructuringPatterns,
    HighRiskMerchants,
    OffshoreTransactions,
    CashEquivalents,
    AmountFrequency,
    TimePatterns,
    // Combined dimension
    CreditContribution,
    AmlContribution,
}

impl FactorName {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactorName::PaymentHistory => "payment_history",
            FactorName::CreditUtilization => "credit_utilization",
            FactorName::AccountAge => "account_age",
            FactorName::TransactionFrequency => "transaction_frequency",
            FactorName::AmountConsistency => "amount_consistency",
            FactorName::StructuringPatterns => "structuring_patterns",
            FactorName::HighRiskMerchants => "high_risk_merchants",
            FactorName::OffshoreTransactions => "offshore_transactions",
            FactorName::CashEquivalents => "cash_equivalents",
            FactorName::AmountFrequency => "amount_frequency",
            FactorName::TimePatterns => "time_patterns",
            FactorName::CreditContribution => "credit_contribution",
            FactorName::AmlContribution => "aml_contribution",
        }
    }
}

/// A single normalized [0,1] risk contributor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub name: FactorName,
    pub value: f64,
}

/// All factors of one dimension, produced transiently per scoring run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorSet {
    pub dimension: Dimension,
    pub factors: Vec<Factor>,
}

impl FactorSet {
    pub fn new(dimension: Dimension) -> Self {
        Self {
            dimension,
            factors: Vec::new(),
        }
    }

    /// Record a factor value
    pub fn push(&mut self, name: FactorName, value: f64) {
        self.factors.push(Factor { name, value });
    }

    /// Look up a factor by name
    pub fn get(&self, name: FactorName) -> Option<f64> {
        self.factors.iter().find(|f| f.name == name).map(|f| f.value)
    }

    /// Factors sorted by descending magnitude, for explanations
    pub fn dominant(&self) -> Vec<Factor> {
        let mut sorted = self.factors.clone();
        sorted.sort_by(|a, b| {
            b.value
                .partial_cmp(&a.value)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.as_str().cmp(b.name.as_str()))
        });
        sorted
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

/// Monitored entity with its current risk view.
///
/// The current score fields always reflect the latest completed scoring run;
/// they are only updated as a unit together with that run's three records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub credit_score: f64,
    pub aml_score: f64,
    pub combined_risk_score: f64,
    pub risk_level: RiskBand,
    pub is_flagged: bool,
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    /// Create a new entity with baseline (unscored) risk fields
    pub fn new(name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at,
            credit_score: 0.0,
            aml_score: 0.0,
            combined_risk_score: 0.0,
            risk_level: RiskBand::Low,
            is_flagged: false,
            updated_at: created_at,
        }
    }
}

/// Immutable activity record ingested by an external collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub amount: f64,
    pub merchant: String,
    pub category: String,
    pub timestamp: DateTime<Utc>,
    pub is_offshore: bool,
    pub is_cash_equivalent: bool,
}

impl ActivityRecord {
    pub fn new(
        entity_id: Uuid,
        amount: f64,
        merchant: impl Into<String>,
        category: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_id,
            amount,
            merchant: merchant.into(),
            category: category.into(),
            timestamp,
            is_offshore: false,
            is_cash_equivalent: false,
        }
    }

    pub fn offshore(mut self) -> Self {
        self.is_offshore = true;
        self
    }

    pub fn cash_equivalent(mut self) -> Self {
        self.is_cash_equivalent = true;
        self
    }
}

/// Recommended follow-up actions derived from a band classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    /// Proceed normally
    Allow,
    /// Watch for additional suspicious activity
    EnhancedMonitoring,
    /// Require additional verification before further activity
    AdditionalVerification,
    /// Hold for manual review
    ManualReview,
    /// File Suspicious Activity Report (SAR)
    FileSar,
}

/// One append-only audit record of a scoring run.
///
/// Never mutated or deleted once written; three of these (CREDIT, AML,
/// COMBINED) are produced per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScoreRecord {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub dimension: Dimension,
    pub score: f64,
    pub confidence: f64,
    pub factors: FactorSet,
    pub explanation: String,
    pub recommended_actions: Vec<RecommendedAction>,
    pub created_at: DateTime<Utc>,
}

/// Entity current-field update applied atomically with a run's records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityScoreUpdate {
    pub credit_score: f64,
    pub aml_score: f64,
    pub combined_risk_score: f64,
    pub risk_level: RiskBand,
    pub is_flagged: bool,
    pub updated_at: DateTime<Utc>,
}
