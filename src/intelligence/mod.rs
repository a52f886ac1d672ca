//! External intelligence collaborator.
//!
//! Signals arrive from an outside enrichment service; the engine consumes
//! them but never computes them. Only the `payment_history` signal feeds the
//! credit dimension today, everything else passes through to callers.

use crate::error::Result;
use crate::model::RiskBand;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Signal name the credit extractor reads for the opaque payment history input
pub const PAYMENT_HISTORY_SIGNAL: &str = "payment_history";

/// One named intelligence signal about an entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalSignal {
    /// Signal name, e.g. "payment_history", "adverse_media"
    pub name: String,
    /// Numeric signal value
    pub value: f64,
    /// Provider confidence in the signal, [0, 1]
    pub confidence: f64,
    /// Categorical impact assessed by the provider
    pub impact: RiskBand,
    /// Originating source identifier
    pub source: String,
    pub observed_at: DateTime<Utc>,
}

/// Asynchronous supplier of intelligence signals per entity
#[async_trait]
pub trait IntelligenceProvider: Send + Sync {
    /// Signals known for an entity; an unknown entity yields an empty list
    async fn signals_for(&self, entity_id: Uuid) -> Result<Vec<ExternalSignal>>;
}

/// Extract the payment-history value from a signal list, if supplied
pub fn payment_history(signals: &[ExternalSignal]) -> Option<f64> {
    signals
        .iter()
        .find(|s| s.name == PAYMENT_HISTORY_SIGNAL)
        .map(|s| s.value)
}

/// Canned signal provider backed by a fixed table.
///
/// Stands in for the real enrichment service in demos and tests.
#[derive(Debug, Default)]
pub struct StaticIntelligence {
    signals: HashMap<Uuid, Vec<ExternalSignal>>,
}

impl StaticIntelligence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register canned signals for an entity
    pub fn with_signals(mut self, entity_id: Uuid, signals: Vec<ExternalSignal>) -> Self {
        self.signals.insert(entity_id, signals);
        self
    }
}

#[async_trait]
impl IntelligenceProvider for StaticIntelligence {
    async fn signals_for(&self, entity_id: Uuid) -> Result<Vec<ExternalSignal>> {
        Ok(self.signals.get(&entity_id).cloned().unwrap_or_default())
    }
}
