//! Scoring engine: orchestrates one risk scoring run per entity.
//!
//! A run fetches the entity and its windowed activity, extracts the credit and
//! AML factor sets concurrently, aggregates them under the configured weights,
//! classifies the combined score, and commits the three audit records plus the
//! entity field update as one atomic unit. Extraction and aggregation are pure
//! functions of their inputs, so a failed commit is safe to retry wholesale.

pub mod aggregate;
pub mod classify;
pub mod factors;

pub use aggregate::DimensionScore;
pub use factors::LookbackWindow;

use crate::config::RiskConfig;
use crate::error::{Error, Result};
use crate::intelligence::{self, IntelligenceProvider};
use crate::model::{EntityScoreUpdate, RiskBand, RiskScoreRecord};
use crate::storage::RiskStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of one completed scoring run
#[derive(Debug, Clone)]
pub struct ScoringOutcome {
    pub entity_id: Uuid,
    pub credit_score: f64,
    pub aml_score: f64,
    pub combined_score: f64,
    pub combined_confidence: f64,
    pub band: RiskBand,
    /// The three audit records written by this run (CREDIT, AML, COMBINED)
    pub records: [RiskScoreRecord; 3],
    /// The entity field update applied with the records
    pub entity_update: EntityScoreUpdate,
}

/// Unified risk scoring engine.
///
/// Holds an immutable validated configuration; runs for different entities
/// share no mutable state and may execute fully in parallel. Single-flight
/// execution per entity id is the orchestration layer's responsibility.
pub struct ScoringEngine<S> {
    config: RiskConfig,
    store: Arc<S>,
    intelligence: Option<Arc<dyn IntelligenceProvider>>,
}

impl<S> std::fmt::Debug for ScoringEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: RiskStore> ScoringEngine<S> {
    /// Construct an engine over a store, validating the configuration first.
    ///
    /// An invalid weight table is fatal here; it never reaches a run.
    pub fn new(config: RiskConfig, store: Arc<S>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            intelligence: None,
        })
    }

    /// Attach an external intelligence provider
    pub fn with_intelligence(mut self, provider: Arc<dyn IntelligenceProvider>) -> Self {
        self.intelligence = Some(provider);
        self
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Execute one scoring run for an entity at the current instant
    pub async fn score_entity(&self, entity_id: Uuid) -> Result<ScoringOutcome> {
        self.score_entity_at(entity_id, Utc::now()).await
    }

    /// Execute one scoring run with an explicit reference instant.
    ///
    /// The instant anchors the lookback window and all timestamps of the run,
    /// which keeps runs deterministic under test.
    pub async fn score_entity_at(
        &self,
        entity_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ScoringOutcome> {
        // Fail fast before any computation
        let entity = self
            .store
            .get_entity(entity_id)
            .await?
            .ok_or_else(|| Error::EntityNotFound(entity_id.to_string()))?;

        let window = LookbackWindow::ending_at(now, &self.config.window);
        let activity = self.store.activity_since(entity_id, window.cutoff).await?;
        debug!(
            entity_id = %entity_id,
            records = activity.len(),
            window_days = window.days,
            "starting scoring run"
        );

        let payment_history = self.fetch_payment_history(entity_id).await;

        // The two dimensions have no data dependency on each other
        let (credit_factors, aml_factors) = tokio::join!(
            async {
                factors::extract_credit_factors(
                    &entity,
                    &activity,
                    &window,
                    &self.config.calibration,
                    payment_history,
                    now,
                )
            },
            async { factors::extract_aml_factors(&activity, &window, &self.config.calibration) },
        );

        let credit = aggregate::score_credit(
            credit_factors,
            &self.config.weights,
            self.config.confidence.credit,
        )?;
        let aml = aggregate::score_aml(
            aml_factors,
            &self.config.weights,
            self.config.confidence.aml,
        )?;
        let combined = aggregate::combine(&credit, &aml, &self.config.weights.combined);

        let band = classify::classify(combined.score, &self.config.bands);

        let records = [
            self.build_record(entity_id, &credit, now),
            self.build_record(entity_id, &aml, now),
            self.build_record(entity_id, &combined, now),
        ];

        let entity_update = EntityScoreUpdate {
            credit_score: credit.score,
            aml_score: aml.score,
            combined_risk_score: combined.score,
            risk_level: band,
            is_flagged: band >= RiskBand::High,
            updated_at: now,
        };

        // The only transactional scope of a run: all-or-nothing
        self.store
            .commit_run(entity_id, &entity_update, &records)
            .await?;

        info!(
            entity_id = %entity_id,
            credit = credit.score,
            aml = aml.score,
            combined = combined.score,
            band = band.as_str(),
            "scoring run committed"
        );

        Ok(ScoringOutcome {
            entity_id,
            credit_score: credit.score,
            aml_score: aml.score,
            combined_score: combined.score,
            combined_confidence: combined.confidence,
            band,
            records,
            entity_update,
        })
    }

    /// Pull the external payment-history signal, defaulting on provider failure.
    ///
    /// The collaborator is best-effort: a failed lookup degrades to the
    /// configured default instead of failing the run.
    async fn fetch_payment_history(&self, entity_id: Uuid) -> Option<f64> {
        let provider = self.intelligence.as_ref()?;
        match provider.signals_for(entity_id).await {
            Ok(signals) => intelligence::payment_history(&signals),
            Err(e) => {
                warn!(entity_id = %entity_id, error = %e, "intelligence lookup failed");
                None
            }
        }
    }

    fn build_record(
        &self,
        entity_id: Uuid,
        score: &DimensionScore,
        now: DateTime<Utc>,
    ) -> RiskScoreRecord {
        let band = classify::classify(score.score, &self.config.bands);
        RiskScoreRecord {
            id: Uuid::new_v4(),
            entity_id,
            dimension: score.dimension,
            score: score.score,
            confidence: score.confidence,
            factors: score.factors.clone(),
            explanation: classify::explain(score),
            recommended_actions: classify::recommended_actions(band),
            created_at: now,
        }
    }
}
