//! UniRisk - unified credit and AML risk scoring for compliance monitoring
//!
//! The engine turns a bounded activity history into normalized risk factors,
//! aggregates them under fixed weight tables, and classifies the result with a
//! traceable explanation. Each module covers one concern:
//! - error: structured error types with retry guidance
//! - config: immutable calibration, validated at startup
//! - model: entities, activity, factor sets, audit records
//! - scoring: factor extraction, weighted aggregation, classification
//! - storage: the durable collaborator behind an async trait
//! - intelligence: externally supplied signals, consumed but never computed
//!
//! Scoring runs for different entities are independent and may execute fully
//! in parallel; within a run only the final persistence step is transactional.

pub mod config;
pub mod error;
pub mod intelligence;
pub mod model;
pub mod scoring;
pub mod storage;

// Re-export commonly used types for easy access
pub use config::RiskConfig;
pub use error::{Error, Result};
pub use intelligence::{ExternalSignal, IntelligenceProvider, StaticIntelligence};
pub use model::{
    ActivityRecord, Dimension, Entity, EntityScoreUpdate, Factor, FactorName, FactorSet,
    RecommendedAction, RiskBand, RiskScoreRecord,
};
pub use scoring::{LookbackWindow, ScoringEngine, ScoringOutcome};
pub use storage::{MemoryStore, RiskStore, SqliteStore};

/// Initialize tracing with an env-filter controlled subscriber.
///
/// Safe to call once per process; typically from the binary or test harness,
/// honoring `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
