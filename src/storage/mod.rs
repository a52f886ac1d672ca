//! Storage abstraction for the scoring engine.
//!
//! The engine only ever talks to a [`RiskStore`]; backends decide durability.
//! The one hard contract is `commit_run`: the three audit records and the
//! entity field update of a run land together or not at all.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::model::{ActivityRecord, Entity, EntityScoreUpdate, RiskScoreRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Durable keeper of entities, activity, and the append-only audit trail
#[async_trait]
pub trait RiskStore: Send + Sync {
    /// Create a new entity
    async fn insert_entity(&self, entity: &Entity) -> Result<()>;

    /// Fetch an entity by id
    async fn get_entity(&self, id: Uuid) -> Result<Option<Entity>>;

    /// Ingest an immutable activity record
    async fn insert_activity(&self, record: &ActivityRecord) -> Result<()>;

    /// Activity for an entity with `timestamp >= cutoff`
    async fn activity_since(
        &self,
        entity_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>>;

    /// Atomically persist one scoring run: exactly three risk score records
    /// plus the entity's current-field update. Implementations must roll back
    /// everything when any part fails; no partial run state may ever be
    /// observable.
    async fn commit_run(
        &self,
        entity_id: Uuid,
        update: &EntityScoreUpdate,
        records: &[RiskScoreRecord; 3],
    ) -> Result<()>;

    /// All audit records for an entity, oldest first
    async fn score_records(&self, entity_id: Uuid) -> Result<Vec<RiskScoreRecord>>;
}
