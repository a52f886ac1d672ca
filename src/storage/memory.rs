//! In-memory store for development and tests.
//!
//! All state sits behind a single async RwLock, so `commit_run` is naturally
//! atomic: the write guard covers the record appends and the entity update.

use crate::error::{Error, Result};
use crate::model::{ActivityRecord, Entity, EntityScoreUpdate, RiskScoreRecord};
use crate::storage::RiskStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct MemoryState {
    entities: HashMap<Uuid, Entity>,
    activity: HashMap<Uuid, Vec<ActivityRecord>>,
    records: Vec<RiskScoreRecord>,
}

/// In-memory [`RiskStore`] backend
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of audit records across all entities
    pub async fn record_count(&self) -> usize {
        self.state.read().await.records.len()
    }
}

#[async_trait]
impl RiskStore for MemoryStore {
    async fn insert_entity(&self, entity: &Entity) -> Result<()> {
        let mut state = self.state.write().await;
        state.entities.insert(entity.id, entity.clone());
        Ok(())
    }

    async fn get_entity(&self, id: Uuid) -> Result<Option<Entity>> {
        let state = self.state.read().await;
        Ok(state.entities.get(&id).cloned())
    }

    async fn insert_activity(&self, record: &ActivityRecord) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .activity
            .entry(record.entity_id)
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn activity_since(
        &self,
        entity_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>> {
        let state = self.state.read().await;
        Ok(state
            .activity
            .get(&entity_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.timestamp >= cutoff)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn commit_run(
        &self,
        entity_id: Uuid,
        update: &EntityScoreUpdate,
        records: &[RiskScoreRecord; 3],
    ) -> Result<()> {
        let mut state = self.state.write().await;

        // Validate before touching anything so a failure leaves no partial state
        let entity = state
            .entities
            .get_mut(&entity_id)
            .ok_or_else(|| Error::storage(format!("entity {} vanished before commit", entity_id)))?;

        entity.credit_score = update.credit_score;
        entity.aml_score = update.aml_score;
        entity.combined_risk_score = update.combined_risk_score;
        entity.risk_level = update.risk_level;
        entity.is_flagged = update.is_flagged;
        entity.updated_at = update.updated_at;

        state.records.extend(records.iter().cloned());
        Ok(())
    }

    async fn score_records(&self, entity_id: Uuid) -> Result<Vec<RiskScoreRecord>> {
        let state = self.state.read().await;
        Ok(state
            .records
            .iter()
            .filter(|r| r.entity_id == entity_id)
            .cloned()
            .collect())
    }
}
