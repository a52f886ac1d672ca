//! SQLite-backed store.
//!
//! The atomic commit contract maps directly onto a SQLite transaction: the
//! three audit inserts and the entity update either all commit or roll back
//! together when the transaction is dropped on error.

use crate::error::{Error, Result};
use crate::model::{
    ActivityRecord, Dimension, Entity, EntityScoreUpdate, FactorSet, RecommendedAction,
    RiskBand, RiskScoreRecord,
};
use crate::storage::RiskStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use uuid::Uuid;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS entities (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    credit_score REAL NOT NULL DEFAULT 0.0,
    aml_score REAL NOT NULL DEFAULT 0.0,
    combined_risk_score REAL NOT NULL DEFAULT 0.0,
    risk_level TEXT NOT NULL DEFAULT 'LOW',
    is_flagged INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS activity_records (
    id TEXT PRIMARY KEY,
    entity_id TEXT NOT NULL,
    amount REAL NOT NULL,
    merchant TEXT NOT NULL,
    category TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    is_offshore INTEGER NOT NULL DEFAULT 0,
    is_cash_equivalent INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_activity_entity_ts
    ON activity_records (entity_id, timestamp);

CREATE TABLE IF NOT EXISTS risk_scores (
    id TEXT PRIMARY KEY,
    entity_id TEXT NOT NULL,
    dimension TEXT NOT NULL,
    score REAL NOT NULL,
    confidence REAL NOT NULL,
    factors TEXT NOT NULL,
    explanation TEXT NOT NULL,
    recommended_actions TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_risk_scores_entity
    ON risk_scores (entity_id, created_at);
";

/// SQLite [`RiskStore`] backend
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and apply the schema
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::storage(format!("bad timestamp '{}': {}", raw, e)))
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::storage(format!("bad uuid '{}': {}", raw, e)))
}

fn parse_band(raw: &str) -> Result<RiskBand> {
    RiskBand::from_label(raw).ok_or_else(|| Error::storage(format!("bad risk band '{}'", raw)))
}

fn parse_dimension(raw: &str) -> Result<Dimension> {
    match raw {
        "CREDIT" => Ok(Dimension::Credit),
        "AML" => Ok(Dimension::Aml),
        "COMBINED" => Ok(Dimension::Combined),
        _ => Err(Error::storage(format!("bad dimension '{}'", raw))),
    }
}

type EntityRow = (
    String,
    String,
    String,
    f64,
    f64,
    f64,
    String,
    bool,
    String,
);

type ActivityRow = (String, String, f64, String, String, String, bool, bool);

type ScoreRow = (
    String,
    String,
    String,
    f64,
    f64,
    String,
    String,
    String,
    String,
);

fn entity_from_row(row: EntityRow) -> Result<Entity> {
    Ok(Entity {
        id: parse_uuid(&row.0)?,
        name: row.1,
        created_at: parse_timestamp(&row.2)?,
        credit_score: row.3,
        aml_score: row.4,
        combined_risk_score: row.5,
        risk_level: parse_band(&row.6)?,
        is_flagged: row.7,
        updated_at: parse_timestamp(&row.8)?,
    })
}

fn activity_from_row(row: ActivityRow) -> Result<ActivityRecord> {
    Ok(ActivityRecord {
        id: parse_uuid(&row.0)?,
        entity_id: parse_uuid(&row.1)?,
        amount: row.2,
        merchant: row.3,
        category: row.4,
        timestamp: parse_timestamp(&row.5)?,
        is_offshore: row.6,
        is_cash_equivalent: row.7,
    })
}

fn score_from_row(row: ScoreRow) -> Result<RiskScoreRecord> {
    let factors: FactorSet = serde_json::from_str(&row.5)?;
    let recommended_actions: Vec<RecommendedAction> = serde_json::from_str(&row.7)?;
    Ok(RiskScoreRecord {
        id: parse_uuid(&row.0)?,
        entity_id: parse_uuid(&row.1)?,
        dimension: parse_dimension(&row.2)?,
        score: row.3,
        confidence: row.4,
        factors,
        explanation: row.6,
        recommended_actions,
        created_at: parse_timestamp(&row.8)?,
    })
}

#[async_trait]
impl RiskStore for SqliteStore {
    async fn insert_entity(&self, entity: &Entity) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO entities
                (id, name, created_at, credit_score, aml_score, combined_risk_score,
                 risk_level, is_flagged, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entity.id.to_string(),
                entity.name,
                entity.created_at.to_rfc3339(),
                entity.credit_score,
                entity.aml_score,
                entity.combined_risk_score,
                entity.risk_level.as_str(),
                entity.is_flagged,
                entity.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn get_entity(&self, id: Uuid) -> Result<Option<Entity>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, created_at, credit_score, aml_score, combined_risk_score,
                    risk_level, is_flagged, updated_at
             FROM entities WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, bool>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?;

        match rows.next() {
            Some(row) => Ok(Some(entity_from_row(row?)?)),
            None => Ok(None),
        }
    }

    async fn insert_activity(&self, record: &ActivityRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO activity_records
                (id, entity_id, amount, merchant, category, timestamp,
                 is_offshore, is_cash_equivalent)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id.to_string(),
                record.entity_id.to_string(),
                record.amount,
                record.merchant,
                record.category,
                record.timestamp.to_rfc3339(),
                record.is_offshore,
                record.is_cash_equivalent,
            ],
        )?;
        Ok(())
    }

    async fn activity_since(
        &self,
        entity_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, entity_id, amount, merchant, category, timestamp,
                    is_offshore, is_cash_equivalent
             FROM activity_records
             WHERE entity_id = ?1 AND timestamp >= ?2
             ORDER BY timestamp ASC",
        )?;
        let rows = stmt.query_map(
            params![entity_id.to_string(), cutoff.to_rfc3339()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, bool>(6)?,
                    row.get::<_, bool>(7)?,
                ))
            },
        )?;

        let mut records = Vec::new();
        for row in rows {
            records.push(activity_from_row(row?)?);
        }
        Ok(records)
    }

    async fn commit_run(
        &self,
        entity_id: Uuid,
        update: &EntityScoreUpdate,
        records: &[RiskScoreRecord; 3],
    ) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        for record in records {
            tx.execute(
                "INSERT INTO risk_scores
                    (id, entity_id, dimension, score, confidence, factors,
                     explanation, recommended_actions, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id.to_string(),
                    record.entity_id.to_string(),
                    record.dimension.as_str(),
                    record.score,
                    record.confidence,
                    serde_json::to_string(&record.factors)?,
                    record.explanation,
                    serde_json::to_string(&record.recommended_actions)?,
                    record.created_at.to_rfc3339(),
                ],
            )?;
        }

        let updated = tx.execute(
            "UPDATE entities
             SET credit_score = ?2, aml_score = ?3, combined_risk_score = ?4,
                 risk_level = ?5, is_flagged = ?6, updated_at = ?7
             WHERE id = ?1",
            params![
                entity_id.to_string(),
                update.credit_score,
                update.aml_score,
                update.combined_risk_score,
                update.risk_level.as_str(),
                update.is_flagged,
                update.updated_at.to_rfc3339(),
            ],
        )?;

        if updated != 1 {
            // Dropping the transaction rolls back the record inserts
            return Err(Error::storage(format!(
                "entity {} vanished before commit",
                entity_id
            )));
        }

        tx.commit()?;
        Ok(())
    }

    async fn score_records(&self, entity_id: Uuid) -> Result<Vec<RiskScoreRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, entity_id, dimension, score, confidence, factors,
                    explanation, recommended_actions, created_at
             FROM risk_scores
             WHERE entity_id = ?1
             ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map(params![entity_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(score_from_row(row?)?);
        }
        Ok(records)
    }
}
