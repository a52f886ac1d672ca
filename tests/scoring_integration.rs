//! End-to-end scoring runs against both store backends.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use unirisk::{
    ActivityRecord, Dimension, Entity, EntityScoreUpdate, Error, ExternalSignal, FactorName,
    MemoryStore, RecommendedAction, RiskBand, RiskConfig, RiskScoreRecord, RiskStore,
    ScoringEngine, SqliteStore, StaticIntelligence,
};
use uuid::Uuid;

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
}

/// Store wrapper whose commit can be switched to fail, for rollback tests
struct FlakyStore {
    inner: MemoryStore,
    fail_commit: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_commit: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl RiskStore for FlakyStore {
    async fn insert_entity(&self, entity: &Entity) -> unirisk::Result<()> {
        self.inner.insert_entity(entity).await
    }

    async fn get_entity(&self, id: Uuid) -> unirisk::Result<Option<Entity>> {
        self.inner.get_entity(id).await
    }

    async fn insert_activity(&self, record: &ActivityRecord) -> unirisk::Result<()> {
        self.inner.insert_activity(record).await
    }

    async fn activity_since(
        &self,
        entity_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> unirisk::Result<Vec<ActivityRecord>> {
        self.inner.activity_since(entity_id, cutoff).await
    }

    async fn commit_run(
        &self,
        entity_id: Uuid,
        update: &EntityScoreUpdate,
        records: &[RiskScoreRecord; 3],
    ) -> unirisk::Result<()> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(Error::Storage("injected commit failure".to_string()));
        }
        self.inner.commit_run(entity_id, update, records).await
    }

    async fn score_records(&self, entity_id: Uuid) -> unirisk::Result<Vec<RiskScoreRecord>> {
        self.inner.score_records(entity_id).await
    }
}

#[tokio::test]
async fn scenario_run_produces_exact_aml_factors() {
    // Three transactions 950 / 950 / 5000 in the last 90 days, one at a
    // denylisted merchant, one offshore.
    let now = noon();
    let store = Arc::new(MemoryStore::new());
    let entity = Entity::new("Scenario Co", now - Duration::days(200));
    store.insert_entity(&entity).await.unwrap();

    for record in [
        ActivityRecord::new(entity.id, 950.0, "Corner Store", "retail", now - Duration::days(10)),
        ActivityRecord::new(
            entity.id,
            950.0,
            "Casino Royale",
            "gambling",
            now - Duration::days(20),
        ),
        ActivityRecord::new(entity.id, 5000.0, "Corner Store", "retail", now - Duration::days(30))
            .offshore(),
    ] {
        store.insert_activity(&record).await.unwrap();
    }

    let engine = ScoringEngine::new(RiskConfig::default(), store.clone()).unwrap();
    let outcome = engine.score_entity_at(entity.id, now).await.unwrap();

    let aml_record = outcome
        .records
        .iter()
        .find(|r| r.dimension == Dimension::Aml)
        .unwrap();
    assert_eq!(
        aml_record.factors.get(FactorName::StructuringPatterns),
        Some(0.2)
    );
    assert_eq!(
        aml_record.factors.get(FactorName::HighRiskMerchants),
        Some(0.2)
    );
    assert_eq!(
        aml_record.factors.get(FactorName::OffshoreTransactions),
        Some(1.0 / 3.0)
    );

    // AML dimension score from the fixed weights
    let expected_aml = 0.25 * 0.2 + 0.20 * 0.2 + 0.20 / 3.0 + 0.10 * 0.2;
    assert!((outcome.aml_score - expected_aml).abs() < 1e-12);

    // Combined follows the 0.4/0.6 policy exactly and lands in LOW here
    let expected_combined = 0.4 * outcome.credit_score + 0.6 * outcome.aml_score;
    assert!((outcome.combined_score - expected_combined).abs() < 1e-12);
    assert_eq!(outcome.band, RiskBand::Low);
    assert!((outcome.combined_confidence - 0.875).abs() < 1e-12);
}

#[tokio::test]
async fn missing_entity_returns_not_found_and_writes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let engine = ScoringEngine::new(RiskConfig::default(), store.clone()).unwrap();

    let err = engine.score_entity(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, Error::EntityNotFound(_)));
    assert!(!err.is_retryable());
    assert_eq!(store.record_count().await, 0);
}

#[tokio::test]
async fn failed_commit_rolls_back_and_is_retryable() {
    let now = noon();
    let store = Arc::new(FlakyStore::new());
    let entity = Entity::new("Flaky Co", now - Duration::days(400));
    store.insert_entity(&entity).await.unwrap();
    store
        .insert_activity(&ActivityRecord::new(
            entity.id,
            950.0,
            "Crypto Exchange",
            "crypto",
            now - Duration::days(5),
        ))
        .await
        .unwrap();

    let engine = ScoringEngine::new(RiskConfig::default(), store.clone()).unwrap();

    store.fail_commit.store(true, Ordering::SeqCst);
    let err = engine.score_entity_at(entity.id, now).await.unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
    assert!(err.is_retryable());

    // Nothing partially persisted: entity untouched, zero records
    let stored = store.get_entity(entity.id).await.unwrap().unwrap();
    assert_eq!(stored.combined_risk_score, 0.0);
    assert_eq!(stored.risk_level, RiskBand::Low);
    assert!(store.score_records(entity.id).await.unwrap().is_empty());

    // Extraction and aggregation are pure, so retrying the whole run succeeds
    store.fail_commit.store(false, Ordering::SeqCst);
    let outcome = engine.score_entity_at(entity.id, now).await.unwrap();
    assert_eq!(store.score_records(entity.id).await.unwrap().len(), 3);
    let stored = store.get_entity(entity.id).await.unwrap().unwrap();
    assert_eq!(stored.combined_risk_score, outcome.combined_score);
}

#[tokio::test]
async fn heavy_aml_activity_flags_entity() {
    let now = noon();
    let store = Arc::new(MemoryStore::new());
    let entity = Entity::new("Laundry Co", now - Duration::days(30));
    store.insert_entity(&entity).await.unwrap();

    // Saturate every AML factor
    for i in 0..10 {
        store
            .insert_activity(
                &ActivityRecord::new(
                    entity.id,
                    950.0,
                    "Offshore Trading Co",
                    "trading",
                    Utc.with_ymd_and_hms(2025, 6, 1, 3, 0, 0).unwrap() + Duration::days(i % 5),
                )
                .offshore()
                .cash_equivalent(),
            )
            .await
            .unwrap();
    }
    for i in 0..5 {
        store
            .insert_activity(&ActivityRecord::new(
                entity.id,
                2000.0 + 1000.0 * i as f64,
                "Crypto Exchange",
                "crypto",
                now - Duration::days(i),
            ))
            .await
            .unwrap();
    }

    let engine = ScoringEngine::new(RiskConfig::default(), store.clone()).unwrap();
    let outcome = engine.score_entity_at(entity.id, now).await.unwrap();

    assert_eq!(outcome.aml_score, 1.0);
    assert!(outcome.band >= RiskBand::High);

    let stored = store.get_entity(entity.id).await.unwrap().unwrap();
    assert!(stored.is_flagged);

    let combined_record = outcome
        .records
        .iter()
        .find(|r| r.dimension == Dimension::Combined)
        .unwrap();
    assert!(combined_record
        .recommended_actions
        .contains(&RecommendedAction::ManualReview));
}

#[tokio::test]
async fn external_payment_history_signal_feeds_credit() {
    let now = noon();
    let store = Arc::new(MemoryStore::new());
    let entity = Entity::new("Signal Co", now - Duration::days(800));
    store.insert_entity(&entity).await.unwrap();

    let provider = StaticIntelligence::new().with_signals(
        entity.id,
        vec![ExternalSignal {
            name: "payment_history".to_string(),
            value: 0.9,
            confidence: 0.75,
            impact: RiskBand::High,
            source: "credit-bureau-feed".to_string(),
            observed_at: now,
        }],
    );

    let engine = ScoringEngine::new(RiskConfig::default(), store.clone())
        .unwrap()
        .with_intelligence(Arc::new(provider));
    let outcome = engine.score_entity_at(entity.id, now).await.unwrap();

    // .35*.9 + .10*.5 (empty-window consistency); everything else zero
    assert!((outcome.credit_score - (0.35 * 0.9 + 0.05)).abs() < 1e-12);

    let credit_record = outcome
        .records
        .iter()
        .find(|r| r.dimension == Dimension::Credit)
        .unwrap();
    assert_eq!(credit_record.factors.get(FactorName::PaymentHistory), Some(0.9));
}

#[tokio::test]
async fn concurrent_runs_never_mix_dimension_scores() {
    let now = noon();
    let store = Arc::new(MemoryStore::new());
    let entity = Entity::new("Busy Co", now - Duration::days(100));
    store.insert_entity(&entity).await.unwrap();
    for days in 1..20 {
        store
            .insert_activity(&ActivityRecord::new(
                entity.id,
                100.0 * days as f64,
                "Corner Store",
                "retail",
                now - Duration::days(days),
            ))
            .await
            .unwrap();
    }

    let engine = Arc::new(ScoringEngine::new(RiskConfig::default(), store.clone()).unwrap());

    // Overlapping runs with different reference instants produce different
    // scores, but the committed entity view must always be one run's output.
    let handles: Vec<_> = (0..8i64)
        .map(|offset| {
            let engine = engine.clone();
            let entity_id = entity.id;
            tokio::spawn(async move {
                engine
                    .score_entity_at(entity_id, noon() + Duration::days(offset * 7))
                    .await
            })
        })
        .collect();
    for result in futures::future::join_all(handles).await {
        result.unwrap().unwrap();
    }

    let stored = store.get_entity(entity.id).await.unwrap().unwrap();
    let expected =
        (0.4 * stored.credit_score + 0.6 * stored.aml_score).clamp(0.0, 1.0);
    assert!((stored.combined_risk_score - expected).abs() < 1e-12);
}

#[tokio::test]
async fn sqlite_backend_full_run_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unirisk.db");

    let now = noon();
    let store = Arc::new(SqliteStore::open(&path).unwrap());
    let entity = Entity::new("Durable Co", now - Duration::days(200));
    store.insert_entity(&entity).await.unwrap();
    store
        .insert_activity(
            &ActivityRecord::new(entity.id, 950.0, "Casino Royale", "gambling", now - Duration::days(3))
                .cash_equivalent(),
        )
        .await
        .unwrap();

    let engine = ScoringEngine::new(RiskConfig::default(), store.clone()).unwrap();
    let outcome = engine.score_entity_at(entity.id, now).await.unwrap();

    // Reopen the database and confirm the run survived intact
    drop(engine);
    drop(store);
    let reopened = SqliteStore::open(&path).unwrap();
    let stored = reopened.get_entity(entity.id).await.unwrap().unwrap();
    assert!((stored.combined_risk_score - outcome.combined_score).abs() < 1e-12);
    assert_eq!(stored.risk_level, outcome.band);

    let records = reopened.score_records(entity.id).await.unwrap();
    assert_eq!(records.len(), 3);
    let combined = records
        .iter()
        .find(|r| r.dimension == Dimension::Combined)
        .unwrap();
    assert_eq!(combined.explanation, outcome.records[2].explanation);
}
