//! Integration tests against a real PostgreSQL.
//!
//! These tests require Docker to be running.
//!
//! Run with:
//!   docker compose -f crates/oliviagold_test_utils/docker/docker-compose.yml up -d
//!   cargo test -p oliviagold_test_utils --features docker-tests

#![cfg(feature = "docker-tests")]

use oliviagold_guard::{
    DbClient, DeletionPlan, DestructiveGate, GateOptions, IdentityValidator, RuntimeMode,
    SequenceReset, Verdict,
};
use oliviagold_test_utils::schema::seed_shop;
use oliviagold_test_utils::{RecordingReporter, TestPgPool};

#[tokio::test]
async fn test_current_database_matches_isolated_name() {
    let db = TestPgPool::new().await.unwrap();
    let client = db.client();

    let reported = client.current_database().await.unwrap();
    assert_eq!(reported, db.config.database);

    let validator = IdentityValidator::default();
    let descriptor = db.descriptor().unwrap();
    let verdict = validator.evaluate(RuntimeMode::Test, Some(&descriptor));
    assert_eq!(validator.confirm_live(RuntimeMode::Test, &reported, verdict), Verdict::Safe);

    db.drop_database().await.unwrap();
}

#[tokio::test]
async fn test_default_plan_satisfies_foreign_keys() {
    let db = TestPgPool::new().await.unwrap();
    seed_shop(&db.pool).await.unwrap();
    let client = db.client();
    let reporter = RecordingReporter::default();

    let mut gate = DestructiveGate::new(&client, &reporter, GateOptions::default());
    let report = gate
        .wipe(&Verdict::Safe, &DeletionPlan::shop_default())
        .await
        .unwrap();

    assert_eq!(report.total_rows(), 14);
    for table in ["order_items", "orders", "customers", "categories"] {
        assert_eq!(db.count(table).await.unwrap(), 0, "{} not empty", table);
    }
    assert!(report
        .sequences
        .iter()
        .all(|s| matches!(s.outcome, SequenceReset::Reset { .. })));

    // Sequences restart at 1.
    seed_shop(&db.pool).await.unwrap();
    let id: i32 = sqlx::query_scalar("SELECT id FROM customers")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(id, 1);

    db.drop_database().await.unwrap();
}

#[tokio::test]
async fn test_reset_schema_drops_tables() {
    let db = TestPgPool::new().await.unwrap();
    let client = db.client();
    let reporter = RecordingReporter::default();

    let mut gate = DestructiveGate::new(&client, &reporter, GateOptions::default());
    gate.reset_schema(&Verdict::Safe, "public").await.unwrap();

    assert!(db.count("customers").await.is_err());
    db.drop_database().await.unwrap();
}
