use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::Utc;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use engine::{
    ActivityAction, Engine, EngineError, Expense, ExpenseList, MembershipChange, Participant,
    SettlementStatus, SplitItem, SplitPolicy,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

/// A pool over a scratch database file, so transactions run on separate
/// connections and really contend for the write lock.
async fn engine_with_file_db() -> (Engine, PathBuf) {
    let path = std::env::temp_dir().join(format!("chipin-{}.db", Uuid::new_v4()));
    let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
    options.max_connections(4);
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    (engine, path)
}

fn remove_db_files(path: &Path) {
    for suffix in ["", "-wal", "-shm", "-journal"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

fn ann() -> Participant {
    Participant::new("ann@example.com")
}

fn bob() -> Participant {
    Participant::new("bob@example.com")
}

/// Bob owes ann 20.
async fn list_with_debt(engine: &Engine) -> ExpenseList {
    let list = engine.new_list("Concert", &ann()).await.unwrap();
    engine
        .update_membership(list.id, MembershipChange::Add, "bob@example.com", &ann())
        .await
        .unwrap();
    let tickets = Expense::new("Tickets", 20.0, ann(), SplitPolicy::Fixed, ann(), Utc::now())
        .with_items(vec![SplitItem::new(bob(), 20.0)]);
    engine.save_expense(list.id, tickets, &ann()).await.unwrap();
    list
}

#[tokio::test]
async fn confirmed_settlement_clears_the_debt() {
    let (engine, _db) = engine_with_db().await;
    let list = list_with_debt(&engine).await;

    let settlement = engine
        .record_settlement(list.id, &bob(), &ann(), 20.0, None, &bob())
        .await
        .unwrap();
    assert_eq!(settlement.status, SettlementStatus::Pending);
    assert_eq!(settlement.description, "Debt settlement");

    // Pending settlements do not move balances.
    let balances = engine.adjusted_balances(list.id, &ann()).await.unwrap();
    assert_eq!(balances[&bob()], -20.0);
    assert_eq!(engine.suggested_payments(list.id, &ann()).await.unwrap().len(), 1);

    let confirmed = engine
        .confirm_settlement(list.id, settlement.id, &ann())
        .await
        .unwrap();
    assert_eq!(confirmed.status, SettlementStatus::Confirmed);
    assert_eq!(confirmed.confirmed_by, Some(ann()));
    assert!(confirmed.confirmed_at.is_some());

    let balances = engine.adjusted_balances(list.id, &bob()).await.unwrap();
    assert_eq!(balances[&ann()], 0.0);
    assert_eq!(balances[&bob()], 0.0);
    assert!(engine.suggested_payments(list.id, &bob()).await.unwrap().is_empty());

    // Raw balances ignore settlements.
    let raw = engine.balances(list.id, &bob()).await.unwrap();
    assert_eq!(raw[&bob()], -20.0);

    let stored = engine
        .load_settlements(list.id, &ann(), Some(SettlementStatus::Confirmed))
        .await
        .unwrap();
    assert_eq!(stored, vec![confirmed]);
}

#[tokio::test]
async fn only_the_recipient_can_transition() {
    let (engine, _db) = engine_with_db().await;
    let list = list_with_debt(&engine).await;
    let settlement = engine
        .record_settlement(list.id, &bob(), &ann(), 20.0, Some("cash"), &bob())
        .await
        .unwrap();

    let err = engine
        .confirm_settlement(list.id, settlement.id, &bob())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let pending = engine
        .load_settlements(list.id, &bob(), Some(SettlementStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].description, "cash");
}

#[tokio::test]
async fn second_transition_conflicts() {
    let (engine, _db) = engine_with_db().await;
    let list = list_with_debt(&engine).await;
    let settlement = engine
        .record_settlement(list.id, &bob(), &ann(), 20.0, None, &bob())
        .await
        .unwrap();

    let rejected = engine
        .reject_settlement(list.id, settlement.id, &ann())
        .await
        .unwrap();
    assert_eq!(rejected.status, SettlementStatus::Rejected);
    assert_eq!(rejected.confirmed_by, Some(ann()));

    let err = engine
        .confirm_settlement(list.id, settlement.id, &ann())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let stored = engine.load_settlements(list.id, &ann(), None).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, SettlementStatus::Rejected);

    let log = engine.activity_log(list.id, &ann()).await.unwrap();
    assert_eq!(log[0].action, ActivityAction::SettlementRejected);
    assert_eq!(log[0].subject, settlement.id.to_string());
    assert_eq!(
        log.iter()
            .filter(|e| e.action == ActivityAction::SettlementConfirmed)
            .count(),
        0
    );
}

#[tokio::test]
async fn transition_checks_status_and_existence() {
    let (engine, _db) = engine_with_db().await;
    let list = list_with_debt(&engine).await;

    let err = engine
        .transition_settlement(list.id, Uuid::new_v4(), SettlementStatus::Pending, &ann())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .confirm_settlement(list.id, Uuid::new_v4(), &ann())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::KeyNotFound("settlement not exists".to_string())
    );
}

#[tokio::test]
async fn only_the_debtor_records_a_payment() {
    let (engine, _db) = engine_with_db().await;
    let list = list_with_debt(&engine).await;

    let err = engine
        .record_settlement(list.id, &bob(), &ann(), 20.0, None, &ann())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .record_received_payment(list.id, &bob(), &ann(), 20.0, None, &bob())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .record_settlement(list.id, &bob(), &bob(), 20.0, None, &bob())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .record_settlement(
            list.id,
            &bob(),
            &Participant::new("dan@example.com"),
            5.0,
            None,
            &bob(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn received_payment_is_confirmed_immediately() {
    let (engine, _db) = engine_with_db().await;
    let list = list_with_debt(&engine).await;

    let settlement = engine
        .record_received_payment(list.id, &bob(), &ann(), 20.0, Some("bank transfer"), &ann())
        .await
        .unwrap();
    assert_eq!(settlement.status, SettlementStatus::Confirmed);
    assert_eq!(settlement.created_by, ann());

    let balances = engine.adjusted_balances(list.id, &ann()).await.unwrap();
    assert_eq!(balances[&bob()], 0.0);
}

#[tokio::test]
async fn duplicate_settlements_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let list = list_with_debt(&engine).await;

    let first = engine
        .record_settlement(list.id, &bob(), &ann(), 20.0, None, &bob())
        .await
        .unwrap();
    let err = engine
        .record_settlement(list.id, &bob(), &ann(), 20.004, None, &bob())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    // Once rejected, the same payment can be recorded again.
    engine
        .reject_settlement(list.id, first.id, &ann())
        .await
        .unwrap();
    engine
        .record_settlement(list.id, &bob(), &ann(), 20.0, None, &bob())
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn racing_transitions_have_a_single_winner() {
    let (engine, path) = engine_with_file_db().await;
    let list = list_with_debt(&engine).await;
    let engine = Arc::new(engine);

    for round in 0..10 {
        let settlement = engine
            .record_settlement(list.id, &bob(), &ann(), 1.0 + f64::from(round), None, &bob())
            .await
            .unwrap();
        let (list_id, settlement_id) = (list.id, settlement.id);

        let confirm = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move {
                engine
                    .confirm_settlement(list_id, settlement_id, &ann())
                    .await
            }
        });
        let reject = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.reject_settlement(list_id, settlement_id, &ann()).await }
        });
        let confirmed = confirm.await.unwrap();
        let rejected = reject.await.unwrap();

        let winner = match (&confirmed, &rejected) {
            (Ok(won), Err(EngineError::Conflict(_))) | (Err(EngineError::Conflict(_)), Ok(won)) => {
                won.status
            }
            other => panic!("round {round}: expected one winner and one conflict, got {other:?}"),
        };

        let stored = engine.load_settlements(list.id, &ann(), None).await.unwrap();
        let stored = stored
            .iter()
            .find(|s| s.id == settlement.id)
            .unwrap();
        assert_eq!(stored.status, winner);
    }

    let log = engine.activity_log(list.id, &ann()).await.unwrap();
    assert_eq!(
        log.iter()
            .filter(|e| matches!(
                e.action,
                ActivityAction::SettlementConfirmed | ActivityAction::SettlementRejected
            ))
            .count(),
        10
    );

    drop(engine);
    remove_db_files(&path);
}

#[tokio::test]
async fn recording_on_an_unknown_list_is_not_found() {
    let (engine, _db) = engine_with_db().await;
    let missing = Uuid::new_v4();
    let not_found = EngineError::KeyNotFound("expense list not exists".to_string());

    // On an existing list both actors would be forbidden.
    let err = engine
        .record_settlement(missing, &bob(), &ann(), 5.0, None, &ann())
        .await
        .unwrap_err();
    assert_eq!(err, not_found);

    let err = engine
        .record_received_payment(missing, &bob(), &ann(), 5.0, None, &bob())
        .await
        .unwrap_err();
    assert_eq!(err, not_found);
}
