//! Capacity under concurrent confirms on a file-backed database.

mod common;

use common::{harness_with, june};
use rentline_core::{Actor, CommitmentLevel, CoreError};
use rentline_engine::{EngineConfig, EngineError};

fn file_config(dir: &tempfile::TempDir) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.database.path = dir.path().join("rentline.db");
    config.database.max_connections = 4;
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_confirms_never_overbook() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness_with(file_config(&dir)).await;
    let projector = h.product("Projector", 5, 2500).await;

    let alice = Actor::customer("alice");
    let bob = Actor::customer("bob");
    let a = h.quote_for(&alice, &projector, 3, june(1), june(5)).await;
    let b = h.quote_for(&bob, &projector, 3, june(3), june(7)).await;

    let (ra, rb) = tokio::join!(
        h.engine.confirm(&h.vendor, &a.id),
        h.engine.confirm(&h.vendor, &b.id),
    );

    let outcomes = [&ra, &rb];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = outcomes
        .iter()
        .find_map(|r| r.as_ref().err())
        .unwrap();
    assert!(matches!(
        loser,
        EngineError::Domain(CoreError::InsufficientStock { .. })
    ));
    assert_eq!(loser.shortfalls().unwrap()[0].available, 2);

    // Committed demand inside the overlap never exceeds stock.
    let overlap = h
        .engine
        .check_availability(&h.vendor, &projector.id, 1, june(3), june(5))
        .await
        .unwrap();
    assert_eq!(overlap.reserved, 3);

    let (winner, loser_id) = if ra.is_ok() { (&a.id, &b.id) } else { (&b.id, &a.id) };
    assert_eq!(h.levels(winner).await, vec![CommitmentLevel::Committed]);
    assert_eq!(h.levels(loser_id).await, vec![CommitmentLevel::Provisional]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_concurrent_confirms_respect_stock() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness_with(file_config(&dir)).await;
    let mic = h.product("Microphone", 4, 600).await;

    let mut orders = Vec::new();
    for i in 0..8 {
        let customer = Actor::customer(format!("customer-{i}"));
        orders.push(h.quote_for(&customer, &mic, 1, june(2), june(4)).await);
    }

    let mut tasks = Vec::new();
    for order in &orders {
        let engine = h.engine.clone();
        let vendor = h.vendor.clone();
        let id = order.id.clone();
        tasks.push(tokio::spawn(async move { engine.confirm(&vendor, &id).await }));
    }

    let mut confirmed = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => confirmed += 1,
            Err(e) => assert!(e.shortfalls().is_some() || e.is_transient(), "{e}"),
        }
    }

    assert!(confirmed <= 4);
    let availability = h
        .engine
        .check_availability(&h.vendor, &mic.id, 1, june(2), june(4))
        .await
        .unwrap();
    assert_eq!(availability.reserved, confirmed);
    assert_eq!(availability.available_units, 4 - confirmed);
}
