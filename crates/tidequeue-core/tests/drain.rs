//! Drain behaviour against a recording backing store.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Failure, LOOKUP, MockStore, manual_manager};
use rstest::rstest;
use serde_json::json;
use tidequeue_core::domain::{ClaimRef, ResourceClaims};
use tidequeue_core::queue::SkipReason;
use tidequeue_core::{OperationKind, OperationStatus};

#[tokio::test]
async fn unavailable_resource_rejects_reservation_without_creating_it() {
    let store = MockStore::new();
    store.set_resource(
        "B1",
        ResourceClaims {
            is_available: false,
            ..ResourceClaims::free()
        },
    );
    let manager = manual_manager(store.clone()).await;

    let id = manager
        .enqueue(
            OperationKind::ReservationCreate,
            json!({"resource_id": "B1", "guest": "Kim", "starts_at": "2024-08-01T00:00:00Z"}),
        )
        .await;
    let summary = manager.drain().await;

    let record = manager.record(id).await.unwrap();
    assert_eq!(record.status, OperationStatus::Failed);
    assert_eq!(record.retry_count, 0);
    assert!(record.last_error.unwrap().contains("unavailable"));
    assert!(record.last_attempt_at.is_some());
    assert!(store.calls_to("create_reservation").is_empty());
    assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn allocation_create_on_free_resource_completes() {
    let store = MockStore::new();
    store.free_resource("B1");
    let manager = manual_manager(store.clone()).await;

    let id = manager
        .enqueue(OperationKind::AllocationCreate, json!({"resource_id": "B1", "owner": "ana"}))
        .await;
    manager.drain().await;

    let record = manager.record(id).await.unwrap();
    assert_eq!(record.status, OperationStatus::Completed);
    assert_eq!(record.last_error, None);

    let creates = store.calls_to("create_allocation");
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].data["resource_id"], "B1");
    assert_eq!(creates[0].data["owner"], "ana");
    assert_eq!(creates[0].data["status"], "active");
    assert!(creates[0].data["created_at"].is_string());
}

#[tokio::test]
async fn payment_with_failing_bill_update_is_retried() {
    let store = MockStore::new();
    store.fail("mark_bill_paid", Failure::Always);
    let manager = manual_manager(store.clone()).await;

    let id = manager
        .enqueue(OperationKind::PaymentApply, json!({"bill_id": "bill-7", "amount": 120}))
        .await;
    let summary = manager.drain().await;

    let record = manager.record(id).await.unwrap();
    assert_eq!(record.status, OperationStatus::Pending);
    assert_eq!(record.retry_count, 1);
    assert!(record.last_error.unwrap().contains("mark_bill_paid"));
    assert_eq!(summary.retrying, 1);
    assert_eq!(store.methods(), vec!["create_payment", "mark_bill_paid"]);
    assert_eq!(store.calls_to("mark_bill_paid")[0].id.as_deref(), Some("bill-7"));
}

#[tokio::test]
async fn five_unrelated_records_complete_in_one_drain() {
    let store = MockStore::new();
    let manager = manual_manager(store.clone()).await;
    for n in 0..5 {
        manager
            .enqueue(OperationKind::TaskCreate, json!({"title": format!("task {n}")}))
            .await;
    }

    let summary = manager.drain().await;
    assert_eq!(summary.attempted, 5);
    assert_eq!(summary.completed, 5);

    let status = manager.status().await;
    assert_eq!(status.completed, 5);
    assert_eq!(status.pending, 0);
    assert!(!status.is_draining);
    assert!(!manager.is_draining());
}

#[tokio::test]
async fn replays_in_enqueue_order() {
    let store = MockStore::new();
    store.free_resource("B2");
    let manager = manual_manager(store.clone()).await;

    manager.enqueue(OperationKind::BillCreate, json!({"amount": 40})).await;
    manager
        .enqueue(OperationKind::TaskUpdate, json!({"id": "t1", "data": {"done": true}}))
        .await;
    manager
        .enqueue(OperationKind::ReservationCreate, json!({"resource_id": "B2"}))
        .await;
    manager.enqueue(OperationKind::TaskCreate, json!({"title": "hose"})).await;
    manager.drain().await;

    assert_eq!(
        store.methods(),
        vec!["create_bill", "update_task", LOOKUP, "create_reservation", "create_task"]
    );
    assert_eq!(store.calls_to("update_task")[0].id.as_deref(), Some("t1"));
}

#[tokio::test]
async fn transient_failures_stop_at_the_retry_bound() {
    let store = MockStore::new();
    store.fail("create_task", Failure::Always);
    let manager = manual_manager(store.clone()).await;
    let id = manager.enqueue(OperationKind::TaskCreate, json!({"title": "x"})).await;

    for _ in 0..5 {
        manager.drain().await;
    }

    let record = manager.record(id).await.unwrap();
    assert_eq!(record.status, OperationStatus::Failed);
    assert_eq!(record.retry_count, 3);
    assert_eq!(store.calls_to("create_task").len(), 3);
}

#[tokio::test]
async fn terminal_records_are_never_attempted_again() {
    let store = MockStore::new();
    store.set_resource("B1", ResourceClaims::missing());
    let manager = manual_manager(store.clone()).await;
    let done = manager.enqueue(OperationKind::TaskCreate, json!({"title": "x"})).await;
    let rejected = manager
        .enqueue(OperationKind::AllocationCreate, json!({"resource_id": "B1"}))
        .await;

    manager.drain().await;
    let calls = store.calls().len();
    let before = (manager.record(done).await.unwrap(), manager.record(rejected).await.unwrap());

    let summary = manager.drain().await;
    assert_eq!(summary.attempted, 0);
    assert_eq!(store.calls().len(), calls);
    assert_eq!(manager.record(done).await.unwrap(), before.0);
    assert_eq!(manager.record(rejected).await.unwrap(), before.1);
}

#[rstest]
#[case::missing_wins(ResourceClaims::missing(), "not found")]
#[case::unavailable(ResourceClaims { is_available: false, ..contracted() }, "unavailable")]
#[case::contract_before_booking(booked(contracted()), "has active contract")]
#[case::booking(booked(ResourceClaims::free()), "has active booking")]
#[tokio::test]
async fn conflict_reason_follows_precedence(#[case] claims: ResourceClaims, #[case] expected: &str) {
    let store = MockStore::new();
    store.set_resource("B1", claims);
    let manager = manual_manager(store.clone()).await;

    let id = manager
        .enqueue(OperationKind::AllocationCreate, json!({"resource_id": "B1"}))
        .await;
    manager.drain().await;

    let record = manager.record(id).await.unwrap();
    assert_eq!(record.status, OperationStatus::Failed);
    assert_eq!(record.last_error.as_deref(), Some(expected));
    assert!(store.calls_to("create_allocation").is_empty());
}

fn contracted() -> ResourceClaims {
    ResourceClaims {
        active_long_term_claims: vec![ClaimRef::new("contract-1")],
        ..ResourceClaims::free()
    }
}

fn booked(claims: ResourceClaims) -> ResourceClaims {
    ResourceClaims {
        active_short_term_claims_overlapping_now: vec![ClaimRef::new("booking-1")],
        ..claims
    }
}

#[tokio::test]
async fn update_moving_a_claim_is_conflict_checked() {
    let store = MockStore::new();
    store.contracted_resource("B3");
    let manager = manual_manager(store.clone()).await;

    let moved = manager
        .enqueue(
            OperationKind::AllocationUpdate,
            json!({"id": "a1", "data": {"resource_id": "B3"}}),
        )
        .await;
    let in_place = manager
        .enqueue(OperationKind::AllocationUpdate, json!({"id": "a1", "data": {"notes": "paid up"}}))
        .await;
    manager.drain().await;

    assert_eq!(manager.record(moved).await.unwrap().status, OperationStatus::Failed);
    assert_eq!(manager.record(in_place).await.unwrap().status, OperationStatus::Completed);

    let updates = store.calls_to("update_allocation");
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].data["notes"], "paid up");
    assert!(updates[0].data["updated_at"].is_string());
}

#[tokio::test]
async fn failed_conflict_lookup_is_retried() {
    let store = MockStore::new();
    store.free_resource("B1");
    store.fail(LOOKUP, Failure::Times(1));
    let manager = manual_manager(store.clone()).await;
    let id = manager
        .enqueue(OperationKind::ReservationCreate, json!({"resource_id": "B1"}))
        .await;

    manager.drain().await;
    let record = manager.record(id).await.unwrap();
    assert_eq!(record.status, OperationStatus::Pending);
    assert_eq!(record.retry_count, 1);
    assert!(store.calls_to("create_reservation").is_empty());

    manager.drain().await;
    assert_eq!(manager.record(id).await.unwrap().status, OperationStatus::Completed);
    assert_eq!(store.calls_to("create_reservation").len(), 1);
}

#[tokio::test]
async fn unsupported_kind_fails_without_retry() {
    let store = MockStore::new();
    let manager = manual_manager(store.clone()).await;
    let id = manager
        .enqueue(OperationKind::from("invoice_void".to_string()), json!({"id": 1}))
        .await;

    manager.drain().await;

    let record = manager.record(id).await.unwrap();
    assert_eq!(record.status, OperationStatus::Failed);
    assert_eq!(record.retry_count, 0);
    assert!(record.last_error.unwrap().contains("invoice_void"));
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn claiming_create_without_resource_is_rejected() {
    let store = MockStore::new();
    let manager = manual_manager(store.clone()).await;
    let id = manager
        .enqueue(OperationKind::AllocationCreate, json!({"owner": "ana"}))
        .await;

    manager.drain().await;

    let record = manager.record(id).await.unwrap();
    assert_eq!(record.status, OperationStatus::Failed);
    assert_eq!(record.retry_count, 0);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn concurrent_drain_is_a_no_op() {
    let store = MockStore::new();
    let manager = manual_manager(store.clone()).await;
    let id = manager.enqueue(OperationKind::TaskCreate, json!({"title": "x"})).await;
    let gate = store.close_gate();

    let first = tokio::spawn({
        let manager = manager.clone();
        async move { manager.drain().await }
    });
    while store.calls().is_empty() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    assert!(manager.is_draining());
    assert!(manager.status().await.is_draining);
    let second = manager.drain().await;
    assert_eq!(second.skipped, Some(SkipReason::AlreadyDraining));
    assert_eq!(second.attempted, 0);

    gate.add_permits(1);
    let first = first.await.unwrap();
    assert_eq!(first.completed, 1);
    assert!(!manager.is_draining());
    assert_eq!(store.calls_to("create_task").len(), 1);
    assert_eq!(manager.record(id).await.unwrap().status, OperationStatus::Completed);
}

#[tokio::test]
async fn clearing_an_in_flight_record_discards_its_result() {
    let store = MockStore::new();
    let manager = manual_manager(store.clone()).await;
    manager.enqueue(OperationKind::TaskCreate, json!({"title": "x"})).await;
    let gate = store.close_gate();

    let drain = tokio::spawn({
        let manager = manager.clone();
        async move { manager.drain().await }
    });
    while store.calls().is_empty() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    assert_eq!(manager.clear_all().await, 1);
    gate.add_permits(1);
    let summary = drain.await.unwrap();

    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.completed, 0);
    assert_eq!(manager.status().await.total, 0);
}

#[tokio::test]
async fn enqueue_never_touches_the_backing_store() {
    let store = MockStore::new();
    store.fail("create_task", Failure::Always);
    let manager = manual_manager(Arc::clone(&store)).await;

    let id = manager.enqueue(OperationKind::TaskCreate, json!({})).await;

    assert!(store.calls().is_empty());
    let record = manager.record(id).await.unwrap();
    assert_eq!(record.status, OperationStatus::Pending);
    assert_eq!(record.retry_count, 0);
    assert_eq!(record.last_attempt_at, None);
}
