//! 服务单工作流端到端测试
//!
//! 使用磁盘上的 redb 数据库 (tempfile) 跑完整的命令流程，
//! 覆盖诊断单从开单到交付、越级流转、超额付款和并发预留。

use std::sync::{Arc, Barrier};

use repair_server::orders::{
    BranchPolicies, LedgerPolicy, ManagerError, NewOrder, OrderError, OrderOrchestrator,
};
use repair_server::{CatalogEntry, InMemoryCatalog};
use shared::order::{
    Actor, LineItemInput, LineItemKind, OrderState, PaymentInput, PaymentMethod,
    ReservationInput, ReservationStatus, Role, ServiceKind, TransitionPayload,
};
use tempfile::TempDir;

const T1: i64 = 1_800_000_000_000;
const T2: i64 = 1_800_259_200_000;

fn reception() -> Actor {
    Actor::new("rec-1", "Ana", Role::Reception)
}

fn technician() -> Actor {
    Actor::new("tech-1", "Luis", Role::Technician)
}

fn setup() -> (TempDir, OrderOrchestrator) {
    let dir = tempfile::tempdir().unwrap();
    let catalog = InMemoryCatalog::with_entries([CatalogEntry {
        sku: "SVC-SCREEN".to_string(),
        name: "Screen replacement".to_string(),
        kind: LineItemKind::Service,
        price: 1200.0,
        cost: 700.0,
        warranty_days: 90,
    }]);
    let orchestrator = OrderOrchestrator::new(
        dir.path().join("orders.redb"),
        Arc::new(catalog),
        BranchPolicies::new(LedgerPolicy::default()),
    )
    .unwrap();
    (dir, orchestrator)
}

fn diagnosis_order() -> NewOrder {
    NewOrder {
        branch: "CENTRO".to_string(),
        service_kind: ServiceKind::Diagnosis,
        reported_problem: "Laptop does not boot".to_string(),
        client_id: "client-42".to_string(),
        equipment_id: "eq-42".to_string(),
        technician_id: Some("tech-1".to_string()),
        items: vec![],
    }
}

fn order_error(err: ManagerError) -> OrderError {
    match err {
        ManagerError::Order(e) => e,
        other => panic!("expected an order error, got {other:?}"),
    }
}

/// Scenarios 1 and 2: open, start diagnosis, record the quote
fn diagnosed_order(orchestrator: &OrderOrchestrator) -> String {
    let created = orchestrator
        .create_order(&reception(), diagnosis_order())
        .unwrap();
    let order_id = created.order.order_id.clone();

    let started = orchestrator
        .apply_transition(
            &order_id,
            &technician(),
            OrderState::InDiagnosis,
            TransitionPayload {
                estimated_completion: Some(T1),
                ..Default::default()
            },
            None,
        )
        .unwrap();
    assert_eq!(started.order.state, OrderState::InDiagnosis);
    assert_eq!(started.order.estimated_completion, Some(T1));

    let diagnosed = orchestrator
        .apply_transition(
            &order_id,
            &technician(),
            OrderState::DiagnosisCompleted,
            TransitionPayload {
                diagnosis: Some("bad HDD".to_string()),
                quoted_cost: Some(800.0),
                estimated_completion: Some(T2),
                ..Default::default()
            },
            None,
        )
        .unwrap();
    assert_eq!(diagnosed.order.state, OrderState::DiagnosisCompleted);
    assert_eq!(diagnosed.ledger.total, 800.0);
    assert_eq!(diagnosed.ledger.advance_required, 800.0);
    assert_eq!(diagnosed.order.quoted_cost, Some(800.0));

    order_id
}

fn advance(
    orchestrator: &OrderOrchestrator,
    order_id: &str,
    actor: &Actor,
    to: OrderState,
    payload: TransitionPayload,
) {
    orchestrator
        .apply_transition(order_id, actor, to, payload, None)
        .unwrap_or_else(|e| panic!("transition to {to} failed: {e}"));
}

#[test]
fn test_diagnosis_order_start_and_quote() {
    let (_dir, orchestrator) = setup();
    let order_id = diagnosed_order(&orchestrator);

    let order = orchestrator.get_order(&order_id).unwrap().unwrap();
    assert_eq!(order.folio, "CENTRO-000001");
    assert_eq!(order.diagnosis.as_deref(), Some("bad HDD"));
    assert_eq!(order.estimated_completion, Some(T2));
    assert_eq!(order.balance, 800.0);
}

#[test]
fn test_skipping_states_is_rejected() {
    let (_dir, orchestrator) = setup();
    let created = orchestrator
        .create_order(&reception(), diagnosis_order())
        .unwrap();
    let order_id = created.order.order_id;
    advance(
        &orchestrator,
        &order_id,
        &technician(),
        OrderState::InDiagnosis,
        TransitionPayload {
            estimated_completion: Some(T1),
            ..Default::default()
        },
    );

    for actor in [technician(), reception(), Actor::new("adm", "Root", Role::Admin)] {
        let err = orchestrator
            .apply_transition(
                &order_id,
                &actor,
                OrderState::RepairCompleted,
                TransitionPayload {
                    work_performed: Some("replaced disk".to_string()),
                    ..Default::default()
                },
                None,
            )
            .unwrap_err();
        assert!(
            matches!(order_error(err), OrderError::InvalidTransition { .. }),
            "{:?} should not skip states",
            actor.role
        );
    }

    let order = orchestrator.get_order(&order_id).unwrap().unwrap();
    assert_eq!(order.state, OrderState::InDiagnosis);
}

#[test]
fn test_payment_settles_balance_then_delivery_succeeds() {
    let (_dir, orchestrator) = setup();
    let order_id = diagnosed_order(&orchestrator);

    advance(&orchestrator, &order_id, &reception(), OrderState::Approved, TransitionPayload::default());
    advance(&orchestrator, &order_id, &technician(), OrderState::InRepair, TransitionPayload::default());
    advance(
        &orchestrator,
        &order_id,
        &technician(),
        OrderState::RepairCompleted,
        TransitionPayload {
            work_performed: Some("Replaced HDD with SSD, reinstalled OS".to_string()),
            ..Default::default()
        },
    );
    advance(
        &orchestrator,
        &order_id,
        &technician(),
        OrderState::ReadyForDelivery,
        TransitionPayload::default(),
    );

    // Delivery is refused while money is owed
    let err = orchestrator
        .apply_transition(
            &order_id,
            &reception(),
            OrderState::PaidAndDelivered,
            TransitionPayload::default(),
            None,
        )
        .unwrap_err();
    assert!(matches!(order_error(err), OrderError::InvalidTransition { .. }));

    let paid = orchestrator
        .record_payment(&order_id, &reception(), PaymentInput::new(PaymentMethod::Cash, 800.0))
        .unwrap();
    assert_eq!(paid.ledger.balance, 0.0);
    assert_eq!(paid.order.state, OrderState::ReadyForDelivery);

    let delivered = orchestrator
        .apply_transition(
            &order_id,
            &reception(),
            OrderState::PaidAndDelivered,
            TransitionPayload::default(),
            None,
        )
        .unwrap();
    assert_eq!(delivered.order.state, OrderState::PaidAndDelivered);
    assert!(delivered.order.completed_at.is_some());
    assert!(delivered.allowed_actions.is_empty());

    // Closed orders reject every further move
    for target in OrderState::ALL {
        let err = orchestrator
            .apply_transition(&order_id, &reception(), target, TransitionPayload::default(), None)
            .unwrap_err();
        assert!(matches!(order_error(err), OrderError::InvalidTransition { .. }));
    }
    assert!(orchestrator.get_active_orders().unwrap().is_empty());

    // Replaying the stored events reproduces the snapshot
    let rebuilt = orchestrator.rebuild_snapshot(&order_id).unwrap();
    assert_eq!(rebuilt, orchestrator.get_order(&order_id).unwrap().unwrap());
}

#[test]
fn test_overpayment_rejected_and_balance_unchanged() {
    let (_dir, orchestrator) = setup();
    let order_id = diagnosed_order(&orchestrator);

    let err = orchestrator
        .record_payment(&order_id, &reception(), PaymentInput::new(PaymentMethod::Card, 900.0))
        .unwrap_err();
    assert!(matches!(order_error(err), OrderError::Overpayment { .. }));

    let order = orchestrator.get_order(&order_id).unwrap().unwrap();
    assert_eq!(order.total, 800.0);
    assert_eq!(order.balance, 800.0);
    assert!(order.payments.is_empty());
}

#[test]
fn test_concurrent_reservations_never_oversell() {
    let (_dir, orchestrator) = setup();
    orchestrator
        .inventory()
        .receive_stock("PART-X", "CENTRO", 5)
        .unwrap();

    let order_a = orchestrator
        .create_order(&reception(), diagnosis_order())
        .unwrap()
        .order
        .order_id;
    let order_b = orchestrator
        .create_order(&reception(), diagnosis_order())
        .unwrap()
        .order
        .order_id;

    let barrier = Arc::new(Barrier::new(2));
    let reserve = |order_id: String, actor: Actor, quantity: u32| {
        let orchestrator = orchestrator.clone();
        let barrier = barrier.clone();
        std::thread::spawn(move || {
            barrier.wait();
            orchestrator.reserve_material(
                &order_id,
                &actor,
                ReservationInput {
                    product_id: "PART-X".to_string(),
                    quantity,
                    branch: None,
                    estimated_use_at: None,
                },
            )
        })
    };

    let a = reserve(order_a.clone(), technician(), 5);
    let b = reserve(order_b.clone(), reception(), 1);
    let results = [a.join().unwrap(), b.join().unwrap()];

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one reservation must win");
    let failure = results.into_iter().find_map(Result::err).unwrap();
    assert!(matches!(order_error(failure), OrderError::StockInsufficient { .. }));

    let level = orchestrator.inventory().stock_level("PART-X", "CENTRO").unwrap();
    assert_eq!(level.on_hand, 5);
    assert!(level.reserved <= level.on_hand);
}

#[test]
fn test_cancel_releases_reserved_stock() {
    let (_dir, orchestrator) = setup();
    orchestrator
        .inventory()
        .receive_stock("PART-X", "CENTRO", 3)
        .unwrap();
    let order_id = diagnosed_order(&orchestrator);
    orchestrator
        .reserve_material(
            &order_id,
            &technician(),
            ReservationInput {
                product_id: "PART-X".to_string(),
                quantity: 2,
                branch: None,
                estimated_use_at: Some(T2),
            },
        )
        .unwrap();
    assert_eq!(
        orchestrator.inventory().stock_level("PART-X", "CENTRO").unwrap().available(),
        1
    );

    advance(&orchestrator, &order_id, &reception(), OrderState::Cancelled, TransitionPayload::default());

    let level = orchestrator.inventory().stock_level("PART-X", "CENTRO").unwrap();
    assert_eq!((level.on_hand, level.reserved), (3, 0));
    let reservations = orchestrator.get_reservations(&order_id).unwrap();
    assert_eq!(reservations.len(), 1);
    assert_eq!(reservations[0].status, ReservationStatus::Released);
}

#[test]
fn test_specific_service_delivery_consumes_stock() {
    let (_dir, orchestrator) = setup();
    orchestrator
        .inventory()
        .receive_stock("PANEL-14", "NORTE", 2)
        .unwrap();

    let created = orchestrator
        .create_order(
            &reception(),
            NewOrder {
                branch: "norte".to_string(),
                service_kind: ServiceKind::SpecificService,
                reported_problem: "Cracked screen".to_string(),
                client_id: "client-7".to_string(),
                equipment_id: "eq-7".to_string(),
                technician_id: None,
                items: vec![LineItemInput::sku("SVC-SCREEN", 1)],
            },
        )
        .unwrap();
    let order_id = created.order.order_id;
    assert_eq!(created.order.folio, "NORTE-000001");
    assert_eq!(created.ledger.total, 1200.0);
    assert_eq!(created.ledger.advance_required, 600.0);

    advance(
        &orchestrator,
        &order_id,
        &technician(),
        OrderState::InDiagnosis,
        TransitionPayload {
            estimated_completion: Some(T1),
            ..Default::default()
        },
    );
    orchestrator
        .reserve_material(
            &order_id,
            &technician(),
            ReservationInput {
                product_id: "PANEL-14".to_string(),
                quantity: 1,
                branch: None,
                estimated_use_at: None,
            },
        )
        .unwrap();
    advance(
        &orchestrator,
        &order_id,
        &technician(),
        OrderState::ReadyForDelivery,
        TransitionPayload {
            work_performed: Some("Panel swapped".to_string()),
            ..Default::default()
        },
    );

    let level = orchestrator.inventory().stock_level("PANEL-14", "NORTE").unwrap();
    assert_eq!((level.on_hand, level.reserved), (1, 0));

    let delivered = orchestrator
        .apply_transition(
            &order_id,
            &reception(),
            OrderState::PaidAndDelivered,
            TransitionPayload {
                payment: Some(PaymentInput::new(PaymentMethod::Transfer, 1200.0)),
                ..Default::default()
            },
            None,
        )
        .unwrap();
    assert_eq!(delivered.order.state, OrderState::PaidAndDelivered);
    assert_eq!(delivered.ledger.balance, 0.0);
}

#[test]
fn test_orders_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.redb");
    let order_id = {
        let orchestrator = OrderOrchestrator::new(
            &path,
            Arc::new(InMemoryCatalog::new()),
            BranchPolicies::default(),
        )
        .unwrap();
        diagnosed_order(&orchestrator)
    };

    let reopened =
        OrderOrchestrator::new(&path, Arc::new(InMemoryCatalog::new()), BranchPolicies::default())
            .unwrap();
    let order = reopened.get_order(&order_id).unwrap().unwrap();
    assert_eq!(order.state, OrderState::DiagnosisCompleted);
    assert_eq!(order.total, 800.0);

    // Folio numbering continues where it stopped
    let next = reopened.create_order(&reception(), diagnosis_order()).unwrap();
    assert_eq!(next.order.folio, "CENTRO-000002");
}
