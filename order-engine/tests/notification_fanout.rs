//! 通知推送 / 轮询集成测试

use order_engine::notify::{HubConfig, spawn_hub};
use order_engine::{Catalog, LedgerStore, OrderService, ServiceSettings};
use rust_decimal_macros::dec;
use shared::message::{NotificationEvent, Role, Room};
use shared::models::{DiningTableCreate, ProductCreate};
use shared::order::{CreateOrder, ItemInput, OrderState, PaymentMode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

async fn next_kind(receiver: &mut mpsc::Receiver<NotificationEvent>) -> Option<&'static str> {
    tokio::time::timeout(Duration::from_millis(500), receiver.recv())
        .await
        .ok()
        .flatten()
        .map(|e| e.notice.kind())
}

fn drain(receiver: &mut mpsc::Receiver<NotificationEvent>) -> Vec<&'static str> {
    let mut kinds = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        kinds.push(event.notice.kind());
    }
    kinds
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_role_scoped_push_and_poll_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let store = LedgerStore::open(dir.path().join("orders.redb")).unwrap();
    let hub = spawn_hub(HubConfig::default());
    let service = OrderService::new(
        store.clone(),
        Arc::new(hub.clone()),
        ServiceSettings::default(),
    );
    let catalog = Catalog::new(store);
    let table = catalog
        .create_table(DiningTableCreate {
            name: "Terraza 2".into(),
            capacity: 2,
        })
        .unwrap();
    let pupusa = catalog
        .create_product(ProductCreate {
            name: "Pupusa revuelta".into(),
            price: dec!(0.75),
            stock_item_id: None,
        })
        .unwrap();

    let mut kitchen = hub.register(Role::Kitchen, "cocina").await.unwrap();
    let mut waiter = hub.register(Role::Waitstaff, "mesero").await.unwrap();
    let mut manager = hub.register(Role::Manager, "gerente").await.unwrap();

    let order_id = service
        .create_order(CreateOrder {
            table_id: Some(table.id),
            operator: "mesero".into(),
            payment_mode: PaymentMode::PayLater,
            customer_name: None,
            note: None,
            items: vec![ItemInput::product(pupusa.id, 4)],
        })
        .unwrap()
        .id();

    assert_eq!(next_kind(&mut kitchen.receiver).await, Some("new_order"));
    assert_eq!(next_kind(&mut manager.receiver).await, Some("new_order"));

    // the waiter follows this order
    assert!(hub.subscribe(waiter.id, Room::Order(order_id)).await.unwrap());

    service.transition(order_id, OrderState::InKitchen).unwrap();
    service.transition(order_id, OrderState::Ready).unwrap();

    // state_changed(in_kitchen) via order room, then state_changed(ready) and
    // order_ready; one copy each even though two rooms match
    assert_eq!(next_kind(&mut waiter.receiver).await, Some("state_changed"));
    assert_eq!(next_kind(&mut waiter.receiver).await, Some("state_changed"));
    assert_eq!(next_kind(&mut waiter.receiver).await, Some("order_ready"));
    assert!(drain(&mut waiter.receiver).is_empty());

    // kitchen only hears about in_kitchen
    assert_eq!(next_kind(&mut kitchen.receiver).await, Some("state_changed"));
    assert!(drain(&mut kitchen.receiver).is_empty());

    // poll clients: kitchen ring + general ring
    let polled = hub.poll(Role::Kitchen).await.unwrap();
    let kinds: Vec<_> = polled.events.iter().map(|e| e.notice.kind()).collect();
    assert_eq!(kinds, vec!["new_order", "state_changed", "state_changed"]);
    assert_eq!(polled.total, 3);

    let polled = hub.poll(Role::Waitstaff).await.unwrap();
    assert!(
        polled
            .events
            .iter()
            .any(|e| e.notice.kind() == "order_ready")
    );

    // outside the five minute window nothing is returned
    let later = shared::util::now_millis() + 6 * 60 * 1000;
    let polled = hub.poll_at(Role::Kitchen, later).await.unwrap();
    assert!(polled.events.is_empty());
    assert_eq!(polled.total, 0);

    hub.shutdown().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dead_connection_does_not_fail_orders() {
    let dir = tempfile::tempdir().unwrap();
    let store = LedgerStore::open(dir.path().join("orders.redb")).unwrap();
    let hub = spawn_hub(HubConfig {
        push_buffer: 1,
        ..Default::default()
    });
    let service = OrderService::new(
        store.clone(),
        Arc::new(hub.clone()),
        ServiceSettings::default(),
    );
    let catalog = Catalog::new(store);
    let coffee = catalog
        .create_product(ProductCreate {
            name: "Café".into(),
            price: dec!(1.25),
            stock_item_id: None,
        })
        .unwrap();

    let registrations = (0..8).map(|i| hub.register(Role::Kitchen, format!("kds-{i}")));
    let connections: Vec<_> = futures::future::join_all(registrations)
        .await
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(hub.stats().await.unwrap().connections, 8);

    // half of the displays go away without disconnecting
    let (alive, gone): (Vec<_>, Vec<_>) = connections.into_iter().partition(|c| {
        let first = c.id.as_bytes()[0];
        first % 2 == 0
    });
    let gone_count = gone.len();
    drop(gone);

    // slow consumers: the second event overflows push_buffer = 1
    for _ in 0..2 {
        service
            .create_order(CreateOrder {
                table_id: None,
                operator: "caja".into(),
                payment_mode: PaymentMode::Prepaid,
                customer_name: None,
                note: None,
                items: vec![ItemInput::product(coffee.id, 1)],
            })
            .unwrap();
    }

    let stats = hub.stats().await.unwrap();
    assert_eq!(stats.connections, 8 - gone_count);
    assert_eq!(stats.buffered.get("kitchen"), Some(&2));

    for mut connection in alive {
        assert_eq!(drain(&mut connection.receiver), vec!["new_order"]);
    }

    hub.shutdown().unwrap();
}
