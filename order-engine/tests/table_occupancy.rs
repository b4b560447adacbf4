//! 桌台占用并发测试
//!
//! 同一张桌上的多笔订单由不同收银员同时结账或取消，
//! 最后一笔结束时桌台必须变为空闲，只要还有一笔活动订单就保持占用。

use order_engine::{Catalog, LedgerStore, MemorySink, OrderService, ServiceSettings};
use rust_decimal_macros::dec;
use shared::models::{DiningTableCreate, ProductCreate, TableState};
use shared::order::{CreateOrder, ItemInput, OrderState, PaymentMode, Settlement};
use std::sync::{Arc, Barrier};

struct Setup {
    _dir: tempfile::TempDir,
    service: OrderService,
    table_id: u64,
    product_id: u64,
}

fn setup() -> Setup {
    let dir = tempfile::tempdir().unwrap();
    let store = LedgerStore::open(dir.path().join("orders.redb")).unwrap();
    let service = OrderService::new(
        store.clone(),
        Arc::new(MemorySink::new()),
        ServiceSettings::default(),
    );
    let catalog = Catalog::new(store);
    let table_id = catalog
        .create_table(DiningTableCreate {
            name: "Terraza 2".into(),
            capacity: 8,
        })
        .unwrap()
        .id;
    let product_id = catalog
        .create_product(ProductCreate {
            name: "Casamiento".into(),
            price: dec!(3.50),
            stock_item_id: None,
        })
        .unwrap()
        .id;
    Setup {
        _dir: dir,
        service,
        table_id,
        product_id,
    }
}

impl Setup {
    fn open_orders(&self, n: usize) -> Vec<u64> {
        (0..n)
            .map(|_| {
                self.service
                    .create_order(CreateOrder {
                        table_id: Some(self.table_id),
                        operator: "mesero".into(),
                        payment_mode: PaymentMode::PayLater,
                        customer_name: None,
                        note: None,
                        items: vec![ItemInput::product(self.product_id, 1)],
                    })
                    .unwrap()
                    .id()
            })
            .collect()
    }

    fn table_state(&self) -> TableState {
        self.service.get_table(self.table_id).unwrap().state
    }

    /// End every order at once from its own thread: even ones are paid
    /// (pay-later closes on payment), odd ones are cancelled
    fn finish_concurrently(&self, orders: &[u64]) {
        let barrier = Barrier::new(orders.len());
        std::thread::scope(|scope| {
            let handles: Vec<_> = orders
                .iter()
                .enumerate()
                .map(|(i, &order_id)| {
                    let barrier = &barrier;
                    let service = &self.service;
                    scope.spawn(move || {
                        barrier.wait();
                        if i % 2 == 0 {
                            service.settle_payment(order_id, Settlement::default())
                        } else {
                            service.transition(order_id, OrderState::Cancelled)
                        }
                    })
                })
                .collect();
            for handle in handles {
                let snapshot = handle.join().unwrap().unwrap();
                assert!(snapshot.order.state.is_terminal());
            }
        });
    }
}

#[test]
fn test_last_sibling_frees_table_under_concurrency() {
    for _ in 0..20 {
        let s = setup();
        let orders = s.open_orders(6);
        assert_eq!(s.table_state(), TableState::Occupied);

        s.finish_concurrently(&orders);

        assert_eq!(s.table_state(), TableState::Free);
        for order_id in orders {
            assert!(s.service.get_order(order_id).unwrap().order.state.is_terminal());
        }
    }
}

#[test]
fn test_table_stays_occupied_while_a_sibling_is_active() {
    for _ in 0..20 {
        let s = setup();
        let mut orders = s.open_orders(5);
        let remaining = orders.pop().unwrap();

        s.finish_concurrently(&orders);
        assert_eq!(s.table_state(), TableState::Occupied);
        assert_eq!(
            s.service.get_order(remaining).unwrap().order.state,
            OrderState::InTable
        );

        s.service
            .settle_payment(remaining, Settlement::default())
            .unwrap();
        assert_eq!(s.table_state(), TableState::Free);
    }
}

#[test]
fn test_new_order_racing_closures_keeps_table_occupied() {
    for _ in 0..20 {
        let s = setup();
        let orders = s.open_orders(4);
        let barrier = Barrier::new(orders.len() + 1);

        let opened = std::thread::scope(|scope| {
            for &order_id in &orders {
                let barrier = &barrier;
                let service = &s.service;
                scope.spawn(move || {
                    barrier.wait();
                    service
                        .transition(order_id, OrderState::Cancelled)
                        .unwrap();
                });
            }
            let opener = scope.spawn(|| {
                barrier.wait();
                s.open_orders(1)[0]
            });
            opener.join().unwrap()
        });

        // 新订单无论先后提交，桌台都必须保持占用
        assert_eq!(s.table_state(), TableState::Occupied);
        assert_eq!(
            s.service.get_order(opened).unwrap().order.state,
            OrderState::InTable
        );
    }
}
