//! 信用额度并发测试
//!
//! 额度 100.00，已用 90.00；同时提交 15.00 与 5.00 两笔赊账，
//! 只能有一笔通过，15.00 必须失败。

use order_engine::{Catalog, LedgerStore, MemorySink, OrderError, OrderService, ServiceSettings};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::models::{CustomerCreate, ProductCreate};
use shared::order::{CreateOrder, ItemInput, OrderState, PaymentMode};
use std::sync::{Arc, Barrier};

struct Setup {
    _dir: tempfile::TempDir,
    service: OrderService,
    customer_id: u64,
    big_order: u64,
    small_order: u64,
}

fn counter_order(service: &OrderService, product_id: u64) -> u64 {
    counter_order_lines(service, product_id, 1)
}

/// One billing line per unit; IVA is rounded per line
fn counter_order_lines(service: &OrderService, product_id: u64, lines: usize) -> u64 {
    service
        .create_order(CreateOrder {
            table_id: None,
            operator: "caja".into(),
            payment_mode: PaymentMode::Prepaid,
            customer_name: None,
            note: None,
            items: vec![ItemInput::product(product_id, 1); lines],
        })
        .unwrap()
        .id()
}

fn product(catalog: &Catalog, name: &str, price: Decimal) -> u64 {
    catalog
        .create_product(ProductCreate {
            name: name.into(),
            price,
            stock_item_id: None,
        })
        .unwrap()
        .id
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

    let customer_id = catalog
        .create_customer(CustomerCreate {
            name: "Cooperativa".into(),
            credit_limit: dec!(100.00),
            ..Default::default()
        })
        .unwrap()
        .id;

    // 79.65 + 10.35 IVA = 90.00
    let banquet = product(&catalog, "Banquete", dec!(79.65));
    // 13.27 + 1.73 IVA = 15.00
    let platter = product(&catalog, "Parrillada", dec!(13.27));
    // 2 × (2.21 + 0.29 IVA) = 5.00
    let soup = product(&catalog, "Sopa", dec!(2.21));

    let prior = counter_order(&service, banquet);
    service
        .register_credit_sale(prior, customer_id, dec!(90.00))
        .unwrap();

    Setup {
        big_order: counter_order(&service, platter),
        small_order: counter_order_lines(&service, soup, 2),
        _dir: dir,
        service,
        customer_id,
    }
}

#[test]
fn test_big_sale_first_sees_ten_available() {
    let s = setup();
    assert_eq!(
        s.service.get_order(s.small_order).unwrap().order.total,
        dec!(5.00)
    );

    let err = s
        .service
        .register_credit_sale(s.big_order, s.customer_id, dec!(15.00))
        .unwrap_err();
    match err {
        OrderError::InsufficientCredit {
            customer_id,
            available,
            requested,
        } => {
            assert_eq!(customer_id, s.customer_id);
            assert_eq!(available, dec!(10.00));
            assert_eq!(requested, dec!(15.00));
        }
        other => panic!("expected credit rejection, got {other:?}"),
    }

    let snapshot = s
        .service
        .register_credit_sale(s.small_order, s.customer_id, dec!(5.00))
        .unwrap();
    assert_eq!(snapshot.order.state, OrderState::Credit);
    let summary = s.service.credit_summary(s.customer_id).unwrap();
    assert_eq!(summary.utilized, dec!(95.00));
    assert_eq!(summary.available, dec!(5.00));
}

#[test]
fn test_concurrent_credit_admission_respects_ceiling() {
    for _ in 0..20 {
        let s = setup();
        let barrier = Barrier::new(2);

        let (big, small) = std::thread::scope(|scope| {
            let big = scope.spawn(|| {
                barrier.wait();
                s.service
                    .register_credit_sale(s.big_order, s.customer_id, dec!(15.00))
            });
            let small = scope.spawn(|| {
                barrier.wait();
                s.service
                    .register_credit_sale(s.small_order, s.customer_id, dec!(5.00))
            });
            (big.join().unwrap(), small.join().unwrap())
        });

        assert!(small.is_ok(), "small sale must fit: {:?}", small.err());
        match big {
            Err(OrderError::InsufficientCredit {
                available,
                requested,
                ..
            }) => {
                assert_eq!(requested, dec!(15.00));
                // 取决于哪一笔先提交
                assert!(
                    available == dec!(10.00) || available == dec!(5.00),
                    "unexpected available {available}"
                );
            }
            other => panic!("big sale must be rejected, got {other:?}"),
        }

        let summary = s.service.credit_summary(s.customer_id).unwrap();
        assert_eq!(summary.utilized, dec!(95.00));
        assert!(summary.utilized <= summary.ceiling);

        let big_state = s.service.get_order(s.big_order).unwrap().order.state;
        assert_eq!(big_state, OrderState::PendingPayment);
    }
}

#[test]
fn test_concurrent_admissions_never_exceed_ceiling() {
    let s = setup();
    let catalog = Catalog::new(s.service.store().clone());
    // 0.88 + 0.11 IVA = 0.99; only ten fit into the remaining 10.00
    let snack = product(&catalog, "Pan", dec!(0.88));
    let orders: Vec<u64> = (0..30).map(|_| counter_order(&s.service, snack)).collect();
    let total = s.service.get_order(orders[0]).unwrap().order.total;
    assert_eq!(total, dec!(0.99));

    let barrier = Barrier::new(orders.len());
    let admitted = std::thread::scope(|scope| {
        let handles: Vec<_> = orders
            .iter()
            .map(|&order_id| {
                let barrier = &barrier;
                let service = &s.service;
                let customer_id = s.customer_id;
                scope.spawn(move || {
                    barrier.wait();
                    service.register_credit_sale(order_id, customer_id, total)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| r.is_ok())
            .count()
    });

    assert_eq!(admitted, 10);
    let summary = s.service.credit_summary(s.customer_id).unwrap();
    assert!(summary.utilized <= summary.ceiling);
    assert_eq!(
        summary.utilized,
        dec!(90.00) + total * Decimal::from(admitted as u64)
    );
}
