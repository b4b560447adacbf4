use super::*;
use crate::catalog::Catalog;
use crate::notify::MemorySink;
use rust_decimal_macros::dec;
use shared::models::{
    ComboComponent, ComboCreate, Customer, CustomerCreate, DiningTableCreate, Product,
    ProductCreate, ProductUpdate, StockItem, StockItemCreate, TableState,
};
use shared::order::PaymentMode;

/// Service over an in-memory ledger with a small seeded catalog
///
/// | 商品 | 价格 | 库存 |
/// |------|------|------|
/// | coffee | 1.50 | beans (10, min 2) |
/// | sandwich | 3.00 | - |
/// | juice | 1.00 | - |
/// | breakfast combo | 5.00 | sandwich + coffee + 2 juice |
struct Fixture {
    service: OrderService,
    catalog: Catalog,
    sink: Arc<MemorySink>,
    coffee: Product,
    sandwich: Product,
    juice: Product,
    combo_id: u64,
    beans: StockItem,
    table_id: u64,
    customer: Customer,
}

fn create_test_service() -> Fixture {
    create_test_service_with(ServiceSettings::default())
}

fn create_test_service_with(settings: ServiceSettings) -> Fixture {
    let store = LedgerStore::open_in_memory().unwrap();
    let sink = Arc::new(MemorySink::new());
    let service = OrderService::new(store.clone(), sink.clone(), settings);
    let catalog = Catalog::new(store);

    let beans = catalog
        .create_stock_item(StockItemCreate {
            name: "Coffee beans".into(),
            unit: "cup".into(),
            level: dec!(10),
            min_level: dec!(2),
        })
        .unwrap();
    let coffee = catalog
        .create_product(ProductCreate {
            name: "Coffee".into(),
            price: dec!(1.50),
            stock_item_id: Some(beans.id),
        })
        .unwrap();
    let sandwich = catalog
        .create_product(ProductCreate {
            name: "Sandwich".into(),
            price: dec!(3.00),
            stock_item_id: None,
        })
        .unwrap();
    let juice = catalog
        .create_product(ProductCreate {
            name: "Juice".into(),
            price: dec!(1.00),
            stock_item_id: None,
        })
        .unwrap();
    let combo = catalog
        .create_combo(ComboCreate {
            name: "Breakfast".into(),
            price: dec!(5.00),
            components: vec![
                ComboComponent {
                    product_id: sandwich.id,
                    quantity: 1,
                },
                ComboComponent {
                    product_id: coffee.id,
                    quantity: 1,
                },
                ComboComponent {
                    product_id: juice.id,
                    quantity: 2,
                },
            ],
        })
        .unwrap();
    let table = catalog
        .create_table(DiningTableCreate {
            name: "Mesa 1".into(),
            capacity: 4,
        })
        .unwrap();
    let customer = catalog
        .create_customer(CustomerCreate {
            name: "Empresa S.A.".into(),
            document_number: Some("0614-010190-101-1".into()),
            credit_limit: dec!(100),
            ..Default::default()
        })
        .unwrap();

    Fixture {
        service,
        catalog,
        sink,
        coffee,
        sandwich,
        juice,
        combo_id: combo.id,
        beans,
        table_id: table.id,
        customer,
    }
}

fn order_input(
    payment_mode: PaymentMode,
    table_id: Option<u64>,
    items: Vec<ItemInput>,
) -> CreateOrder {
    CreateOrder {
        table_id,
        operator: "Ana".into(),
        payment_mode,
        customer_name: None,
        note: None,
        items,
    }
}

impl Fixture {
    /// Counter order: prepaid, no table
    fn counter_order(&self, items: Vec<ItemInput>) -> OrderSnapshot {
        self.service
            .create_order(order_input(PaymentMode::Prepaid, None, items))
            .unwrap()
    }

    /// Dine-in order on the seeded table
    fn table_order(&self, items: Vec<ItemInput>) -> OrderSnapshot {
        self.service
            .create_order(order_input(PaymentMode::PayLater, Some(self.table_id), items))
            .unwrap()
    }

    fn table_state(&self) -> TableState {
        self.service.get_table(self.table_id).unwrap().state
    }

    fn beans_level(&self) -> Decimal {
        self.catalog.get_stock_item(self.beans.id).unwrap().level
    }

    /// Published `state_changed` transitions of one order
    fn transitions(&self, order_id: u64) -> Vec<(OrderState, OrderState)> {
        self.sink
            .events()
            .into_iter()
            .filter_map(|e| match e.notice {
                OrderNotice::StateChanged {
                    order_id: id,
                    from,
                    to,
                    ..
                } if id == order_id => Some((from, to)),
                _ => None,
            })
            .collect()
    }

    fn make_unavailable(&self, product_id: u64) {
        self.catalog
            .update_product(
                product_id,
                ProductUpdate {
                    available: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
    }
}
