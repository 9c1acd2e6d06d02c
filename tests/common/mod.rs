use std::sync::Arc;

use chrono::NaiveDate;
use storefront_orderservice::{
    api::catalog::FixedStockValidator,
    bus::{EventPublisher, memory::MemoryEventBus},
    service::OrderService,
    store::memory::MemoryStore,
};
use uuid::Uuid;

pub struct TestHarness {
    pub service: OrderService,
    pub store: MemoryStore,
    pub stock: Arc<FixedStockValidator>,
    pub bus: Arc<MemoryEventBus>,
}

pub fn harness() -> TestHarness {
    let store = MemoryStore::new();
    let stock = Arc::new(FixedStockValidator::new());
    let bus = Arc::new(MemoryEventBus::new());
    let publisher = EventPublisher::new(bus.clone(), "OrderService");
    let service = OrderService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        stock.clone(),
        publisher,
    );
    TestHarness {
        service,
        store,
        stock,
        bus,
    }
}

pub fn promise_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()
}

pub async fn create_order(harness: &TestHarness, user_id: i32, total_amount: f32) -> Uuid {
    harness
        .service
        .create_order(user_id, "1 Main St".to_string(), total_amount, promise_date())
        .await
        .expect("order creation must succeed")
}
