//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::{Arc, Mutex};

use rentline_core::{
    Actor, Coupon, DiscountKind, DurationUnit, FixedClock, Invoice, Money, Order, Product,
};
use rentline_db::generate_id;
use rentline_engine::{CreateQuotation, EngineConfig, LineRequest, Notifier, RentalEngine};

pub const VENDOR: &str = "vendor-1";
pub const CUSTOMER: &str = "customer-1";

pub fn june(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, day, 0, 0, 0).unwrap()
}

/// May 31 2026, the day before every test window opens.
pub fn eve() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 31, 9, 0, 0).unwrap()
}

pub struct Harness {
    pub engine: RentalEngine,
    pub clock: Arc<FixedClock>,
    pub customer: Actor,
    pub vendor: Actor,
}

pub async fn harness() -> Harness {
    harness_with(EngineConfig::in_memory()).await
}

pub async fn harness_with(config: EngineConfig) -> Harness {
    let clock = Arc::new(FixedClock::new(eve()));
    let engine = RentalEngine::connect(config)
        .await
        .unwrap()
        .with_clock(clock.clone());

    Harness {
        engine,
        clock,
        customer: Actor::customer(CUSTOMER),
        vendor: Actor::vendor(VENDOR),
    }
}

impl Harness {
    /// Inserts an active per-day product owned by `VENDOR`.
    pub async fn product(&self, name: &str, stock: i64, price_cents: i64) -> Product {
        let product = Product {
            id: generate_id(),
            vendor_id: VENDOR.to_string(),
            name: name.to_string(),
            stock,
            price: Money::from_cents(price_cents),
            duration_unit: DurationUnit::Day,
            is_active: true,
            created_at: eve(),
            updated_at: eve(),
        };
        self.engine
            .database()
            .products()
            .insert(&product)
            .await
            .unwrap();
        product
    }

    pub async fn coupon(&self, code: &str, kind: DiscountKind, value: i64) {
        self.engine
            .database()
            .coupons()
            .upsert(&Coupon {
                code: code.to_string(),
                kind,
                value,
                is_active: true,
            })
            .await
            .unwrap();
    }

    /// A one-line quotation by `customer`.
    pub async fn quote_for(
        &self,
        customer: &Actor,
        product: &Product,
        quantity: i64,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Order {
        self.engine
            .create_quotation(
                customer,
                CreateQuotation {
                    lines: vec![LineRequest::new(&product.id, quantity, starts_at, ends_at)],
                    shipping: None,
                },
            )
            .await
            .unwrap()
    }

    pub async fn quote(
        &self,
        product: &Product,
        quantity: i64,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Order {
        self.quote_for(&self.customer, product, quantity, starts_at, ends_at)
            .await
    }

    /// A one-line order confirmed by the vendor.
    pub async fn confirmed(
        &self,
        product: &Product,
        quantity: i64,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Order {
        let order = self.quote(product, quantity, starts_at, ends_at).await;
        self.engine.confirm(&self.vendor, &order.id).await.unwrap()
    }

    pub async fn levels(&self, order_id: &str) -> Vec<rentline_core::CommitmentLevel> {
        self.engine
            .database()
            .reservations()
            .list_for_order(order_id)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.level)
            .collect()
    }
}

/// Records notifications instead of delivering them.
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Waits (real time) until `n` events have been recorded.
    pub async fn wait_for(&self, n: usize) -> Vec<String> {
        for _ in 0..100 {
            let events = self.events();
            if events.len() >= n {
                return events;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        self.events()
    }
}

impl Notifier for RecordingNotifier {
    fn quotation_sent(&self, order: &Order) -> Result<(), String> {
        self.events
            .lock()
            .unwrap()
            .push(format!("sent:{}", order.id));
        Ok(())
    }

    fn order_paid(&self, order: &Order, invoice: &Invoice) -> Result<(), String> {
        self.events
            .lock()
            .unwrap()
            .push(format!("paid:{}:{}", order.id, invoice.id));
        Err("smtp relay unreachable".to_string())
    }
}
