//! Lifecycle properties: atomicity, idempotence, release, pricing, access.

mod common;

use std::sync::Arc;

use common::{harness, june, RecordingNotifier, CUSTOMER, VENDOR};
use rentline_core::{
    Actor, CommitmentLevel, CoreError, DiscountKind, InvoiceStatus, Money, OrderStatus,
    PaymentMethod, Totals, ValidationError, MAX_SHIPPING_CENTS,
};
use rentline_engine::{CreateQuotation, EngineError, LineRequest};

fn is_invalid_transition(err: &EngineError) -> bool {
    matches!(err, EngineError::Domain(CoreError::InvalidTransition { .. }))
}

fn is_unauthorized(err: &EngineError) -> bool {
    matches!(err, EngineError::Domain(CoreError::Unauthorized { .. }))
}

// =============================================================================
// Confirm
// =============================================================================

#[tokio::test]
async fn test_failed_confirm_leaves_every_line_provisional() {
    let h = harness().await;
    let camera = h.product("Camera", 2, 3500).await;
    let table = h.product("Table", 40, 300).await;

    // Tables fit, cameras do not.
    let order = h
        .engine
        .create_quotation(
            &h.customer,
            CreateQuotation {
                lines: vec![
                    LineRequest::new(&table.id, 10, june(1), june(3)),
                    LineRequest::new(&camera.id, 3, june(1), june(3)),
                ],
                shipping: None,
            },
        )
        .await
        .unwrap();

    let err = h.engine.confirm(&h.vendor, &order.id).await.unwrap_err();
    let shortfalls = err.shortfalls().unwrap();
    assert_eq!(shortfalls.len(), 1);
    assert_eq!(shortfalls[0].product_id, camera.id);

    assert_eq!(
        h.levels(&order.id).await,
        vec![CommitmentLevel::Provisional, CommitmentLevel::Provisional]
    );
    let reloaded = h.engine.get_order(&h.customer, &order.id).await.unwrap();
    assert_eq!(reloaded.status, OrderStatus::Quotation);
    assert_eq!(reloaded.confirmed_at, None);

    // Nothing was taken from the tables either.
    let tables = h
        .engine
        .check_availability(&h.customer, &table.id, 40, june(1), june(3))
        .await
        .unwrap();
    assert!(tables.is_available);
}

#[tokio::test]
async fn test_lines_of_one_order_cannot_jointly_overbook() {
    let h = harness().await;
    let tent = h.product("Tent", 4, 1500).await;

    let order = h
        .engine
        .create_quotation(
            &h.customer,
            CreateQuotation {
                lines: vec![
                    LineRequest::new(&tent.id, 3, june(1), june(4)),
                    LineRequest::new(&tent.id, 2, june(3), june(6)),
                ],
                shipping: None,
            },
        )
        .await
        .unwrap();

    let err = h.engine.confirm(&h.vendor, &order.id).await.unwrap_err();
    let shortfalls = err.shortfalls().unwrap();
    assert_eq!(shortfalls.len(), 1);
    assert_eq!(shortfalls[0].line_id, order.lines[1].id);
    assert_eq!(shortfalls[0].available, 1);
}

#[tokio::test]
async fn test_confirm_from_sent_quotation() {
    let h = harness().await;
    let tent = h.product("Tent", 4, 1500).await;
    let order = h.quote(&tent, 1, june(1), june(2)).await;

    let sent = h.engine.send(&h.vendor, &order.id).await.unwrap();
    assert_eq!(sent.status, OrderStatus::QuotationSent);

    let confirmed = h.engine.confirm(&h.vendor, &order.id).await.unwrap();
    assert_eq!(confirmed.status, OrderStatus::SalesOrder);
    assert!(confirmed.confirmed_at.is_some());
    assert_eq!(h.levels(&order.id).await, vec![CommitmentLevel::Committed]);

    // Confirming twice is not a no-op
    let err = h.engine.confirm(&h.vendor, &order.id).await.unwrap_err();
    assert!(is_invalid_transition(&err));
}

// =============================================================================
// Pay
// =============================================================================

#[tokio::test]
async fn test_pay_is_idempotent() {
    let h = harness().await;
    let tent = h.product("Tent", 4, 1500).await;
    let order = h.confirmed(&tent, 2, june(1), june(3)).await;

    let first = h
        .engine
        .pay(&h.customer, &order.id, PaymentMethod::Card)
        .await
        .unwrap();
    assert_eq!(first.order.status, OrderStatus::Paid);
    assert_eq!(first.invoice.status, InvoiceStatus::Paid);
    assert_eq!(first.invoice.payment_method, Some(PaymentMethod::Card));
    assert_eq!(first.invoice.payment_date, Some(common::eve()));
    assert_eq!(first.invoice.amount, order.totals.grand_total);

    let second = h
        .engine
        .pay(&h.customer, &order.id, PaymentMethod::Cash)
        .await
        .unwrap();
    assert_eq!(second.invoice, first.invoice);
    assert_eq!(second.order.status, OrderStatus::Paid);

    // Still idempotent after pickup
    h.engine.pickup(&h.vendor, &order.id).await.unwrap();
    let third = h
        .engine
        .pay(&h.customer, &order.id, PaymentMethod::Cash)
        .await
        .unwrap();
    assert_eq!(third.invoice.id, first.invoice.id);
    assert_eq!(third.order.status, OrderStatus::PickedUp);
}

#[tokio::test]
async fn test_pay_marks_existing_unpaid_invoice() {
    let h = harness().await;
    let tent = h.product("Tent", 4, 1500).await;
    let order = h.confirmed(&tent, 1, june(1), june(3)).await;

    let issued = h.engine.create_invoice(&h.vendor, &order.id).await.unwrap();
    let receipt = h
        .engine
        .pay(&h.customer, &order.id, PaymentMethod::BankTransfer)
        .await
        .unwrap();

    assert_eq!(receipt.invoice.id, issued.id);
    assert_eq!(receipt.invoice.number, issued.number);
    assert_eq!(receipt.invoice.status, InvoiceStatus::Paid);
}

#[tokio::test]
async fn test_second_invoice_for_order_is_rejected() {
    let h = harness().await;
    let tent = h.product("Tent", 4, 1500).await;
    let order = h.confirmed(&tent, 1, june(1), june(3)).await;

    let issued = h.engine.create_invoice(&h.vendor, &order.id).await.unwrap();
    let err = h
        .engine
        .create_invoice(&h.vendor, &order.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Domain(CoreError::DuplicateInvoice { ref order_id }) if *order_id == order.id
    ));

    // Payment settles the invoice that was issued first
    let receipt = h
        .engine
        .pay(&h.customer, &order.id, PaymentMethod::Cash)
        .await
        .unwrap();
    assert_eq!(receipt.invoice.id, issued.id);
    assert_eq!(receipt.invoice.status, InvoiceStatus::Paid);

    // Still exactly one invoice, now paid
    let stored = h
        .engine
        .get_invoice_for_order(&h.customer, &order.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.id, issued.id);
    assert_eq!(stored.status, InvoiceStatus::Paid);
    assert!(matches!(
        h.engine.create_invoice(&h.vendor, &order.id).await,
        Err(EngineError::Domain(CoreError::DuplicateInvoice { .. }))
    ));
}

#[tokio::test]
async fn test_quotation_cannot_be_paid() {
    let h = harness().await;
    let tent = h.product("Tent", 4, 1500).await;
    let order = h.quote(&tent, 1, june(1), june(3)).await;

    let err = h
        .engine
        .pay(&h.customer, &order.id, PaymentMethod::Card)
        .await
        .unwrap_err();
    assert!(is_invalid_transition(&err));
    assert!(h
        .engine
        .get_invoice_for_order(&h.customer, &order.id)
        .await
        .unwrap()
        .is_none());
}

// =============================================================================
// Release
// =============================================================================

#[tokio::test]
async fn test_return_frees_capacity() {
    let h = harness().await;
    let van = h.product("Van", 1, 180_000).await;

    let order = h.confirmed(&van, 1, june(1), june(10)).await;
    h.engine
        .pay(&h.customer, &order.id, PaymentMethod::Card)
        .await
        .unwrap();
    h.engine.pickup(&h.vendor, &order.id).await.unwrap();
    assert_eq!(h.levels(&order.id).await, vec![CommitmentLevel::Active]);

    let during = h
        .engine
        .check_availability(&h.customer, &van.id, 1, june(4), june(6))
        .await
        .unwrap();
    assert_eq!(during.available_units, 0);

    // Returned early
    h.engine
        .return_items(&h.vendor, &order.id, june(3))
        .await
        .unwrap();

    let after = h
        .engine
        .check_availability(&h.customer, &van.id, 1, june(4), june(6))
        .await
        .unwrap();
    assert_eq!(after.available_units, 1);
    h.confirmed(&van, 1, june(4), june(6)).await;
}

#[tokio::test]
async fn test_cancel_releases_and_voids_unpaid_invoice() {
    let h = harness().await;
    let tent = h.product("Tent", 2, 1500).await;

    let order = h.confirmed(&tent, 2, june(1), june(3)).await;
    let invoice = h.engine.create_invoice(&h.vendor, &order.id).await.unwrap();

    let cancelled = h.engine.cancel(&h.customer, &order.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());
    assert_eq!(h.levels(&order.id).await, vec![CommitmentLevel::Released]);

    let invoice = h.engine.get_invoice(&h.vendor, &invoice.id).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Void);

    // Capacity is back
    h.confirmed(&tent, 2, june(1), june(3)).await;
}

#[tokio::test]
async fn test_paid_order_cannot_be_cancelled() {
    let h = harness().await;
    let tent = h.product("Tent", 2, 1500).await;
    let order = h.confirmed(&tent, 1, june(1), june(3)).await;
    h.engine
        .pay(&h.customer, &order.id, PaymentMethod::Card)
        .await
        .unwrap();

    let err = h.engine.cancel(&h.customer, &order.id).await.unwrap_err();
    assert!(is_invalid_transition(&err));
    assert_eq!(h.levels(&order.id).await, vec![CommitmentLevel::Committed]);
}

#[tokio::test]
async fn test_pickup_requires_payment() {
    let h = harness().await;
    let tent = h.product("Tent", 2, 1500).await;
    let order = h.confirmed(&tent, 1, june(1), june(3)).await;

    let err = h.engine.pickup(&h.vendor, &order.id).await.unwrap_err();
    assert!(is_invalid_transition(&err));
    assert_eq!(h.levels(&order.id).await, vec![CommitmentLevel::Committed]);
}

// =============================================================================
// Pricing
// =============================================================================

#[tokio::test]
async fn test_stored_totals_recompute_exactly() {
    let h = harness().await;
    h.coupon("FLAT5", DiscountKind::Fixed, 500).await;
    let mic = h.product("Microphone", 10, 599).await;
    let screen = h.product("Screen", 3, 901).await;

    let order = h
        .engine
        .create_quotation(
            &h.customer,
            CreateQuotation {
                lines: vec![
                    LineRequest::new(&mic.id, 3, june(1), june(2)),
                    LineRequest::new(&screen.id, 1, june(1), june(3)),
                ],
                shipping: Some(Money::from_cents(1250)),
            },
        )
        .await
        .unwrap();
    h.engine
        .apply_coupon(&h.customer, &order.id, "flat5")
        .await
        .unwrap();
    h.engine.confirm(&h.vendor, &order.id).await.unwrap();
    h.engine
        .pay(&h.customer, &order.id, PaymentMethod::Card)
        .await
        .unwrap();
    h.engine.pickup(&h.vendor, &order.id).await.unwrap();
    h.engine
        .return_items(&h.vendor, &order.id, june(4))
        .await
        .unwrap();

    let stored = h.engine.get_order(&h.customer, &order.id).await.unwrap();
    let recomputed = Totals::compute(
        &stored.lines,
        stored.tax_rate,
        stored.discount.as_ref(),
        stored.totals.shipping,
        stored.totals.late_fee,
    );
    assert_eq!(recomputed, stored.totals);

    assert_eq!(stored.totals.subtotal, Money::from_cents(3 * 599 + 901));
    assert_eq!(stored.totals.discount, Money::from_cents(500));
    assert_eq!(stored.totals.shipping, Money::from_cents(1250));
    // mic: 2 days late, screen: 1 day late
    assert_eq!(stored.totals.late_fee, Money::from_cents(2 * 599 + 901));
}

#[tokio::test]
async fn test_new_coupon_replaces_old_until_confirmed() {
    let h = harness().await;
    h.coupon("WELCOME10", DiscountKind::Percent, 1000).await;
    h.coupon("SUMMER20", DiscountKind::Percent, 2000).await;
    let chairs = h.product("Chair", 10, 500).await;
    let order = h.quote(&chairs, 2, june(1), june(2)).await;

    h.engine
        .apply_coupon(&h.customer, &order.id, "WELCOME10")
        .await
        .unwrap();
    let replaced = h
        .engine
        .apply_coupon(&h.customer, &order.id, "SUMMER20")
        .await
        .unwrap();
    assert_eq!(replaced.discount.as_ref().unwrap().code, "SUMMER20");
    assert_eq!(replaced.totals.discount, Money::from_cents(200));

    let err = h
        .engine
        .apply_coupon(&h.customer, &order.id, "NOPE")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Domain(CoreError::CouponNotFound(_))
    ));

    h.engine.confirm(&h.vendor, &order.id).await.unwrap();

    // Same code stays a no-op; a new one is a transition error
    let same = h
        .engine
        .apply_coupon(&h.customer, &order.id, "SUMMER20")
        .await
        .unwrap();
    assert_eq!(same.totals.discount, Money::from_cents(200));
    let err = h
        .engine
        .apply_coupon(&h.customer, &order.id, "WELCOME10")
        .await
        .unwrap_err();
    assert!(is_invalid_transition(&err));
}

// =============================================================================
// Quotation editing
// =============================================================================

#[tokio::test]
async fn test_add_and_remove_lines_reprice() {
    let h = harness().await;
    let tent = h.product("Tent", 4, 1500).await;
    let chair = h.product("Chair", 100, 50).await;
    let order = h.quote(&tent, 1, june(1), june(3)).await;

    let grown = h
        .engine
        .add_line(
            &h.customer,
            &order.id,
            LineRequest::new(&chair.id, 8, june(1), june(3)),
        )
        .await
        .unwrap();
    assert_eq!(grown.lines.len(), 2);
    assert_eq!(grown.lines[1].position, 1);
    assert_eq!(grown.totals.subtotal, Money::from_cents(1500 + 400));
    assert_eq!(
        h.levels(&order.id).await,
        vec![CommitmentLevel::Provisional, CommitmentLevel::Provisional]
    );

    let tent_line = grown.lines[0].id.clone();
    let shrunk = h
        .engine
        .remove_line(&h.customer, &order.id, &tent_line)
        .await
        .unwrap();
    assert_eq!(shrunk.lines.len(), 1);
    assert_eq!(shrunk.totals.subtotal, Money::from_cents(400));
    assert_eq!(h.levels(&order.id).await.len(), 1);

    // The last line stays
    let last = shrunk.lines[0].id.clone();
    let err = h
        .engine
        .remove_line(&h.customer, &order.id, &last)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Domain(CoreError::Validation(_))));

    let err = h
        .engine
        .remove_line(&h.customer, &order.id, "no-such-line")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[tokio::test]
async fn test_confirmed_order_lines_are_frozen() {
    let h = harness().await;
    let tent = h.product("Tent", 4, 1500).await;
    let order = h.confirmed(&tent, 1, june(1), june(3)).await;

    let err = h
        .engine
        .add_line(
            &h.customer,
            &order.id,
            LineRequest::new(&tent.id, 1, june(1), june(3)),
        )
        .await
        .unwrap_err();
    assert!(is_invalid_transition(&err));
}

#[tokio::test]
async fn test_quotation_input_validation() {
    let h = harness().await;
    let tent = h.product("Tent", 4, 1500).await;

    let quote = |lines: Vec<LineRequest>| {
        h.engine.create_quotation(
            &h.customer,
            CreateQuotation {
                lines,
                shipping: None,
            },
        )
    };

    // Past start
    let last_week = june(1) - chrono::Duration::days(5);
    let err = quote(vec![LineRequest::new(&tent.id, 1, last_week, june(2))])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Domain(CoreError::InvalidRange { .. })));

    // Empty window
    let err = quote(vec![LineRequest::new(&tent.id, 1, june(2), june(2))])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Domain(CoreError::InvalidRange { .. })));

    // No lines
    let err = quote(vec![]).await.unwrap_err();
    assert!(matches!(err, EngineError::Domain(CoreError::Validation(_))));

    // Unknown product
    let err = quote(vec![LineRequest::new("missing", 1, june(1), june(2))])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));

    // Shipping beyond the cap is rejected instead of overflowing the totals
    for cents in [MAX_SHIPPING_CENTS + 1, i64::MAX] {
        let err = h
            .engine
            .create_quotation(
                &h.customer,
                CreateQuotation {
                    lines: vec![LineRequest::new(&tent.id, 1, june(1), june(2))],
                    shipping: Some(Money::from_cents(cents)),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    let order = h
        .engine
        .create_quotation(
            &h.customer,
            CreateQuotation {
                lines: vec![LineRequest::new(&tent.id, 1, june(1), june(2))],
                shipping: Some(Money::from_cents(MAX_SHIPPING_CENTS)),
            },
        )
        .await
        .unwrap();
    assert_eq!(order.totals.shipping, Money::from_cents(MAX_SHIPPING_CENTS));
    assert!(order.totals.grand_total > Money::zero());
}

#[tokio::test]
async fn test_one_vendor_per_order() {
    let h = harness().await;
    let tent = h.product("Tent", 4, 1500).await;
    let mut other = tent.clone();
    other.id = rentline_db::generate_id();
    other.vendor_id = "vendor-2".to_string();
    h.engine.database().products().insert(&other).await.unwrap();

    let err = h
        .engine
        .create_quotation(
            &h.customer,
            CreateQuotation {
                lines: vec![
                    LineRequest::new(&tent.id, 1, june(1), june(2)),
                    LineRequest::new(&other.id, 1, june(1), june(2)),
                ],
                shipping: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Domain(CoreError::MixedVendors { .. })
    ));
}

// =============================================================================
// Authorization
// =============================================================================

#[tokio::test]
async fn test_only_owners_may_act() {
    let h = harness().await;
    let tent = h.product("Tent", 4, 1500).await;
    let order = h.quote(&tent, 1, june(1), june(3)).await;
    assert_eq!(order.customer_id, CUSTOMER);
    assert_eq!(order.vendor_id, VENDOR);

    let stranger = Actor::customer("customer-2");
    let rival = Actor::vendor("vendor-2");

    // Customers cannot confirm, even their own orders
    let err = h.engine.confirm(&h.customer, &order.id).await.unwrap_err();
    assert!(is_unauthorized(&err));

    let err = h.engine.confirm(&rival, &order.id).await.unwrap_err();
    assert!(is_unauthorized(&err));

    let err = h.engine.get_order(&stranger, &order.id).await.unwrap_err();
    assert!(is_unauthorized(&err));

    let err = h
        .engine
        .list_orders_for_customer(&stranger, CUSTOMER)
        .await
        .unwrap_err();
    assert!(is_unauthorized(&err));

    // Vendors cannot create quotations
    let err = h
        .engine
        .create_quotation(
            &h.vendor,
            CreateQuotation {
                lines: vec![LineRequest::new(&tent.id, 1, june(1), june(3))],
                shipping: None,
            },
        )
        .await
        .unwrap_err();
    assert!(is_unauthorized(&err));

    // No state change from rejected calls
    let reloaded = h.engine.get_order(&h.vendor, &order.id).await.unwrap();
    assert_eq!(reloaded.status, OrderStatus::Quotation);

    // Admin may do anything
    let admin = Actor::admin("ops");
    let confirmed = h.engine.confirm(&admin, &order.id).await.unwrap();
    assert_eq!(confirmed.status, OrderStatus::SalesOrder);

    let mine = h
        .engine
        .list_orders_for_customer(&h.customer, CUSTOMER)
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
}

// =============================================================================
// Notifications
// =============================================================================

#[tokio::test]
async fn test_notifications_fire_after_commit() {
    let h = harness().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = h.engine.clone().with_notifier(notifier.clone());
    let tent = h.product("Tent", 4, 1500).await;
    let order = h.quote(&tent, 1, june(1), june(3)).await;

    engine.send(&h.vendor, &order.id).await.unwrap();
    engine.confirm(&h.vendor, &order.id).await.unwrap();

    // order_paid fails inside the notifier; payment still stands
    let receipt = engine
        .pay(&h.customer, &order.id, PaymentMethod::Card)
        .await
        .unwrap();

    let mut events = notifier.wait_for(2).await;
    events.sort();
    assert_eq!(
        events,
        vec![
            format!("paid:{}:{}", order.id, receipt.invoice.id),
            format!("sent:{}", order.id),
        ]
    );
    let reloaded = engine.get_order(&h.customer, &order.id).await.unwrap();
    assert_eq!(reloaded.status, OrderStatus::Paid);

    // Idempotent pay does not notify again
    engine
        .pay(&h.customer, &order.id, PaymentMethod::Card)
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(notifier.events().len(), 2);
}
