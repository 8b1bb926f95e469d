//! # Order Lifecycle
//!
//! Every operation that moves an order through its states.
//!
//! ## Transaction Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  retrying(op, || async {                                                │
//! │      let mut tx = db.begin()                                            │
//! │      OrderRepository::lock(&mut tx, id)   ← write lock, first statement │
//! │      OrderRepository::load(&mut tx, id)                                 │
//! │      authorize(actor, op, owner)          ← Err drops tx: rollback      │
//! │      status.apply(event)                  ← Err drops tx: rollback      │
//! │      ...reads, capacity checks, writes...                               │
//! │      tx.commit()                                                        │
//! │  })                                                                     │
//! │  notify (after commit, never awaited)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Taking the write lock before any capacity read serializes overlapping
//! confirms: the second one sees the first one's committed intervals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

use crate::availability::validate_claim;
use crate::engine::{found, RentalEngine};
use crate::error::{EngineError, EngineResult};
use crate::notify::{dispatch_order_paid, dispatch_quotation_sent};
use rentline_core::availability::{counted_claims, plan_commit, ProductCapacity};
use rentline_core::pricing::late_fee;
use rentline_core::validation::{
    normalize_coupon_code, validate_line_count, validate_shipping_cents,
};
use rentline_core::{
    authorize, Actor, CommitmentLevel, CoreError, Invoice, InvoiceEvent, InvoiceStatus, Money,
    Operation, Order, OrderEvent, OrderLine, OrderStatus, Ownership, PaymentMethod, Product,
    ReservationInterval, Totals, VariantSelection,
};
use rentline_db::{
    generate_id, CouponRepository, DbError, InvoiceRepository, OrderRepository,
    ProductRepository, ReservationRepository, Tx,
};

// =============================================================================
// Requests & Receipts
// =============================================================================

/// One line of a quotation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: String,
    pub quantity: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub variants: Vec<VariantSelection>,
}

impl LineRequest {
    pub fn new(
        product_id: impl Into<String>,
        quantity: i64,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Self {
        LineRequest {
            product_id: product_id.into(),
            quantity,
            starts_at,
            ends_at,
            variants: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQuotation {
    pub lines: Vec<LineRequest>,
    /// Falls back to `pricing.default_shipping_cents`.
    #[serde(default)]
    pub shipping: Option<Money>,
}

/// Result of [`RentalEngine::pay`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub order: Order,
    pub invoice: Invoice,
}

/// Result of [`RentalEngine::return_items`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnReceipt {
    pub order: Order,
    /// Total late fee charged; also stored in `order.totals.late_fee`.
    pub late_fee: Money,
}

pub(crate) fn ownership(order: &Order) -> Ownership<'_> {
    Ownership {
        customer_id: &order.customer_id,
        vendor_id: &order.vendor_id,
    }
}

/// Recomputes the breakdown from what the order stores.
fn reprice(order: &mut Order) {
    order.totals = Totals::compute(
        &order.lines,
        order.tax_rate,
        order.discount.as_ref(),
        order.totals.shipping,
        order.totals.late_fee,
    );
}

/// A fresh line snapshotting `product`, holding a provisional interval.
fn build_line(
    order_id: &str,
    position: i64,
    product: &Product,
    request: &LineRequest,
    now: DateTime<Utc>,
) -> OrderLine {
    let line_id = generate_id();
    OrderLine {
        id: line_id.clone(),
        order_id: order_id.to_string(),
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        quantity: request.quantity,
        unit_price: product.price,
        duration_unit: product.duration_unit,
        starts_at: request.starts_at,
        ends_at: request.ends_at,
        variants: request.variants.clone(),
        position,
        reservation: ReservationInterval {
            id: generate_id(),
            order_id: order_id.to_string(),
            order_line_id: line_id,
            product_id: product.id.clone(),
            quantity: request.quantity,
            starts_at: request.starts_at,
            ends_at: request.ends_at,
            level: CommitmentLevel::Provisional,
            created_at: now,
            updated_at: now,
        },
    }
}

impl RentalEngine {
    // =========================================================================
    // Shared steps
    // =========================================================================

    /// Opens a write transaction, locks and loads the order, and checks that
    /// `actor` may perform `op` on it.
    pub(crate) async fn lock_order(
        &self,
        actor: &Actor,
        op: Operation,
        order_id: &str,
    ) -> EngineResult<(Tx, Order)> {
        let mut tx = self.db.begin().await?;
        OrderRepository::lock(&mut tx, order_id).await?;
        let order = found(OrderRepository::load(&mut tx, order_id).await?, "Order", order_id)?;
        authorize(actor, op, Some(ownership(&order)))?;
        Ok((tx, order))
    }

    /// Loads a rentable product from the catalog.
    async fn rentable_product(&self, product_id: &str) -> EngineResult<Product> {
        let product = found(
            self.db.products().get_by_id(product_id).await?,
            "Product",
            product_id,
        )?;
        if !product.is_active {
            return Err(CoreError::ProductInactive(product.id).into());
        }
        Ok(product)
    }

    /// Moves every interval of `order` that `event` applies to.
    async fn move_reservations(
        tx: &mut Tx,
        order: &mut Order,
        event: OrderEvent,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        for line in &mut order.lines {
            let interval = &mut line.reservation;
            if event == OrderEvent::Cancel && interval.level == CommitmentLevel::Released {
                continue;
            }
            interval.level = interval.level.apply(event)?;
            interval.updated_at = now;
            ReservationRepository::set_level(&mut **tx, &interval.id, interval.level, now).await?;
        }
        Ok(())
    }

    // =========================================================================
    // Quotation
    // =========================================================================

    /// Creates a quotation owned by `actor`.
    ///
    /// Lines hold provisional intervals: nothing is checked against capacity
    /// until [`confirm`](Self::confirm).
    pub async fn create_quotation(
        &self,
        actor: &Actor,
        request: CreateQuotation,
    ) -> EngineResult<Order> {
        authorize(actor, Operation::CreateQuotation, None)?;
        validate_line_count(request.lines.len()).map_err(CoreError::from)?;

        let shipping = request
            .shipping
            .unwrap_or_else(|| self.config.pricing.default_shipping());
        validate_shipping_cents(shipping.cents()).map_err(CoreError::from)?;

        let now = self.clock.now();
        for line in &request.lines {
            validate_claim(line.quantity, line.starts_at, line.ends_at, now)?;
        }

        // Catalog reads happen on the pool, before the write transaction.
        let mut products: HashMap<String, Product> = HashMap::new();
        for line in &request.lines {
            if !products.contains_key(&line.product_id) {
                let product = self.rentable_product(&line.product_id).await?;
                products.insert(product.id.clone(), product);
            }
        }

        let order_id = generate_id();
        let mut vendor_id: Option<&str> = None;
        let mut lines = Vec::with_capacity(request.lines.len());
        for (position, line) in request.lines.iter().enumerate() {
            let product = found(products.get(&line.product_id), "Product", &line.product_id)?;
            match vendor_id {
                None => vendor_id = Some(&product.vendor_id),
                Some(first) if first != product.vendor_id => {
                    return Err(CoreError::MixedVendors {
                        first: first.to_string(),
                        second: product.vendor_id.clone(),
                    }
                    .into());
                }
                Some(_) => {}
            }
            lines.push(build_line(&order_id, position as i64, product, line, now));
        }

        let tax_rate = self.config.pricing.tax_rate();
        let totals = Totals::compute(&lines, tax_rate, None, shipping, Money::zero());

        let draft = Order {
            id: order_id,
            number: String::new(),
            customer_id: actor.id.clone(),
            vendor_id: vendor_id.unwrap_or_default().to_string(),
            status: OrderStatus::Quotation,
            lines,
            tax_rate,
            discount: None,
            totals,
            created_at: now,
            updated_at: now,
            confirmed_at: None,
            paid_at: None,
            picked_up_at: None,
            returned_at: None,
            cancelled_at: None,
        };

        let order = self
            .retrying("create_quotation", || {
                let mut order = draft.clone();
                async move {
                    let mut tx = self.db.begin().await?;
                    OrderRepository::insert(&mut tx, &mut order).await?;
                    tx.commit().await.map_err(DbError::from)?;
                    Ok::<_, EngineError>(order)
                }
            })
            .await?;

        info!(
            order_id = %order.id,
            number = %order.number,
            lines = order.lines.len(),
            grand_total = %order.totals.grand_total,
            "Quotation created"
        );
        Ok(order)
    }

    /// Adds a line (with a provisional interval) to a quotation.
    pub async fn add_line(
        &self,
        actor: &Actor,
        order_id: &str,
        request: LineRequest,
    ) -> EngineResult<Order> {
        let now = self.clock.now();
        validate_claim(request.quantity, request.starts_at, request.ends_at, now)?;
        let product = self.rentable_product(&request.product_id).await?;

        let order = self
            .retrying("add_line", || {
                self.add_line_once(actor, order_id, &product, &request, now)
            })
            .await?;

        info!(order_id = %order.id, product_id = %product.id, "Line added");
        Ok(order)
    }

    async fn add_line_once(
        &self,
        actor: &Actor,
        order_id: &str,
        product: &Product,
        request: &LineRequest,
        now: DateTime<Utc>,
    ) -> EngineResult<Order> {
        let (mut tx, mut order) = self.lock_order(actor, Operation::AddLine, order_id).await?;
        order.status.apply(OrderEvent::EditLines)?;
        validate_line_count(order.lines.len() + 1).map_err(CoreError::from)?;

        if product.vendor_id != order.vendor_id {
            return Err(CoreError::MixedVendors {
                first: order.vendor_id.clone(),
                second: product.vendor_id.clone(),
            }
            .into());
        }

        let position = order.lines.iter().map(|l| l.position + 1).max().unwrap_or(0);
        let line = build_line(&order.id, position, product, request, now);
        OrderRepository::insert_line(&mut tx, &line).await?;
        order.lines.push(line);

        reprice(&mut order);
        order.updated_at = now;
        OrderRepository::update(&mut tx, &order).await?;
        tx.commit().await.map_err(DbError::from)?;
        Ok(order)
    }

    /// Removes a line, and its provisional interval, from a quotation.
    ///
    /// The last line cannot be removed; cancel the order instead.
    pub async fn remove_line(
        &self,
        actor: &Actor,
        order_id: &str,
        line_id: &str,
    ) -> EngineResult<Order> {
        let order = self
            .retrying("remove_line", || async {
                let (mut tx, mut order) =
                    self.lock_order(actor, Operation::RemoveLine, order_id).await?;
                order.status.apply(OrderEvent::EditLines)?;
                found(order.line(line_id), "OrderLine", line_id)?;
                validate_line_count(order.lines.len() - 1).map_err(CoreError::from)?;

                OrderRepository::delete_line(&mut tx, &order.id, line_id).await?;
                order.lines.retain(|l| l.id != line_id);

                reprice(&mut order);
                order.updated_at = self.clock.now();
                OrderRepository::update(&mut tx, &order).await?;
                tx.commit().await.map_err(DbError::from)?;
                Ok(order)
            })
            .await?;

        info!(order_id = %order.id, line_id = %line_id, "Line removed");
        Ok(order)
    }

    /// Applies a coupon to a quotation, replacing any previous one.
    ///
    /// Re-applying the code already on the order returns it unchanged, in
    /// any status.
    pub async fn apply_coupon(&self, actor: &Actor, order_id: &str, code: &str) -> EngineResult<Order> {
        let code = normalize_coupon_code(code).map_err(CoreError::from)?;

        self.retrying("apply_coupon", || async {
            let (mut tx, mut order) =
                self.lock_order(actor, Operation::ApplyCoupon, order_id).await?;

            if order.discount.as_ref().is_some_and(|d| d.code == code) {
                debug!(order_id = %order.id, code = %code, "Coupon already applied");
                return Ok(order);
            }

            order.status.apply(OrderEvent::ApplyCoupon)?;
            let coupon = CouponRepository::fetch_active(&mut tx, &code)
                .await?
                .ok_or_else(|| CoreError::CouponNotFound(code.clone()))?;

            order.discount = Some(coupon.to_discount());
            reprice(&mut order);
            order.updated_at = self.clock.now();
            OrderRepository::update(&mut tx, &order).await?;
            tx.commit().await.map_err(DbError::from)?;

            info!(
                order_id = %order.id,
                code = %code,
                discount = %order.totals.discount,
                "Coupon applied"
            );
            Ok(order)
        })
        .await
    }

    /// Sends a quotation to its customer.
    pub async fn send(&self, actor: &Actor, order_id: &str) -> EngineResult<Order> {
        let order = self
            .retrying("send", || async {
                let (mut tx, mut order) = self.lock_order(actor, Operation::Send, order_id).await?;
                order.status = order.status.apply(OrderEvent::Send)?;
                order.updated_at = self.clock.now();
                OrderRepository::update(&mut tx, &order).await?;
                tx.commit().await.map_err(DbError::from)?;
                Ok(order)
            })
            .await?;

        info!(order_id = %order.id, number = %order.number, "Quotation sent");
        dispatch_quotation_sent(&self.notifier, &order);
        Ok(order)
    }

    // =========================================================================
    // Confirm
    // =========================================================================

    /// Turns a quotation into a sales order, committing every line's
    /// capacity or none of it.
    ///
    /// ## Flow
    /// ```text
    /// lock order ──► stock + committed/active claims of other orders
    ///      │              (per product, over the order's whole span)
    ///      ▼
    /// plan_commit(lines) ──► Err(shortfalls) ──► InsufficientStock, rollback
    ///      │
    ///      ▼ Ok
    /// provisional ──► committed for every line, status = sales_order, commit
    /// ```
    pub async fn confirm(&self, actor: &Actor, order_id: &str) -> EngineResult<Order> {
        let result = self
            .retrying("confirm", || self.confirm_once(actor, order_id))
            .await;

        match &result {
            Ok(order) => info!(order_id = %order.id, number = %order.number, "Order confirmed"),
            Err(e) => {
                if let Some(shortfalls) = e.shortfalls() {
                    info!(
                        order_id = %order_id,
                        failing_lines = shortfalls.len(),
                        "Confirm rejected: insufficient stock"
                    );
                }
            }
        }
        result
    }

    async fn confirm_once(&self, actor: &Actor, order_id: &str) -> EngineResult<Order> {
        let (mut tx, mut order) = self.lock_order(actor, Operation::Confirm, order_id).await?;
        order.status = order.status.apply(OrderEvent::Confirm)?;

        let product_ids: BTreeSet<&str> =
            order.lines.iter().map(|l| l.product_id.as_str()).collect();

        let mut capacity: HashMap<String, ProductCapacity> = HashMap::new();
        for product_id in product_ids {
            let span = order
                .lines
                .iter()
                .filter(|l| l.product_id == product_id)
                .map(|l| (l.starts_at, l.ends_at))
                .reduce(|(s1, e1), (s2, e2)| (s1.min(s2), e1.max(e2)));
            let Some((start, end)) = span else {
                continue;
            };

            let product = found(
                ProductRepository::fetch(&mut tx, product_id).await?,
                "Product",
                product_id,
            )?;
            let claims = ReservationRepository::fetch_capacity_claims(
                &mut tx,
                product_id,
                start,
                end,
                Some(order.id.as_str()),
            )
            .await?;

            debug!(
                product_id = %product_id,
                stock = product.stock,
                claims = claims.len(),
                "Capacity snapshot"
            );
            capacity.insert(
                product_id.to_string(),
                ProductCapacity {
                    stock: product.stock,
                    claims: counted_claims(&claims),
                },
            );
        }

        plan_commit(&order.lines, &capacity)
            .map_err(|shortfalls| CoreError::InsufficientStock { shortfalls })?;

        let now = self.clock.now();
        Self::move_reservations(&mut tx, &mut order, OrderEvent::Confirm, now).await?;
        order.confirmed_at = Some(now);
        order.updated_at = now;
        OrderRepository::update(&mut tx, &order).await?;
        tx.commit().await.map_err(DbError::from)?;
        Ok(order)
    }

    // =========================================================================
    // Payment, Pickup, Return
    // =========================================================================

    /// Records payment of a sales order.
    ///
    /// Paying an order that is already paid returns the existing invoice
    /// unchanged.
    pub async fn pay(
        &self,
        actor: &Actor,
        order_id: &str,
        method: PaymentMethod,
    ) -> EngineResult<PaymentReceipt> {
        let (receipt, newly_paid) = self
            .retrying("pay", || self.pay_once(actor, order_id, method))
            .await?;

        if newly_paid {
            info!(
                order_id = %receipt.order.id,
                invoice = %receipt.invoice.number,
                method = %method,
                "Order paid"
            );
            dispatch_order_paid(&self.notifier, &receipt.order, &receipt.invoice);
        } else {
            debug!(order_id = %receipt.order.id, "Order already paid");
        }
        Ok(receipt)
    }

    async fn pay_once(
        &self,
        actor: &Actor,
        order_id: &str,
        method: PaymentMethod,
    ) -> EngineResult<(PaymentReceipt, bool)> {
        let (mut tx, mut order) = self.lock_order(actor, Operation::Pay, order_id).await?;
        let existing = InvoiceRepository::fetch_for_order(&mut tx, &order.id).await?;

        if order.status.is_paid() {
            let invoice = found(existing, "Invoice", &order.id)?;
            return Ok((PaymentReceipt { order, invoice }, false));
        }

        order.status = order.status.apply(OrderEvent::Pay)?;
        let now = self.clock.now();

        let invoice = match existing {
            Some(mut invoice) => {
                invoice.status = invoice.status.apply(InvoiceEvent::Pay)?;
                invoice.payment_date = Some(now);
                invoice.payment_method = Some(method);
                invoice.updated_at = now;
                InvoiceRepository::update(&mut tx, &invoice).await?;
                invoice
            }
            None => {
                let mut invoice = Invoice {
                    id: generate_id(),
                    number: String::new(),
                    order_id: order.id.clone(),
                    amount: order.totals.grand_total,
                    status: InvoiceStatus::Paid,
                    payment_date: Some(now),
                    payment_method: Some(method),
                    created_at: now,
                    updated_at: now,
                };
                InvoiceRepository::insert(&mut tx, &mut invoice).await?;
                invoice
            }
        };

        order.paid_at = Some(now);
        order.updated_at = now;
        OrderRepository::update(&mut tx, &order).await?;
        tx.commit().await.map_err(DbError::from)?;
        Ok((PaymentReceipt { order, invoice }, true))
    }

    /// Records that the customer collected the items.
    pub async fn pickup(&self, actor: &Actor, order_id: &str) -> EngineResult<Order> {
        let order = self
            .retrying("pickup", || async {
                let (mut tx, mut order) =
                    self.lock_order(actor, Operation::Pickup, order_id).await?;
                order.status = order.status.apply(OrderEvent::Pickup)?;

                let now = self.clock.now();
                Self::move_reservations(&mut tx, &mut order, OrderEvent::Pickup, now).await?;
                order.picked_up_at = Some(now);
                order.updated_at = now;
                OrderRepository::update(&mut tx, &order).await?;
                tx.commit().await.map_err(DbError::from)?;
                Ok(order)
            })
            .await?;

        info!(order_id = %order.id, number = %order.number, "Order picked up");
        Ok(order)
    }

    /// Records the return of every item at `returned_at`, releasing capacity
    /// and charging late fees for lines returned after their end.
    pub async fn return_items(
        &self,
        actor: &Actor,
        order_id: &str,
        returned_at: DateTime<Utc>,
    ) -> EngineResult<ReturnReceipt> {
        let receipt = self
            .retrying("return_items", || async {
                let (mut tx, mut order) =
                    self.lock_order(actor, Operation::ReturnItems, order_id).await?;
                order.status = order.status.apply(OrderEvent::Return)?;

                if let Some(picked_up_at) = order.picked_up_at {
                    if returned_at < picked_up_at {
                        return Err(EngineError::from(CoreError::invalid_range(format!(
                            "return at {} precedes pickup at {}",
                            returned_at.to_rfc3339(),
                            picked_up_at.to_rfc3339()
                        ))));
                    }
                }

                let fee = late_fee(
                    &order.lines,
                    returned_at,
                    self.config.pricing.late_fee_multiplier(),
                );

                let now = self.clock.now();
                Self::move_reservations(&mut tx, &mut order, OrderEvent::Return, now).await?;
                order.totals.late_fee = fee;
                reprice(&mut order);
                order.returned_at = Some(returned_at);
                order.updated_at = now;
                OrderRepository::update(&mut tx, &order).await?;
                tx.commit().await.map_err(DbError::from)?;
                Ok(ReturnReceipt {
                    order,
                    late_fee: fee,
                })
            })
            .await?;

        info!(
            order_id = %receipt.order.id,
            late_fee = %receipt.late_fee,
            grand_total = %receipt.order.totals.grand_total,
            "Order returned"
        );
        Ok(receipt)
    }

    // =========================================================================
    // Cancel
    // =========================================================================

    /// Cancels an unpaid order, releasing its reservations and voiding an
    /// unpaid invoice.
    pub async fn cancel(&self, actor: &Actor, order_id: &str) -> EngineResult<Order> {
        let order = self
            .retrying("cancel", || async {
                let (mut tx, mut order) =
                    self.lock_order(actor, Operation::Cancel, order_id).await?;
                order.status = order.status.apply(OrderEvent::Cancel)?;

                let now = self.clock.now();
                Self::move_reservations(&mut tx, &mut order, OrderEvent::Cancel, now).await?;

                if let Some(mut invoice) =
                    InvoiceRepository::fetch_for_order(&mut tx, &order.id).await?
                {
                    if invoice.status == InvoiceStatus::Unpaid {
                        invoice.status = invoice.status.apply(InvoiceEvent::Void)?;
                        invoice.updated_at = now;
                        InvoiceRepository::update(&mut tx, &invoice).await?;
                        debug!(invoice_id = %invoice.id, "Voided invoice of cancelled order");
                    }
                }

                order.cancelled_at = Some(now);
                order.updated_at = now;
                OrderRepository::update(&mut tx, &order).await?;
                tx.commit().await.map_err(DbError::from)?;
                Ok(order)
            })
            .await?;

        info!(order_id = %order.id, number = %order.number, "Order cancelled");
        Ok(order)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_order(&self, actor: &Actor, order_id: &str) -> EngineResult<Order> {
        let order = found(self.db.orders().get(order_id).await?, "Order", order_id)?;
        authorize(actor, Operation::ViewOrder, Some(ownership(&order)))?;
        Ok(order)
    }

    /// Orders of `customer_id`, newest first.
    pub async fn list_orders_for_customer(
        &self,
        actor: &Actor,
        customer_id: &str,
    ) -> EngineResult<Vec<Order>> {
        authorize(
            actor,
            Operation::ListOrders,
            Some(Ownership {
                customer_id,
                vendor_id: "",
            }),
        )?;
        Ok(self.db.orders().list_for_customer(customer_id).await?)
    }
}
