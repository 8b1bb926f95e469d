//! # Invoice Lifecycle
//!
//! ```text
//! create_invoice ──► unpaid ──pay (via RentalEngine::pay)──► paid
//!                       │
//!                       └──void_invoice──► void
//! ```
//!
//! Invoice mutations lock the owning order first, so they serialize with
//! `pay` and `cancel` on the same order. Voiding never touches reservations.

use tracing::info;

use crate::engine::{found, RentalEngine};
use crate::error::{EngineError, EngineResult};
use crate::lifecycle::ownership;
use rentline_core::{
    authorize, Actor, CoreError, Invoice, InvoiceEvent, InvoiceStatus, Operation, OrderStatus,
};
use rentline_db::{generate_id, DbError, InvoiceRepository, OrderRepository};

impl RentalEngine {
    /// Issues an unpaid invoice for a confirmed order.
    pub async fn create_invoice(&self, actor: &Actor, order_id: &str) -> EngineResult<Invoice> {
        let invoice = self
            .retrying("create_invoice", || async {
                let (mut tx, order) =
                    self.lock_order(actor, Operation::CreateInvoice, order_id).await?;

                match order.status {
                    OrderStatus::SalesOrder
                    | OrderStatus::Paid
                    | OrderStatus::PickedUp
                    | OrderStatus::Returned => {}
                    OrderStatus::Quotation
                    | OrderStatus::QuotationSent
                    | OrderStatus::Cancelled => {
                        return Err(EngineError::from(CoreError::invalid_transition(
                            "Order",
                            order.status,
                            "create invoice",
                        )));
                    }
                }

                if InvoiceRepository::fetch_for_order(&mut tx, &order.id)
                    .await?
                    .is_some()
                {
                    return Err(CoreError::DuplicateInvoice {
                        order_id: order.id.clone(),
                    }
                    .into());
                }

                let now = self.clock.now();
                let mut invoice = Invoice {
                    id: generate_id(),
                    number: String::new(),
                    order_id: order.id.clone(),
                    amount: order.totals.grand_total,
                    status: InvoiceStatus::Unpaid,
                    payment_date: None,
                    payment_method: None,
                    created_at: now,
                    updated_at: now,
                };

                InvoiceRepository::insert(&mut tx, &mut invoice)
                    .await
                    .map_err(|e| match e {
                        DbError::UniqueViolation { ref field, .. } if field == "invoices.order_id" => {
                            EngineError::from(CoreError::DuplicateInvoice {
                                order_id: order.id.clone(),
                            })
                        }
                        other => EngineError::from(other),
                    })?;
                tx.commit().await.map_err(DbError::from)?;
                Ok(invoice)
            })
            .await?;

        info!(
            invoice_id = %invoice.id,
            number = %invoice.number,
            order_id = %invoice.order_id,
            amount = %invoice.amount,
            "Invoice created"
        );
        Ok(invoice)
    }

    /// Voids an unpaid invoice. The order's reservations are untouched.
    pub async fn void_invoice(&self, actor: &Actor, invoice_id: &str) -> EngineResult<Invoice> {
        let invoice = self
            .retrying("void_invoice", || async {
                let mut tx = self.db.begin().await?;
                let order_id = OrderRepository::lock_by_invoice(&mut tx, invoice_id).await?;
                let order =
                    found(OrderRepository::load(&mut tx, &order_id).await?, "Order", &order_id)?;
                authorize(actor, Operation::VoidInvoice, Some(ownership(&order)))?;

                let mut invoice = found(
                    InvoiceRepository::fetch(&mut tx, invoice_id).await?,
                    "Invoice",
                    invoice_id,
                )?;
                invoice.status = invoice.status.apply(InvoiceEvent::Void)?;
                invoice.updated_at = self.clock.now();
                InvoiceRepository::update(&mut tx, &invoice).await?;
                tx.commit().await.map_err(DbError::from)?;
                Ok(invoice)
            })
            .await?;

        info!(invoice_id = %invoice.id, number = %invoice.number, "Invoice voided");
        Ok(invoice)
    }

    pub async fn get_invoice(&self, actor: &Actor, invoice_id: &str) -> EngineResult<Invoice> {
        let invoice = found(self.db.invoices().get(invoice_id).await?, "Invoice", invoice_id)?;
        let order = found(
            self.db.orders().get(&invoice.order_id).await?,
            "Order",
            &invoice.order_id,
        )?;
        authorize(actor, Operation::ViewInvoice, Some(ownership(&order)))?;
        Ok(invoice)
    }

    /// The order's invoice, if one has been issued.
    pub async fn get_invoice_for_order(
        &self,
        actor: &Actor,
        order_id: &str,
    ) -> EngineResult<Option<Invoice>> {
        let order = found(self.db.orders().get(order_id).await?, "Order", order_id)?;
        authorize(actor, Operation::ViewInvoice, Some(ownership(&order)))?;
        Ok(self.db.invoices().get_for_order(order_id).await?)
    }
}
