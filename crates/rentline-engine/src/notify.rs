//! # Notifications
//!
//! Outbound hooks for the notification collaborator (e-mail, SMS, ...).
//!
//! ```text
//! RentalEngine::send / pay
//!      │
//!      ├── commit transaction
//!      │
//!      └── dispatch_* ──► spawn_blocking ──► Notifier::quotation_sent / order_paid
//!                                               │
//!                                               └── Err ──► warn!, transition stands
//! ```
//!
//! Dispatch happens after commit and is never awaited by the caller.

use std::sync::Arc;
use tracing::{info, warn};

use rentline_core::{Invoice, Order};

/// Receives lifecycle events worth telling a human about.
pub trait Notifier: Send + Sync {
    /// A quotation was sent to the customer.
    fn quotation_sent(&self, order: &Order) -> Result<(), String>;

    /// An order was paid.
    fn order_paid(&self, order: &Order, invoice: &Invoice) -> Result<(), String>;
}

/// Default notifier: records the event in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn quotation_sent(&self, order: &Order) -> Result<(), String> {
        info!(
            order = %order.number,
            customer_id = %order.customer_id,
            grand_total = %order.totals.grand_total,
            "Quotation sent"
        );
        Ok(())
    }

    fn order_paid(&self, order: &Order, invoice: &Invoice) -> Result<(), String> {
        info!(
            order = %order.number,
            invoice = %invoice.number,
            amount = %invoice.amount,
            "Order paid"
        );
        Ok(())
    }
}

pub(crate) fn dispatch_quotation_sent(notifier: &Arc<dyn Notifier>, order: &Order) {
    let notifier = Arc::clone(notifier);
    let order = order.clone();
    tokio::task::spawn_blocking(move || {
        if let Err(e) = notifier.quotation_sent(&order) {
            warn!(order_id = %order.id, error = %e, "quotation_sent notification failed");
        }
    });
}

pub(crate) fn dispatch_order_paid(notifier: &Arc<dyn Notifier>, order: &Order, invoice: &Invoice) {
    let notifier = Arc::clone(notifier);
    let order = order.clone();
    let invoice = invoice.clone();
    tokio::task::spawn_blocking(move || {
        if let Err(e) = notifier.order_paid(&order, &invoice) {
            warn!(order_id = %order.id, error = %e, "order_paid notification failed");
        }
    });
}
