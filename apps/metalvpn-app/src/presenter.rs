use crate::balance::Balance;
use crate::models::{OperationRecord, PendingPayment};

/// Rendering side of the app. The core never draws anything itself; it hands
/// state to whatever implements this.
pub trait Presenter: Send + Sync {
    /// Payment details (wallet, memo, deep link) for the open top-up.
    fn show_payment(&self, payment: &PendingPayment);

    /// Blocking alert. Only used when a payment cannot be created.
    fn show_alert(&self, message: &str);

    fn show_balance(&self, balance: &Balance, history: &[OperationRecord]);

    fn payment_completed(&self, payment: &PendingPayment, balance: &Balance);
}

/// Presenter for headless runs; everything goes to the log.
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn show_payment(&self, payment: &PendingPayment) {
        tracing::info!(
            "Payment {} created: {} via {}, memo {}",
            payment.id,
            payment.amount,
            payment.method,
            payment.memo
        );
    }

    fn show_alert(&self, message: &str) {
        tracing::warn!("Alert: {}", message);
    }

    fn show_balance(&self, balance: &Balance, history: &[OperationRecord]) {
        tracing::info!("Balance {} ({} operations)", balance.total, history.len());
    }

    fn payment_completed(&self, payment: &PendingPayment, balance: &Balance) {
        tracing::info!(
            "Payment {} completed, balance now {}",
            payment.id,
            balance.total
        );
    }
}
