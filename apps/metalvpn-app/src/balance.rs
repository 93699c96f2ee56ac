use serde::Serialize;

use crate::models::{Direction, OperationRecord, PaymentMethod};

/// Wallet totals folded from the operation history. There is no stored
/// balance anywhere; this is recomputed from the list every time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Balance {
    pub total: i64,
    pub telegram_stars: u64,
    pub ton_coin: u64,
    pub usdt_ton: u64,
}

impl Balance {
    /// Sums saturate, so a damaged cache can skew the figures but never
    /// panic.
    pub fn from_operations(ops: &[OperationRecord]) -> Self {
        ops.iter().fold(Self::default(), |mut acc, op| {
            let amount = i64::try_from(op.amount).unwrap_or(i64::MAX);
            match op.direction {
                Direction::Credit => {
                    acc.total = acc.total.saturating_add(amount);
                    let bucket = match op.method {
                        Some(PaymentMethod::TelegramStars) => &mut acc.telegram_stars,
                        Some(PaymentMethod::TonCoin) => &mut acc.ton_coin,
                        Some(PaymentMethod::UsdtTon) => &mut acc.usdt_ton,
                        None => return acc,
                    };
                    *bucket = bucket.saturating_add(op.amount);
                }
                Direction::Debit => acc.total = acc.total.saturating_sub(amount),
            }
            acc
        })
    }

    pub fn for_method(&self, method: PaymentMethod) -> u64 {
        match method {
            PaymentMethod::TelegramStars => self.telegram_stars,
            PaymentMethod::TonCoin => self.ton_coin,
            PaymentMethod::UsdtTon => self.usdt_ton,
        }
    }
}
