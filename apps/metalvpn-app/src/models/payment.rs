use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const NANOTONS_PER_TON: u64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "telegram-stars", alias = "starsPay")]
    TelegramStars,
    #[serde(rename = "ton-ton", alias = "tonCoin")]
    TonCoin,
    #[serde(rename = "usdt-ton", alias = "usdtTon")]
    UsdtTon,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::TelegramStars,
        PaymentMethod::TonCoin,
        PaymentMethod::UsdtTon,
    ];

    /// Name used on the wire and in the local cache.
    pub fn as_wire(&self) -> &'static str {
        match self {
            PaymentMethod::TelegramStars => "telegram-stars",
            PaymentMethod::TonCoin => "ton-ton",
            PaymentMethod::UsdtTon => "usdt-ton",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentMethod::TelegramStars => "Telegram Stars",
            PaymentMethod::TonCoin => "TON-TON",
            PaymentMethod::UsdtTon => "USDT-TON",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "telegram-stars" | "starsPay" => Ok(PaymentMethod::TelegramStars),
            "ton-ton" | "tonCoin" => Ok(PaymentMethod::TonCoin),
            "usdt-ton" | "usdtTon" => Ok(PaymentMethod::UsdtTon),
            other => Err(format!("unknown payment method: {}", other)),
        }
    }
}

/// A created top-up that is waiting for the on-chain transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingPayment {
    pub id: String,
    pub memo: String,
    pub amount: u64,
    pub wallet_address: String,
    pub method: PaymentMethod,
    pub ton_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PendingPayment {
    /// Deep link the wallet app should open. Falls back to building the
    /// `ton://transfer` link when the backend did not send one.
    pub fn transfer_url(&self) -> String {
        if let Some(url) = self.ton_url.as_deref().filter(|u| !u.is_empty()) {
            return url.to_string();
        }
        format!(
            "ton://transfer/{}?amount={}&text={}",
            self.wallet_address,
            self.amount.saturating_mul(NANOTONS_PER_TON),
            urlencoding::encode(&self.memo)
        )
    }
}

/// Lifecycle of the single top-up a session may have in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentState {
    Idle,
    AwaitingPayment(PendingPayment),
    Completed(PendingPayment),
}

impl PaymentState {
    pub fn pending(&self) -> Option<&PendingPayment> {
        match self {
            PaymentState::AwaitingPayment(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, PaymentState::Idle)
    }
}
