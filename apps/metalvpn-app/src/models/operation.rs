use chrono::{Local, NaiveDate};
use metalvpn_shared::api::ApiOperation;
use metalvpn_shared::payment::STATUS_COMPLETED;
use serde::{Deserialize, Serialize};

use crate::models::payment::PaymentMethod;

pub const DATE_FORMAT: &str = "%d.%m.%Y";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationKind {
    TopUp,
    Subscription,
    Other(String),
}

impl OperationKind {
    /// The backend still labels rows in Russian; both spellings are accepted.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "top_up" | "topup" | "Пополнение" => OperationKind::TopUp,
            "subscription" | "Подписка" => OperationKind::Subscription,
            other => OperationKind::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            OperationKind::TopUp => "top_up",
            OperationKind::Subscription => "subscription",
            OperationKind::Other(s) => s,
        }
    }

    pub fn default_direction(&self) -> Direction {
        match self {
            OperationKind::TopUp => Direction::Credit,
            OperationKind::Subscription | OperationKind::Other(_) => Direction::Debit,
        }
    }
}

impl From<String> for OperationKind {
    fn from(value: String) -> Self {
        OperationKind::from_label(&value)
    }
}

impl From<OperationKind> for String {
    fn from(value: OperationKind) -> Self {
        value.label().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Credit,
    Debit,
}

/// Largest amount a single operation may carry.
pub const MAX_AMOUNT: u64 = 999_999_999;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub amount: u64,
    pub direction: Direction,
    pub method: Option<PaymentMethod>,
    #[serde(with = "date_format")]
    pub date: NaiveDate,
}

impl OperationRecord {
    pub fn top_up(amount: u64, method: PaymentMethod, date: NaiveDate) -> Self {
        Self {
            kind: OperationKind::TopUp,
            amount,
            direction: Direction::Credit,
            method: Some(method),
            date,
        }
    }

    pub fn is_credit(&self) -> bool {
        self.direction == Direction::Credit
    }

    /// Converts a backend row. Rows that are not completed yet do not touch the
    /// balance and are dropped.
    pub fn from_api(op: ApiOperation) -> Option<Self> {
        if let Some(status) = op.status.as_deref() {
            if !status.eq_ignore_ascii_case(STATUS_COMPLETED) {
                return None;
            }
        }
        let kind = OperationKind::from_label(&op.op_type);
        let date = op
            .date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), DATE_FORMAT).ok())
            .unwrap_or_else(|| Local::now().date_naive());

        Some(Self {
            direction: kind.default_direction(),
            kind,
            amount: op.amount.clamp(0, MAX_AMOUNT as i64) as u64,
            method: op.method.as_deref().and_then(|m| m.parse().ok()),
            date,
        })
    }

    pub fn formatted_date(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }
}

mod date_format {
    use super::DATE_FORMAT;
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&date.format(DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(serde::de::Error::custom)
    }
}
