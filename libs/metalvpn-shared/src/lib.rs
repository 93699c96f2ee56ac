use serde::{Deserialize, Serialize};

pub mod api {
    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct UserResponse {
        pub user_id: i64,
        pub username: Option<String>,
        pub first_name: Option<String>,
        pub last_name: Option<String>,
        pub avatar_url: Option<String>,
        #[serde(default)]
        pub telegram_stars: i64,
        #[serde(default)]
        pub ton_balance: i64,
    }

    /// Operation row as returned by `/api/operations`. The backend does not
    /// send a direction; it follows from `op_type`.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ApiOperation {
        #[serde(rename = "type")]
        pub op_type: String,
        pub amount: i64,
        pub method: Option<String>,
        pub status: Option<String>,
        /// `dd.mm.yyyy`
        pub date: Option<String>,
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct OperationsResponse {
        #[serde(default)]
        pub operations: Vec<ApiOperation>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CreatePaymentRequest {
        pub user_id: i64,
        pub amount: u64,
        pub method: String,
    }

    /// `payment_id` is an integer row id on the current backend, so it is kept
    /// as a raw JSON value and normalized by the client.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CreatePaymentResponse {
        pub payment_id: Option<serde_json::Value>,
        #[serde(default)]
        pub memo: String,
        #[serde(default)]
        pub wallet: String,
        pub ton_url: Option<String>,
        pub amount: Option<u64>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PaymentCheckResponse {
        pub payment_id: Option<serde_json::Value>,
        pub status: String,
        pub amount: Option<u64>,
        pub memo: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ConfirmPaymentRequest {
        pub memo: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ConfirmPaymentResponse {
        pub status: String,
        pub user_id: Option<i64>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ErrorResponse {
        pub error: String,
    }
}

pub mod payment {
    pub const STATUS_PENDING: &str = "pending";
    pub const STATUS_COMPLETED: &str = "completed";
    pub const STATUS_ALREADY_COMPLETED: &str = "already_completed";

    /// Status reported by `/api/payment/check` and `/api/payment/confirm`.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum PaymentStatus {
        Pending,
        Completed,
        /// Confirm was sent for a payment that had already been credited.
        AlreadyCompleted,
        Other(String),
    }

    impl PaymentStatus {
        pub fn parse(raw: &str) -> Self {
            match raw.trim().to_ascii_lowercase().as_str() {
                STATUS_PENDING => PaymentStatus::Pending,
                STATUS_COMPLETED => PaymentStatus::Completed,
                STATUS_ALREADY_COMPLETED => PaymentStatus::AlreadyCompleted,
                other => PaymentStatus::Other(other.to_string()),
            }
        }

        pub fn is_completed(&self) -> bool {
            matches!(self, PaymentStatus::Completed)
        }
    }
}
