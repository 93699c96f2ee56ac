use async_trait::async_trait;
use metalvpn_shared::api::{
    ConfirmPaymentRequest, ConfirmPaymentResponse, CreatePaymentRequest, CreatePaymentResponse,
    ErrorResponse, OperationsResponse, PaymentCheckResponse, UserResponse,
};
use metalvpn_shared::payment::PaymentStatus;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ApiError;
use crate::models::{OperationRecord, PaymentMethod, UserProfile};

pub type ApiResult<T> = Result<T, ApiError>;

/// The slice of the backend the Mini App talks to.
#[async_trait]
pub trait PaymentApi: Send + Sync {
    async fn get_user_data(&self, user_id: i64) -> ApiResult<UserProfile>;

    async fn get_operations(&self, user_id: i64) -> ApiResult<Vec<OperationRecord>>;

    async fn create_payment(
        &self,
        user_id: i64,
        amount: u64,
        method: PaymentMethod,
    ) -> ApiResult<CreatePaymentResponse>;

    async fn check_payment(&self, payment_id: &str) -> ApiResult<PaymentStatus>;

    async fn confirm_payment(&self, memo: &str) -> ApiResult<ConfirmPaymentResponse>;
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> ApiResult<T> {
        let url = format!("{}/api{}", self.base_url, path);
        let resp = self.client.get(&url).send().await?;
        Self::read(path, resp).await
    }

    async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let url = format!("{}/api{}", self.base_url, path);
        let resp = self.client.post(&url).json(body).send().await?;
        Self::read(path, resp).await
    }

    /// Non-2xx becomes `ApiError::Status`, carrying the backend's `error`
    /// text when the body has one.
    async fn read<T: for<'de> Deserialize<'de>>(path: &str, resp: Response) -> ApiResult<T> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<ErrorResponse>()
                .await
                .ok()
                .map(|e| e.error);
            return Err(ApiError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        resp.json()
            .await
            .map_err(|e| ApiError::Decode(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl PaymentApi for ApiClient {
    async fn get_user_data(&self, user_id: i64) -> ApiResult<UserProfile> {
        let resp: UserResponse = self.get(&format!("/user?user_id={}", user_id)).await?;
        Ok(resp.into())
    }

    async fn get_operations(&self, user_id: i64) -> ApiResult<Vec<OperationRecord>> {
        let resp: OperationsResponse = self
            .get(&format!("/operations?user_id={}", user_id))
            .await?;
        Ok(resp
            .operations
            .into_iter()
            .filter_map(OperationRecord::from_api)
            .collect())
    }

    async fn create_payment(
        &self,
        user_id: i64,
        amount: u64,
        method: PaymentMethod,
    ) -> ApiResult<CreatePaymentResponse> {
        let req = CreatePaymentRequest {
            user_id,
            amount,
            method: method.as_wire().to_string(),
        };
        self.post("/payment/create", &req).await
    }

    async fn check_payment(&self, payment_id: &str) -> ApiResult<PaymentStatus> {
        let resp: PaymentCheckResponse = self
            .get(&format!(
                "/payment/check?payment_id={}",
                urlencoding::encode(payment_id)
            ))
            .await?;
        Ok(PaymentStatus::parse(&resp.status))
    }

    async fn confirm_payment(&self, memo: &str) -> ApiResult<ConfirmPaymentResponse> {
        let req = ConfirmPaymentRequest {
            memo: memo.to_string(),
        };
        self.post("/payment/confirm", &req).await
    }
}

/// Normalizes the backend's `payment_id`, which is a number today but may be
/// a string. Empty and null ids count as missing.
pub fn payment_id_of(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
