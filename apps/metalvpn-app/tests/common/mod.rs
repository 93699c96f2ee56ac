//! Fake MetalVPN backend served on an ephemeral port.

#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::Notify;

use metalvpn_app::balance::Balance;
use metalvpn_app::models::{OperationRecord, PendingPayment};
use metalvpn_app::presenter::Presenter;

pub const USER_ID: i64 = 1455767363;
pub const PAYMENT_ID: u64 = 42;
pub const MEMO: &str = "MV-1455767363-42";
pub const WALLET: &str = "UQBvW8Z5huBkMJYdnfAEM5JqTNkuWX3diqYENkWsIL0XggGG";

#[derive(Default)]
pub struct BackendState {
    /// Answers for `/payment/check`, front first; "pending" once drained.
    pub statuses: Mutex<VecDeque<&'static str>>,
    pub operations: Mutex<Vec<Value>>,
    pub operations_down: AtomicBool,
    pub operations_malformed: AtomicBool,
    /// Replaces the normal `/payment/create` body.
    pub create_override: Mutex<Option<Value>>,
    pub last_create: Mutex<Option<Value>>,
    pub open_payment: Mutex<Option<(u64, String)>>,
    pub check_calls: AtomicUsize,
}

impl BackendState {
    pub fn script(&self, statuses: &[&'static str]) {
        self.statuses.lock().unwrap().extend(statuses.iter().copied());
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    fn settle(&self) {
        if let Some((amount, method)) = self.open_payment.lock().unwrap().take() {
            let date = chrono::Local::now().format("%d.%m.%Y").to_string();
            self.operations.lock().unwrap().insert(
                0,
                json!({
                    "type": "top_up",
                    "amount": amount,
                    "method": method,
                    "status": "completed",
                    "date": date,
                }),
            );
        }
    }
}

pub struct FakeBackend {
    pub url: String,
    pub state: Arc<BackendState>,
}

pub async fn start_backend() -> FakeBackend {
    let state = Arc::new(BackendState::default());
    let app = Router::new()
        .route("/api/user", get(user))
        .route("/api/operations", get(operations))
        .route("/api/payment/create", post(create_payment))
        .route("/api/payment/check", get(check_payment))
        .route("/api/payment/confirm", post(confirm_payment))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeBackend {
        url: format!("http://{}", addr),
        state,
    }
}

async fn user(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let user_id: i64 = params
        .get("user_id")
        .and_then(|id| id.parse().ok())
        .unwrap_or_default();
    Json(json!({
        "user_id": user_id,
        "username": "metal_user",
        "first_name": "Alex",
        "last_name": null,
        "avatar_url": null,
        "telegram_stars": 0,
        "ton_balance": 0,
    }))
}

async fn operations(State(state): State<Arc<BackendState>>) -> Result<Json<Value>, StatusCode> {
    if state.operations_down.load(Ordering::SeqCst) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    if state.operations_malformed.load(Ordering::SeqCst) {
        return Ok(Json(json!({ "operations": "unavailable" })));
    }
    let ops = state.operations.lock().unwrap().clone();
    Ok(Json(json!({ "operations": ops })))
}

async fn create_payment(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    *state.last_create.lock().unwrap() = Some(body.clone());
    if let Some(reply) = state.create_override.lock().unwrap().clone() {
        return Json(reply);
    }

    let amount = body["amount"].as_u64().unwrap_or_default();
    let method = body["method"].as_str().unwrap_or_default().to_string();
    *state.open_payment.lock().unwrap() = Some((amount, method));
    Json(json!({
        "payment_id": PAYMENT_ID,
        "memo": MEMO,
        "wallet": WALLET,
        "amount": amount,
    }))
}

async fn check_payment(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    state.check_calls.fetch_add(1, Ordering::SeqCst);
    let status = state
        .statuses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or("pending");
    if status == "completed" {
        state.settle();
    }
    Json(json!({
        "payment_id": params.get("payment_id"),
        "status": status,
    }))
}

async fn confirm_payment(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if body["memo"].as_str() != Some(MEMO) {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Payment not found" })),
        ));
    }
    if state.open_payment.lock().unwrap().is_none() {
        return Ok(Json(json!({ "status": "already_completed" })));
    }
    state.settle();
    Ok(Json(json!({ "status": "completed", "user_id": USER_ID })))
}

/// Records presenter calls and wakes waiters on completion.
#[derive(Default)]
pub struct RecordingPresenter {
    pub alerts: Mutex<Vec<String>>,
    pub balances: Mutex<Vec<Balance>>,
    pub shown: Mutex<Vec<PendingPayment>>,
    pub completed: Notify,
}

impl RecordingPresenter {
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn last_balance(&self) -> Option<Balance> {
        self.balances.lock().unwrap().last().copied()
    }
}

impl Presenter for RecordingPresenter {
    fn show_payment(&self, payment: &PendingPayment) {
        self.shown.lock().unwrap().push(payment.clone());
    }

    fn show_alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }

    fn show_balance(&self, balance: &Balance, _history: &[OperationRecord]) {
        self.balances.lock().unwrap().push(*balance);
    }

    fn payment_completed(&self, _payment: &PendingPayment, _balance: &Balance) {
        self.completed.notify_one();
    }
}
