use chrono::{Local, Utc};
use metalvpn_shared::api::CreatePaymentResponse;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api_client::{payment_id_of, PaymentApi};
use crate::balance::Balance;
use crate::error::PaymentError;
use crate::models::{OperationRecord, PaymentMethod, PaymentState, PendingPayment};
use crate::presenter::Presenter;
use crate::storage::LocalStore;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Nothing is awaiting payment.
    Inactive,
    /// Still pending, or the check failed and will be retried next tick.
    Pending,
    /// The response belongs to a payment that was cancelled or replaced.
    Stale,
    Completed(Balance),
}

struct Inner {
    state: PaymentState,
    /// Bumped on every create and cancel so late create responses can tell
    /// they were superseded.
    epoch: u64,
    poller: Option<JoinHandle<()>>,
}

impl Inner {
    fn reset(&mut self) -> bool {
        let was_active = !self.state.is_idle() || self.poller.is_some();
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
        self.state = PaymentState::Idle;
        self.epoch += 1;
        was_active
    }
}

/// Drives one top-up from creation to a terminal state. At most one payment
/// and one poller exist at a time; a new attempt replaces the old one.
#[derive(Clone)]
pub struct PaymentCoordinator {
    api: Arc<dyn PaymentApi>,
    store: LocalStore,
    presenter: Arc<dyn Presenter>,
    user_id: i64,
    poll_interval: Duration,
    inner: Arc<Mutex<Inner>>,
}

impl PaymentCoordinator {
    pub fn new(
        api: Arc<dyn PaymentApi>,
        store: LocalStore,
        presenter: Arc<dyn Presenter>,
        user_id: i64,
        poll_interval: Duration,
    ) -> Self {
        Self {
            api,
            store,
            presenter,
            user_id,
            poll_interval,
            inner: Arc::new(Mutex::new(Inner {
                state: PaymentState::Idle,
                epoch: 0,
                poller: None,
            })),
        }
    }

    pub async fn state(&self) -> PaymentState {
        self.inner.lock().await.state.clone()
    }

    pub async fn pending(&self) -> Option<PendingPayment> {
        self.inner.lock().await.state.pending().cloned()
    }

    pub async fn is_polling(&self) -> bool {
        self.inner
            .lock()
            .await
            .poller
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    pub async fn create_payment(
        &self,
        amount: u64,
        method: PaymentMethod,
    ) -> Result<PendingPayment, PaymentError> {
        let epoch = {
            let mut inner = self.inner.lock().await;
            if inner.reset() {
                info!("Replacing previous payment attempt");
            }
            inner.epoch
        };

        if amount == 0 {
            let err = PaymentError::InvalidAmount;
            self.presenter.show_alert(err.user_message());
            return Err(err);
        }

        info!("Creating payment: {} via {}", amount, method.as_wire());
        let created = self
            .api
            .create_payment(self.user_id, amount, method)
            .await
            .map_err(PaymentError::from)
            .and_then(|resp| build_pending(resp, amount, method));

        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch {
            debug!("Dropping create response for a superseded attempt");
            return Err(PaymentError::Superseded);
        }

        let payment = match created {
            Ok(p) => p,
            Err(e) => {
                warn!("Payment creation failed: {}", e);
                self.presenter.show_alert(e.user_message());
                return Err(e);
            }
        };

        info!("Payment {} awaiting transfer (memo {})", payment.id, payment.memo);
        inner.state = PaymentState::AwaitingPayment(payment.clone());
        inner.poller = Some(self.spawn_poller(payment.id.clone()));
        self.presenter.show_payment(&payment);
        Ok(payment)
    }

    /// Checks the current payment once.
    pub async fn poll_once(&self) -> PollOutcome {
        let id = match self.inner.lock().await.state.pending() {
            Some(p) => p.id.clone(),
            None => return PollOutcome::Inactive,
        };
        self.poll_payment(&id).await
    }

    /// Stops polling and forgets the pending payment. Returns whether there was
    /// anything to cancel.
    pub async fn cancel(&self) -> bool {
        let cancelled = self.inner.lock().await.reset();
        if cancelled {
            info!("Payment cancelled");
        }
        cancelled
    }

    fn spawn_poller(&self, payment_id: String) -> JoinHandle<()> {
        let this = self.clone();
        let period = self.poll_interval;
        tokio::spawn(async move {
            let mut tick = time::interval_at(Instant::now() + period, period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                match this.poll_payment(&payment_id).await {
                    PollOutcome::Pending => continue,
                    outcome => {
                        debug!("Poller for payment {} stopped: {:?}", payment_id, outcome);
                        break;
                    }
                }
            }
        })
    }

    async fn poll_payment(&self, payment_id: &str) -> PollOutcome {
        let checked = self.api.check_payment(payment_id).await;

        let payment = {
            let mut inner = self.inner.lock().await;
            let payment = match &inner.state {
                PaymentState::AwaitingPayment(p) if p.id == payment_id => p.clone(),
                _ => {
                    debug!("Ignoring status of stale payment {}", payment_id);
                    return PollOutcome::Stale;
                }
            };

            match checked {
                Ok(status) if status.is_completed() => {}
                Ok(status) => {
                    debug!("Payment {} still {:?}", payment_id, status);
                    return PollOutcome::Pending;
                }
                Err(e) => {
                    warn!("Payment {} status check failed: {}", payment_id, e);
                    return PollOutcome::Pending;
                }
            }

            inner.state = PaymentState::Completed(payment.clone());
            // The poller exits by itself once it sees a non-pending outcome.
            inner.poller.take();
            payment
        };

        info!("Payment {} completed", payment.id);
        let balance = self.reconcile(&payment).await;
        self.presenter.payment_completed(&payment, &balance);
        PollOutcome::Completed(balance)
    }

    /// Refreshes history after a completed top-up. The backend list wins; if it
    /// cannot be fetched the credit is recorded locally instead.
    async fn reconcile(&self, payment: &PendingPayment) -> Balance {
        let history = match self.api.get_operations(self.user_id).await {
            Ok(ops) => self.store.replace_operations(ops).await,
            Err(e) => {
                warn!(
                    "Could not refresh history after payment {}: {}",
                    payment.id, e
                );
                let record = OperationRecord::top_up(
                    payment.amount,
                    payment.method,
                    Local::now().date_naive(),
                );
                self.store.push_operation(record).await
            }
        };

        let balance = Balance::from_operations(&history);
        self.presenter.show_balance(&balance, &history);
        balance
    }
}

fn build_pending(
    resp: CreatePaymentResponse,
    requested: u64,
    method: PaymentMethod,
) -> Result<PendingPayment, PaymentError> {
    let id = payment_id_of(resp.payment_id.as_ref()).ok_or(PaymentError::MissingPaymentId)?;
    Ok(PendingPayment {
        id,
        memo: resp.memo,
        amount: resp.amount.filter(|a| *a > 0).unwrap_or(requested),
        wallet_address: resp.wallet,
        method,
        ton_url: resp.ton_url,
        created_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::ApiResult;
    use crate::error::ApiError;
    use crate::models::{Direction, UserProfile};
    use async_trait::async_trait;
    use metalvpn_shared::api::ConfirmPaymentResponse;
    use metalvpn_shared::payment::PaymentStatus;
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct Gate {
        entered: Notify,
        release: Notify,
    }

    #[derive(Default)]
    struct FakeApi {
        create_responses: std::sync::Mutex<VecDeque<ApiResult<CreatePaymentResponse>>>,
        statuses: std::sync::Mutex<HashMap<String, VecDeque<ApiResult<PaymentStatus>>>>,
        check_calls: std::sync::Mutex<HashMap<String, usize>>,
        operations: std::sync::Mutex<Option<Vec<OperationRecord>>>,
        create_gate: Option<Gate>,
        check_gate: Option<Gate>,
    }

    impl FakeApi {
        fn script_create(&self, resp: ApiResult<CreatePaymentResponse>) {
            self.create_responses.lock().unwrap().push_back(resp);
        }

        fn script_status(&self, id: &str, statuses: Vec<ApiResult<PaymentStatus>>) {
            self.statuses
                .lock()
                .unwrap()
                .insert(id.to_string(), statuses.into());
        }

        fn calls(&self, id: &str) -> usize {
            self.check_calls.lock().unwrap().get(id).copied().unwrap_or(0)
        }
    }

    fn created(id: serde_json::Value, amount: u64) -> CreatePaymentResponse {
        CreatePaymentResponse {
            payment_id: Some(id),
            memo: "MEMO0000MEMO0000".into(),
            wallet: "UQwallet".into(),
            ton_url: None,
            amount: Some(amount),
        }
    }

    fn unavailable() -> ApiError {
        ApiError::Status {
            path: "/test".into(),
            status: 503,
            message: None,
        }
    }

    #[async_trait]
    impl PaymentApi for FakeApi {
        async fn get_user_data(&self, user_id: i64) -> ApiResult<UserProfile> {
            Ok(UserProfile {
                user_id,
                ..Default::default()
            })
        }

        async fn get_operations(&self, _user_id: i64) -> ApiResult<Vec<OperationRecord>> {
            self.operations.lock().unwrap().clone().ok_or_else(unavailable)
        }

        async fn create_payment(
            &self,
            _user_id: i64,
            amount: u64,
            _method: PaymentMethod,
        ) -> ApiResult<CreatePaymentResponse> {
            if let Some(gate) = &self.create_gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
            self.create_responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(created(json!(1), amount)))
        }

        async fn check_payment(&self, payment_id: &str) -> ApiResult<PaymentStatus> {
            *self
                .check_calls
                .lock()
                .unwrap()
                .entry(payment_id.to_string())
                .or_default() += 1;
            if let Some(gate) = &self.check_gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
            self.statuses
                .lock()
                .unwrap()
                .get_mut(payment_id)
                .and_then(|q| q.pop_front())
                .unwrap_or(Ok(PaymentStatus::Pending))
        }

        async fn confirm_payment(&self, _memo: &str) -> ApiResult<ConfirmPaymentResponse> {
            Ok(ConfirmPaymentResponse {
                status: "completed".into(),
                user_id: None,
            })
        }
    }

    #[derive(Default)]
    struct RecordingPresenter {
        events: std::sync::Mutex<Vec<String>>,
    }

    impl RecordingPresenter {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn alerts(&self) -> usize {
            self.events()
                .iter()
                .filter(|e| e.starts_with("alert"))
                .count()
        }
    }

    impl Presenter for RecordingPresenter {
        fn show_payment(&self, payment: &PendingPayment) {
            self.events
                .lock()
                .unwrap()
                .push(format!("payment:{}", payment.id));
        }

        fn show_alert(&self, message: &str) {
            self.events.lock().unwrap().push(format!("alert:{}", message));
        }

        fn show_balance(&self, balance: &Balance, _history: &[OperationRecord]) {
            self.events
                .lock()
                .unwrap()
                .push(format!("balance:{}", balance.total));
        }

        fn payment_completed(&self, payment: &PendingPayment, balance: &Balance) {
            self.events
                .lock()
                .unwrap()
                .push(format!("completed:{}:{}", payment.id, balance.total));
        }
    }

    fn coordinator(
        api: Arc<FakeApi>,
        poll_interval: Duration,
    ) -> (PaymentCoordinator, Arc<RecordingPresenter>, LocalStore) {
        let presenter = Arc::new(RecordingPresenter::default());
        let store = LocalStore::in_memory();
        let c = PaymentCoordinator::new(api, store.clone(), presenter.clone(), 42, poll_interval);
        (c, presenter, store)
    }

    async fn wait_until_completed(c: &PaymentCoordinator, presenter: &RecordingPresenter) {
        for _ in 0..100 {
            let reported = presenter.events().iter().any(|e| e.starts_with("completed"));
            if reported && matches!(c.state().await, PaymentState::Completed(_)) {
                return;
            }
            time::sleep(Duration::from_millis(500)).await;
        }
        panic!("payment never completed");
    }

    #[tokio::test(start_paused = true)]
    async fn completes_after_pending_polls() {
        let api = Arc::new(FakeApi::default());
        api.script_status(
            "1",
            vec![
                Ok(PaymentStatus::Pending),
                Ok(PaymentStatus::Pending),
                Ok(PaymentStatus::Pending),
                Ok(PaymentStatus::Completed),
            ],
        );
        let credit = OperationRecord::top_up(1000, PaymentMethod::TonCoin, Local::now().date_naive());
        *api.operations.lock().unwrap() = Some(vec![credit.clone()]);

        let (c, presenter, store) = coordinator(api.clone(), DEFAULT_POLL_INTERVAL);
        assert!(c.state().await.is_idle());

        let payment = c.create_payment(1000, PaymentMethod::TonCoin).await.unwrap();
        assert_eq!(payment.id, "1");
        assert!(matches!(c.state().await, PaymentState::AwaitingPayment(_)));

        wait_until_completed(&c, &presenter).await;
        assert_eq!(api.calls("1"), 4);
        assert!(!c.is_polling().await);

        let history = store.load_operations().await;
        assert_eq!(history[0], credit);
        assert_eq!(Balance::from_operations(&history).total, 1000);
        assert!(presenter.events().contains(&"completed:1:1000".to_string()));
        assert_eq!(presenter.alerts(), 0);
    }

    #[tokio::test]
    async fn missing_payment_id_stays_idle() {
        let api = Arc::new(FakeApi::default());
        let mut resp = created(json!(1), 100);
        resp.payment_id = None;
        api.script_create(Ok(resp));
        api.script_create(Ok(created(json!(""), 100)));

        let (c, presenter, _) = coordinator(api, DEFAULT_POLL_INTERVAL);

        let err = c.create_payment(100, PaymentMethod::TonCoin).await.unwrap_err();
        assert!(matches!(err, PaymentError::MissingPaymentId));
        assert!(c.state().await.is_idle());

        let err = c.create_payment(100, PaymentMethod::TonCoin).await.unwrap_err();
        assert!(matches!(err, PaymentError::MissingPaymentId));
        assert!(c.state().await.is_idle());
        assert!(!c.is_polling().await);
        assert_eq!(presenter.alerts(), 2);
    }

    #[tokio::test]
    async fn transport_failure_alerts_without_retry() {
        let api = Arc::new(FakeApi::default());
        api.script_create(Err(unavailable()));

        let (c, presenter, _) = coordinator(api.clone(), DEFAULT_POLL_INTERVAL);
        let err = c.create_payment(500, PaymentMethod::TonCoin).await.unwrap_err();

        assert!(matches!(err, PaymentError::Create(_)));
        assert!(c.state().await.is_idle());
        assert_eq!(presenter.alerts(), 1);
        assert!(api.create_responses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_amount_is_rejected() {
        let (c, presenter, _) = coordinator(Arc::new(FakeApi::default()), DEFAULT_POLL_INTERVAL);
        let err = c.create_payment(0, PaymentMethod::TonCoin).await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidAmount));
        assert!(c.state().await.is_idle());
        assert_eq!(presenter.alerts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn new_payment_stops_previous_poller() {
        let api = Arc::new(FakeApi::default());
        api.script_create(Ok(created(json!(1), 100)));
        api.script_create(Ok(created(json!(2), 200)));

        let (c, _, _) = coordinator(api.clone(), DEFAULT_POLL_INTERVAL);
        c.create_payment(100, PaymentMethod::TonCoin).await.unwrap();
        time::sleep(DEFAULT_POLL_INTERVAL * 3 + Duration::from_millis(100)).await;
        let first_calls = api.calls("1");
        assert!(first_calls >= 2);

        let second = c.create_payment(200, PaymentMethod::TonCoin).await.unwrap();
        assert_eq!(second.id, "2");
        time::sleep(DEFAULT_POLL_INTERVAL * 3 + Duration::from_millis(100)).await;

        assert_eq!(api.calls("1"), first_calls);
        assert!(api.calls("2") >= 2);
        assert_eq!(c.pending().await.map(|p| p.id), Some("2".to_string()));
    }

    #[tokio::test]
    async fn late_status_for_replaced_payment_is_ignored() {
        let api = Arc::new(FakeApi {
            check_gate: Some(Gate::default()),
            ..Default::default()
        });
        api.script_create(Ok(created(json!(1), 100)));
        api.script_create(Ok(created(json!(2), 200)));
        api.script_status("1", vec![Ok(PaymentStatus::Completed)]);

        // Long interval so only the manual poll hits the API.
        let (c, presenter, store) = coordinator(api.clone(), Duration::from_secs(3600));
        c.create_payment(100, PaymentMethod::TonCoin).await.unwrap();

        let poll = tokio::spawn({
            let c = c.clone();
            async move { c.poll_once().await }
        });
        api.check_gate.as_ref().unwrap().entered.notified().await;

        assert!(c.cancel().await);
        c.create_payment(200, PaymentMethod::TonCoin).await.unwrap();
        api.check_gate.as_ref().unwrap().release.notify_one();

        assert_eq!(poll.await.unwrap(), PollOutcome::Stale);
        assert_eq!(c.pending().await.map(|p| p.id), Some("2".to_string()));
        assert!(store.load_operations().await.is_empty());
        assert!(!presenter.events().iter().any(|e| e.starts_with("completed")));
    }

    #[tokio::test]
    async fn create_response_after_cancel_is_dropped() {
        let api = Arc::new(FakeApi {
            create_gate: Some(Gate::default()),
            ..Default::default()
        });

        let (c, presenter, _) = coordinator(api.clone(), DEFAULT_POLL_INTERVAL);
        let create = tokio::spawn({
            let c = c.clone();
            async move { c.create_payment(100, PaymentMethod::TonCoin).await }
        });
        api.create_gate.as_ref().unwrap().entered.notified().await;

        c.cancel().await;
        api.create_gate.as_ref().unwrap().release.notify_one();

        let result = create.await.unwrap();
        assert!(matches!(result, Err(PaymentError::Superseded)));
        assert!(c.state().await.is_idle());
        assert!(!c.is_polling().await);
        assert!(presenter.events().is_empty());
    }

    #[tokio::test]
    async fn cancel_from_idle_is_noop() {
        let (c, _, _) = coordinator(Arc::new(FakeApi::default()), DEFAULT_POLL_INTERVAL);
        assert!(!c.cancel().await);
        assert!(c.state().await.is_idle());
        assert_eq!(c.poll_once().await, PollOutcome::Inactive);
    }

    #[tokio::test]
    async fn cancel_discards_pending_payment() {
        let (c, _, _) = coordinator(Arc::new(FakeApi::default()), DEFAULT_POLL_INTERVAL);
        c.create_payment(100, PaymentMethod::TonCoin).await.unwrap();
        assert!(c.is_polling().await);

        assert!(c.cancel().await);
        assert!(c.state().await.is_idle());
        assert!(!c.is_polling().await);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_errors_are_silent() {
        let api = Arc::new(FakeApi::default());
        api.script_status(
            "1",
            vec![Err(unavailable()), Err(unavailable()), Ok(PaymentStatus::Completed)],
        );
        *api.operations.lock().unwrap() = Some(Vec::new());

        let (c, presenter, _) = coordinator(api.clone(), DEFAULT_POLL_INTERVAL);
        c.create_payment(100, PaymentMethod::TonCoin).await.unwrap();
        assert_eq!(c.poll_once().await, PollOutcome::Pending);

        wait_until_completed(&c, &presenter).await;
        assert_eq!(presenter.alerts(), 0);
    }

    #[tokio::test]
    async fn history_falls_back_to_local_credit() {
        let api = Arc::new(FakeApi::default());
        api.script_status("1", vec![Ok(PaymentStatus::Completed)]);

        let (c, _, store) = coordinator(api, Duration::from_secs(3600));
        store
            .push_operation(OperationRecord {
                kind: crate::models::OperationKind::Subscription,
                amount: 300,
                direction: Direction::Debit,
                method: None,
                date: Local::now().date_naive(),
            })
            .await;

        c.create_payment(1000, PaymentMethod::TonCoin).await.unwrap();
        let outcome = c.poll_once().await;

        let history = store.load_operations().await;
        assert_eq!(history.len(), 2);
        assert!(history[0].is_credit());
        assert_eq!(history[0].amount, 1000);
        assert_eq!(outcome, PollOutcome::Completed(Balance::from_operations(&history)));
        assert_eq!(Balance::from_operations(&history).total, 700);
    }
}
