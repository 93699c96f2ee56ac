use std::sync::Arc;

use crate::api_client::PaymentApi;
use crate::config::AppConfig;
use crate::error::{ApiError, PaymentError};
use crate::models::PendingPayment;
use crate::presenter::Presenter;
use crate::services::guide::GuideManager;
use crate::services::modal::{ModalId, ModalManager};
use crate::services::navigation::{Navigation, View, ViewEffect};
use crate::services::payment_coordinator::PaymentCoordinator;
use crate::services::plans::PlansManager;
use crate::services::profile_service::{ProfileService, ProfileSnapshot};
use crate::services::settings_service::{SettingKind, SettingsService};
use crate::services::skeleton::SkeletonManager;
use crate::storage::LocalStore;
use metalvpn_shared::payment::PaymentStatus;

/// What the WebView reports about the device.
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    pub user_agent: String,
    pub platform: String,
}

/// Everything a screen needs, built once at startup and passed around
/// instead of living in globals.
pub struct AppContext {
    pub api: Arc<dyn PaymentApi>,
    pub store: LocalStore,
    pub presenter: Arc<dyn Presenter>,
    pub device: DeviceInfo,
    pub settings: SettingsService,
    pub profile: ProfileService,
    pub payments: PaymentCoordinator,
    pub navigation: Navigation,
    pub modals: ModalManager,
    pub plans: PlansManager,
    pub guide: GuideManager,
    pub skeleton: SkeletonManager,
}

impl AppContext {
    /// Builds the context and applies whatever the restored view requires.
    pub async fn boot(
        config: &AppConfig,
        api: Arc<dyn PaymentApi>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        let store = match &config.storage_path {
            Some(path) => LocalStore::open(path).await,
            None => LocalStore::in_memory(),
        };
        let device = DeviceInfo {
            user_agent: config.user_agent.clone(),
            platform: config.platform.clone(),
        };

        let settings = SettingsService::new(store.clone());
        let profile = ProfileService::new(api.clone(), store.clone(), settings.clone(), config.user_id);
        let payments = PaymentCoordinator::new(
            api.clone(),
            store.clone(),
            presenter.clone(),
            config.user_id,
            config.poll_interval(),
        );
        let plans = PlansManager::load(store.clone(), settings.clone()).await;
        let guide = GuideManager::new(&device.user_agent, &device.platform);
        let (navigation, effect) = Navigation::restore(store.clone()).await;

        let mut ctx = Self {
            api,
            store,
            presenter,
            device,
            settings,
            profile,
            payments,
            navigation,
            modals: ModalManager::new(),
            plans,
            guide,
            skeleton: SkeletonManager::new(),
        };
        ctx.apply(effect).await;
        tracing::info!("App ready, view {:?}", ctx.navigation.current());
        ctx
    }

    pub async fn switch_view(&mut self, view: View) {
        let effect = self.navigation.switch_view(view).await;
        self.apply(effect).await;
    }

    async fn apply(&mut self, effect: ViewEffect) {
        match effect {
            ViewEffect::None => {}
            ViewEffect::DetectPlatform => {
                let platform = self
                    .guide
                    .init_platform(&self.device.user_agent, &self.device.platform);
                tracing::debug!("Guide platform {}", platform.label());
            }
            ViewEffect::RefreshProfile => {
                self.refresh_profile().await;
            }
        }
    }

    pub async fn refresh_profile(&self) -> ProfileSnapshot {
        let snapshot = self.profile.load().await;
        self.presenter
            .show_balance(&snapshot.balance, &snapshot.history);
        snapshot
    }

    /// Support lives on the profile screen.
    pub async fn open_support(&mut self) {
        self.switch_view(View::Profile).await;
    }

    pub async fn open_modal(&mut self, modal: ModalId) {
        if modal != ModalId::TopUp && self.modals.active() == Some(ModalId::TopUp) {
            self.payments.cancel().await;
        }
        self.modals.open(modal);
    }

    pub async fn close_modal(&mut self, modal: ModalId) -> bool {
        let closed = self.modals.close(modal);
        if closed && modal == ModalId::TopUp {
            self.payments.cancel().await;
        }
        closed
    }

    pub async fn escape(&mut self) -> Option<ModalId> {
        let closed = self.modals.escape()?;
        if closed == ModalId::TopUp {
            self.payments.cancel().await;
        }
        Some(closed)
    }

    /// Starts a payment for the amount and method picked in the top-up form.
    /// Returns None unless the top-up modal is open with a complete form.
    pub async fn confirm_topup(&mut self) -> Option<Result<PendingPayment, PaymentError>> {
        if self.modals.active() != Some(ModalId::TopUp) {
            return None;
        }
        let (amount, method) = self.modals.topup().selection()?;
        Some(self.payments.create_payment(amount, method).await)
    }

    /// Applies a choice from a settings modal and closes it. Values outside
    /// the option list are ignored and keep the modal open.
    pub async fn choose_setting(&mut self, kind: SettingKind, value: &str) -> Option<String> {
        let saved = self.settings.set(kind, value).await?;
        self.close_modal(ModalId::Settings(kind)).await;
        if kind == SettingKind::Currency {
            tracing::debug!("Plan price now {}", self.plans.price_label().await);
        }
        Some(saved)
    }

    /// Manual confirmation by memo, for payments the poller never saw. Only a
    /// fresh `completed` reloads the history; `already_completed` means it is
    /// already in there.
    pub async fn confirm_by_memo(&self, memo: &str) -> Result<PaymentStatus, ApiError> {
        let response = self.api.confirm_payment(memo).await?;
        let status = PaymentStatus::parse(&response.status);
        match &status {
            PaymentStatus::Completed => {
                self.refresh_profile().await;
            }
            PaymentStatus::AlreadyCompleted => {
                tracing::info!("Payment {} was already credited", memo);
            }
            other => tracing::warn!("Confirm for {} returned {:?}", memo, other),
        }
        Ok(status)
    }
}
