use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::api_client::PaymentApi;
use crate::balance::Balance;
use crate::models::{OperationRecord, UserProfile};
use crate::services::settings_service::{SettingKind, SettingsService};
use crate::storage::LocalStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistorySource {
    Remote,
    Cache,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileSnapshot {
    pub profile: Option<UserProfile>,
    pub language: String,
    pub currency: String,
    pub history: Vec<OperationRecord>,
    pub history_source: HistorySource,
    pub balance: Balance,
}

#[derive(Clone)]
pub struct ProfileService {
    api: Arc<dyn PaymentApi>,
    store: LocalStore,
    settings: SettingsService,
    user_id: i64,
}

impl ProfileService {
    pub fn new(
        api: Arc<dyn PaymentApi>,
        store: LocalStore,
        settings: SettingsService,
        user_id: i64,
    ) -> Self {
        Self {
            api,
            store,
            settings,
            user_id,
        }
    }

    /// Backend history when reachable (and cached), otherwise the cache.
    pub async fn load_history(&self) -> (Vec<OperationRecord>, HistorySource) {
        match self.api.get_operations(self.user_id).await {
            Ok(ops) => (
                self.store.replace_operations(ops).await,
                HistorySource::Remote,
            ),
            Err(e) => {
                warn!("Failed to load operations, using cache: {}", e);
                (self.store.load_operations().await, HistorySource::Cache)
            }
        }
    }

    pub async fn load(&self) -> ProfileSnapshot {
        let profile = match self.api.get_user_data(self.user_id).await {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("Failed to load user {}: {}", self.user_id, e);
                None
            }
        };
        let (history, history_source) = self.load_history().await;

        ProfileSnapshot {
            profile,
            language: self.settings.get(SettingKind::Language).await,
            currency: self.settings.get(SettingKind::Currency).await,
            balance: Balance::from_operations(&history),
            history,
            history_source,
        }
    }
}
