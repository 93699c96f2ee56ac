use crate::storage::{keys, LocalStore};
use crate::utils::validate_string;

pub const LANGUAGES: [&str; 4] = ["Русский", "English", "中文", "Español"];
pub const CURRENCIES: [&str; 4] = ["₽ (RUB)", "$ (USD)", "€ (EUR)", "¥ (CNY)"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Language,
    Currency,
}

impl SettingKind {
    pub fn title(&self) -> &'static str {
        match self {
            SettingKind::Language => "Выберите язык",
            SettingKind::Currency => "Выберите валюту",
        }
    }

    pub fn options(&self) -> &'static [&'static str] {
        match self {
            SettingKind::Language => &LANGUAGES,
            SettingKind::Currency => &CURRENCIES,
        }
    }

    pub fn default_value(&self) -> &'static str {
        self.options()[0]
    }

    fn storage_key(&self) -> &'static str {
        match self {
            SettingKind::Language => keys::LANGUAGE,
            SettingKind::Currency => keys::CURRENCY,
        }
    }
}

impl std::str::FromStr for SettingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "language" => Ok(SettingKind::Language),
            "currency" => Ok(SettingKind::Currency),
            other => Err(format!("unknown setting: {}", other)),
        }
    }
}

/// Language and currency preferences. Values are limited to the fixed option
/// lists; anything else stored on disk reads back as the default.
#[derive(Clone)]
pub struct SettingsService {
    store: LocalStore,
}

impl SettingsService {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub async fn get(&self, kind: SettingKind) -> String {
        let stored: Option<String> = self.store.load(kind.storage_key()).await;
        match stored {
            Some(v) if kind.options().contains(&v.as_str()) => v,
            _ => kind.default_value().to_string(),
        }
    }

    /// Stores `value` if it is one of the options for `kind`. Returns the
    /// accepted value.
    pub async fn set(&self, kind: SettingKind, value: &str) -> Option<String> {
        let value = validate_string(value, 100);
        if !kind.options().contains(&value.as_str()) {
            tracing::debug!("Rejected {:?} value {:?}", kind, value);
            return None;
        }
        self.store.save(kind.storage_key(), &value).await;
        Some(value)
    }

    /// Currency symbol for price labels, e.g. `₽` out of `₽ (RUB)`.
    pub async fn currency_symbol(&self) -> String {
        let currency = self.get(SettingKind::Currency).await;
        currency
            .split(' ')
            .next()
            .unwrap_or_default()
            .to_string()
    }
}
