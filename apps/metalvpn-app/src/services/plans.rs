use serde_json::{json, Value};

use crate::services::settings_service::SettingsService;
use crate::storage::{keys, LocalStore};
use crate::utils::{format_price, sanitize_number, validate_string};

pub const BASE_PRICE: f64 = 500.0;
pub const MAX_DEVICES: u8 = 10;
pub const MAX_PERIOD: u8 = 3;
const CUSTOM_DEVICES_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceChoice {
    Count(u8),
    /// The "more" button; the count comes from a separate field and may be
    /// missing while the user types.
    Custom(Option<u8>),
}

impl DeviceChoice {
    fn multiplier(&self) -> f64 {
        match self {
            DeviceChoice::Count(1) => 1.0,
            DeviceChoice::Count(2) => 1.5,
            DeviceChoice::Count(_) => 1.0,
            DeviceChoice::Custom(Some(n)) => CUSTOM_DEVICES_MULTIPLIER * (*n as f64 / 2.0),
            DeviceChoice::Custom(None) => CUSTOM_DEVICES_MULTIPLIER,
        }
    }

    /// `1`..`10`, `"custom"`, or `{"custom": n}` once a count was typed.
    fn to_stored(self) -> Value {
        match self {
            DeviceChoice::Count(n) => Value::from(n),
            DeviceChoice::Custom(None) => Value::from("custom"),
            DeviceChoice::Custom(Some(n)) => json!({ "custom": n }),
        }
    }

    fn from_stored(value: Option<Value>) -> Self {
        match value {
            Some(Value::String(s)) if s == "custom" => DeviceChoice::Custom(None),
            Some(Value::Object(map)) => {
                let count = map
                    .get("custom")
                    .map(|v| sanitize_number(&v.to_string(), i64::MIN, MAX_DEVICES as i64, 0))
                    .filter(|n| *n >= 1)
                    .map(|n| n as u8);
                DeviceChoice::Custom(count)
            }
            Some(Value::String(s)) => {
                DeviceChoice::Count(sanitize_number(&s, 1, MAX_DEVICES as i64, 1) as u8)
            }
            Some(Value::Number(n)) => DeviceChoice::Count(
                sanitize_number(&n.to_string(), 1, MAX_DEVICES as i64, 1) as u8,
            ),
            _ => DeviceChoice::Count(1),
        }
    }
}

fn period_multiplier(period: u8) -> f64 {
    match period {
        2 => 1.8,
        3 => 2.5,
        _ => 1.0,
    }
}

/// Price for a device/period combination, in whole currency units.
pub fn plan_price(devices: DeviceChoice, period: u8) -> i64 {
    (BASE_PRICE * devices.multiplier() * period_multiplier(period)).round() as i64
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSelection {
    pub protocol: String,
    pub location: String,
    pub devices: DeviceChoice,
    pub period: u8,
}

impl Default for PlanSelection {
    fn default() -> Self {
        Self {
            protocol: "openvpn".to_string(),
            location: "netherlands".to_string(),
            devices: DeviceChoice::Count(1),
            period: 1,
        }
    }
}

/// Segmented controls on the plans screen plus the price they produce.
pub struct PlansManager {
    store: LocalStore,
    settings: SettingsService,
    selection: PlanSelection,
}

impl PlansManager {
    pub async fn load(store: LocalStore, settings: SettingsService) -> Self {
        let defaults = PlanSelection::default();
        let protocol = store
            .load::<String>(keys::SELECTED_PROTOCOL)
            .await
            .map(|p| validate_string(&p, 50))
            .filter(|p| !p.is_empty())
            .unwrap_or(defaults.protocol);
        let location = store
            .load::<String>(keys::SELECTED_LOCATION)
            .await
            .map(|l| validate_string(&l, 50))
            .filter(|l| !l.is_empty())
            .unwrap_or(defaults.location);
        let devices = DeviceChoice::from_stored(store.load_raw(keys::SELECTED_DEVICES).await);
        let period = store
            .load_raw(keys::SELECTED_PERIOD)
            .await
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .map(|raw| sanitize_number(&raw, 1, MAX_PERIOD as i64, 1) as u8)
            .unwrap_or(1);

        Self {
            store,
            settings,
            selection: PlanSelection {
                protocol,
                location,
                devices,
                period,
            },
        }
    }

    pub fn selection(&self) -> &PlanSelection {
        &self.selection
    }

    pub async fn select_protocol(&mut self, protocol: &str) {
        let protocol = validate_string(protocol, 50);
        if protocol.is_empty() {
            return;
        }
        self.store.save(keys::SELECTED_PROTOCOL, &protocol).await;
        self.selection.protocol = protocol;
    }

    pub async fn select_location(&mut self, location: &str) {
        let location = validate_string(location, 50);
        if location.is_empty() {
            return;
        }
        self.store.save(keys::SELECTED_LOCATION, &location).await;
        self.selection.location = location;
    }

    /// Handles a devices button; `raw` is the button value (`1`, `2`, ... or
    /// `custom`).
    pub async fn select_devices(&mut self, raw: &str) {
        let choice = if raw.trim() == "custom" {
            DeviceChoice::Custom(None)
        } else {
            DeviceChoice::Count(sanitize_number(raw, 1, MAX_DEVICES as i64, 1) as u8)
        };
        self.store
            .save(keys::SELECTED_DEVICES, &choice.to_stored())
            .await;
        self.selection.devices = choice;
    }

    /// Custom device count field. Values above the maximum are capped; zero or
    /// garbage leaves the selection alone.
    pub async fn input_custom_devices(&mut self, raw: &str) {
        let value = sanitize_number(raw, i64::MIN, MAX_DEVICES as i64, 0);
        if value < 1 {
            return;
        }
        let choice = DeviceChoice::Custom(Some(value as u8));
        self.store
            .save(keys::SELECTED_DEVICES, &choice.to_stored())
            .await;
        self.selection.devices = choice;
    }

    pub async fn select_period(&mut self, raw: &str) {
        let period = sanitize_number(raw, 1, MAX_PERIOD as i64, 1) as u8;
        self.store.save(keys::SELECTED_PERIOD, &period).await;
        self.selection.period = period;
    }

    pub fn price(&self) -> i64 {
        plan_price(self.selection.devices, self.selection.period)
    }

    pub async fn price_label(&self) -> String {
        format_price(self.price(), &self.settings.currency_symbol().await)
    }
}
