use crate::models::PaymentMethod;
use crate::services::settings_service::SettingKind;
use crate::utils::sanitize_number;

pub const PRESET_AMOUNTS: [u64; 4] = [100, 500, 1000, 5000];
pub const MIN_TOPUP: i64 = 1;
pub const MAX_TOPUP: i64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalId {
    TopUp,
    Settings(SettingKind),
}

/// Amount and method picked in the top-up dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopUpForm {
    preset: Option<u64>,
    custom: String,
    method: Option<PaymentMethod>,
}

impl TopUpForm {
    pub fn select_preset(&mut self, amount: u64) {
        self.preset = Some(amount);
        self.custom.clear();
    }

    /// Takes raw text from the custom amount field and returns what the field
    /// should show after correction.
    pub fn input_custom(&mut self, raw: &str) -> &str {
        if raw.trim().is_empty() {
            self.custom.clear();
            return &self.custom;
        }
        let value = sanitize_number(raw, MIN_TOPUP, MAX_TOPUP, MIN_TOPUP);
        self.custom = value.to_string();
        self.preset = None;
        &self.custom
    }

    pub fn select_method(&mut self, method: PaymentMethod) {
        self.method = Some(method);
    }

    /// A preset button wins over the custom field.
    pub fn selected_amount(&self) -> Option<u64> {
        if let Some(amount) = self.preset {
            return Some(amount.clamp(MIN_TOPUP as u64, MAX_TOPUP as u64));
        }
        if self.custom.is_empty() {
            return None;
        }
        let amount = sanitize_number(&self.custom, MIN_TOPUP, MAX_TOPUP, 0);
        (amount >= MIN_TOPUP).then_some(amount as u64)
    }

    pub fn selected_method(&self) -> Option<PaymentMethod> {
        self.method
    }

    pub fn selection(&self) -> Option<(u64, PaymentMethod)> {
        Some((self.selected_amount()?, self.method?))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Default)]
pub struct ModalManager {
    active: Option<ModalId>,
    topup: TopUpForm,
}

impl ModalManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<ModalId> {
        self.active
    }

    pub fn topup(&self) -> &TopUpForm {
        &self.topup
    }

    pub fn topup_mut(&mut self) -> &mut TopUpForm {
        &mut self.topup
    }

    pub fn open(&mut self, modal: ModalId) {
        if let Some(prev) = self.active.filter(|m| *m != modal) {
            self.close(prev);
        }
        self.active = Some(modal);
    }

    /// Closes `modal` if it is the open one and clears its state.
    pub fn close(&mut self, modal: ModalId) -> bool {
        if self.active != Some(modal) {
            return false;
        }
        self.active = None;
        if modal == ModalId::TopUp {
            self.topup.reset();
        }
        true
    }

    pub fn escape(&mut self) -> Option<ModalId> {
        let active = self.active?;
        self.close(active);
        Some(active)
    }
}
