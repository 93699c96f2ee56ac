use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::storage::{keys, LocalStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Home,
    Guide,
    Profile,
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "home" => Ok(View::Home),
            "guide" => Ok(View::Guide),
            "profile" => Ok(View::Profile),
            other => Err(format!("unknown view: {}", other)),
        }
    }
}

/// What the caller has to do after a tab switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEffect {
    None,
    DetectPlatform,
    RefreshProfile,
}

pub struct Navigation {
    current: View,
    store: LocalStore,
}

impl Navigation {
    /// Restores the last opened tab. Unknown stored values fall back to Home.
    pub async fn restore(store: LocalStore) -> (Self, ViewEffect) {
        let saved = store
            .load::<String>(keys::CURRENT_VIEW)
            .await
            .and_then(|v| v.parse::<View>().ok())
            .unwrap_or_default();

        let mut nav = Self {
            current: View::Home,
            store,
        };
        let effect = nav.switch_view(saved).await;
        (nav, effect)
    }

    pub fn current(&self) -> View {
        self.current
    }

    pub async fn switch_view(&mut self, view: View) -> ViewEffect {
        if self.current == view {
            return ViewEffect::None;
        }
        tracing::debug!("View {:?} -> {:?}", self.current, view);
        self.current = view;
        self.store.save(keys::CURRENT_VIEW, &view).await;

        match view {
            View::Home => ViewEffect::None,
            View::Guide => ViewEffect::DetectPlatform,
            View::Profile => ViewEffect::RefreshProfile,
        }
    }
}
