use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;

use crate::utils::clamp_delay;

pub const FONT_FALLBACK: Duration = Duration::from_secs(3);
pub const ICON_FALLBACK: Duration = Duration::from_secs(3);
pub const AVATAR_DELAY: Duration = Duration::from_millis(1500);

/// Which placeholders are still shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkeletonState {
    pub fonts_loaded: bool,
    pub icons_loaded: bool,
    pub avatar_ready: bool,
}

impl SkeletonState {
    pub fn all_ready(&self) -> bool {
        self.fonts_loaded && self.icons_loaded && self.avatar_ready
    }
}

pub struct SkeletonManager {
    tx: watch::Sender<SkeletonState>,
}

impl Default for SkeletonManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SkeletonManager {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SkeletonState::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<SkeletonState> {
        self.tx.subscribe()
    }

    pub fn state(&self) -> SkeletonState {
        *self.tx.borrow()
    }

    /// Clears placeholders as resources arrive. `fonts` resolves to whether
    /// the font load succeeded; a failure waits out the fallback instead.
    /// `icons` resolves once the icon font renders and is cut off after the
    /// fallback.
    pub async fn run<F, I>(&self, fonts: F, icons: I)
    where
        F: Future<Output = bool>,
        I: Future<Output = ()>,
    {
        let fonts = async {
            if !fonts.await {
                tracing::warn!("Font loading check failed, using fallback timer");
                time::sleep(clamp_delay(FONT_FALLBACK)).await;
            }
            self.tx.send_modify(|s| s.fonts_loaded = true);
        };
        let icons = async {
            if time::timeout(clamp_delay(ICON_FALLBACK), icons).await.is_err() {
                tracing::debug!("Icon font not detected, clearing placeholders anyway");
            }
            self.tx.send_modify(|s| s.icons_loaded = true);
        };
        let avatar = async {
            time::sleep(clamp_delay(AVATAR_DELAY)).await;
            self.tx.send_modify(|s| s.avatar_ready = true);
        };

        tokio::join!(fonts, icons, avatar);
    }
}
