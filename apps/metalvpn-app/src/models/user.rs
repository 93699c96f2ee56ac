use metalvpn_shared::api::UserResponse;
use serde::Serialize;

/// Profile as the backend reports it. The balances here are informational;
/// the wallet view always folds the operation history instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub telegram_stars: i64,
    pub ton_balance: i64,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !full.is_empty() {
            return full;
        }
        match &self.username {
            Some(u) if !u.is_empty() => format!("@{}", u),
            _ => format!("#{}", self.user_id),
        }
    }
}

impl From<UserResponse> for UserProfile {
    fn from(r: UserResponse) -> Self {
        Self {
            user_id: r.user_id,
            username: r.username,
            first_name: r.first_name,
            last_name: r.last_name,
            avatar_url: r.avatar_url,
            telegram_stars: r.telegram_stars,
            ton_balance: r.ton_balance,
        }
    }
}
