use std::path::PathBuf;
use time::Duration;

#[derive(Clone)]
pub struct AppConfig {
    pub app_name: String,
    /// TOML file with houses and admin accounts.
    pub site: Option<PathBuf>,
    /// JSON file the subscription store persists to. In-memory when unset.
    pub subscriptions: Option<PathBuf>,
    pub page_size: usize,
    pub vapid_private_key: Option<String>,
    pub vapid_public_key: Option<String>,
    pub vapid_subject: Option<String>,
    pub auth: Option<AuthConfig>,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub key: String,
    pub token_ttl: Duration,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "Komsai Cup".to_string(),
            site: None,
            subscriptions: None,
            page_size: crate::push::DEFAULT_PAGE_SIZE,
            vapid_private_key: None,
            vapid_public_key: None,
            vapid_subject: None,
            auth: None,
        }
    }
}
