use crate::auth::{AuthError, AuthState};
use crate::config::AppConfig;
use crate::ports::{StoreError, SubscriptionStore};
use crate::site::{Site, SiteError};
use crate::store::MemorySubscriptionStore;

use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid auth configuration: {0}")]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Site(#[from] SiteError),
    #[error("failed to open subscription store: {0}")]
    Store(#[from] StoreError),
}

/// Handles shared by every request, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub(crate) config: AppConfig,
    pub(crate) auth: Option<AuthState>,
    pub(crate) site: Arc<Site>,
    pub(crate) store: Arc<dyn SubscriptionStore>,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> Result<Self, StartupError> {
        let auth = AuthState::from_config(&config)?;
        let site = match config.site.as_deref() {
            Some(path) => Site::load(path)?,
            None => Site::default(),
        };
        let store = match config.subscriptions.as_deref() {
            Some(path) => MemorySubscriptionStore::open(path)?,
            None => MemorySubscriptionStore::new(),
        };
        Ok(Self {
            config,
            auth,
            site: Arc::new(site),
            store: Arc::new(store),
        })
    }
}
