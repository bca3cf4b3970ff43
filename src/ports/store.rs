use crate::types::push::{PushSubscription, StoredSubscription, SubscriptionId};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid pagination cursor '{0}'")]
    InvalidCursor(String),
    #[error("page size must be greater than 0")]
    InvalidPageSize,
    #[error("subscription store unavailable: {0}")]
    Unavailable(String),
    #[error("subscription store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("subscription store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// One page of a scan over every stored subscription.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<StoredSubscription>,
    pub next_cursor: Option<String>,
    pub is_done: bool,
}

/// Persistence for push subscriptions, keyed by endpoint.
///
/// Callers are responsible for authorization; the store never checks identity.
pub trait SubscriptionStore: Send + Sync {
    /// Returns the id of the record for `subscription.endpoint`, inserting it
    /// when absent. Keys of an existing record are left untouched.
    fn upsert(&self, subscription: &PushSubscription) -> Result<SubscriptionId, StoreError>;

    fn find_by_endpoint(&self, endpoint: &str) -> Result<Option<StoredSubscription>, StoreError>;

    /// Returns `false` when no record matched.
    fn delete_by_endpoint(&self, endpoint: &str) -> Result<bool, StoreError>;

    fn count(&self) -> Result<usize, StoreError>;

    /// Pages are ordered by id. Pass the previous page's `next_cursor` to
    /// continue; `None` starts from the beginning.
    fn list_page(&self, cursor: Option<&str>, page_size: usize) -> Result<Page, StoreError>;
}
