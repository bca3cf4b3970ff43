//! Seams used by the subscription lifecycle client.
//!
//! Both traits model a single browser tab: futures are awaited one at a time
//! on the tab's event loop, so nothing here needs to be `Send`.
#![allow(async_fn_in_trait)]

use crate::client::ClientError;
use crate::types::push::{PushSubscription, SubscriptionId, SubscriptionKeys};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Default,
    Granted,
    Denied,
}

/// A subscription as reported by the device's push manager. Keys can be
/// missing when the platform fails to serialize the subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSubscription {
    pub endpoint: String,
    pub keys: Option<SubscriptionKeys>,
}

impl DeviceSubscription {
    pub fn into_push_subscription(self) -> Option<PushSubscription> {
        let keys = self.keys?;
        if self.endpoint.is_empty() {
            return None;
        }
        Some(PushSubscription {
            endpoint: self.endpoint,
            keys,
        })
    }
}

pub trait PushDevice {
    /// Whether the platform offers service workers and a push manager at all.
    fn supports_push(&self) -> bool;

    fn permission(&self) -> Permission;

    async fn register_worker(&self) -> Result<(), ClientError>;

    async fn existing_subscription(&self) -> Result<Option<DeviceSubscription>, ClientError>;

    async fn request_permission(&self) -> Result<Permission, ClientError>;

    async fn subscribe(&self, application_server_key: &[u8])
    -> Result<DeviceSubscription, ClientError>;

    /// Cancels the current device subscription. Returns `false` when there was
    /// none to cancel.
    async fn unsubscribe(&self) -> Result<bool, ClientError>;
}

/// Remote access to the subscription store from the device.
pub trait SubscriptionApi {
    /// Id of the stored record for `endpoint`, if any. Keys never travel back.
    async fn find_by_endpoint(&self, endpoint: &str)
    -> Result<Option<SubscriptionId>, ClientError>;

    async fn upsert(&self, subscription: &PushSubscription) -> Result<SubscriptionId, ClientError>;

    async fn delete_by_endpoint(&self, endpoint: &str) -> Result<(), ClientError>;
}
