//! Browser-side subscription lifecycle.
//!
//! [`LifecycleClient`] keeps a device's push subscription and the server's
//! record of it in agreement. It is driven by three kinds of events: the
//! one-time [`mount`](LifecycleClient::mount), updates of the store lookup
//! ([`observe`](LifecycleClient::observe)), and the user's
//! [`subscribe`](LifecycleClient::subscribe) /
//! [`unsubscribe`](LifecycleClient::unsubscribe) actions.
//!
//! All methods take `&self` and run on one thread. The busy flag is the only
//! guard against overlapping actions from the same tab.

use crate::ports::{Permission, PushDevice, SubscriptionApi};
use crate::push::vapid::{self, APPLICATION_SERVER_KEY_LEN, KeyError};
use crate::types::push::SubscriptionId;

use std::cell::{Cell, RefCell};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("service worker registration failed: {0}")]
    Registration(String),
    #[error("device push manager failed: {0}")]
    Device(String),
    #[error("device subscription is missing its keys")]
    MissingKeys,
    #[error("subscription store request failed: {0}")]
    Store(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Checking,
    Idle,
    Subscribed,
    Denied,
    /// The device holds a subscription the store lost, and writing it back
    /// failed. Offered to the user like [`Status::Idle`].
    ResyncFailed,
}

impl Status {
    pub fn can_subscribe(self) -> bool {
        matches!(self, Status::Idle | Status::ResyncFailed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncStatus {
    Idle,
    Resyncing,
    Failed,
}

/// Latest value of a store lookup. `None` means the lookup finished and found
/// nothing, which is different from not having an answer yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPhase<T> {
    Loading,
    Value(T),
    None,
}

impl<T> From<Option<T>> for QueryPhase<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => QueryPhase::Value(value),
            None => QueryPhase::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Probe {
    Pending,
    Absent,
    Present(String),
}

pub struct LifecycleClient<D, A> {
    device: D,
    api: A,
    application_server_key: [u8; APPLICATION_SERVER_KEY_LEN],
    probe: RefCell<Probe>,
    record: RefCell<QueryPhase<SubscriptionId>>,
    resync: Cell<ResyncStatus>,
    busy: Cell<bool>,
}

impl<D, A> LifecycleClient<D, A>
where
    D: PushDevice,
    A: SubscriptionApi,
{
    pub fn new(device: D, api: A, public_key: &str) -> Result<Self, KeyError> {
        Ok(Self {
            device,
            api,
            application_server_key: vapid::application_server_key(public_key)?,
            probe: RefCell::new(Probe::Pending),
            record: RefCell::new(QueryPhase::Loading),
            resync: Cell::new(ResyncStatus::Idle),
            busy: Cell::new(false),
        })
    }

    pub fn status(&self) -> Status {
        match &*self.probe.borrow() {
            Probe::Pending => Status::Checking,
            Probe::Absent => {
                if !self.device.supports_push() || self.device.permission() == Permission::Denied {
                    Status::Denied
                } else {
                    Status::Idle
                }
            }
            Probe::Present(_) => match &*self.record.borrow() {
                QueryPhase::Loading => Status::Checking,
                QueryPhase::Value(_) => Status::Subscribed,
                QueryPhase::None => match self.resync.get() {
                    ResyncStatus::Resyncing => Status::Checking,
                    ResyncStatus::Failed => Status::ResyncFailed,
                    ResyncStatus::Idle => Status::Idle,
                },
            },
        }
    }

    pub fn resync_status(&self) -> ResyncStatus {
        self.resync.get()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    /// Registers the worker and probes for an existing device subscription,
    /// then looks it up in the store.
    pub async fn mount(&self) -> Status {
        if !self.device.supports_push() {
            self.set_probe(Probe::Absent);
            return self.status();
        }

        let existing = match self.device.register_worker().await {
            Ok(()) => self.device.existing_subscription().await,
            Err(err) => Err(err),
        };
        match existing {
            Ok(Some(subscription)) => {
                self.set_probe(Probe::Present(subscription.endpoint));
                self.refresh().await;
            }
            Ok(None) => self.set_probe(Probe::Absent),
            Err(err) => {
                tracing::warn!(error = %err, "push subscription probe failed");
                self.set_probe(Probe::Absent);
            }
        }
        self.status()
    }

    /// Re-runs the store lookup for the device endpoint and feeds the result
    /// to [`observe`](Self::observe). A failed lookup keeps the last phase.
    pub async fn refresh(&self) -> Status {
        let Some(endpoint) = self.endpoint() else {
            return self.status();
        };
        match self.api.find_by_endpoint(&endpoint).await {
            Ok(record) => self.observe(record.into()).await,
            Err(err) => {
                tracing::warn!(%endpoint, error = %err, "subscription lookup failed");
                self.status()
            }
        }
    }

    /// Accepts the latest store lookup result. When the device has a
    /// subscription the store does not, writes it back once.
    pub async fn observe(&self, phase: QueryPhase<SubscriptionId>) -> Status {
        let drifted = matches!(phase, QueryPhase::None);
        *self.record.borrow_mut() = phase;
        if drifted && self.endpoint().is_some() && self.resync.get() == ResyncStatus::Idle {
            self.resync().await;
        }
        self.status()
    }

    async fn resync(&self) {
        self.resync.set(ResyncStatus::Resyncing);
        let subscription = match self.device.existing_subscription().await {
            Ok(Some(device)) => device.into_push_subscription(),
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(error = %err, "push subscription unavailable for resync");
                None
            }
        };

        let Some(subscription) = subscription else {
            self.set_probe(Probe::Absent);
            *self.record.borrow_mut() = QueryPhase::None;
            self.resync.set(ResyncStatus::Idle);
            return;
        };

        match self.api.upsert(&subscription).await {
            Ok(id) => {
                tracing::info!(endpoint = %subscription.endpoint, "push subscription resynced");
                self.set_probe(Probe::Present(subscription.endpoint.clone()));
                *self.record.borrow_mut() = QueryPhase::Value(id);
                self.resync.set(ResyncStatus::Idle);
            }
            Err(err) => {
                tracing::error!(
                    endpoint = %subscription.endpoint,
                    error = %err,
                    "push subscription resync failed"
                );
                self.resync.set(ResyncStatus::Failed);
            }
        }
    }

    /// Asks for permission, subscribes the device and stores the
    /// subscription. Any failure leaves the state as it was.
    pub async fn subscribe(&self) -> Status {
        if self.busy.replace(true) {
            return self.status();
        }
        let result = self.try_subscribe().await;
        self.busy.set(false);

        match result {
            Ok(Some((id, endpoint))) => {
                self.set_probe(Probe::Present(endpoint));
                *self.record.borrow_mut() = QueryPhase::Value(id);
                self.resync.set(ResyncStatus::Idle);
            }
            Ok(None) => {}
            Err(err) => tracing::error!(error = %err, "failed to subscribe"),
        }
        self.status()
    }

    async fn try_subscribe(&self) -> Result<Option<(SubscriptionId, String)>, ClientError> {
        let permission = self.device.request_permission().await?;
        if permission != Permission::Granted {
            return Ok(None);
        }

        let subscription = self
            .device
            .subscribe(&self.application_server_key)
            .await?
            .into_push_subscription()
            .ok_or(ClientError::MissingKeys)?;
        let id = self.api.upsert(&subscription).await?;
        Ok(Some((id, subscription.endpoint)))
    }

    /// Cancels the device subscription, then removes the stored record. A
    /// failed removal is logged and the endpoint is forgotten regardless.
    pub async fn unsubscribe(&self) -> Status {
        let Some(endpoint) = self.endpoint() else {
            return self.status();
        };
        if self.busy.replace(true) {
            return self.status();
        }

        match self.device.unsubscribe().await {
            Ok(true) => {
                self.set_probe(Probe::Absent);
                *self.record.borrow_mut() = QueryPhase::None;
                self.resync.set(ResyncStatus::Idle);
                if let Err(err) = self.api.delete_by_endpoint(&endpoint).await {
                    tracing::error!(
                        %endpoint,
                        error = %err,
                        "stored push subscription left behind after unsubscribe"
                    );
                }
            }
            Ok(false) => {}
            Err(err) => tracing::error!(%endpoint, error = %err, "failed to unsubscribe"),
        }
        self.busy.set(false);
        self.status()
    }

    fn endpoint(&self) -> Option<String> {
        match &*self.probe.borrow() {
            Probe::Present(endpoint) => Some(endpoint.clone()),
            Probe::Pending | Probe::Absent => None,
        }
    }

    fn set_probe(&self, probe: Probe) {
        *self.probe.borrow_mut() = probe;
    }
}
