use crate::adapters::WebPushSender;
use crate::config;
use crate::ports::SubscriptionStore;
use crate::types::push::NotificationPayload;

use std::sync::Arc;

pub mod composer;
mod dispatcher;
pub mod vapid;

pub use dispatcher::DispatchError;
pub(crate) use dispatcher::{DEFAULT_PAGE_SIZE, Dispatcher};
pub(crate) use vapid::{VapidConfigStatus, load_vapid_config};

/// Sends `payload` to every stored subscription.
///
/// Credentials and the web-push client are set up once, before the first
/// page of subscriptions is read. Individual delivery failures are logged
/// and skipped; a failed page fetch aborts the whole send.
///
/// Delivery runs on a detached task, so dropping the returned future stops
/// waiting for the outcome but never stops the send.
pub async fn send_all(
    config: &config::AppConfig,
    store: Arc<dyn SubscriptionStore>,
    payload: NotificationPayload,
) -> Result<(), DispatchError> {
    let vapid = match load_vapid_config(config) {
        VapidConfigStatus::Ready(vapid) => vapid,
        VapidConfigStatus::Incomplete => {
            tracing::warn!("push notifications disabled: incomplete VAPID configuration");
            return Err(DispatchError::NotConfigured);
        }
        VapidConfigStatus::Missing => return Err(DispatchError::NotConfigured),
    };

    let sender = WebPushSender::new(vapid)?;
    Dispatcher::new(sender, config.page_size)
        .spawn(store, payload)
        .await??;
    Ok(())
}
