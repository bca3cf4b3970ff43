use crate::ports::{PushSender, StoreError, SubscriptionStore};
use crate::types::push::{NotificationPayload, PushMessage};

use std::sync::Arc;
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle, JoinSet};

pub(crate) const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("push notifications are not configured")]
    NotConfigured,
    #[error("failed to initialize push sender: {0}")]
    Sender(#[from] web_push::WebPushError),
    #[error("failed to encode push message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to fetch subscriptions: {0}")]
    Store(#[from] StoreError),
    #[error("dispatch task did not complete: {0}")]
    Interrupted(#[from] JoinError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DispatchSummary {
    pub(crate) attempted: usize,
    pub(crate) failed: usize,
}

/// Delivers one message to every stored subscription, a page at a time.
///
/// All deliveries of a page run concurrently and are joined before the next
/// page is fetched, so at most `page_size` deliveries are in flight.
#[derive(Debug, Clone)]
pub(crate) struct Dispatcher<S> {
    sender: S,
    page_size: usize,
}

impl<S> Dispatcher<S>
where
    S: PushSender,
{
    pub(crate) fn new(sender: S, page_size: usize) -> Self {
        Self {
            sender,
            page_size: page_size.max(1),
        }
    }

    pub(crate) async fn dispatch(
        &self,
        store: &dyn SubscriptionStore,
        payload: &NotificationPayload,
    ) -> Result<DispatchSummary, DispatchError> {
        let message: Arc<[u8]> = serde_json::to_vec(&PushMessage::from(payload))?.into();
        let mut summary = DispatchSummary::default();
        let mut cursor: Option<String> = None;

        loop {
            let page = store.list_page(cursor.as_deref(), self.page_size)?;
            let mut deliveries = JoinSet::new();
            for stored in page.items {
                let sender = self.sender.clone();
                let message = Arc::clone(&message);
                deliveries.spawn(async move {
                    let subscription = stored.subscription;
                    let result = sender
                        .send(&subscription, &message)
                        .await
                        .map_err(|err| err.to_string());
                    (subscription.endpoint, result)
                });
            }

            while let Some(joined) = deliveries.join_next().await {
                summary.attempted += 1;
                match joined {
                    Ok((_, Ok(()))) => {}
                    Ok((endpoint, Err(err))) => {
                        summary.failed += 1;
                        tracing::warn!(%endpoint, error = %err, "push delivery failed");
                    }
                    Err(err) => {
                        summary.failed += 1;
                        tracing::error!(error = %err, "push delivery task did not complete");
                    }
                }
            }

            if page.is_done {
                break;
            }
            cursor = page.next_cursor;
        }

        tracing::info!(
            attempted = summary.attempted,
            failed = summary.failed,
            tag = payload.tag.as_str(),
            "push notification dispatched"
        );
        Ok(summary)
    }

    /// Runs [`dispatch`](Self::dispatch) on its own task. Dropping the handle
    /// detaches the task; every page is still delivered.
    pub(crate) fn spawn(
        self,
        store: Arc<dyn SubscriptionStore>,
        payload: NotificationPayload,
    ) -> JoinHandle<Result<DispatchSummary, DispatchError>> {
        tokio::spawn(async move { self.dispatch(store.as_ref(), &payload).await })
    }
}
