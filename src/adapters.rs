use std::pin::Pin;
use std::sync::Arc;

use crate::ports;
use crate::types::push::{PushSubscription, VapidConfig};

/// Seconds a push service keeps an undelivered message.
const MESSAGE_TTL: u32 = 60 * 60 * 12;

#[derive(Clone)]
pub struct WebPushSender {
    vapid: VapidConfig,
    client: Arc<web_push::WebPushClient>,
}

impl WebPushSender {
    /// Validates the signing key up front so a bad key fails the whole send
    /// instead of every delivery.
    pub fn new(vapid: VapidConfig) -> Result<Self, web_push::WebPushError> {
        web_push::VapidSignatureBuilder::from_base64_no_sub(
            &vapid.private_key,
            web_push::URL_SAFE_NO_PAD,
        )?;
        let client = web_push::WebPushClient::new()?;
        Ok(Self {
            vapid,
            client: Arc::new(client),
        })
    }
}

impl ports::PushSender for WebPushSender {
    type Error = web_push::WebPushError;
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(&'a self, subscription: &'a PushSubscription, payload: &'a [u8]) -> Self::Fut<'a> {
        Box::pin(async move {
            let subscription_info = web_push::SubscriptionInfo::new(
                subscription.endpoint.clone(),
                subscription.keys.p256dh.clone(),
                subscription.keys.auth.clone(),
            );
            let mut builder = web_push::WebPushMessageBuilder::new(&subscription_info)?;
            builder.set_payload(web_push::ContentEncoding::Aes128Gcm, payload);
            builder.set_ttl(MESSAGE_TTL);
            let mut signature_builder = web_push::VapidSignatureBuilder::from_base64(
                &self.vapid.private_key,
                web_push::URL_SAFE_NO_PAD,
                &subscription_info,
            )?;
            signature_builder.add_claim("sub", self.vapid.subject.as_str());
            builder.set_vapid_signature(signature_builder.build()?);
            self.client.send(builder.build()?).await?;
            Ok(())
        })
    }
}
