use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct VapidConfig {
    pub private_key: String,
    pub public_key: String,
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// A browser push channel as handed out by the device's push manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

impl PushSubscription {
    pub fn is_complete(&self) -> bool {
        !self.endpoint.trim().is_empty()
            && !self.keys.p256dh.trim().is_empty()
            && !self.keys.auth.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSubscription {
    pub id: SubscriptionId,
    #[serde(flatten)]
    pub subscription: PushSubscription,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    #[default]
    Reminders,
    Results,
}

impl Tag {
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Reminders => "reminders",
            Tag::Results => "results",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub tag: Tag,
}

impl NotificationPayload {
    pub fn has_content(&self) -> bool {
        !self.title.trim().is_empty() && !self.body.trim().is_empty()
    }
}

/// Icon and badge the service worker attaches to every notification.
pub const NOTIFICATION_ICON: &str = "/assets/starwhite.png";

/// Wire body of a push message, read by `static/sw.js`.
#[derive(Debug, Serialize)]
pub(crate) struct PushMessage<'a> {
    pub(crate) title: &'a str,
    pub(crate) body: &'a str,
    pub(crate) icon: &'a str,
    pub(crate) badge: &'a str,
    pub(crate) tag: Tag,
}

impl<'a> From<&'a NotificationPayload> for PushMessage<'a> {
    fn from(payload: &'a NotificationPayload) -> Self {
        Self {
            title: &payload.title,
            body: &payload.body,
            icon: NOTIFICATION_ICON,
            badge: NOTIFICATION_ICON,
            tag: payload.tag,
        }
    }
}

/// A house as ranked on the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub id: String,
    pub name: String,
    pub total_points: i64,
}
