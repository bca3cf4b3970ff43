pub mod device;
pub mod push;
pub mod store;

pub use device::{DeviceSubscription, Permission, PushDevice, SubscriptionApi};
pub use push::PushSender;
pub use store::{Page, StoreError, SubscriptionStore};
