//! Outbound notifications: email, SMS and push.
//!
//! [`NotificationDispatcher`] owns at most one [`Notifier`] per channel and
//! turns every send into a [`NotificationResult`]; delivery errors are
//! reported, never raised.

mod dispatcher;
mod email;
mod error;
mod message;
mod mock;
mod push;
mod sms;

pub use dispatcher::{ChannelStatus, NotificationDispatcher, Notifier, NotifyConfig};
pub use email::{EmailConfig, EmailNotifier, validate_email};
pub use error::NotifyError;
pub use message::{
    NotificationMessage, NotificationResult, Recipient, delay_alert, disruption_alert,
};
pub use mock::MockNotifier;
pub use push::{
    MulticastReport, PushConfig, PushNotifier, SubscriptionReport, validate_device_token,
};
pub use sms::{SmsConfig, SmsNotifier, validate_phone};
