//! Alert notification delivery.
//!
//! - [`Notifier`]: send one human-readable message (SMS, log, mock)
//! - [`MessageFormatter`]: render an alert into its message text
//! - [`NotificationDispatcher`]: bounded queue + worker task so a slow
//!   provider never stalls feed ingestion

pub mod dispatcher;
pub mod error;
pub mod format;
pub mod notifier;
pub mod sms;

pub use dispatcher::{DispatcherConfig, NotificationDispatcher};
pub use error::{NotifyError, NotifyResult};
pub use format::MessageFormatter;
pub use notifier::{BoxFuture, DynNotifier, LogNotifier, MockNotifier, Notifier};
pub use sms::{SmsCredentials, SmsNotifier};
