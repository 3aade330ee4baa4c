//! Bundled channel providers.
//!
//! Real email/SMS/voice/push providers live outside this crate; they either
//! implement [`NotificationChannel`](super::NotificationChannel) directly or
//! sit behind an HTTP gateway reached through [`WebhookChannel`].

mod log;
mod webhook;

pub use self::log::LogChannel;
pub use webhook::WebhookChannel;
