//! Notification delivery.
//!
//! This module handles:
//! - The `Notifier` trait the scanner and poll loop send through
//! - Telegram delivery
//! - Log-only and recording notifiers

pub mod mock;
pub mod notifier;
pub mod telegram;

pub use mock::RecordingNotifier;
pub use notifier::{LogNotifier, Notifier};
pub use telegram::TelegramNotifier;
