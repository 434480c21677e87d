//! Outbound notifications: a Telegram Bot HTTP channel plus a per-type
//! rate gate backed by the notification log.

mod gate;
mod telegram;

pub use gate::NotificationGate;
pub use telegram::{split_message, TelegramConfig, TelegramNotifier, TELEGRAM_MAX_MESSAGE_LEN};
