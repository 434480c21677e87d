use async_trait::async_trait;

use crate::error::EngineError;

/// Outbound message channel (Telegram in production, a recorder in tests).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), EngineError>;
}
