use std::sync::Arc;

use chrono::Duration;

use observatory_core::store::NotificationStore;
use observatory_core::{Clock, EngineError};

/// Per-type notification rate gate.
///
/// The notification log is the only state: a type may fire again once its
/// minimum interval has elapsed since the last recorded send. Suppression
/// is silent — callers see `false`, not an error.
pub struct NotificationGate<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: NotificationStore> NotificationGate<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// True when `kind` is allowed to fire; records the send when it is.
    pub async fn try_acquire(&self, kind: &str, min_interval: Duration) -> Result<bool, EngineError> {
        let now = self.clock.now();
        if let Some(last) = self.store.last_sent(kind).await? {
            if now - last < min_interval {
                tracing::debug!("notification {kind} suppressed (sent {last})");
                return Ok(false);
            }
        }
        self.store.record_sent(kind, now).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryLog {
        sent: Mutex<HashMap<String, DateTime<Utc>>>,
    }

    #[async_trait]
    impl NotificationStore for MemoryLog {
        async fn last_sent(&self, kind: &str) -> Result<Option<DateTime<Utc>>, EngineError> {
            Ok(self.sent.lock().unwrap().get(kind).copied())
        }

        async fn record_sent(&self, kind: &str, at: DateTime<Utc>) -> Result<(), EngineError> {
            self.sent.lock().unwrap().insert(kind.to_string(), at);
            Ok(())
        }
    }

    struct TickingClock(Mutex<DateTime<Utc>>);

    impl Clock for TickingClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    #[tokio::test]
    async fn first_send_passes_then_suppresses_within_interval() {
        let store = Arc::new(MemoryLog::default());
        let clock = Arc::new(TickingClock(Mutex::new(
            Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap(),
        )));
        let gate = NotificationGate::new(store, clock.clone());

        assert!(gate.try_acquire("scan_signal", Duration::hours(6)).await.unwrap());
        assert!(!gate.try_acquire("scan_signal", Duration::hours(6)).await.unwrap());

        // A different type is gated independently.
        assert!(gate.try_acquire("rogue_wave", Duration::hours(6)).await.unwrap());

        // Past the interval the type may fire again.
        *clock.0.lock().unwrap() = Utc.with_ymd_and_hms(2026, 8, 1, 15, 30, 0).unwrap();
        assert!(gate.try_acquire("scan_signal", Duration::hours(6)).await.unwrap());
    }
}
