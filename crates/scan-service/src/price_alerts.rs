//! Price-alert evaluation against the latest scan results.

use chrono::Duration;

use observatory_core::{store::AlertStore, AlertMetric, Clock, EngineError, Notifier};

use crate::TickerScanResult;

/// Cooldown window per alert.
pub const PRICE_ALERT_COOLDOWN_HOURS: i64 = 24;

/// Evaluate every active alert against the scan results. Triggered alerts
/// notify and persist `last_triggered_at`; alerts inside their cooldown
/// are suppressed.
///
/// Timestamp contract: `last_triggered_at` values are `DateTime<Utc>` by
/// the store trait; stores persisting naive timestamps must have read
/// them back as UTC, or this comparison would silently shift.
pub async fn evaluate_price_alerts<S: AlertStore>(
    store: &S,
    results: &[TickerScanResult],
    notifier: &dyn Notifier,
    clock: &dyn Clock,
) -> Result<usize, EngineError> {
    let alerts = store.list_active_alerts().await?;
    if alerts.is_empty() {
        return Ok(0);
    }

    let now = clock.now();
    let cooldown = Duration::hours(PRICE_ALERT_COOLDOWN_HOURS);
    let mut triggered = 0;

    for alert in alerts {
        let Some(result) = results.iter().find(|r| r.ticker == alert.symbol) else {
            continue;
        };

        let value = match alert.metric {
            AlertMetric::Rsi => result.rsi,
            AlertMetric::Price => result.price,
            AlertMetric::Bias => result.bias,
        };
        let Some(value) = value else { continue };

        if !alert.operator.holds(value, alert.threshold) {
            continue;
        }

        if let Some(last) = alert.last_triggered_at {
            if now - last < cooldown {
                tracing::debug!("alert {} for {} inside cooldown", alert.id, alert.symbol);
                continue;
            }
        }

        let message = format!(
            "🔔 {} {:?} is {:.2}, crossed the {:?} {:.2} threshold",
            alert.symbol, alert.metric, value, alert.operator, alert.threshold
        );
        if let Err(e) = notifier.send(&message).await {
            tracing::warn!("price alert notification failed for {}: {e}", alert.symbol);
            continue;
        }

        store.mark_alert_triggered(alert.id, now).await?;
        triggered += 1;
    }

    Ok(triggered)
}
