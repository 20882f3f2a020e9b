use std::time::Duration;

use futures::StreamExt;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;
use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::events::{EventSource, StatusStream};
use crate::normalizer::{normalize, StatusNormalizer};

pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// In-process change events, derived by polling the battery source.
///
/// An event is emitted only when the normalized status differs from the
/// previous one, so a level change or a charging change each produce one.
pub struct PollingEvents {
    normalizer: StatusNormalizer,
    interval: Duration,
}

impl PollingEvents {
    pub fn new(normalizer: StatusNormalizer, interval: Duration) -> Self {
        Self {
            normalizer,
            interval: interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl EventSource for PollingEvents {
    async fn open(&mut self) -> Result<StatusStream> {
        let Some(reading) = self.normalizer.read() else {
            return Err(BridgeError::Unavailable(self.normalizer.source_name()));
        };

        let mut last = normalize(&reading);
        let normalizer = self.normalizer.clone();

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!(
            interval_ms = self.interval.as_millis() as u64,
            level = last.level,
            "Polling battery for changes"
        );

        let stream = IntervalStream::new(ticker).filter_map(move |_| {
            let changed = normalizer
                .read()
                .map(|reading| normalize(&reading))
                .filter(|status| *status != last);
            if let Some(status) = changed {
                last = status;
            }
            futures::future::ready(changed)
        });

        Ok(stream.boxed_local())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSource;
    use battery_bridge_platform::{BatteryReading, ChargeState};
    use battery_bridge_protocol::StatusKind;

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_open_fails_without_battery() {
        let source = FakeSource::default();
        let mut events = PollingEvents::new(
            StatusNormalizer::new(source.shared()),
            Duration::from_millis(10),
        );

        assert!(matches!(
            events.open().await,
            Err(BridgeError::Unavailable("fake"))
        ));
    }

    #[tokio::test]
    async fn test_emits_only_changes() {
        let source = FakeSource::with(BatteryReading::new(50.0, ChargeState::Discharging));
        let mut events = PollingEvents::new(
            StatusNormalizer::new(source.shared()),
            Duration::from_millis(10),
        );
        let mut stream = events.open().await.unwrap();

        source.set(Some(BatteryReading::new(49.0, ChargeState::Discharging)));
        let status = tokio::time::timeout(WAIT, stream.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.level, 49);

        source.set(Some(BatteryReading::new(49.0, ChargeState::Charging)));
        let status = tokio::time::timeout(WAIT, stream.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.status, StatusKind::Charging);

        let quiet = tokio::time::timeout(Duration::from_millis(60), stream.next()).await;
        assert!(quiet.is_err(), "no event expected without a change");
    }

    #[test]
    fn test_interval_has_a_floor() {
        let source = FakeSource::default();
        let events = PollingEvents::new(StatusNormalizer::new(source.shared()), Duration::ZERO);
        assert_eq!(events.interval(), MIN_POLL_INTERVAL);
    }
}
