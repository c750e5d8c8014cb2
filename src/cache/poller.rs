use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{Sample, SampleCache};
use crate::sensor::SensorReader;

/// Reads the sensor and offers each result to the cache.
pub struct Poller<R> {
    reader: R,
    cache: Arc<SampleCache>,
}

impl<R: SensorReader> Poller<R> {
    pub fn new(reader: R, cache: Arc<SampleCache>) -> Self {
        Self { reader, cache }
    }

    /// One read attempt. Returns whether the result replaced the stored sample.
    pub fn poll(&mut self) -> bool {
        let reading = self.reader.read();
        let candidate = Sample::new(reading, Utc::now());
        let committed = self.cache.offer(candidate);

        if committed {
            tracing::debug!(
                status = ?candidate.status,
                temperature = candidate.temperature,
                humidity = candidate.humidity,
                "Sample committed"
            );
        } else {
            tracing::info!(
                status = ?candidate.status,
                "Read failed, keeping last good sample"
            );
        }
        committed
    }
}

/// Polls on a fixed period until the runtime shuts down.
///
/// Reads block, so each one runs on the blocking pool. The next tick is not
/// taken until the previous read has finished.
pub fn spawn_poller<R>(mut poller: Poller<R>, period: Duration) -> JoinHandle<()>
where
    R: SensorReader + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            kind = ?poller.reader.kind(),
            period_ms = period.as_millis() as u64,
            "Sensor poll loop started"
        );

        loop {
            interval.tick().await;

            let result = tokio::task::spawn_blocking(move || {
                poller.poll();
                poller
            })
            .await;

            poller = match result {
                Ok(poller) => poller,
                Err(e) => {
                    tracing::error!("Sensor read task failed: {}", e);
                    break;
                }
            };
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{RawReading, SensorKind, SensorStatus};
    use std::collections::VecDeque;

    struct Scripted(VecDeque<RawReading>);

    impl SensorReader for Scripted {
        fn read(&mut self) -> RawReading {
            self.0
                .pop_front()
                .unwrap_or(RawReading::failed(SensorStatus::Unknown))
        }

        fn kind(&self) -> SensorKind {
            SensorKind::Dht22
        }
    }

    #[test]
    fn poll_applies_policy() {
        let cache = Arc::new(SampleCache::default());
        let script = VecDeque::from(vec![
            RawReading::failed(SensorStatus::TimeoutError),
            RawReading::success(45.2, 21.7),
            RawReading::failed(SensorStatus::GpioError),
        ]);
        let mut poller = Poller::new(Scripted(script), cache.clone());

        assert!(poller.poll());
        assert_eq!(cache.snapshot().status, SensorStatus::TimeoutError);

        assert!(poller.poll());
        assert_eq!(cache.read_temperature().value, 21.7);

        // well inside the staleness window
        assert!(!poller.poll());
        assert_eq!(cache.snapshot().status, SensorStatus::Success);
    }

    #[tokio::test]
    async fn poll_loop_fills_cache() {
        let cache = Arc::new(SampleCache::default());
        let script = VecDeque::from(vec![RawReading::success(40.0, 19.5)]);
        let handle = spawn_poller(
            Poller::new(Scripted(script), cache.clone()),
            Duration::from_millis(2500),
        );

        for _ in 0..50 {
            if cache.snapshot().status == SensorStatus::Success {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        assert_eq!(cache.read_humidity().value, 40.0);
    }
}
