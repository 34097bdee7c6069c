use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Instant};

use crate::{
    clock::Clock,
    errors::{Debounce, ReportError},
    hw_abstraction::StatusSink,
    signals as s,
    sync::watch::Watch,
    types::{
        config::{secs, ReportConfig},
        status::FlightStatus,
    },
};

const ID: &str = "status_reporter";

/// Decides when the beacon message must be refreshed: whenever the status
/// changes, and otherwise once per interval.
#[derive(Debug, Clone)]
pub struct StatusBroadcaster {
    config: ReportConfig,
    interval: Duration,
    last: Option<(Instant, FlightStatus)>,
    broadcasts: u32,
    failures: u32,
}

impl StatusBroadcaster {
    pub fn new(config: ReportConfig) -> Self {
        Self {
            interval: secs(config.interval_s),
            config,
            last: None,
            broadcasts: 0,
            failures: 0,
        }
    }

    pub fn broadcasts(&self) -> u32 {
        self.broadcasts
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// The last status the sink accepted
    pub fn last_status(&self) -> Option<FlightStatus> {
        self.last.map(|(_, status)| status)
    }

    pub fn is_due(&self, status: FlightStatus, now: Instant) -> bool {
        self.last.is_none_or(|(sent_at, sent)| {
            sent != status || now.saturating_duration_since(sent_at) >= self.interval
        })
    }

    /// Send the status if due. Returns whether a message was sent. A failed
    /// send leaves the broadcaster due, so it is retried on the next poll.
    pub async fn poll(
        &mut self,
        sink: &mut impl StatusSink,
        status: FlightStatus,
        now: Instant,
    ) -> Result<bool, ReportError> {
        if !self.is_due(status, now) {
            return Ok(false);
        }

        if self.last_status() != Some(status) {
            info!("{}: Broadcasting {} ({})", ID, status, status.beacon_message());
        }

        match sink.update_message(status.beacon_message()).await {
            Ok(()) => {
                self.last = Some((now, status));
                self.broadcasts = self.broadcasts.saturating_add(1);
                Ok(true)
            }
            Err(error) => {
                self.failures = self.failures.saturating_add(1);
                Err(error)
            }
        }
    }
}

/// Relay the published flight status to the beacon. Never returns, so run
/// it alongside the flight monitor.
pub async fn main(sink: impl StatusSink, clock: impl Clock, broadcaster: &mut StatusBroadcaster) {
    run(sink, clock, broadcaster, &s::FLIGHT_STATUS).await
}

async fn run<M: RawMutex>(
    mut sink: impl StatusSink,
    clock: impl Clock,
    broadcaster: &mut StatusBroadcaster,
    status: &Watch<FlightStatus, M>,
) {
    info!(
        "{}: Task started, re-broadcasting every {} s",
        ID, broadcaster.config.interval_s
    );

    let mut error_log = Debounce::new(Duration::from_secs(5));
    let period = Duration::from_millis(broadcaster.config.poll_interval_ms as u64);
    let mut next = clock.now() + period;

    let mut receiver = status.receiver();
    let mut current = receiver.try_get().unwrap_or_default();

    loop {
        let now = clock.now();

        if let Err(error) = broadcaster.poll(&mut sink, current, now).await {
            if let Some(error) = error_log.evaluate(error, now) {
                warn!("{}: Beacon update failed: {}", ID, error);
            }
        }

        // A new status goes out right away, without waiting for the next poll
        match select(clock.wait_until(next), receiver.changed()).await {
            Either::First(()) => next += period,
            Either::Second(latest) => current = latest,
        }
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::yield_now;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    use super::*;
    use crate::clock::ManualClock;

    #[derive(Default)]
    struct RecordingSink {
        messages: Vec<String>,
        reject: bool,
    }

    impl StatusSink for RecordingSink {
        async fn update_message(&mut self, message: &str) -> Result<(), ReportError> {
            if self.reject {
                return Err(ReportError::Rejected);
            }
            self.messages.push(message.to_string());
            Ok(())
        }
    }

    fn at(millis: u64) -> Instant {
        Instant::from_millis(millis)
    }

    #[futures_test::test]
    async fn sends_on_change_and_interval() {
        let mut sink = RecordingSink::default();
        let mut broadcaster = StatusBroadcaster::new(ReportConfig::default());
        let stopped = FlightStatus::Stopped;
        let started = FlightStatus::Started;

        assert_eq!(broadcaster.poll(&mut sink, stopped, at(0)).await, Ok(true));
        assert_eq!(broadcaster.poll(&mut sink, stopped, at(500)).await, Ok(false));

        // Change goes out right away
        assert_eq!(broadcaster.poll(&mut sink, started, at(600)).await, Ok(true));
        assert_eq!(broadcaster.poll(&mut sink, started, at(1500)).await, Ok(false));

        // Unchanged, but the interval has passed
        assert_eq!(broadcaster.poll(&mut sink, started, at(1600)).await, Ok(true));

        assert_eq!(sink.messages, ["0", "1", "1"]);
        assert_eq!(broadcaster.broadcasts(), 3);
    }

    #[futures_test::test]
    async fn failed_send_is_retried() {
        let mut sink = RecordingSink {
            reject: true,
            ..Default::default()
        };
        let mut broadcaster = StatusBroadcaster::new(ReportConfig::default());

        let result = broadcaster.poll(&mut sink, FlightStatus::Started, at(0)).await;
        assert_eq!(result, Err(ReportError::Rejected));
        assert_eq!(broadcaster.failures(), 1);
        assert!(broadcaster.is_due(FlightStatus::Started, at(50)));

        sink.reject = false;
        let result = broadcaster.poll(&mut sink, FlightStatus::Started, at(50)).await;
        assert_eq!(result, Ok(true));
        assert_eq!(broadcaster.last_status(), Some(FlightStatus::Started));
    }

    #[futures_test::test]
    async fn relays_published_status() {
        static STATUS: Watch<FlightStatus, CriticalSectionRawMutex> = Watch::new();

        let clock = ManualClock::new(at(0));
        let mut sink = RecordingSink::default();
        let mut broadcaster = StatusBroadcaster::new(ReportConfig::default());

        let script = async {
            while clock.now() < at(1000) {
                yield_now().await;
            }
            STATUS.send(FlightStatus::Started);
            while clock.now() < at(3500) {
                yield_now().await;
            }
        };

        let outcome = select(run(&mut sink, &clock, &mut broadcaster, &STATUS), script).await;
        assert!(matches!(outcome, Either::Second(())));

        // Stopped before anything was published, then the change at 1 s
        // and one refresh per second after that
        assert_eq!(sink.messages, ["0", "1", "1", "1"]);
        assert_eq!(broadcaster.broadcasts(), 4);
    }
}
