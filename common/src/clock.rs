//! Monotonic time source for the detection core and its tasks.
//!
//! Real deployments use [`SystemClock`], backed by the embassy time driver.
//! Accelerated replays and tests use [`ManualClock`], which only moves when
//! told to, so dwell and timeout checks become fully deterministic.

use core::cell::Cell;
use core::future::poll_fn;
use core::task::Poll;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use embassy_time::{Duration, Instant, Timer};

#[allow(async_fn_in_trait)]
pub trait Clock {
    /// The current instant, never decreasing between calls
    fn now(&self) -> Instant;

    /// Resolve once `now()` has reached `deadline`
    async fn wait_until(&self, deadline: Instant);
}

impl<C: Clock> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    async fn wait_until(&self, deadline: Instant) {
        (**self).wait_until(deadline).await
    }
}

/// The system clock, as provided by the embassy time driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn wait_until(&self, deadline: Instant) {
        Timer::at(deadline).await
    }
}

/// A clock that is advanced explicitly.
///
/// Waiting on a deadline in the future jumps the clock forward to it, then
/// yields once so other tasks on the same executor get to observe the new
/// time before the waiter continues.
pub struct ManualClock {
    now: Mutex<CriticalSectionRawMutex, Cell<Instant>>,
}

impl ManualClock {
    pub const fn new(start: Instant) -> Self {
        Self {
            now: Mutex::new(Cell::new(start)),
        }
    }

    pub fn set(&self, instant: Instant) {
        self.now.lock(|now| {
            if instant > now.get() {
                now.set(instant)
            }
        })
    }

    pub fn advance(&self, duration: Duration) {
        self.now.lock(|now| now.set(now.get() + duration))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Instant::from_ticks(0))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.lock(|now| now.get())
    }

    async fn wait_until(&self, deadline: Instant) {
        self.set(deadline);

        let mut yielded = false;
        poll_fn(|cx| {
            if yielded {
                Poll::Ready(())
            } else {
                yielded = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        })
        .await
    }
}
