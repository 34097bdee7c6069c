use core::cell::RefCell;
use core::future::poll_fn;
use core::task::Poll;

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::waitqueue::MultiWakerRegistration;

/// Number of receivers that can await a change at the same time. Registering
/// more wakes all current waiters, which simply re-register when polled.
const MAX_WAITERS: usize = 4;

/// A single-value broadcast cell. Senders overwrite the value, receivers
/// observe the latest one and can tell whether it changed since they last
/// looked.
pub struct Watch<T, M: RawMutex = CriticalSectionRawMutex> {
    state: Mutex<M, RefCell<State<T>>>,
}

struct State<T> {
    value: Option<T>,
    msg_id: usize,
    wakers: MultiWakerRegistration<MAX_WAITERS>,
}

impl<T: Clone, M: RawMutex> Watch<T, M> {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(State {
                value: None,
                msg_id: 0,
                wakers: MultiWakerRegistration::new(),
            })),
        }
    }

    pub const fn sender(&self) -> Sender<'_, T, M> {
        Sender { watch: self }
    }

    pub const fn receiver(&self) -> Receiver<'_, T, M> {
        Receiver {
            watch: self,
            msg_id: 0,
        }
    }

    pub fn try_get(&self) -> Option<T> {
        self.inner_getter(None).map(|(value, _)| value)
    }

    pub fn is(&self, other: &T) -> bool
    where
        T: PartialEq,
    {
        self.state.lock(|state| {
            state
                .borrow()
                .value
                .as_ref()
                .is_some_and(|inner| inner == other)
        })
    }

    pub fn get_msg_id(&self) -> usize {
        self.state.lock(|state| state.borrow().msg_id)
    }

    pub fn send(&self, value: T) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            state.msg_id = state.msg_id.wrapping_add(1);
            state.value = Some(value);
            state.wakers.wake();
        });
    }

    /// Send the value only if it differs from the current one, returning
    /// whether it was sent.
    pub fn send_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            if state.value.as_ref() == Some(&value) {
                return false;
            }
            state.msg_id = state.msg_id.wrapping_add(1);
            state.value = Some(value);
            state.wakers.wake();
            true
        })
    }

    fn inner_getter(&self, msg_id: Option<usize>) -> Option<(T, usize)> {
        self.state.lock(|state| {
            let state = state.borrow();

            // Wrapping comparison, a receiver would have to be exactly
            // 2^usize::BITS messages behind to miss one.
            if msg_id.is_some_and(|msg_id| state.msg_id.wrapping_sub(msg_id) == 0) {
                return None;
            }

            state
                .value
                .as_ref()
                .map(|value| (value.clone(), state.msg_id))
        })
    }
}

impl<T: Clone, M: RawMutex> Default for Watch<T, M> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Receiver<'a, T, M: RawMutex = CriticalSectionRawMutex> {
    watch: &'a Watch<T, M>,
    msg_id: usize,
}

impl<T: Clone, M: RawMutex> Receiver<'_, T, M> {
    /// Wait for a value this receiver has not seen yet.
    pub async fn changed(&mut self) -> T {
        poll_fn(|cx| {
            // Check and register under the same lock, so a send cannot slip
            // in between and get lost.
            self.watch.state.lock(|state| {
                let mut state = state.borrow_mut();
                match &state.value {
                    Some(value) if state.msg_id != self.msg_id => {
                        self.msg_id = state.msg_id;
                        Poll::Ready(value.clone())
                    }
                    _ => {
                        state.wakers.register(cx.waker());
                        Poll::Pending
                    }
                }
            })
        })
        .await
    }

    pub fn try_changed(&mut self) -> Option<T> {
        self.watch
            .inner_getter(Some(self.msg_id))
            .map(|(value, msg_id)| {
                self.msg_id = msg_id;
                value
            })
    }

    pub fn try_get(&mut self) -> Option<T> {
        self.watch.inner_getter(None).map(|(value, msg_id)| {
            self.msg_id = msg_id;
            value
        })
    }
}

pub struct Sender<'a, T, M: RawMutex = CriticalSectionRawMutex> {
    watch: &'a Watch<T, M>,
}

impl<T: Clone, M: RawMutex> Sender<'_, T, M> {
    pub fn send(&mut self, value: T) {
        self.watch.send(value);
    }

    pub fn send_if_changed(&mut self, value: T) -> bool
    where
        T: PartialEq,
    {
        self.watch.send_if_changed(value)
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::join::join;
    use embassy_futures::yield_now;

    use super::*;

    static TEST_NUMBERS: &[i32] = &[1, 3, 3, 7];

    async fn multi_yield(num: usize) {
        for _ in 0..num {
            yield_now().await
        }
    }

    #[futures_test::test]
    async fn test_async_changed() {
        static WATCH: Watch<i32> = Watch::new();

        let receive = async {
            let mut receiver = WATCH.receiver();
            for expected in TEST_NUMBERS {
                assert_eq!(receiver.changed().await, *expected);
                multi_yield(5).await;
            }
        };

        let send = async {
            let mut sender = WATCH.sender();
            for number in TEST_NUMBERS {
                sender.send(*number);
                multi_yield(10).await;
            }
        };

        join(receive, send).await;
    }

    #[test]
    fn test_various() {
        static WATCH: Watch<i32> = Watch::new();

        let mut sender = WATCH.sender();
        let mut receiver = WATCH.receiver();

        assert_eq!(receiver.try_changed(), None);
        assert_eq!(receiver.try_get(), None);

        sender.send(10);

        assert_eq!(receiver.try_changed(), Some(10));
        assert_eq!(receiver.try_changed(), None);
        assert_eq!(receiver.try_get(), Some(10));

        sender.send(20);

        assert_eq!(receiver.try_get(), Some(20));
        assert_eq!(receiver.try_changed(), None);

        assert!(WATCH.is(&20));
        assert!(!sender.send_if_changed(20));
        assert_eq!(receiver.try_changed(), None);
        assert!(sender.send_if_changed(30));
        assert_eq!(receiver.try_changed(), Some(30));
    }
}
