use core::cell::RefCell;

use critical_section::Mutex;
use embassy_time::Duration;
use heapless::Deque;

use crate::bus::{stats::Counter, wake::WakeSignal};

/// Bounded FIFO carrying events from interrupt context to a dispatcher task.
///
/// The producer side ([`post`](Self::post)) never blocks: when the queue is full the
/// event is dropped and counted, and no wake is raised. Each successful post raises
/// the paired [`WakeSignal`] once.
///
/// `N` is the queue capacity.
pub struct DeferredQueue<T, const N: usize> {
    items: Mutex<RefCell<Deque<T, N>>>,
    wake: WakeSignal,
    dropped: Counter,
}

impl<T, const N: usize> core::fmt::Debug for DeferredQueue<T, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("capacity", &N)
            .field("len", &self.len())
            .field("dropped", &self.dropped())
            .finish()
    }
}

impl<T, const N: usize> DeferredQueue<T, N> {
    pub const fn new() -> Self {
        Self {
            items: Mutex::new(RefCell::new(Deque::new())),
            wake: WakeSignal::new(),
            dropped: Counter::new(),
        }
    }

    /// Interrupt-side push.
    ///
    /// On overflow the event is handed back and counted as dropped.
    pub fn post(&self, item: T) -> Result<(), T> {
        let pushed = critical_section::with(|cs| self.items.borrow_ref_mut(cs).push_back(item));
        match pushed {
            Ok(()) => {
                self.wake.raise();
                Ok(())
            }
            Err(item) => {
                self.dropped.increment();
                Err(item)
            }
        }
    }

    /// Non-blocking pop of the oldest event.
    pub fn try_pop(&self) -> Option<T> {
        critical_section::with(|cs| self.items.borrow_ref_mut(cs).pop_front())
    }

    /// Waits for the wake signal for at most `timeout`.
    ///
    /// Returns the number of wakes taken, or `None` if the timeout elapsed.
    pub async fn wait(&self, timeout: Duration) -> Option<u32> {
        self.wake.wait_timeout(timeout).await
    }

    /// Pops every queued event, oldest first, and passes it to `f`.
    ///
    /// Events posted while draining are drained too. Returns the count handled.
    pub fn drain(&self, mut f: impl FnMut(T)) -> usize {
        let mut handled = 0;
        while let Some(item) = self.try_pop() {
            f(item);
            handled += 1;
        }
        handled
    }

    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.items.borrow_ref(cs).len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of events dropped on overflow since creation.
    pub fn dropped(&self) -> u32 {
        self.dropped.get()
    }
}

impl<T, const N: usize> Default for DeferredQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
