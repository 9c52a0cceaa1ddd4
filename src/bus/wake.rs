use core::cell::Cell;
use core::future::poll_fn;
use core::task::Poll;

use critical_section::Mutex;
use embassy_sync::waitqueue::AtomicWaker;
use embassy_time::{Duration, with_timeout};

/// Counting wake signal from interrupt context to a dispatcher task.
///
/// [`raise`](Self::raise) never blocks and may be called from an ISR. The waiting
/// task takes all pending counts at once.
pub struct WakeSignal {
    pending: Mutex<Cell<u32>>,
    waker: AtomicWaker,
}

impl core::fmt::Debug for WakeSignal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WakeSignal").finish_non_exhaustive()
    }
}

impl WakeSignal {
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(Cell::new(0)),
            waker: AtomicWaker::new(),
        }
    }

    /// Adds one count and wakes the waiting task.
    pub fn raise(&self) {
        critical_section::with(|cs| {
            let pending = self.pending.borrow(cs);
            pending.set(pending.get().saturating_add(1));
        });
        self.waker.wake();
    }

    /// Takes all pending counts without waiting.
    pub fn try_take(&self) -> u32 {
        critical_section::with(|cs| self.pending.borrow(cs).replace(0))
    }

    /// Waits until at least one count is pending, then takes all of them.
    pub async fn wait(&self) -> u32 {
        poll_fn(|cx| {
            let taken = self.try_take();
            if taken > 0 {
                return Poll::Ready(taken);
            }
            self.waker.register(cx.waker());
            // A raise between the take and the register would otherwise be missed
            match self.try_take() {
                0 => Poll::Pending,
                taken => Poll::Ready(taken),
            }
        })
        .await
    }

    /// Like [`wait`](Self::wait), but gives up after `timeout` and returns `None`.
    pub async fn wait_timeout(&self, timeout: Duration) -> Option<u32> {
        with_timeout(timeout, self.wait()).await.ok()
    }
}

impl Default for WakeSignal {
    fn default() -> Self {
        Self::new()
    }
}
