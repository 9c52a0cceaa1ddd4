use core::cell::Cell;

use critical_section::Mutex;

/// Event counter shared between interrupt and task context.
///
/// Saturates instead of wrapping.
pub(crate) struct Counter(Mutex<Cell<u32>>);

impl Counter {
    pub(crate) const fn new() -> Self {
        Self(Mutex::new(Cell::new(0)))
    }

    pub(crate) fn increment(&self) {
        critical_section::with(|cs| {
            let count = self.0.borrow(cs);
            count.set(count.get().saturating_add(1));
        });
    }

    pub(crate) fn get(&self) -> u32 {
        critical_section::with(|cs| self.0.borrow(cs).get())
    }
}

/// Snapshot of CAN driver counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanStats {
    /// Received frames dropped because the event queue was full.
    pub dropped_frames: u32,
    /// Receive interrupts where the peripheral could not hand over a frame.
    pub rx_errors: u32,
    /// Frames the hardware refused to accept for transmission.
    pub tx_errors: u32,
}

/// Snapshot of SPI driver counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiStats {
    /// Completions that could not be queued; each one leaves its slot claimed.
    pub lost_completions: u32,
    /// Claims the dispatcher or a failed trigger could not release in time.
    pub release_timeouts: u32,
    /// Completions discarded because the slot was no longer claimed.
    pub spurious_completions: u32,
}
