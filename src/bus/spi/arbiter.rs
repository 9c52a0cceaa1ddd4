use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, with_timeout};

use crate::bus::{BusError, SlotId};

/// Where a slot is in its claim lifecycle.
///
/// `Idle -> Claimed -> TransferPending -> CompletionQueued -> Idle`. A failed trigger
/// goes from `Claimed` straight back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClaimState {
    #[default]
    Idle,
    /// Owned by a caller that has not started its transfer yet.
    Claimed,
    /// Transfer running; waiting for the completion interrupt.
    TransferPending,
    /// Completion queued for the dispatcher.
    CompletionQueued,
}

/// Proof of exclusive ownership of one slot, handed out by [`Arbiter::claim`].
#[must_use = "a claim that is neither triggered nor released keeps the bus busy"]
#[derive(Debug)]
pub struct Ownership {
    slot: SlotId,
}

impl Ownership {
    pub fn slot(&self) -> SlotId {
        self.slot
    }
}

/// Outcome of a dispatcher-side completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Completion {
    /// The claimant's callback ran and the slot is idle again.
    Released,
    /// The slot had no queued completion; nothing ran and any claim is untouched.
    Spurious,
    /// The slot lock could not be taken in time; the slot stays claimed.
    LockTimeout,
}

struct ArbiterSlot<C> {
    /// Current claimant; `Some` while the slot is in use.
    record: Mutex<CriticalSectionRawMutex, Option<C>>,
    stage: critical_section::Mutex<Cell<ClaimState>>,
}

impl<C> ArbiterSlot<C> {
    const fn new() -> Self {
        Self {
            record: Mutex::new(None),
            stage: critical_section::Mutex::new(Cell::new(ClaimState::Idle)),
        }
    }
}

/// Per-slot exclusive ownership with bounded waits.
///
/// The in-use record sits behind an async mutex that task context takes with a
/// timeout. Interrupt context never touches it; it only reads and advances the
/// lifecycle stage, which lives in a critical-section cell.
pub struct Arbiter<C, const N: usize> {
    slots: [ArbiterSlot<C>; N],
}

impl<C: Copy, const N: usize> Arbiter<C, N> {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| ArbiterSlot::new()),
        }
    }

    /// Claims `slot` for `claimant`.
    ///
    /// Fails with [`BusError::Busy`] if the slot is already in use or its lock is not
    /// available within `timeout`.
    pub async fn claim(
        &self,
        slot: SlotId,
        claimant: C,
        timeout: Duration,
    ) -> Result<Ownership, BusError> {
        let entry = &self.slots[slot.index()];
        let mut record = with_timeout(timeout, entry.record.lock())
            .await
            .map_err(|_| BusError::Busy)?;

        if record.is_some() {
            return Err(BusError::Busy);
        }
        *record = Some(claimant);
        critical_section::with(|cs| entry.stage.borrow(cs).set(ClaimState::Claimed));
        Ok(Ownership { slot })
    }

    /// Gives a claim back without a transfer.
    ///
    /// On lock timeout the slot stays claimed and [`BusError::Busy`] is returned.
    pub async fn release(&self, ownership: Ownership, timeout: Duration) -> Result<(), BusError> {
        let entry = &self.slots[ownership.slot.index()];
        let mut record = with_timeout(timeout, entry.record.lock())
            .await
            .map_err(|_| BusError::Busy)?;

        *record = None;
        critical_section::with(|cs| entry.stage.borrow(cs).set(ClaimState::Idle));
        Ok(())
    }

    /// Marks the claimed slot as having a transfer in flight.
    pub fn mark_pending(&self, cs: critical_section::CriticalSection<'_>, ownership: &Ownership) {
        self.slots[ownership.slot.index()]
            .stage
            .borrow(cs)
            .set(ClaimState::TransferPending);
    }

    /// Interrupt-side transition once the completion has been queued.
    pub fn mark_completion_queued(&self, cs: critical_section::CriticalSection<'_>, slot: SlotId) {
        self.slots[slot.index()]
            .stage
            .borrow(cs)
            .set(ClaimState::CompletionQueued);
    }

    pub fn state_cs(&self, cs: critical_section::CriticalSection<'_>, slot: SlotId) -> ClaimState {
        self.slots[slot.index()].stage.borrow(cs).get()
    }

    pub fn state(&self, slot: SlotId) -> ClaimState {
        critical_section::with(|cs| self.state_cs(cs, slot))
    }

    /// Finishes the transfer on `slot`: runs `on_complete` with the claimant while the
    /// slot is still in use, then releases it.
    ///
    /// Only a slot in [`ClaimState::CompletionQueued`] is finished. A stale or
    /// repeated completion that finds the slot idle, or owned by a newer claimant
    /// whose transfer has not completed, is [`Completion::Spurious`].
    pub async fn complete(
        &self,
        slot: SlotId,
        timeout: Duration,
        on_complete: impl FnOnce(C),
    ) -> Completion {
        let entry = &self.slots[slot.index()];
        let Ok(mut record) = with_timeout(timeout, entry.record.lock()).await else {
            return Completion::LockTimeout;
        };

        let queued = self.state(slot) == ClaimState::CompletionQueued;
        let Some(claimant) = (*record).filter(|_| queued) else {
            return Completion::Spurious;
        };
        on_complete(claimant);
        *record = None;
        critical_section::with(|cs| entry.stage.borrow(cs).set(ClaimState::Idle));
        Completion::Released
    }
}

#[cfg(test)]
impl<C, const N: usize> Arbiter<C, N> {
    /// Takes the lock of `slot` away from everyone else until the guard drops.
    pub(crate) fn hold(
        &self,
        slot: SlotId,
    ) -> embassy_sync::mutex::MutexGuard<'_, CriticalSectionRawMutex, Option<C>> {
        self.slots[slot.index()].record.try_lock().unwrap()
    }
}

impl<C: Copy, const N: usize> Default for Arbiter<C, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_executor::block_on;

    fn slot(index: usize) -> SlotId {
        SlotId::new(index)
    }

    const WAIT: Duration = Duration::from_millis(10);

    #[test]
    fn second_claim_is_busy_until_released() {
        let arbiter: Arbiter<u8, 2> = Arbiter::new();

        let first = block_on(arbiter.claim(slot(0), 1, WAIT)).unwrap();
        assert_eq!(arbiter.state(slot(0)), ClaimState::Claimed);
        assert_eq!(
            block_on(arbiter.claim(slot(0), 2, WAIT)).unwrap_err(),
            BusError::Busy
        );

        // Other slots are independent
        let other = block_on(arbiter.claim(slot(1), 3, WAIT)).unwrap();

        block_on(arbiter.release(first, WAIT)).unwrap();
        assert_eq!(arbiter.state(slot(0)), ClaimState::Idle);
        assert!(block_on(arbiter.claim(slot(0), 2, WAIT)).is_ok());
        block_on(arbiter.release(other, WAIT)).unwrap();
    }

    #[test]
    fn contended_lock_times_out_as_busy() {
        let arbiter: Arbiter<u8, 1> = Arbiter::new();
        let _held = arbiter.hold(slot(0));

        let claimed = block_on(arbiter.claim(slot(0), 1, Duration::from_ticks(0)));

        assert_eq!(claimed.unwrap_err(), BusError::Busy);
    }

    #[test]
    fn completion_runs_callback_then_idles() {
        let arbiter: Arbiter<u8, 1> = Arbiter::new();
        let claim = block_on(arbiter.claim(slot(0), 7, WAIT)).unwrap();
        critical_section::with(|cs| {
            arbiter.mark_pending(cs, &claim);
            arbiter.mark_completion_queued(cs, slot(0));
        });
        assert_eq!(arbiter.state(slot(0)), ClaimState::CompletionQueued);

        let mut seen = None;
        let outcome = block_on(arbiter.complete(slot(0), WAIT, |c| seen = Some(c)));

        assert_eq!(outcome, Completion::Released);
        assert_eq!(seen, Some(7));
        assert_eq!(arbiter.state(slot(0)), ClaimState::Idle);
    }

    #[test]
    fn completion_on_idle_slot_is_spurious() {
        let arbiter: Arbiter<u8, 1> = Arbiter::new();

        let outcome = block_on(arbiter.complete(slot(0), WAIT, |_| panic!("no claimant")));

        assert_eq!(outcome, Completion::Spurious);
    }

    #[test]
    fn completion_before_interrupt_keeps_claim() {
        let arbiter: Arbiter<u8, 1> = Arbiter::new();
        let claim = block_on(arbiter.claim(slot(0), 7, WAIT)).unwrap();
        critical_section::with(|cs| arbiter.mark_pending(cs, &claim));

        let outcome = block_on(arbiter.complete(slot(0), WAIT, |_| panic!("not finished")));

        assert_eq!(outcome, Completion::Spurious);
        assert_eq!(arbiter.state(slot(0)), ClaimState::TransferPending);
        assert_eq!(
            block_on(arbiter.claim(slot(0), 8, WAIT)).unwrap_err(),
            BusError::Busy
        );
    }
}
