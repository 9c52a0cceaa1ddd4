//! Arbitrated, interrupt-completed SPI transfers.
//!
//! A transfer claims its bus through the [`Arbiter`], asserts the device's chip
//! select and starts the hardware. The completion interrupt releases chip select
//! and queues the slot index; the dispatcher task then runs the device's handler
//! with the receive buffer and frees the bus for the next claimant.

mod arbiter;
mod device;
mod hal;

pub use arbiter::{Arbiter, ClaimState, Completion, Ownership};
pub use device::{ChipSelect, OutputPinSelect, SpiDevice, TransferHandler};
pub use hal::SpiPeripheral;

use core::cell::RefCell;

use critical_section::Mutex;

use crate::bus::{
    BusError, BusRegistry, SlotId,
    config::{SPI_MAX_BUSES, SPI_QUEUE_LEN, SpiConfig},
    queue::DeferredQueue,
    stats::{Counter, SpiStats},
};

/// A transfer that never started. Carries the receive buffer back to the caller.
#[derive(Debug)]
pub struct TransferError<'a> {
    pub error: BusError,
    pub rx: &'a mut [u8],
}

impl From<TransferError<'_>> for BusError {
    fn from(rejected: TransferError<'_>) -> Self {
        rejected.error
    }
}

impl core::fmt::Display for TransferError<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.error.fmt(f)
    }
}

/// What the completion interrupt and the dispatcher need from a running transfer.
///
/// Both buffers stay borrowed here until the dispatcher finishes the transfer, so
/// the hardware can keep reading `tx` and writing `rx` after `transfer` returns.
struct Inflight<'a> {
    chip_select: Option<&'a dyn ChipSelect>,
    tx: Option<&'a [u8]>,
    rx: Option<&'a mut [u8]>,
}

struct SpiSlot<'a, P> {
    hal: Mutex<RefCell<Option<P>>>,
    inflight: Mutex<RefCell<Inflight<'a>>>,
}

impl<P> SpiSlot<'_, P> {
    const fn new() -> Self {
        Self {
            hal: Mutex::new(RefCell::new(None)),
            inflight: Mutex::new(RefCell::new(Inflight {
                chip_select: None,
                tx: None,
                rx: None,
            })),
        }
    }
}

/// SPI driver for up to `BUSES` controllers with a `QUEUE`-deep completion queue.
///
/// At most one transfer runs per bus. A caller that finds the bus claimed gets
/// [`BusError::Busy`] instead of waiting for it.
pub struct SpiBus<'a, I, P, const BUSES: usize = SPI_MAX_BUSES, const QUEUE: usize = SPI_QUEUE_LEN>
where
    bitmaps::BitsImpl<BUSES>: bitmaps::Bits,
{
    registry: BusRegistry<I, BUSES>,
    slots: [SpiSlot<'a, P>; BUSES],
    arbiter: Arbiter<&'a SpiDevice<'a, I>, BUSES>,
    completions: DeferredQueue<SlotId, QUEUE>,
    release_timeouts: Counter,
    spurious_completions: Counter,
    config: SpiConfig,
}

impl<'a, I, P, const BUSES: usize, const QUEUE: usize> SpiBus<'a, I, P, BUSES, QUEUE>
where
    I: Copy + Eq,
    P: SpiPeripheral<I>,
    bitmaps::BitsImpl<BUSES>: bitmaps::Bits,
{
    /// Creates the driver with idle, unconfigured slots and their locks.
    ///
    /// A layout that names the same bus twice cannot get one lock per bus and fails
    /// with [`BusError::MutexInitError`].
    pub fn new(layout: [I; BUSES], config: SpiConfig) -> Result<Self, BusError> {
        let registry = BusRegistry::new(layout).map_err(|_| BusError::MutexInitError)?;
        Ok(Self {
            registry,
            slots: core::array::from_fn(|_| SpiSlot::new()),
            arbiter: Arbiter::new(),
            completions: DeferredQueue::new(),
            release_timeouts: Counter::new(),
            spurious_completions: Counter::new(),
            config,
        })
    }

    /// Binds `periph` to its slot and enables its completion interrupt.
    pub fn configure(&mut self, mut periph: P) -> Result<SlotId, BusError> {
        let slot = self
            .registry
            .position(periph.instance())
            .ok_or(BusError::InvalidBus)?;

        if periph.enable_completion_interrupt().is_err() {
            error!("spi: slot {} interrupt enable failed", slot.index());
            return Err(BusError::InterruptEnable);
        }

        *self.slots[slot.index()].hal.get_mut().get_mut() = Some(periph);
        self.registry.bind(slot);
        info!("spi: slot {} configured", slot.index());
        Ok(slot)
    }

    /// Starts a full-duplex transfer to `device`.
    ///
    /// Returns once the hardware has started; `device`'s handler receives `rx` from
    /// the dispatcher task when it completes. Until then the driver keeps both
    /// buffers borrowed. `tx` and `rx` must be the same, non-zero length.
    ///
    /// Fails with [`BusError::Busy`] if another transfer owns the bus, and with
    /// [`BusError::TxError`] if the hardware refuses to start (the bus is released
    /// again in that case). Every failure hands `rx` back in the [`TransferError`]
    /// so the caller can retry with it.
    pub async fn transfer(
        &self,
        device: &'a SpiDevice<'a, I>,
        tx: &'a [u8],
        rx: &'a mut [u8],
    ) -> Result<(), TransferError<'a>> {
        let slot = match self.registry.resolve(device.bus()) {
            Ok(slot) => slot,
            Err(error) => return Err(TransferError { error, rx }),
        };
        if tx.len() != rx.len() || rx.is_empty() {
            return Err(TransferError {
                error: BusError::InvalidLength,
                rx,
            });
        }

        let claim = match self
            .arbiter
            .claim(slot, device, self.config.claim_timeout)
            .await
        {
            Ok(claim) => claim,
            Err(error) => return Err(TransferError { error, rx }),
        };

        if let Err(rejected) = self.trigger(&claim, device, tx, rx) {
            if self
                .arbiter
                .release(claim, self.config.release_timeout)
                .await
                .is_err()
            {
                self.release_timeouts.increment();
                error!("spi: slot {} could not be released after failed start", slot.index());
            }
            return Err(rejected);
        }
        trace!("spi: slot {} transfer started", slot.index());
        Ok(())
    }

    fn trigger(
        &self,
        claim: &Ownership,
        device: &'a SpiDevice<'a, I>,
        tx: &'a [u8],
        rx: &'a mut [u8],
    ) -> Result<(), TransferError<'a>> {
        let slot = &self.slots[claim.slot().index()];
        critical_section::with(|cs| -> Result<(), TransferError<'a>> {
            let mut hal = slot.hal.borrow_ref_mut(cs);
            let Some(hal) = hal.as_mut() else {
                return Err(TransferError {
                    error: BusError::InvalidBus,
                    rx,
                });
            };

            let chip_select = device.chip_select();
            chip_select.select();
            if hal.start_transfer(tx, rx).is_err() {
                chip_select.deselect();
                return Err(TransferError {
                    error: BusError::TxError,
                    rx,
                });
            }

            *slot.inflight.borrow_ref_mut(cs) = Inflight {
                chip_select: Some(chip_select),
                tx: Some(tx),
                rx: Some(rx),
            };
            self.arbiter.mark_pending(cs, claim);
            Ok(())
        })
    }

    /// Transfer-complete interrupt entry point for `bus`.
    ///
    /// Releases chip select and queues the completion. If the queue is full the
    /// completion is lost and the bus stays claimed; this is counted in
    /// [`SpiStats::lost_completions`].
    ///
    /// Interrupts are ignored unless a transfer was started and its bus is not
    /// released yet. A repeated interrupt in that window is queued too; the
    /// dispatcher discards it and counts it in [`SpiStats::spurious_completions`].
    pub fn on_transfer_complete(&self, bus: I) {
        let Ok(slot) = self.registry.resolve(bus) else {
            return;
        };

        critical_section::with(|cs| {
            if !matches!(
                self.arbiter.state_cs(cs, slot),
                ClaimState::TransferPending | ClaimState::CompletionQueued
            ) {
                return;
            }
            if let Some(chip_select) = self.slots[slot.index()].inflight.borrow_ref(cs).chip_select
            {
                chip_select.deselect();
            }

            if self.completions.post(slot).is_ok() {
                self.arbiter.mark_completion_queued(cs, slot);
            } else {
                error!("spi: completion queue full, slot {} stays claimed", slot.index());
            }
        });
    }

    /// Runs the handlers for every queued completion and frees their buses.
    ///
    /// Returns the number of completions taken off the queue.
    pub async fn dispatch_pending(&self) -> usize {
        let mut handled = 0;
        while let Some(slot) = self.completions.try_pop() {
            self.finish(slot).await;
            handled += 1;
        }
        handled
    }

    async fn finish(&self, slot: SlotId) {
        let inflight = &self.slots[slot.index()].inflight;
        let outcome = self
            .arbiter
            .complete(slot, self.config.release_timeout, |device| {
                let rx = critical_section::with(|cs| {
                    let mut inflight = inflight.borrow_ref_mut(cs);
                    inflight.chip_select = None;
                    inflight.tx = None;
                    inflight.rx.take()
                });
                if let Some(rx) = rx {
                    device.handler().on_transfer_complete(rx);
                }
            })
            .await;

        match outcome {
            Completion::Released => trace!("spi: slot {} released", slot.index()),
            Completion::Spurious => {
                self.spurious_completions.increment();
                debug!("spi: discarded stale completion for slot {}", slot.index());
            }
            Completion::LockTimeout => {
                self.release_timeouts.increment();
                error!("spi: slot {} lock timed out, completion dropped", slot.index());
            }
        }
    }

    /// Dispatcher task body. Spawn it once per driver.
    pub async fn run_dispatcher(&self) -> ! {
        loop {
            if self.completions.wait(self.config.wake_timeout).await.is_none() {
                trace!("spi: dispatcher idle");
            }
            self.dispatch_pending().await;
        }
    }

    /// Transmit buffer the running transfer on `bus` still holds, if any.
    pub fn pending_tx(&self, bus: I) -> Result<Option<&'a [u8]>, BusError> {
        let slot = self.registry.resolve(bus)?;
        Ok(critical_section::with(|cs| {
            self.slots[slot.index()].inflight.borrow_ref(cs).tx
        }))
    }

    /// Lifecycle stage of `bus`.
    pub fn claim_state(&self, bus: I) -> Result<ClaimState, BusError> {
        let slot = self.registry.resolve(bus)?;
        Ok(self.arbiter.state(slot))
    }

    pub fn stats(&self) -> SpiStats {
        SpiStats {
            lost_completions: self.completions.dropped(),
            release_timeouts: self.release_timeouts.get(),
            spurious_completions: self.spurious_completions.get(),
        }
    }

    pub fn config(&self) -> &SpiConfig {
        &self.config
    }

    pub fn registry(&self) -> &BusRegistry<I, BUSES> {
        &self.registry
    }
}
