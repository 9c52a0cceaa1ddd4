//! CAN receive fan-out and transmit path.
//!
//! Receive interrupts read the pending frame and [`post`](DeferredQueue::post) it to a
//! queue shared by every CAN bus. The dispatcher task drains that queue and hands
//! each frame to the subscribers of the bus it arrived on, filtered by identifier
//! mask, in registration order.

mod frame;
mod hal;

pub use frame::{CanFrame, CanMessage, MAX_DLC};
pub use hal::CanPeripheral;

use core::cell::RefCell;

use critical_section::Mutex;
use embedded_can::StandardId;

use crate::bus::{
    BusError, BusRegistry, CallbackRegistry, FilterMask, Mailbox, SlotId,
    config::{CAN_MAX_BUSES, CAN_MAX_CALLBACKS, CAN_QUEUE_LEN, CanConfig},
    payload::PayloadMut,
    queue::DeferredQueue,
    stats::{CanStats, Counter},
};

/// Subscriber for frames received on one bus.
///
/// Called from the dispatcher task, never from interrupt context.
pub trait FrameHandler<I>: Sync {
    fn on_frame(&self, message: &CanMessage<I>);
}

impl<I, F> FrameHandler<I> for F
where
    F: Fn(&CanMessage<I>) + Sync,
{
    fn on_frame(&self, message: &CanMessage<I>) {
        self(message)
    }
}

#[derive(Debug, Clone, Copy)]
struct RxEvent {
    slot: SlotId,
    frame: CanFrame,
}

struct CanHw<P> {
    periph: P,
    last_mailbox: Option<Mailbox>,
}

struct CanSlot<'a, I, P, const CALLBACKS: usize> {
    hw: Mutex<RefCell<Option<CanHw<P>>>>,
    callbacks: CallbackRegistry<'a, dyn FrameHandler<I> + 'a, CALLBACKS>,
}

impl<'a, I, P, const CALLBACKS: usize> CanSlot<'a, I, P, CALLBACKS> {
    const fn new() -> Self {
        Self {
            hw: Mutex::new(RefCell::new(None)),
            callbacks: CallbackRegistry::new(),
        }
    }
}

/// CAN driver for up to `BUSES` controllers.
///
/// `I` is the bus identity the application uses (usually an enum), `P` the
/// peripheral type bound to each slot. `CALLBACKS` bounds the subscribers per bus
/// and `QUEUE` the receive queue shared by all buses.
///
/// Configuration ([`configure`](Self::configure), [`register_callback`](Self::register_callback))
/// takes `&mut self`; once the driver is shared with interrupt handlers and the
/// dispatcher task everything goes through `&self`.
pub struct CanBus<
    'a,
    I,
    P,
    const BUSES: usize = CAN_MAX_BUSES,
    const CALLBACKS: usize = CAN_MAX_CALLBACKS,
    const QUEUE: usize = CAN_QUEUE_LEN,
> where
    bitmaps::BitsImpl<BUSES>: bitmaps::Bits,
{
    registry: BusRegistry<I, BUSES>,
    slots: [CanSlot<'a, I, P, CALLBACKS>; BUSES],
    events: DeferredQueue<RxEvent, QUEUE>,
    rx_errors: Counter,
    tx_errors: Counter,
    config: CanConfig,
}

impl<'a, I, P, const BUSES: usize, const CALLBACKS: usize, const QUEUE: usize>
    CanBus<'a, I, P, BUSES, CALLBACKS, QUEUE>
where
    I: Copy + Eq,
    P: CanPeripheral<I>,
    bitmaps::BitsImpl<BUSES>: bitmaps::Bits,
{
    /// Creates the driver with every slot unconfigured.
    ///
    /// `layout` fixes which bus identity owns which slot.
    pub fn new(layout: [I; BUSES], config: CanConfig) -> Result<Self, BusError> {
        Ok(Self {
            registry: BusRegistry::new(layout)?,
            slots: core::array::from_fn(|_| CanSlot::new()),
            events: DeferredQueue::new(),
            rx_errors: Counter::new(),
            tx_errors: Counter::new(),
            config,
        })
    }

    /// Binds `periph` to its slot, programs the acceptance filter, starts the
    /// controller and enables its receive interrupt.
    ///
    /// The slot stays unconfigured if any step fails.
    pub fn configure(&mut self, mut periph: P) -> Result<SlotId, BusError> {
        let slot = self
            .registry
            .position(periph.instance())
            .ok_or(BusError::InvalidBus)?;

        if let Err(e) = bring_up::<I, P>(&mut periph, &self.config) {
            error!("can: slot {} configuration failed: {}", slot.index(), e);
            return Err(e);
        }

        *self.slots[slot.index()].hw.get_mut().get_mut() = Some(CanHw {
            periph,
            last_mailbox: None,
        });
        self.registry.bind(slot);
        info!("can: slot {} configured", slot.index());
        Ok(slot)
    }

    /// Subscribes `handler` to every frame received on `bus`.
    pub fn register_callback(
        &mut self,
        bus: I,
        handler: &'a dyn FrameHandler<I>,
    ) -> Result<(), BusError> {
        self.register_filtered_callback(bus, handler, FilterMask::MATCH_ALL)
    }

    /// Subscribes `handler` to frames on `bus` whose identifier passes `mask`.
    pub fn register_filtered_callback(
        &mut self,
        bus: I,
        handler: &'a dyn FrameHandler<I>,
        mask: FilterMask,
    ) -> Result<(), BusError> {
        let slot = self.registry.resolve(bus)?;
        self.slots[slot.index()].callbacks.register(handler, mask)
    }

    /// Number of subscribers on `bus`.
    pub fn callback_count(&self, bus: I) -> Result<usize, BusError> {
        let slot = self.registry.resolve(bus)?;
        Ok(self.slots[slot.index()].callbacks.len())
    }

    /// Submits a standard data frame to a free transmit mailbox.
    ///
    /// Never waits and never retries: [`BusError::TxError`] means every mailbox was
    /// busy. Payloads over [`MAX_DLC`] bytes are rejected with
    /// [`BusError::InvalidLength`].
    pub fn send(&self, bus: I, id: StandardId, data: &[u8]) -> Result<(), BusError> {
        let slot = self.registry.resolve(bus)?;
        let frame = CanFrame::new_standard(id, data)?;
        self.submit(slot, &frame)
    }

    /// Like [`send`](Self::send), building a `len`-byte payload in place.
    ///
    /// ```
    /// # use ecu_bus::bus::can::{CanBus, CanPeripheral};
    /// # use ecu_bus::bus::BusError;
    /// # use embedded_can::StandardId;
    /// # fn demo<P: CanPeripheral<u8>>(can: &CanBus<'_, u8, P>) -> Result<(), BusError> {
    /// let id = StandardId::new(0x38).unwrap();
    /// can.send_with(0, id, 4, |payload| {
    ///     payload.write_u16_le_at(0, 0x0123);
    ///     payload.write_u16_le_at(2, 0x0ABC);
    /// })
    /// # }
    /// ```
    pub fn send_with(
        &self,
        bus: I,
        id: StandardId,
        len: usize,
        build: impl FnOnce(&mut PayloadMut<'_>),
    ) -> Result<(), BusError> {
        let slot = self.registry.resolve(bus)?;
        if len > MAX_DLC {
            return Err(BusError::InvalidLength);
        }

        let mut data = [0u8; MAX_DLC];
        build(&mut PayloadMut::new(&mut data[..len]));
        let frame = CanFrame::new_standard(id, &data[..len])?;
        self.submit(slot, &frame)
    }

    fn submit(&self, slot: SlotId, frame: &CanFrame) -> Result<(), BusError> {
        let result = critical_section::with(|cs| -> Result<(), BusError> {
            let mut hw = self.slots[slot.index()].hw.borrow_ref_mut(cs);
            let hw = hw.as_mut().ok_or(BusError::InvalidBus)?;
            let mailbox = hw.periph.transmit(frame).map_err(|_| BusError::TxError)?;
            hw.last_mailbox = Some(mailbox);
            Ok(())
        });

        if result == Err(BusError::TxError) {
            self.tx_errors.increment();
            debug!("can: slot {} has no free mailbox", slot.index());
        }
        result
    }

    /// Mailbox used by the most recent successful send on `bus`.
    pub fn last_mailbox(&self, bus: I) -> Result<Option<Mailbox>, BusError> {
        let slot = self.registry.resolve(bus)?;
        Ok(critical_section::with(|cs| {
            self.slots[slot.index()]
                .hw
                .borrow_ref(cs)
                .as_ref()
                .and_then(|hw| hw.last_mailbox)
        }))
    }

    /// Receive interrupt entry point for `bus`.
    ///
    /// Reads the pending frame and queues it for the dispatcher. Never blocks; a
    /// frame that does not fit in the queue is dropped and counted.
    pub fn on_rx_pending(&self, bus: I) {
        let Ok(slot) = self.registry.resolve(bus) else {
            return;
        };

        let received = critical_section::with(|cs| {
            self.slots[slot.index()]
                .hw
                .borrow_ref_mut(cs)
                .as_mut()
                .map(|hw| hw.periph.receive())
        });

        match received {
            Some(Ok(frame)) => {
                if self.events.post(RxEvent { slot, frame }).is_err() {
                    warn!("can: event queue full, frame from slot {} dropped", slot.index());
                }
            }
            Some(Err(_)) => {
                self.rx_errors.increment();
                warn!("can: slot {} receive failed", slot.index());
            }
            None => {}
        }
    }

    /// Delivers every queued frame to its subscribers, oldest first.
    ///
    /// Returns the number of frames drained.
    pub fn dispatch_pending(&self) -> usize {
        self.events.drain(|event| self.deliver(event))
    }

    fn deliver(&self, event: RxEvent) {
        let Some(bus) = self.registry.identity(event.slot) else {
            return;
        };
        let message = CanMessage {
            bus,
            frame: event.frame,
        };
        let invoked = self.slots[event.slot.index()]
            .callbacks
            .dispatch(event.frame.raw_id(), |handler| handler.on_frame(&message));
        trace!(
            "can: id {=u32:#x} delivered to {} subscribers",
            event.frame.raw_id(),
            invoked
        );
    }

    /// Dispatcher task body. Spawn it once per driver.
    ///
    /// Sleeps until an interrupt queues a frame, waking at least every
    /// `config.wake_timeout`, and drains the whole queue on each pass.
    pub async fn run_dispatcher(&self) -> ! {
        loop {
            if self.events.wait(self.config.wake_timeout).await.is_none() {
                trace!("can: dispatcher idle");
            }
            self.dispatch_pending();
        }
    }

    pub fn stats(&self) -> CanStats {
        CanStats {
            dropped_frames: self.events.dropped(),
            rx_errors: self.rx_errors.get(),
            tx_errors: self.tx_errors.get(),
        }
    }

    /// Frames waiting for the dispatcher.
    pub fn pending(&self) -> usize {
        self.events.len()
    }

    pub fn config(&self) -> &CanConfig {
        &self.config
    }

    pub fn registry(&self) -> &BusRegistry<I, BUSES> {
        &self.registry
    }
}

fn bring_up<I, P: CanPeripheral<I>>(periph: &mut P, config: &CanConfig) -> Result<(), BusError> {
    periph
        .configure_filter(&config.filter)
        .map_err(|_| BusError::FilterConfig)?;
    periph.start().map_err(|_| BusError::Start)?;
    periph
        .enable_rx_interrupt()
        .map_err(|_| BusError::InterruptEnable)
}
