//! A `no_std`, no-alloc CAN/SPI interrupt-to-task dispatch layer for ECU firmware.
//!
//! Interrupt handlers must not block or run application logic, so this crate splits
//! every bus event into a short interrupt half and a task half.
//!
//! # Features
//!
//! - **Deferred dispatch** - ISRs only queue events; callbacks run in a dispatcher task
//! - **Filtered fan-out** - per-bus CAN subscribers with identifier masks
//! - **Bus arbitration** - one SPI transfer per bus, `Busy` instead of waiting
//! - **Bounded waits** - every lock and sleep carries a timeout
//! - **Static sizing** - slot counts, callback capacity and queue depth are const generics
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  post   ┌───────────────┐  drain  ┌──────────────────────┐
//! │  ISR             │────────▶│ DeferredQueue │────────▶│  run_dispatcher()    │
//! │  on_rx_pending() │  wake   │  (bounded)    │         │  FrameHandler /      │
//! │  on_transfer_    │────────▶│  WakeSignal   │         │  TransferHandler     │
//! │    complete()    │         └───────────────┘         │  (task context)      │
//! └──────────────────┘                                   └──────────────────────┘
//!          ▲                                                        │
//!          │ chip select, start                                     │ release
//! ┌──────────────────┐         ┌───────────────┐                    │
//! │  Task            │  claim  │  Arbiter      │◀───────────────────┘
//! │  send()          │────────▶│  (SPI only)   │
//! │  transfer()      │         └───────────────┘
//! └──────────────────┘
//! ```
//!
//! - **CAN receive**: the ISR reads the frame and queues it; the dispatcher invokes
//!   every subscriber of that bus whose mask accepts the identifier
//! - **CAN transmit**: `send` places a frame in a free mailbox or fails with `TxError`
//! - **SPI**: `transfer` claims the bus, the completion ISR queues the slot, the
//!   dispatcher runs the device handler and releases the claim
//!
//! Events dropped because a queue was full are never reported to a caller; they are
//! visible through [`CanBus::stats`](bus::CanBus::stats) and
//! [`SpiBus::stats`](bus::SpiBus::stats).
//!
//! # Example
//!
//! ```rust,no_run
//! use ecu_bus::prelude::*;
//! use embedded_can::StandardId;
//!
//! #[derive(Clone, Copy, PartialEq, Eq)]
//! enum Can {
//!     Powertrain,
//!     Chassis,
//!     Body,
//! }
//!
//! fn wire_up<P: CanPeripheral<Can>>(
//!     can: &mut CanBus<'static, Can, P>,
//!     powertrain: P,
//!     on_throttle: &'static dyn FrameHandler<Can>,
//! ) -> Result<(), BusError> {
//!     can.configure(powertrain)?;
//!     // Throttle frames live in 0x000..=0x03F
//!     can.register_filtered_callback(Can::Powertrain, on_throttle, FilterMask::new(0x3F))?;
//!
//!     can.send_with(Can::Powertrain, StandardId::new(0x101).unwrap(), 2, |payload| {
//!         payload.write_u16_le_at(0, 1500); // rpm request
//!     })
//! }
//!
//! // Then, from the receive interrupt: `can.on_rx_pending(Can::Powertrain)`,
//! // and from an executor task: `can.run_dispatcher().await`.
//! # let _ = (Can::Chassis, Can::Body);
//! ```

#![deny(unsafe_code)]
#![no_std]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod bus;

pub mod prelude {
    pub use crate::bus::prelude::*;
}
