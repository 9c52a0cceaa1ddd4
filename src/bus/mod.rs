pub mod callbacks;
pub mod can;
pub mod config;
pub mod error;
pub mod payload;
pub mod queue;
pub mod registry;
pub mod spi;
pub mod stats;
pub mod types;
pub mod wake;

#[cfg(test)]
mod test_support;

pub use callbacks::{CallbackEntry, CallbackRegistry};
pub use can::{CanBus, CanFrame, CanMessage, CanPeripheral, FrameHandler};
pub use config::{AcceptanceFilter, CanConfig, SpiConfig};
pub use error::BusError;
pub use payload::{PayloadMut, PayloadRef};
pub use queue::DeferredQueue;
pub use registry::BusRegistry;
pub use spi::{
    ChipSelect, ClaimState, OutputPinSelect, SpiBus, SpiDevice, SpiPeripheral, TransferError,
    TransferHandler,
};
pub use stats::{CanStats, SpiStats};
pub use types::{FilterMask, Mailbox, SlotId};
pub use wake::WakeSignal;

pub mod prelude {
    pub use super::{
        AcceptanceFilter, BusError, CanBus, CanConfig, CanFrame, CanMessage, CanPeripheral,
        CanStats, ChipSelect, ClaimState, FilterMask, FrameHandler, Mailbox, OutputPinSelect,
        PayloadMut, PayloadRef, SlotId, SpiBus, SpiConfig, SpiDevice, SpiPeripheral, SpiStats,
        TransferError, TransferHandler,
    };
}
