/// Errors returned to task-context callers of the bus drivers.
///
/// Failures that happen in interrupt context (a full event queue, a completion that
/// could not be queued) are never reported here; they are counted in the bus
/// statistics instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// The bus identity is unknown or its slot has not been configured.
    InvalidBus,
    /// The slot's callback list is full.
    CallbackCapacityExceeded,
    /// The bus is claimed by another transfer, or its lock could not be taken in time.
    Busy,
    /// The hardware refused the frame or transfer (e.g. no free transmit mailbox).
    TxError,
    /// The per-slot locks could not be established.
    MutexInitError,
    /// Payload or buffer length is outside what the bus accepts.
    InvalidLength,
    /// Programming the hardware acceptance filter failed.
    FilterConfig,
    /// Starting the peripheral failed.
    Start,
    /// Enabling the peripheral interrupt failed.
    InterruptEnable,
}

impl BusError {
    /// Numeric status code, matching the values used by the C-side HAL glue.
    ///
    /// `0` is reserved for success.
    pub const fn status_code(self) -> u8 {
        match self {
            BusError::TxError => 0x01,
            BusError::FilterConfig => 0x02,
            BusError::Start => 0x03,
            BusError::InterruptEnable => 0x04,
            BusError::InvalidBus => 0x05,
            BusError::CallbackCapacityExceeded => 0x06,
            BusError::Busy => 0x07,
            BusError::MutexInitError => 0x08,
            BusError::InvalidLength => 0x09,
        }
    }
}

impl core::fmt::Display for BusError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BusError::InvalidBus => write!(f, "unknown or unconfigured bus"),
            BusError::CallbackCapacityExceeded => write!(f, "callback list is full"),
            BusError::Busy => write!(f, "bus is claimed by another transfer"),
            BusError::TxError => write!(f, "hardware rejected the transmission"),
            BusError::MutexInitError => write!(f, "bus slot locks could not be established"),
            BusError::InvalidLength => write!(f, "payload length out of range"),
            BusError::FilterConfig => write!(f, "acceptance filter configuration failed"),
            BusError::Start => write!(f, "peripheral failed to start"),
            BusError::InterruptEnable => write!(f, "peripheral interrupt could not be enabled"),
        }
    }
}

impl core::error::Error for BusError {}
