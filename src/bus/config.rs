use embassy_time::Duration;

/// Default number of CAN controllers.
pub const CAN_MAX_BUSES: usize = 3;
/// Default callback capacity per CAN bus.
pub const CAN_MAX_CALLBACKS: usize = 16;
/// Default depth of the shared CAN receive queue.
pub const CAN_QUEUE_LEN: usize = 50;
/// Default number of SPI controllers.
pub const SPI_MAX_BUSES: usize = 4;
/// Default depth of the SPI completion queue.
pub const SPI_QUEUE_LEN: usize = 8;

/// How long a dispatcher sleeps without traffic before it wakes for a liveness pass.
pub const DEFAULT_WAKE_TIMEOUT: Duration = Duration::from_millis(500);

/// Hardware ID/mask acceptance filter programmed when a CAN bus is configured.
///
/// A mask bit of 1 compares the corresponding ID bit, 0 is don't-care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AcceptanceFilter {
    /// Filter bank to program.
    pub bank: u8,
    pub id: u32,
    pub mask: u32,
    /// First bank owned by the secondary controller on dual-controller parts.
    pub secondary_start_bank: u8,
}

impl AcceptanceFilter {
    /// One 32-bit ID/mask bank that lets every frame into receive FIFO 0.
    pub const ACCEPT_ALL: AcceptanceFilter = AcceptanceFilter {
        bank: 0,
        id: 0,
        mask: 0,
        secondary_start_bank: 14,
    };
}

impl Default for AcceptanceFilter {
    fn default() -> Self {
        Self::ACCEPT_ALL
    }
}

/// CAN driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub struct CanConfig {
    /// Upper bound on how long the dispatcher sleeps between drains.
    pub wake_timeout: Duration,
    /// Filter programmed into each controller by `configure`.
    pub filter: AcceptanceFilter,
}

impl CanConfig {
    pub fn with_wake_timeout(mut self, timeout: Duration) -> Self {
        self.wake_timeout = timeout;
        self
    }

    pub fn with_filter(mut self, filter: AcceptanceFilter) -> Self {
        self.filter = filter;
        self
    }
}

impl Default for CanConfig {
    fn default() -> Self {
        Self {
            wake_timeout: DEFAULT_WAKE_TIMEOUT,
            filter: AcceptanceFilter::ACCEPT_ALL,
        }
    }
}

/// SPI driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub struct SpiConfig {
    /// Upper bound on how long the dispatcher sleeps between drains.
    pub wake_timeout: Duration,
    /// How long a caller waits for the slot lock before giving up with `Busy`.
    pub claim_timeout: Duration,
    /// How long a release (completion or failed trigger) waits for the slot lock.
    pub release_timeout: Duration,
}

impl SpiConfig {
    pub fn with_wake_timeout(mut self, timeout: Duration) -> Self {
        self.wake_timeout = timeout;
        self
    }

    pub fn with_claim_timeout(mut self, timeout: Duration) -> Self {
        self.claim_timeout = timeout;
        self
    }

    pub fn with_release_timeout(mut self, timeout: Duration) -> Self {
        self.release_timeout = timeout;
        self
    }
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            wake_timeout: DEFAULT_WAKE_TIMEOUT,
            claim_timeout: Duration::from_millis(10),
            release_timeout: Duration::from_millis(100),
        }
    }
}
