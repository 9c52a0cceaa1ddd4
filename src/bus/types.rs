/// Opaque handle to a bus slot, returned by [`BusRegistry::resolve`](crate::bus::BusRegistry::resolve).
///
/// Only the registry creates these, so a `SlotId` always indexes a slot that exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotId(usize);

impl SlotId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the slot in the bus layout.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// CAN identifier filter attached to a callback.
///
/// A frame matches when every bit set in its identifier is also set in the mask.
///
/// ```
/// use ecu_bus::bus::FilterMask;
///
/// assert!(FilterMask::new(0x3F).matches(0x38));
/// assert!(!FilterMask::new(0x8F).matches(0x38));
/// assert!(FilterMask::MATCH_ALL.matches(0x7FF));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FilterMask(u32);

impl FilterMask {
    /// Mask that accepts every identifier.
    pub const MATCH_ALL: FilterMask = FilterMask(u32::MAX);

    pub const fn new(mask: u32) -> Self {
        Self(mask)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if `id` has no bits outside the mask.
    #[inline]
    pub const fn matches(self, id: u32) -> bool {
        id & !self.0 == 0
    }
}

impl Default for FilterMask {
    fn default() -> Self {
        Self::MATCH_ALL
    }
}

/// Hardware transmit mailbox that accepted the last outbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mailbox(pub u32);
