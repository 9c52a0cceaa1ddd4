use embedded_can::{Frame, Id, StandardId};

use crate::bus::{error::BusError, payload::PayloadRef};

/// Largest payload of a classic CAN data frame.
pub const MAX_DLC: usize = 8;

/// Classic CAN data frame with a standard 11-bit identifier.
///
/// Extended identifiers and remote frames are not carried by this layer, so the
/// [`Frame`] constructors return `None` for them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanFrame {
    id: StandardId,
    data: [u8; MAX_DLC],
    dlc: u8,
}

impl CanFrame {
    /// Builds a data frame, rejecting payloads over [`MAX_DLC`] bytes.
    pub fn new_standard(id: StandardId, data: &[u8]) -> Result<Self, BusError> {
        if data.len() > MAX_DLC {
            return Err(BusError::InvalidLength);
        }
        let mut buf = [0u8; MAX_DLC];
        buf[..data.len()].copy_from_slice(data);
        Ok(Self {
            id,
            data: buf,
            dlc: data.len() as u8,
        })
    }

    pub fn standard_id(&self) -> StandardId {
        self.id
    }

    /// Identifier widened for filter-mask matching.
    pub fn raw_id(&self) -> u32 {
        u32::from(self.id.as_raw())
    }

    pub fn payload(&self) -> PayloadRef<'_> {
        PayloadRef::new(self.data())
    }
}

impl Frame for CanFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        match id.into() {
            Id::Standard(id) => Self::new_standard(id, data).ok(),
            Id::Extended(_) => None,
        }
    }

    fn new_remote(_id: impl Into<Id>, _dlc: usize) -> Option<Self> {
        None
    }

    fn is_extended(&self) -> bool {
        false
    }

    fn is_remote_frame(&self) -> bool {
        false
    }

    fn id(&self) -> Id {
        Id::Standard(self.id)
    }

    fn dlc(&self) -> usize {
        self.dlc as usize
    }

    fn data(&self) -> &[u8] {
        &self.data[..self.dlc as usize]
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CanFrame {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "CanFrame {{ id: {=u16:#x}, data: {=[u8]:x} }}",
            self.id.as_raw(),
            self.data()
        )
    }
}

/// A received frame tagged with the bus it arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanMessage<I> {
    pub bus: I,
    pub frame: CanFrame,
}

impl<I> CanMessage<I> {
    pub fn id(&self) -> StandardId {
        self.frame.standard_id()
    }

    pub fn payload(&self) -> PayloadRef<'_> {
        self.frame.payload()
    }
}
