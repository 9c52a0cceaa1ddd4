//! Typed views over CAN frame payloads.
//!
//! Signals in vehicle frames are packed integers at fixed byte offsets. These views
//! give bounds-checked accessors so subscribers and senders do not shift bytes by hand.

mod macros;

use macros::{payload_readers, payload_writers};

/// Read-only view of a received payload.
#[derive(Debug, Clone, Copy)]
pub struct PayloadRef<'a>(&'a [u8]);

impl<'a> PayloadRef<'a> {
    #[inline]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self(bytes)
    }

    /// Payload length in bytes (the frame's DLC).
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.0
    }

    payload_readers!(u16 => 2, i16 => 2, u32 => 4, i32 => 4);
}

/// Writable view of an outbound payload under construction.
#[derive(Debug)]
pub struct PayloadMut<'a>(&'a mut [u8]);

impl<'a> PayloadMut<'a> {
    #[inline]
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copies `src` into the payload starting at `offset`.
    ///
    /// # Panics
    /// Panics if the range exceeds the payload length.
    #[inline]
    pub fn copy_from_slice_at(&mut self, offset: usize, src: &[u8]) {
        self.0[offset..offset + src.len()].copy_from_slice(src);
    }

    /// Fills the whole payload with `value`.
    #[inline]
    pub fn fill(&mut self, value: u8) {
        self.0.fill(value);
    }

    payload_readers!(u16 => 2, i16 => 2, u32 => 4, i32 => 4);
    payload_writers!(u16 => 2, i16 => 2, u32 => 4, i32 => 4);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adc_readings_pack_little_endian() {
        // Four 12-bit ADC channels in one classic frame
        let mut bytes = [0u8; 8];
        let mut payload = PayloadMut::new(&mut bytes);
        for (i, reading) in [0x0123u16, 0x0ABC, 0x0FFF, 0x0000].into_iter().enumerate() {
            payload.write_u16_le_at(i * 2, reading);
        }

        assert_eq!(bytes, [0x23, 0x01, 0xBC, 0x0A, 0xFF, 0x0F, 0x00, 0x00]);

        let view = PayloadRef::new(&bytes);
        assert_eq!(view.read_u16_le_at(2), 0x0ABC);
        assert_eq!(view.read_u16_be_at(2), 0xBC0A);
    }

    #[test]
    fn counter_and_signed_fields() {
        let mut bytes = [0u8; 6];
        let mut payload = PayloadMut::new(&mut bytes);
        payload.write_u16_be_at(0, 0x1234);
        payload.write_i8_at(2, -2);
        payload.write_i16_le_at(3, -300);
        payload.write_u8_at(5, 0xAF);

        assert_eq!(payload.read_u16_be_at(0), 0x1234);
        assert_eq!(payload.read_i8_at(2), -2);
        assert_eq!(payload.read_i16_le_at(3), -300);
        assert_eq!(payload.read_u8_at(5), 0xAF);
    }

    #[test]
    fn wide_fields() {
        let bytes = [0x78, 0x56, 0x34, 0x12, 0xFF, 0xFF, 0xFF, 0xFF];
        let view = PayloadRef::new(&bytes);

        assert_eq!(view.read_u32_le_at(0), 0x12345678);
        assert_eq!(view.read_u32_be_at(0), 0x78563412);
        assert_eq!(view.read_i32_le_at(4), -1);
    }

    #[test]
    fn copy_and_fill() {
        let mut bytes = [0u8; 4];
        let mut payload = PayloadMut::new(&mut bytes);
        payload.fill(0xFF);
        payload.copy_from_slice_at(1, &[0x11, 0x22]);

        assert_eq!(bytes, [0xFF, 0x11, 0x22, 0xFF]);
    }

    #[test]
    #[should_panic]
    fn read_past_dlc_panics() {
        let bytes = [0u8; 3];
        PayloadRef::new(&bytes).read_u32_le_at(0);
    }

    #[test]
    #[should_panic]
    fn write_past_dlc_panics() {
        let mut bytes = [0u8; 2];
        PayloadMut::new(&mut bytes).write_u16_le_at(1, 0);
    }
}
