/// Generates `read_<ty>_le_at` / `read_<ty>_be_at` for multi-byte integers.
macro_rules! payload_readers {
    ($($type:ty => $size:literal),* $(,)?) => {
        $(
            paste::paste! {
                #[doc = "Reads a little-endian `" $type "` starting at payload byte `offset`."]
                #[doc = ""]
                #[doc = "# Panics"]
                #[doc = "Panics if `offset + " $size "` exceeds the payload length."]
                #[inline]
                pub fn [<read_ $type _le_at>](&self, offset: usize) -> $type {
                    <$type>::from_le_bytes(self.field::<$size>(offset))
                }

                #[doc = "Reads a big-endian `" $type "` starting at payload byte `offset`."]
                #[doc = ""]
                #[doc = "# Panics"]
                #[doc = "Panics if `offset + " $size "` exceeds the payload length."]
                #[inline]
                pub fn [<read_ $type _be_at>](&self, offset: usize) -> $type {
                    <$type>::from_be_bytes(self.field::<$size>(offset))
                }
            }
        )*

        /// Reads a single byte.
        ///
        /// # Panics
        /// Panics if `offset` is past the payload end.
        #[inline]
        pub fn read_u8_at(&self, offset: usize) -> u8 {
            self.0[offset]
        }

        /// Reads a single signed byte.
        ///
        /// # Panics
        /// Panics if `offset` is past the payload end.
        #[inline]
        pub fn read_i8_at(&self, offset: usize) -> i8 {
            self.0[offset] as i8
        }

        fn field<const S: usize>(&self, offset: usize) -> [u8; S] {
            assert!(
                offset + S <= self.0.len(),
                "payload read out of bounds: offset {} + size {} > dlc {}",
                offset, S, self.0.len()
            );
            let mut bytes = [0u8; S];
            bytes.copy_from_slice(&self.0[offset..offset + S]);
            bytes
        }
    };
}

/// Generates `write_<ty>_le_at` / `write_<ty>_be_at` for multi-byte integers.
macro_rules! payload_writers {
    ($($type:ty => $size:literal),* $(,)?) => {
        $(
            paste::paste! {
                #[doc = "Writes `value` as a little-endian `" $type "` at payload byte `offset`."]
                #[doc = ""]
                #[doc = "# Panics"]
                #[doc = "Panics if `offset + " $size "` exceeds the payload length."]
                #[inline]
                pub fn [<write_ $type _le_at>](&mut self, offset: usize, value: $type) {
                    self.field_mut::<$size>(offset).copy_from_slice(&value.to_le_bytes());
                }

                #[doc = "Writes `value` as a big-endian `" $type "` at payload byte `offset`."]
                #[doc = ""]
                #[doc = "# Panics"]
                #[doc = "Panics if `offset + " $size "` exceeds the payload length."]
                #[inline]
                pub fn [<write_ $type _be_at>](&mut self, offset: usize, value: $type) {
                    self.field_mut::<$size>(offset).copy_from_slice(&value.to_be_bytes());
                }
            }
        )*

        /// Writes a single byte.
        ///
        /// # Panics
        /// Panics if `offset` is past the payload end.
        #[inline]
        pub fn write_u8_at(&mut self, offset: usize, value: u8) {
            self.0[offset] = value;
        }

        /// Writes a single signed byte.
        ///
        /// # Panics
        /// Panics if `offset` is past the payload end.
        #[inline]
        pub fn write_i8_at(&mut self, offset: usize, value: i8) {
            self.0[offset] = value as u8;
        }

        fn field_mut<const S: usize>(&mut self, offset: usize) -> &mut [u8] {
            assert!(
                offset + S <= self.0.len(),
                "payload write out of bounds: offset {} + size {} > dlc {}",
                offset, S, self.0.len()
            );
            &mut self.0[offset..offset + S]
        }
    };
}

pub(super) use payload_readers;
pub(super) use payload_writers;
