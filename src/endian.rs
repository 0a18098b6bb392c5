//! Byte-order load/store primitives for on-disc integer fields.
//!
//! ECMA-119 directory records store several fields twice, once little-endian
//! and once big-endian, and UDF volume structures use big-endian values.
//! These helpers read either encoding from raw sector bytes regardless of
//! host byte order.

mod private {
    pub trait Sealed {}
}

/// Fixed-width integer that can be loaded from or stored into raw disc bytes.
///
/// Implemented only for the 1/2/4/8-byte integer types; anything else is
/// rejected at compile time.
pub trait EndianInt: Copy + private::Sealed {
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Load a little-endian value from the start of `raw`.
    ///
    /// Panics if `raw` is shorter than [`EndianInt::WIDTH`].
    fn load_le(raw: &[u8]) -> Self;

    /// Load a big-endian value from the start of `raw`.
    ///
    /// Panics if `raw` is shorter than [`EndianInt::WIDTH`].
    fn load_be(raw: &[u8]) -> Self;

    /// Store the value little-endian into the start of `dest`.
    fn store_le(self, dest: &mut [u8]);

    /// Store the value big-endian into the start of `dest`.
    fn store_be(self, dest: &mut [u8]);
}

macro_rules! impl_endian_int {
    ($($ty:ty),+ $(,)?) => {$(
        impl private::Sealed for $ty {}

        impl EndianInt for $ty {
            const WIDTH: usize = std::mem::size_of::<$ty>();

            fn load_le(raw: &[u8]) -> Self {
                let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                bytes.copy_from_slice(&raw[..Self::WIDTH]);
                <$ty>::from_le_bytes(bytes)
            }

            fn load_be(raw: &[u8]) -> Self {
                let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                bytes.copy_from_slice(&raw[..Self::WIDTH]);
                <$ty>::from_be_bytes(bytes)
            }

            fn store_le(self, dest: &mut [u8]) {
                dest[..Self::WIDTH].copy_from_slice(&self.to_le_bytes());
            }

            fn store_be(self, dest: &mut [u8]) {
                dest[..Self::WIDTH].copy_from_slice(&self.to_be_bytes());
            }
        }
    )+};
}

impl_endian_int!(u8, u16, u32, u64, i8, i16, i32, i64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_both_orders() {
        let raw = [0x12, 0x34, 0x56, 0x78];
        assert_eq!(u32::load_le(&raw), 0x7856_3412);
        assert_eq!(u32::load_be(&raw), 0x1234_5678);
        assert_eq!(u16::load_le(&raw), 0x3412);
        assert_eq!(u16::load_be(&raw), 0x1234);
        assert_eq!(u8::load_le(&raw), 0x12);
        assert_eq!(u8::load_be(&raw), 0x12);
    }

    #[test]
    fn test_store_is_inverse_of_load() {
        let mut buf = [0u8; 8];
        0x0102_0304_0506_0708u64.store_be(&mut buf);
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(u64::load_be(&buf), 0x0102_0304_0506_0708);

        0x0102_0304u32.store_le(&mut buf);
        assert_eq!(&buf[..4], &[4, 3, 2, 1]);
        assert_eq!(u32::load_le(&buf), 0x0102_0304);
    }

    #[test]
    fn test_signed_values_keep_their_bits() {
        let mut buf = [0u8; 4];
        (-2i32).store_le(&mut buf);
        assert_eq!(i32::load_le(&buf), -2);
        assert_eq!(u32::load_le(&buf), 0xFFFF_FFFE);
    }

    #[test]
    fn test_load_ignores_trailing_bytes() {
        let raw = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE];
        assert_eq!(u32::load_be(&raw), 0xAABB_CCDD);
    }
}
