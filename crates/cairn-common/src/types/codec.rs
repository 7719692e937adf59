//! Fixed-width binary encoding for in-page slot storage.
//!
//! Hash bucket pages store (key, value) pairs in parallel slot arrays with an
//! explicit byte layout. Native struct layout and padding are never relied
//! upon: every slot type encodes itself into a fixed number of little-endian
//! bytes.

use super::ids::{PageId, RecordId};

/// A type with a fixed-width little-endian byte encoding.
///
/// Implementors must write exactly [`FixedCodec::ENCODED_LEN`] bytes and
/// decode from exactly that many.
///
/// # Example
///
/// ```rust
/// use cairn_common::types::FixedCodec;
///
/// let mut buf = [0u8; 8];
/// 42i64.encode_into(&mut buf);
/// assert_eq!(i64::decode_from(&buf), 42);
/// ```
pub trait FixedCodec: Copy {
    /// Number of bytes this type occupies in a slot.
    const ENCODED_LEN: usize;

    /// Writes the value into `buf[..Self::ENCODED_LEN]`.
    fn encode_into(&self, buf: &mut [u8]);

    /// Reads a value from `buf[..Self::ENCODED_LEN]`.
    fn decode_from(buf: &[u8]) -> Self;
}

macro_rules! impl_fixed_codec_for_int {
    ($($ty:ty),*) => {
        $(
            impl FixedCodec for $ty {
                const ENCODED_LEN: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn encode_into(&self, buf: &mut [u8]) {
                    buf[..Self::ENCODED_LEN].copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn decode_from(buf: &[u8]) -> Self {
                    <$ty>::from_le_bytes(buf[..Self::ENCODED_LEN].try_into().unwrap())
                }
            }
        )*
    };
}

impl_fixed_codec_for_int!(i32, u32, i64, u64);

impl FixedCodec for RecordId {
    const ENCODED_LEN: usize = 8;

    #[inline]
    fn encode_into(&self, buf: &mut [u8]) {
        buf[..4].copy_from_slice(&self.page_id().to_le_bytes());
        buf[4..8].copy_from_slice(&self.slot().to_le_bytes());
    }

    #[inline]
    fn decode_from(buf: &[u8]) -> Self {
        let page_id = PageId::from_le_bytes(buf[..4].try_into().unwrap());
        let slot = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        Self::new(page_id, slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_codec() {
        let mut buf = [0u8; 8];
        (-7i32).encode_into(&mut buf);
        assert_eq!(i32::decode_from(&buf), -7);

        u64::MAX.encode_into(&mut buf);
        assert_eq!(u64::decode_from(&buf), u64::MAX);
    }

    #[test]
    fn test_record_id_codec() {
        let rid = RecordId::new(PageId::new(123), 45);
        let mut buf = [0u8; 8];
        rid.encode_into(&mut buf);
        assert_eq!(RecordId::decode_from(&buf), rid);
    }

    #[test]
    fn test_encoding_is_little_endian() {
        let mut buf = [0u8; 4];
        0x0403_0201i32.encode_into(&mut buf);
        assert_eq!(buf, [1, 2, 3, 4]);
    }
}
