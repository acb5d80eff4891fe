//! Pluggable identifier codecs used when saving and loading indexes.
//!
//! [`DefaultIdCodec`] covers the common scalar id kinds by inspecting the id
//! type at runtime. Other id types supply their own [`IdCodec`], typically
//! built from a pair of closures with [`FnIdCodec`].

use std::{
    any::{Any, TypeId, type_name},
    fmt,
};

use crate::error::{IndexError, Result};

/// Converts identifiers to and from the bytes stored in a saved index.
///
/// The persistence frame length-prefixes every encoded id, so codecs need
/// not be self-delimiting.
pub trait IdCodec<Id>: Send + Sync {
    /// Encodes `id` into bytes.
    ///
    /// # Errors
    /// Returns [`IndexError::UnsupportedIdType`] when the codec cannot
    /// represent the id type.
    fn encode(&self, id: &Id) -> Result<Vec<u8>>;

    /// Decodes an id previously produced by [`IdCodec::encode`].
    ///
    /// # Errors
    /// Returns [`IndexError::InvalidFormat`] for malformed bytes and
    /// [`IndexError::UnsupportedIdType`] when the id type is not handled.
    fn decode(&self, bytes: &[u8]) -> Result<Id>;
}

/// Built-in codec for `String`, `bool`, signed and unsigned integers, and
/// `f32` ids.
///
/// Signed integers are stored as 8-byte little-endian `i64`, unsigned as
/// `u64`, `f32` as 4 little-endian bytes, `bool` as one byte, and strings as
/// raw UTF-8.
///
/// A bare `f32` cannot key an index because [`IndexId`](crate::IndexId)
/// requires `Eq + Hash`. Float-valued ids need a wrapper type, such as one
/// holding `f32::to_bits`, persisted through a [`FnIdCodec`] that can
/// delegate to this codec's `f32` layout.
///
/// # Examples
/// ```
/// use vicinity_core::{DefaultIdCodec, IdCodec};
///
/// let bytes = IdCodec::<u32>::encode(&DefaultIdCodec, &7).expect("u32 is supported");
/// assert_eq!(bytes, 7u64.to_le_bytes());
/// let id: u32 = DefaultIdCodec.decode(&bytes).expect("round trip");
/// assert_eq!(id, 7);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultIdCodec;

macro_rules! encode_as {
    ($any:expr, $wide:ty => $($ty:ty),+) => {
        $(
            if let Some(value) = $any.downcast_ref::<$ty>() {
                return <$wide>::try_from(*value)
                    .map(|wide| wide.to_le_bytes().to_vec())
                    .map_err(|_| IndexError::invalid_format(concat!(
                        "id does not fit in ",
                        stringify!($wide)
                    )));
            }
        )+
    };
}

macro_rules! decode_as {
    ($target:expr, $bytes:expr, $wide:ty => $($ty:ty),+) => {
        $(
            if $target == TypeId::of::<$ty>() {
                let wide = <$wide>::from_le_bytes(fixed_width($bytes)?);
                let value = <$ty>::try_from(wide).map_err(|_| {
                    IndexError::invalid_format(format!(
                        "stored id {wide} does not fit in {}",
                        stringify!($ty)
                    ))
                })?;
                return Ok(Some(Box::new(value) as Box<dyn Any>));
            }
        )+
    };
}

impl<Id: Any> IdCodec<Id> for DefaultIdCodec {
    fn encode(&self, id: &Id) -> Result<Vec<u8>> {
        let any: &dyn Any = id;
        if let Some(value) = any.downcast_ref::<String>() {
            return Ok(value.as_bytes().to_vec());
        }
        if let Some(value) = any.downcast_ref::<bool>() {
            return Ok(vec![u8::from(*value)]);
        }
        if let Some(value) = any.downcast_ref::<f32>() {
            return Ok(value.to_le_bytes().to_vec());
        }
        encode_as!(any, i64 => i8, i16, i32, i64, isize);
        encode_as!(any, u64 => u8, u16, u32, u64, usize);
        Err(unsupported::<Id>())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Id> {
        let boxed = decode_scalar(TypeId::of::<Id>(), bytes)?.ok_or_else(unsupported::<Id>)?;
        boxed
            .downcast::<Id>()
            .map(|value| *value)
            .map_err(|_| unsupported::<Id>())
    }
}

fn decode_scalar(target: TypeId, bytes: &[u8]) -> Result<Option<Box<dyn Any>>> {
    if target == TypeId::of::<String>() {
        let value = String::from_utf8(bytes.to_vec())
            .map_err(|err| IndexError::invalid_format(format!("string id is not UTF-8: {err}")))?;
        return Ok(Some(Box::new(value) as Box<dyn Any>));
    }
    if target == TypeId::of::<bool>() {
        let value = match bytes {
            [0] => false,
            [1] => true,
            _ => return Err(IndexError::invalid_format("bool id must be a single 0 or 1 byte")),
        };
        return Ok(Some(Box::new(value) as Box<dyn Any>));
    }
    if target == TypeId::of::<f32>() {
        let value = f32::from_le_bytes(fixed_width(bytes)?);
        return Ok(Some(Box::new(value) as Box<dyn Any>));
    }
    decode_as!(target, bytes, i64 => i8, i16, i32, i64, isize);
    decode_as!(target, bytes, u64 => u8, u16, u32, u64, usize);
    Ok(None)
}

fn fixed_width<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| {
        IndexError::invalid_format(format!("expected {N} id bytes, found {}", bytes.len()))
    })
}

fn unsupported<Id>() -> IndexError {
    IndexError::UnsupportedIdType {
        type_name: type_name::<Id>(),
    }
}

/// Codec assembled from an encode closure and a decode closure.
///
/// # Examples
/// ```
/// use vicinity_core::{FnIdCodec, IdCodec, IndexError};
///
/// #[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// struct Sku([u8; 2]);
///
/// let codec = FnIdCodec::new(
///     |sku: &Sku| Ok(sku.0.to_vec()),
///     |bytes: &[u8]| {
///         let raw: [u8; 2] = bytes
///             .try_into()
///             .map_err(|_| IndexError::InvalidFormat { reason: "sku".into() })?;
///         Ok(Sku(raw))
///     },
/// );
/// let bytes = codec.encode(&Sku([4, 2])).expect("encode");
/// assert_eq!(codec.decode(&bytes).expect("decode"), Sku([4, 2]));
/// ```
pub struct FnIdCodec<E, D> {
    encode: E,
    decode: D,
}

impl<E, D> FnIdCodec<E, D> {
    /// Builds a codec from the two conversion closures.
    pub const fn new(encode: E, decode: D) -> Self {
        Self { encode, decode }
    }
}

impl<Id, E, D> IdCodec<Id> for FnIdCodec<E, D>
where
    E: Fn(&Id) -> Result<Vec<u8>> + Send + Sync,
    D: Fn(&[u8]) -> Result<Id> + Send + Sync,
{
    fn encode(&self, id: &Id) -> Result<Vec<u8>> {
        (self.encode)(id)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Id> {
        (self.decode)(bytes)
    }
}

impl<E, D> fmt::Debug for FnIdCodec<E, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnIdCodec").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn round_trip<Id: Any + fmt::Debug + PartialEq>(id: Id) {
        let bytes = DefaultIdCodec.encode(&id).expect("encode must succeed");
        let back: Id = DefaultIdCodec.decode(&bytes).expect("decode must succeed");
        assert_eq!(back, id);
    }

    #[rstest]
    fn scalar_kinds_round_trip() {
        round_trip(String::from("alpha"));
        round_trip(true);
        round_trip(-17_i8);
        round_trip(-40_000_i32);
        round_trip(i64::MIN);
        round_trip(-3_isize);
        round_trip(200_u8);
        round_trip(u64::MAX);
        round_trip(9_usize);
        round_trip(1.5_f32);
    }

    #[rstest]
    fn integers_use_eight_byte_little_endian() {
        let bytes = IdCodec::<i16>::encode(&DefaultIdCodec, &-2).expect("i16");
        assert_eq!(bytes, (-2_i64).to_le_bytes());
    }

    #[rstest]
    fn unsupported_type_is_rejected_both_ways() {
        let err = IdCodec::<(u8, u8)>::encode(&DefaultIdCodec, &(1, 2)).expect_err("tuple ids");
        assert!(matches!(err, IndexError::UnsupportedIdType { .. }));
        let err = IdCodec::<f64>::decode(&DefaultIdCodec, &[0; 8]).expect_err("f64 ids");
        assert!(matches!(err, IndexError::UnsupportedIdType { .. }));
    }

    #[rstest]
    #[case::short_integer(&[1, 2, 3])]
    #[case::empty(&[])]
    fn malformed_integer_bytes_are_invalid(#[case] bytes: &[u8]) {
        let err = IdCodec::<u32>::decode(&DefaultIdCodec, bytes).expect_err("bad width");
        assert!(matches!(err, IndexError::InvalidFormat { .. }));
    }

    #[rstest]
    fn narrowing_overflow_is_invalid() {
        let bytes = 300_u64.to_le_bytes();
        let err = IdCodec::<u8>::decode(&DefaultIdCodec, &bytes).expect_err("300 > u8::MAX");
        assert!(matches!(err, IndexError::InvalidFormat { .. }));
    }

    #[rstest]
    fn invalid_utf8_string_is_invalid() {
        let err = IdCodec::<String>::decode(&DefaultIdCodec, &[0xff, 0xfe]).expect_err("utf8");
        assert!(matches!(err, IndexError::InvalidFormat { .. }));
    }
}
