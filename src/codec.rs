//! Codec capability traits and the dynamic value holder.
//!
//! [`Encode`] and [`Decode`] are the per-type capabilities the rest of the
//! crate dispatches through. Most types get them from `#[derive(Encode,
//! Decode)]`; a hand-written impl takes full control of a type's wire form.
//! [`OverrideCodec`] is the registry-side counterpart: a type-erased codec
//! registered for a concrete type, consulted before the type's own impl.

use std::any::Any;

use crate::de::Decoder;
use crate::error::Result;
use crate::ser::Encoder;

/// A value that can be written as XDR.
pub trait Encode {
    /// Writes `self` to the encoder, returning the number of bytes written.
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize>;

    /// Writes a run of elements with no count prefix: the body of a
    /// fixed-length sequence. The default iterates through the encoder's
    /// dispatch; `u8` overrides it to emit the run as fixed-length opaque
    /// bytes (raw bytes plus alignment padding).
    fn encode_elems(items: &[Self], enc: &mut Encoder<'_>) -> Result<usize>
    where
        Self: Sized + 'static,
    {
        let mut n = 0;
        for item in items {
            n += enc.encode_value(item)?;
        }
        Ok(n)
    }
}

/// A value that can be populated from XDR.
///
/// Decoding fills existing storage rather than constructing, so a target can
/// be handed down through nested containers and dynamic holders. Containers
/// materialize missing element storage with [`Default`].
pub trait Decode {
    /// Reads into `self` from the decoder, returning the number of bytes
    /// consumed.
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize>;

    /// Reads a run of elements with no count prefix, the mirror of
    /// [`Encode::encode_elems`]. `u8` overrides it to read the run as
    /// fixed-length opaque bytes.
    fn decode_elems(items: &mut [Self], dec: &mut Decoder<'_>) -> Result<usize>
    where
        Self: Sized + 'static,
    {
        let mut n = 0;
        for item in items {
            n += dec.decode_value(item)?;
        }
        Ok(n)
    }
}

/// A type-erased codec registered for one concrete type.
///
/// Registered via [`register`](crate::register) and consulted by the
/// dispatch before the type's own [`Encode`]/[`Decode`] impl, so a
/// registration replaces the default behavior for that type everywhere it
/// appears, including struct fields and container elements. Implementations
/// downcast the erased value; a mismatch is reported as
/// [`Error::Unsupported`](crate::Error::Unsupported).
pub trait OverrideCodec: Send + Sync {
    /// Encodes the erased `value`, returning the number of bytes written.
    fn encode(&self, enc: &mut Encoder<'_>, value: &dyn Any) -> Result<usize>;

    /// Decodes into the erased `target`, returning the number of bytes
    /// consumed.
    fn decode(&self, dec: &mut Decoder<'_>, target: &mut dyn Any) -> Result<usize>;
}

/// Object-safe bridge implemented for every `Encode + Decode` type, so a
/// concrete value can live behind [`AnyValue`] and still re-enter the full
/// dispatch (override probe included) when reached during a walk.
pub trait Value: Any {
    /// Encodes the concrete value through the encoder's dispatch.
    fn encode_dyn(&self, enc: &mut Encoder<'_>) -> Result<usize>;

    /// Decodes into the concrete value through the decoder's dispatch.
    fn decode_dyn(&mut self, dec: &mut Decoder<'_>) -> Result<usize>;

    /// Borrows the value for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutably borrows the value for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Encode + Decode + 'static> Value for T {
    fn encode_dyn(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        enc.encode_value(self)
    }

    fn decode_dyn(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        dec.decode_value(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A holder for a value whose concrete type is chosen at runtime.
///
/// On the wire an `AnyValue` is exactly the encoding of the value it holds;
/// the holder itself contributes no bytes. An empty holder cannot be encoded
/// or decoded ([`Error::EmptyValue`](crate::Error::EmptyValue)): decoding
/// needs a concrete value already in place to know the shape of the bytes.
///
/// ```
/// use xdr_wire::{to_bytes, unmarshal, AnyValue};
///
/// let holder = AnyValue::new(7u32);
/// let bytes = to_bytes(&holder).unwrap();
/// assert_eq!(bytes, [0, 0, 0, 7]);
///
/// let mut target = AnyValue::new(0u32);
/// unmarshal(&mut &bytes[..], &mut target).unwrap();
/// assert_eq!(target.downcast_ref::<u32>(), Some(&7));
/// ```
#[derive(Default)]
pub struct AnyValue(pub(crate) Option<Box<dyn Value>>);

impl AnyValue {
    /// Wraps a concrete value.
    pub fn new<T: Encode + Decode + 'static>(value: T) -> Self {
        AnyValue(Some(Box::new(value)))
    }

    /// An empty holder. Encoding or decoding it fails until a value is set.
    pub fn empty() -> Self {
        AnyValue(None)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Replaces the held value.
    pub fn set<T: Encode + Decode + 'static>(&mut self, value: T) {
        self.0 = Some(Box::new(value));
    }

    /// Borrows the held value as `T`, if the holder is non-empty and the
    /// concrete type matches.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_ref()?.as_any().downcast_ref()
    }

    /// Mutably borrows the held value as `T`.
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.0.as_mut()?.as_any_mut().downcast_mut()
    }
}

impl std::fmt::Debug for AnyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(_) => f.write_str("AnyValue(..)"),
            None => f.write_str("AnyValue(empty)"),
        }
    }
}

// The held value's concrete type isn't known without a downcast target, so
// this can only distinguish empty from non-empty; it exists so containers
// with an `AnyValue` field can still derive `PartialEq`.
impl PartialEq for AnyValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.is_none() == other.0.is_none()
    }
}
