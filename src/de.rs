//! XDR decoding (RFC 4506).
//!
//! The [`Decoder`] wraps any `std::io::Read` and mirrors the encoder: one
//! operation per wire primitive plus [`Decoder::decode_value`], the dispatch
//! point every recursion funnels through. Decoding populates existing
//! storage; containers materialize element slots with [`Default`] before
//! recursing into them.
//!
//! A full primitive must be available: short reads are driven to completion
//! and a stream that ends mid-primitive is an error, never a silently
//! truncated value. The cumulative byte counter reflects what was actually
//! consumed, including partial progress before a failure.

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::io::{self, Read};

use crate::codec::{AnyValue, Decode};
use crate::error::{Error, Result};
use crate::registry;

// ── Public entry points ────────────────────────────────────────────────────

/// Decode XDR from `reader` into `target`. Returns the number of bytes
/// consumed.
pub fn unmarshal<R: Read, T: Decode + 'static>(reader: &mut R, target: &mut T) -> Result<usize> {
    Decoder::new(reader).decode_value(target)
}

/// Decode a value from XDR bytes. Trailing bytes beyond the value are left
/// unread.
pub fn from_bytes<T: Decode + Default + 'static>(mut input: &[u8]) -> Result<T> {
    let mut value = T::default();
    unmarshal(&mut input, &mut value)?;
    Ok(value)
}

// ── Decoder ────────────────────────────────────────────────────────────────

/// The XDR decoder. Borrows one reader for its lifetime.
///
/// Obtain one via [`unmarshal`] / [`from_bytes`], or construct directly when
/// the cumulative count is needed after a failure, or to lower the
/// length ceiling for untrusted input:
///
/// ```
/// use xdr_wire::{Decoder, Error};
///
/// // Declared length 64, ceiling 16.
/// let bytes = [0u8, 0, 0, 64];
/// let mut input = &bytes[..];
/// let mut dec = Decoder::with_max_len(&mut input, 16);
/// let mut target = Vec::<u8>::new();
/// let err = dec.decode_value(&mut target).unwrap_err();
/// assert!(matches!(err, Error::LengthOverflow { max: 16, got: 64 }));
/// assert_eq!(dec.consumed(), 4); // the prefix was read, the body was not
/// ```
pub struct Decoder<'a> {
    reader: &'a mut (dyn Read + 'a),
    consumed: usize,
    max_len: u32,
}

/// Default ceiling for decoded length and count prefixes.
const DEFAULT_MAX_LEN: u32 = i32::MAX as u32;

impl<'a> Decoder<'a> {
    /// Create a new decoder reading from `reader`, with the default length
    /// ceiling of `2^31 - 1`.
    pub fn new(reader: &'a mut (dyn Read + 'a)) -> Self {
        Decoder::with_max_len(reader, DEFAULT_MAX_LEN)
    }

    /// Create a decoder with a custom ceiling for length and count
    /// prefixes. Any decoded prefix above it fails with
    /// [`Error::LengthOverflow`].
    pub fn with_max_len(reader: &'a mut (dyn Read + 'a), max_len: u32) -> Self {
        Decoder {
            reader,
            consumed: 0,
            max_len,
        }
    }

    /// Total bytes consumed from the reader so far, including any partial
    /// progress made before an error.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Decode into a target of any supported type.
    ///
    /// Dispatch order mirrors the encoder: a registered override codec for
    /// `T` wins, otherwise the type's own [`Decode`] impl runs.
    pub fn decode_value<T: Decode + 'static>(&mut self, target: &mut T) -> Result<usize> {
        if let Some(codec) = registry::lookup(TypeId::of::<T>()) {
            return codec.decode(self, target);
        }
        target.decode(self)
    }

    // ── Primitive operations ───────────────────────────────────────────────
    //
    // Each returns the decoded value and the number of bytes consumed.

    /// XDR unsigned integer: 4 bytes, big-endian.
    pub fn decode_uint(&mut self) -> Result<(u32, usize)> {
        let mut buf = [0u8; 4];
        let n = self.read_full(&mut buf)?;
        Ok((u32::from_be_bytes(buf), n))
    }

    /// XDR signed integer: 4 bytes, big-endian, two's complement.
    pub fn decode_int(&mut self) -> Result<(i32, usize)> {
        let (v, n) = self.decode_uint()?;
        Ok((v as i32, n))
    }

    /// XDR unsigned hyper integer: 8 bytes, big-endian.
    pub fn decode_uhyper(&mut self) -> Result<(u64, usize)> {
        let mut buf = [0u8; 8];
        let n = self.read_full(&mut buf)?;
        Ok((u64::from_be_bytes(buf), n))
    }

    /// XDR hyper integer: 8 bytes, big-endian, two's complement.
    pub fn decode_hyper(&mut self) -> Result<(i64, usize)> {
        let (v, n) = self.decode_uhyper()?;
        Ok((v as i64, n))
    }

    /// XDR boolean. Strict: only 0 and 1 are accepted.
    pub fn decode_bool(&mut self) -> Result<(bool, usize)> {
        let (v, n) = self.decode_uint()?;
        match v {
            0 => Ok((false, n)),
            1 => Ok((true, n)),
            _ => Err(Error::InvalidBool(v)),
        }
    }

    /// XDR single-precision float, from its big-endian bit pattern.
    pub fn decode_float(&mut self) -> Result<(f32, usize)> {
        let (bits, n) = self.decode_uint()?;
        Ok((f32::from_bits(bits), n))
    }

    /// XDR double-precision float, from its big-endian bit pattern.
    pub fn decode_double(&mut self) -> Result<(f64, usize)> {
        let (bits, n) = self.decode_uhyper()?;
        Ok((f64::from_bits(bits), n))
    }

    /// XDR fixed-length opaque: fills `buf` and consumes the 0–3 trailing
    /// padding bytes. Returns bytes consumed (data plus padding).
    pub fn decode_opaque_fixed_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut n = self.read_full(buf)?;
        let pad = (4 - buf.len() % 4) % 4;
        if pad > 0 {
            let mut scratch = [0u8; 3];
            n += self.read_full(&mut scratch[..pad])?;
        }
        Ok(n)
    }

    /// XDR variable-length opaque: 4-byte length, then the padded body. The
    /// declared length is checked against the ceiling before any allocation.
    pub fn decode_opaque(&mut self) -> Result<(Vec<u8>, usize)> {
        let (len, mut n) = self.decode_uint()?;
        self.check_len(len)?;
        let mut data = vec![0u8; len as usize];
        n += self.decode_opaque_fixed_into(&mut data)?;
        Ok((data, n))
    }

    /// XDR string: a variable-length opaque whose body must be valid UTF-8
    /// (the validated-text policy `String` imposes).
    pub fn decode_string(&mut self) -> Result<(String, usize)> {
        let (bytes, n) = self.decode_opaque()?;
        let s = String::from_utf8(bytes).map_err(|_| Error::InvalidString)?;
        Ok((s, n))
    }

    // ── Internal helpers ───────────────────────────────────────────────────

    pub(crate) fn check_len(&self, got: u32) -> Result<()> {
        if got > self.max_len {
            return Err(Error::LengthOverflow {
                max: self.max_len,
                got,
            });
        }
        Ok(())
    }

    /// Reads until `buf` is full. A stream that ends early is
    /// [`Error::UnexpectedEof`]; whatever was read is folded into the
    /// cumulative counter before any error surfaces.
    fn read_full(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => {
                    self.consumed += filled;
                    return Err(Error::UnexpectedEof);
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.consumed += filled;
                    return Err(Error::Io(e));
                }
            }
        }
        self.consumed += filled;
        Ok(filled)
    }
}

// ── Scalar impls ───────────────────────────────────────────────────────────
//
// Integers narrower than 32 bits travel as the full 4-byte word; decoding
// fails when the wire value does not fit the target.

impl Decode for u8 {
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        let (v, n) = dec.decode_uint()?;
        *self = u8::try_from(v).map_err(|_| Error::IntegerOverflow {
            value: i64::from(v),
            target: "u8",
        })?;
        Ok(n)
    }

    /// Byte runs are fixed-length opaque data, not per-element integers.
    fn decode_elems(items: &mut [Self], dec: &mut Decoder<'_>) -> Result<usize> {
        dec.decode_opaque_fixed_into(items)
    }
}

impl Decode for u16 {
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        let (v, n) = dec.decode_uint()?;
        *self = u16::try_from(v).map_err(|_| Error::IntegerOverflow {
            value: i64::from(v),
            target: "u16",
        })?;
        Ok(n)
    }
}

impl Decode for u32 {
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        let (v, n) = dec.decode_uint()?;
        *self = v;
        Ok(n)
    }
}

impl Decode for u64 {
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        let (v, n) = dec.decode_uhyper()?;
        *self = v;
        Ok(n)
    }
}

impl Decode for i8 {
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        let (v, n) = dec.decode_int()?;
        *self = i8::try_from(v).map_err(|_| Error::IntegerOverflow {
            value: i64::from(v),
            target: "i8",
        })?;
        Ok(n)
    }
}

impl Decode for i16 {
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        let (v, n) = dec.decode_int()?;
        *self = i16::try_from(v).map_err(|_| Error::IntegerOverflow {
            value: i64::from(v),
            target: "i16",
        })?;
        Ok(n)
    }
}

impl Decode for i32 {
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        let (v, n) = dec.decode_int()?;
        *self = v;
        Ok(n)
    }
}

impl Decode for i64 {
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        let (v, n) = dec.decode_hyper()?;
        *self = v;
        Ok(n)
    }
}

impl Decode for bool {
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        let (v, n) = dec.decode_bool()?;
        *self = v;
        Ok(n)
    }
}

impl Decode for f32 {
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        let (v, n) = dec.decode_float()?;
        *self = v;
        Ok(n)
    }
}

impl Decode for f64 {
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        let (v, n) = dec.decode_double()?;
        *self = v;
        Ok(n)
    }
}

impl Decode for String {
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        let (s, n) = dec.decode_string()?;
        *self = s;
        Ok(n)
    }
}

// ── Sequence impls ─────────────────────────────────────────────────────────

/// Fixed-length sequence: the element count is the array's own length, no
/// prefix on the wire.
impl<T: Decode + 'static, const N: usize> Decode for [T; N] {
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        T::decode_elems(self.as_mut_slice(), dec)
    }
}

/// Variable-length sequence: 4-byte count prefix, then the fixed-sequence
/// body. The target is resized to the decoded count, materializing new
/// elements with [`Default`].
impl<T: Decode + Default + 'static> Decode for Vec<T> {
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        let (count, mut n) = dec.decode_uint()?;
        dec.check_len(count)?;
        self.clear();
        self.resize_with(count as usize, T::default);
        n += T::decode_elems(self.as_mut_slice(), dec)?;
        Ok(n)
    }
}

// ── Map impls ──────────────────────────────────────────────────────────────
//
// 4-byte entry count, then count key/value pairs. The target is emptied
// first; a duplicate key keeps the last decoded value.

impl<K, V> Decode for HashMap<K, V>
where
    K: Decode + Default + Eq + Hash + 'static,
    V: Decode + Default + 'static,
{
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        let (count, mut n) = dec.decode_uint()?;
        dec.check_len(count)?;
        self.clear();
        self.reserve(count as usize);
        for _ in 0..count {
            let mut key = K::default();
            n += dec.decode_value(&mut key)?;
            let mut value = V::default();
            n += dec.decode_value(&mut value)?;
            self.insert(key, value);
        }
        Ok(n)
    }
}

impl<K, V> Decode for BTreeMap<K, V>
where
    K: Decode + Default + Ord + 'static,
    V: Decode + Default + 'static,
{
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        let (count, mut n) = dec.decode_uint()?;
        dec.check_len(count)?;
        self.clear();
        for _ in 0..count {
            let mut key = K::default();
            n += dec.decode_value(&mut key)?;
            let mut value = V::default();
            n += dec.decode_value(&mut value)?;
            self.insert(key, value);
        }
        Ok(n)
    }
}

// ── Indirection impls ──────────────────────────────────────────────────────

/// Boxes decode through to the pointee; the storage already exists.
impl<T: Decode + 'static> Decode for Box<T> {
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        dec.decode_value(&mut **self)
    }
}

/// Options materialize missing storage on the way down: decoding into
/// `None` first installs `Some(T::default())`, then recurses into it.
impl<T: Decode + Default + 'static> Decode for Option<T> {
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        let slot = self.get_or_insert_with(T::default);
        dec.decode_value(slot)
    }
}

// ── Dynamic holder ─────────────────────────────────────────────────────────

/// Decoding re-enters the dispatch with the held concrete value; the bytes
/// alone cannot name a type, so an empty holder is an error.
impl Decode for AnyValue {
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        match &mut self.0 {
            Some(value) => value.decode_dyn(dec),
            None => Err(Error::EmptyValue),
        }
    }
}
