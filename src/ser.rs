//! XDR encoding (RFC 4506).
//!
//! The [`Encoder`] wraps any `std::io::Write` and offers one operation per
//! XDR wire primitive plus [`Encoder::encode_value`], the dispatch point the
//! whole crate recurses through. A cumulative byte counter tracks everything
//! actually handed to the writer, including partial progress before a
//! failure.
//!
//! ## Wire format summary
//! - All values are big-endian (network byte order)
//! - All items are padded to a multiple of 4 bytes
//! - Integers: 4 bytes (signed or unsigned), hypers: 8 bytes
//! - Floats: IEEE 754, 4 bytes; doubles: 8 bytes
//! - Strings/opaques: 4-byte length prefix + data + 0–3 zero-padding bytes
//! - Sequences: 4-byte count prefix + elements
//! - Structs: fields encoded consecutively, no prefix
//! - Maps: 4-byte entry count + alternating key/value encodings

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::io::{self, Write};

use crate::codec::{AnyValue, Encode};
use crate::error::{Error, Result};
use crate::registry;

// ── Public entry points ────────────────────────────────────────────────────

/// Encode `value` as XDR, writing into `writer`. Returns the number of
/// bytes written.
pub fn marshal<W: Write, T: Encode + 'static>(writer: &mut W, value: &T) -> Result<usize> {
    Encoder::new(writer).encode_value(value)
}

/// Encode `value` into a freshly allocated `Vec<u8>` of XDR bytes.
pub fn to_bytes<T: Encode + 'static>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    marshal(&mut buf, value)?;
    Ok(buf)
}

// ── Encoder ────────────────────────────────────────────────────────────────

/// The XDR encoder. Borrows one writer for its lifetime.
///
/// Obtain one via [`marshal`] / [`to_bytes`], or construct directly when the
/// cumulative byte count is needed after a failure:
///
/// ```
/// use xdr_wire::Encoder;
///
/// let mut buf = Vec::new();
/// let mut enc = Encoder::new(&mut buf);
/// enc.encode_value(&42u32).unwrap();
/// assert_eq!(enc.bytes_written(), 4);
/// assert_eq!(buf, [0, 0, 0, 42]);
/// ```
pub struct Encoder<'a> {
    writer: &'a mut (dyn Write + 'a),
    written: usize,
}

impl<'a> Encoder<'a> {
    /// Create a new encoder that writes into `writer`.
    pub fn new(writer: &'a mut (dyn Write + 'a)) -> Self {
        Encoder { writer, written: 0 }
    }

    /// Total bytes handed to the writer so far, including any partial
    /// progress made before an error.
    pub fn bytes_written(&self) -> usize {
        self.written
    }

    /// Encode a value of any supported type.
    ///
    /// Dispatch order: a registered override codec for `T` wins, otherwise
    /// the type's own [`Encode`] impl runs. Every recursion in the crate
    /// (struct fields, sequence elements, map entries, held dynamic values)
    /// funnels back through here, so overrides apply at any depth.
    pub fn encode_value<T: Encode + 'static>(&mut self, value: &T) -> Result<usize> {
        if let Some(codec) = registry::lookup(TypeId::of::<T>()) {
            return codec.encode(self, value);
        }
        value.encode(self)
    }

    // ── Primitive operations ───────────────────────────────────────────────

    /// XDR unsigned integer: 4 bytes, big-endian.
    pub fn encode_uint(&mut self, v: u32) -> Result<usize> {
        self.write_all(&v.to_be_bytes())
    }

    /// XDR signed integer: 4 bytes, big-endian, two's complement.
    pub fn encode_int(&mut self, v: i32) -> Result<usize> {
        self.write_all(&v.to_be_bytes())
    }

    /// XDR unsigned hyper integer: 8 bytes, big-endian.
    pub fn encode_uhyper(&mut self, v: u64) -> Result<usize> {
        self.write_all(&v.to_be_bytes())
    }

    /// XDR hyper integer: 8 bytes, big-endian, two's complement.
    pub fn encode_hyper(&mut self, v: i64) -> Result<usize> {
        self.write_all(&v.to_be_bytes())
    }

    /// XDR boolean, encoded as a signed integer 0 or 1.
    pub fn encode_bool(&mut self, v: bool) -> Result<usize> {
        self.encode_int(if v { 1 } else { 0 })
    }

    /// XDR single-precision float: the IEEE 754 bit pattern as an unsigned
    /// integer.
    pub fn encode_float(&mut self, v: f32) -> Result<usize> {
        self.encode_uint(v.to_bits())
    }

    /// XDR double-precision float: the IEEE 754 bit pattern as an unsigned
    /// hyper.
    pub fn encode_double(&mut self, v: f64) -> Result<usize> {
        self.encode_uhyper(v.to_bits())
    }

    /// XDR fixed-length opaque: the raw bytes followed by enough zero bytes
    /// to reach a 4-byte boundary. No length prefix.
    pub fn encode_opaque_fixed(&mut self, bytes: &[u8]) -> Result<usize> {
        let mut n = self.write_all(bytes)?;
        let pad = (4 - bytes.len() % 4) % 4;
        if pad > 0 {
            n += self.write_all(&[0u8; 3][..pad])?;
        }
        Ok(n)
    }

    /// XDR variable-length opaque: 4-byte length + padded data.
    pub fn encode_opaque(&mut self, bytes: &[u8]) -> Result<usize> {
        let len = u32::try_from(bytes.len()).map_err(|_| Error::LengthOverflow {
            max: u32::MAX,
            got: u32::MAX,
        })?;
        let mut n = self.encode_uint(len)?;
        n += self.encode_opaque_fixed(bytes)?;
        Ok(n)
    }

    /// XDR string: identical to variable-length opaque over the UTF-8 bytes.
    pub fn encode_string(&mut self, s: &str) -> Result<usize> {
        self.encode_opaque(s.as_bytes())
    }

    // ── Internal helpers ───────────────────────────────────────────────────

    /// Writes the whole buffer, folding however much the writer accepted
    /// into the cumulative counter before surfacing any error.
    fn write_all(&mut self, mut buf: &[u8]) -> Result<usize> {
        let mut written = 0;
        while !buf.is_empty() {
            match self.writer.write(buf) {
                Ok(0) => {
                    self.written += written;
                    return Err(Error::Io(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "writer accepted no bytes",
                    )));
                }
                Ok(n) => {
                    written += n;
                    buf = &buf[n..];
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.written += written;
                    return Err(Error::Io(e));
                }
            }
        }
        self.written += written;
        Ok(written)
    }
}

// ── Scalar impls ───────────────────────────────────────────────────────────

impl Encode for u8 {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        enc.encode_uint(u32::from(*self))
    }

    /// Byte runs are fixed-length opaque data, not per-element integers.
    fn encode_elems(items: &[Self], enc: &mut Encoder<'_>) -> Result<usize> {
        enc.encode_opaque_fixed(items)
    }
}

impl Encode for u16 {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        enc.encode_uint(u32::from(*self))
    }
}

impl Encode for u32 {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        enc.encode_uint(*self)
    }
}

impl Encode for u64 {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        enc.encode_uhyper(*self)
    }
}

impl Encode for i8 {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        enc.encode_int(i32::from(*self))
    }
}

impl Encode for i16 {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        enc.encode_int(i32::from(*self))
    }
}

impl Encode for i32 {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        enc.encode_int(*self)
    }
}

impl Encode for i64 {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        enc.encode_hyper(*self)
    }
}

impl Encode for bool {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        enc.encode_bool(*self)
    }
}

impl Encode for f32 {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        enc.encode_float(*self)
    }
}

impl Encode for f64 {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        enc.encode_double(*self)
    }
}

impl Encode for String {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        enc.encode_string(self)
    }
}

// ── Sequence impls ─────────────────────────────────────────────────────────

/// Fixed-length sequence: element encodings back to back, no prefix.
impl<T: Encode + 'static, const N: usize> Encode for [T; N] {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        T::encode_elems(self.as_slice(), enc)
    }
}

/// Variable-length sequence: 4-byte count prefix, then the fixed-sequence
/// body.
impl<T: Encode + 'static> Encode for Vec<T> {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        let count = u32::try_from(self.len()).map_err(|_| Error::LengthOverflow {
            max: u32::MAX,
            got: u32::MAX,
        })?;
        let mut n = enc.encode_uint(count)?;
        n += T::encode_elems(self.as_slice(), enc)?;
        Ok(n)
    }
}

// ── Map impls ──────────────────────────────────────────────────────────────
//
// Entry order is the map's own iteration order; round trips are equal by
// content, not byte-for-byte.

impl<K: Encode + Eq + Hash + 'static, V: Encode + 'static> Encode for HashMap<K, V> {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        encode_map_entries(enc, self.len(), self.iter())
    }
}

impl<K: Encode + Ord + 'static, V: Encode + 'static> Encode for BTreeMap<K, V> {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        encode_map_entries(enc, self.len(), self.iter())
    }
}

fn encode_map_entries<'e, K: Encode + 'static, V: Encode + 'static>(
    enc: &mut Encoder<'_>,
    len: usize,
    entries: impl Iterator<Item = (&'e K, &'e V)>,
) -> Result<usize> {
    let count = u32::try_from(len).map_err(|_| Error::LengthOverflow {
        max: u32::MAX,
        got: u32::MAX,
    })?;
    let mut n = enc.encode_uint(count)?;
    for (key, value) in entries {
        n += enc.encode_value(key)?;
        n += enc.encode_value(value)?;
    }
    Ok(n)
}

// ── Indirection impls ──────────────────────────────────────────────────────

/// Boxes are ownership indirection: the pointee is encoded, the box itself
/// contributes no bytes.
impl<T: Encode + 'static> Encode for Box<T> {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        enc.encode_value(&**self)
    }
}

/// Options are nullable indirection, not XDR optional-data: `Some` encodes
/// the inner value transparently, `None` has nothing to write and fails.
impl<T: Encode + 'static> Encode for Option<T> {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        match self {
            Some(value) => enc.encode_value(value),
            None => Err(Error::UnsetOption),
        }
    }
}

// ── Dynamic holder ─────────────────────────────────────────────────────────

impl Encode for AnyValue {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        match &self.0 {
            Some(value) => value.encode_dyn(enc),
            None => Err(Error::EmptyValue),
        }
    }
}
