//! Process-wide override codec registry.
//!
//! Some types have a structural encoding that would be wrong or wasteful: a
//! timestamp is internally a pair of counters, a byte buffer carries
//! bookkeeping that does not belong on the wire. The registry maps a
//! concrete type to an [`OverrideCodec`] that replaces the default behavior
//! for that type everywhere the dispatch reaches it.
//!
//! Two entries are installed when the registry is first touched:
//! [`chrono::DateTime<Utc>`] (RFC 3339 string with nanosecond precision)
//! and [`bytes::BytesMut`] (variable-length opaque). Re-registering a type
//! replaces its entry: the last writer wins.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::codec::{Decode, Encode, OverrideCodec};
use crate::de::Decoder;
use crate::error::{Error, Result};
use crate::ser::Encoder;

type Registry = HashMap<TypeId, Arc<dyn OverrideCodec>>;

static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();

fn registry() -> &'static RwLock<Registry> {
    REGISTRY.get_or_init(|| {
        let mut map: Registry = HashMap::new();
        map.insert(TypeId::of::<DateTime<Utc>>(), Arc::new(TimestampCodec));
        map.insert(TypeId::of::<BytesMut>(), Arc::new(ByteBufCodec));
        RwLock::new(map)
    })
}

/// Registers `codec` as the override for `T`, replacing any existing entry.
///
/// The registry is consulted before `T`'s own [`Encode`]/[`Decode`] impl at
/// every dispatch point, so a registration changes `T`'s wire form wherever
/// it appears. Registration is internally synchronized and safe at any
/// time; the registry is expected to be read-mostly after startup.
pub fn register<T: 'static>(codec: impl OverrideCodec + 'static) {
    let mut map = registry().write().unwrap_or_else(PoisonError::into_inner);
    map.insert(TypeId::of::<T>(), Arc::new(codec));
}

pub(crate) fn lookup(id: TypeId) -> Option<Arc<dyn OverrideCodec>> {
    registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .cloned()
}

// ── Timestamp ──────────────────────────────────────────────────────────────
//
// On the wire a timestamp is an XDR string holding the RFC 3339 nanosecond
// form, e.g. "2026-08-02T09:15:30.000000001+00:00". Decoding accepts the
// same precision it encodes.

struct TimestampCodec;

impl OverrideCodec for TimestampCodec {
    fn encode(&self, enc: &mut Encoder<'_>, value: &dyn Any) -> Result<usize> {
        let ts = value
            .downcast_ref::<DateTime<Utc>>()
            .ok_or(Error::Unsupported("chrono::DateTime<Utc>"))?;
        encode_timestamp(enc, ts)
    }

    fn decode(&self, dec: &mut Decoder<'_>, target: &mut dyn Any) -> Result<usize> {
        let slot = target
            .downcast_mut::<DateTime<Utc>>()
            .ok_or(Error::Unsupported("chrono::DateTime<Utc>"))?;
        decode_timestamp(dec, slot)
    }
}

fn encode_timestamp(enc: &mut Encoder<'_>, ts: &DateTime<Utc>) -> Result<usize> {
    enc.encode_string(&ts.to_rfc3339_opts(SecondsFormat::Nanos, true))
}

fn decode_timestamp(dec: &mut Decoder<'_>, slot: &mut DateTime<Utc>) -> Result<usize> {
    let (s, n) = dec.decode_string()?;
    let parsed =
        DateTime::parse_from_rfc3339(&s).map_err(|e| Error::InvalidTimestamp(e.to_string()))?;
    *slot = parsed.with_timezone(&Utc);
    Ok(n)
}

impl Encode for DateTime<Utc> {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        encode_timestamp(enc, self)
    }
}

impl Decode for DateTime<Utc> {
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        decode_timestamp(dec, self)
    }
}

// ── Byte buffer ────────────────────────────────────────────────────────────
//
// The buffer's contents travel as one variable-length opaque. Decoding
// replaces the target with a fresh buffer holding exactly the decoded
// bytes, positioned at the start.

struct ByteBufCodec;

impl OverrideCodec for ByteBufCodec {
    fn encode(&self, enc: &mut Encoder<'_>, value: &dyn Any) -> Result<usize> {
        let buf = value
            .downcast_ref::<BytesMut>()
            .ok_or(Error::Unsupported("bytes::BytesMut"))?;
        enc.encode_opaque(buf.as_ref())
    }

    fn decode(&self, dec: &mut Decoder<'_>, target: &mut dyn Any) -> Result<usize> {
        let slot = target
            .downcast_mut::<BytesMut>()
            .ok_or(Error::Unsupported("bytes::BytesMut"))?;
        let (data, n) = dec.decode_opaque()?;
        *slot = BytesMut::from(&data[..]);
        Ok(n)
    }
}

impl Encode for BytesMut {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        enc.encode_opaque(self.as_ref())
    }
}

impl Decode for BytesMut {
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        let (data, n) = dec.decode_opaque()?;
        *self = BytesMut::from(&data[..]);
        Ok(n)
    }
}

impl Encode for Bytes {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<usize> {
        enc.encode_opaque(self.as_ref())
    }
}

impl Decode for Bytes {
    fn decode(&mut self, dec: &mut Decoder<'_>) -> Result<usize> {
        let (data, n) = dec.decode_opaque()?;
        *self = Bytes::from(data);
        Ok(n)
    }
}
