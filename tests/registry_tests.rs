use std::any::Any;

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, TimeZone, Utc};
use xdr_wire::{
    from_bytes, register, to_bytes, unmarshal, AnyValue, Decode, Decoder, Encode, Encoder, Error,
    OverrideCodec,
};

// ── Timestamp override ─────────────────────────────────────────────────────

#[test]
fn test_timestamp_encodes_as_rfc3339_string() {
    let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
    let bytes = to_bytes(&ts).unwrap();
    // On the wire, a timestamp is an XDR string.
    let s: String = from_bytes(&bytes).unwrap();
    assert_eq!(s, "2023-11-14T22:13:20.123456789Z");
}

#[test]
fn test_timestamp_roundtrip_nanosecond_precision() {
    let ts = Utc.timestamp_opt(1_700_000_000, 987_654_321).unwrap();
    let bytes = to_bytes(&ts).unwrap();
    let mut decoded = DateTime::<Utc>::UNIX_EPOCH;
    let n = unmarshal(&mut &bytes[..], &mut decoded).unwrap();
    assert_eq!(n, bytes.len());
    assert_eq!(ts, decoded);
}

#[test]
fn test_timestamp_invalid() {
    let bytes = to_bytes(&"not-a-time".to_string()).unwrap();
    let mut target = DateTime::<Utc>::UNIX_EPOCH;
    let err = unmarshal(&mut &bytes[..], &mut target).unwrap_err();
    assert!(matches!(err, Error::InvalidTimestamp(_)));
}

#[test]
fn test_timestamp_as_struct_field() {
    #[derive(Debug, PartialEq, Encode, Decode)]
    struct Event {
        id: u32,
        at: DateTime<Utc>,
    }

    let event = Event {
        id: 9,
        at: Utc.timestamp_opt(0, 1).unwrap(),
    };
    let bytes = to_bytes(&event).unwrap();
    let mut decoded = Event { id: 0, at: DateTime::UNIX_EPOCH };
    unmarshal(&mut &bytes[..], &mut decoded).unwrap();
    assert_eq!(event, decoded);
}

// ── Byte-buffer override ───────────────────────────────────────────────────

#[test]
fn test_byte_buffer_is_variable_opaque() {
    let buf = BytesMut::from(&[0x01u8, 0x02, 0x03][..]);
    let bytes = to_bytes(&buf).unwrap();
    // Identical wire form to a plain byte sequence.
    assert_eq!(bytes, to_bytes(&vec![0x01u8, 0x02, 0x03]).unwrap());

    let decoded: BytesMut = from_bytes(&bytes).unwrap();
    assert_eq!(&decoded[..], [0x01, 0x02, 0x03]);
}

#[test]
fn test_byte_buffer_decode_replaces_contents() {
    let bytes = to_bytes(&vec![0xAAu8; 2]).unwrap();
    let mut target = BytesMut::from(&b"stale contents"[..]);
    unmarshal(&mut &bytes[..], &mut target).unwrap();
    assert_eq!(&target[..], [0xAA, 0xAA]);
}

#[test]
fn test_bytes_roundtrip() {
    let b = Bytes::from_static(&[9, 8, 7, 6, 5]);
    let bytes = to_bytes(&b).unwrap();
    assert_eq!(bytes.len(), 4 + 5 + 3);
    assert_eq!(b, from_bytes::<Bytes>(&bytes).unwrap());
}

// ── Custom overrides ───────────────────────────────────────────────────────

// Encodes a Meters value as an XDR string like "18m" instead of its
// structural u32 form.
struct MetersAsString;

#[derive(Debug, Default, PartialEq, Encode, Decode)]
struct Meters(u32);

impl OverrideCodec for MetersAsString {
    fn encode(&self, enc: &mut Encoder<'_>, value: &dyn Any) -> xdr_wire::Result<usize> {
        let m = value.downcast_ref::<Meters>().ok_or(Error::Unsupported("Meters"))?;
        enc.encode_string(&format!("{}m", m.0))
    }

    fn decode(&self, dec: &mut Decoder<'_>, target: &mut dyn Any) -> xdr_wire::Result<usize> {
        let m = target.downcast_mut::<Meters>().ok_or(Error::Unsupported("Meters"))?;
        let (s, n) = dec.decode_string()?;
        let digits = s.strip_suffix('m').unwrap_or(&s);
        m.0 = digits.parse().map_err(|_| Error::InvalidString)?;
        Ok(n)
    }
}

// Encodes a Meters value as a hyper.
struct MetersAsHyper;

impl OverrideCodec for MetersAsHyper {
    fn encode(&self, enc: &mut Encoder<'_>, value: &dyn Any) -> xdr_wire::Result<usize> {
        let m = value.downcast_ref::<Meters>().ok_or(Error::Unsupported("Meters"))?;
        enc.encode_uhyper(u64::from(m.0))
    }

    fn decode(&self, dec: &mut Decoder<'_>, target: &mut dyn Any) -> xdr_wire::Result<usize> {
        let m = target.downcast_mut::<Meters>().ok_or(Error::Unsupported("Meters"))?;
        let (v, n) = dec.decode_uhyper()?;
        m.0 = v as u32;
        Ok(n)
    }
}

#[test]
fn test_register_overrides_structural_form_and_last_writer_wins() {
    // Structural form first: a plain 4-byte integer.
    assert_eq!(to_bytes(&Meters(18)).unwrap(), [0, 0, 0, 18]);

    // A registered override replaces it everywhere, including fields.
    register::<Meters>(MetersAsString);
    let bytes = to_bytes(&Meters(18)).unwrap();
    assert_eq!(bytes, to_bytes(&"18m".to_string()).unwrap());
    assert_eq!(Meters(18), from_bytes::<Meters>(&bytes).unwrap());

    #[derive(Debug, Default, PartialEq, Encode, Decode)]
    struct Span {
        length: Meters,
        width: Meters,
    }
    let span = Span { length: Meters(3), width: Meters(4) };
    let bytes = to_bytes(&span).unwrap();
    assert_eq!(span, from_bytes::<Span>(&bytes).unwrap());
    // "3m" and "4m" as strings: 2 * (4 + 2 + 2 pad)
    assert_eq!(bytes.len(), 16);

    // Re-registering replaces the entry: the last writer wins.
    register::<Meters>(MetersAsHyper);
    let bytes = to_bytes(&Meters(18)).unwrap();
    assert_eq!(bytes, [0, 0, 0, 0, 0, 0, 0, 18]);
    assert_eq!(Meters(18), from_bytes::<Meters>(&bytes).unwrap());
}

// ── Dynamic values ─────────────────────────────────────────────────────────

#[test]
fn test_any_value_is_transparent() {
    let holder = AnyValue::new(0xDEADBEEFu32);
    let bytes = to_bytes(&holder).unwrap();
    assert_eq!(bytes, [0xDE, 0xAD, 0xBE, 0xEF]);
}

#[test]
fn test_any_value_decode_into_concrete_slot() {
    let bytes = to_bytes(&"dyn".to_string()).unwrap();
    let mut target = AnyValue::new(String::new());
    let n = unmarshal(&mut &bytes[..], &mut target).unwrap();
    assert_eq!(n, bytes.len());
    assert_eq!(target.downcast_ref::<String>().map(String::as_str), Some("dyn"));
}

#[test]
fn test_any_value_empty_fails_both_ways() {
    let empty = AnyValue::empty();
    assert!(empty.is_empty());
    assert!(matches!(to_bytes(&empty).unwrap_err(), Error::EmptyValue));

    let mut target = AnyValue::empty();
    let err = unmarshal(&mut &[0u8, 0, 0, 1][..], &mut target).unwrap_err();
    assert!(matches!(err, Error::EmptyValue));
}

#[test]
fn test_any_value_nested_in_record() {
    #[derive(Debug, Default, PartialEq, Encode, Decode)]
    struct Envelope {
        tag: u32,
        payload: AnyValue,
    }

    // PartialEq on Envelope can't see through the holder, so compare the
    // pieces explicitly.
    let env = Envelope { tag: 1, payload: AnyValue::new(vec![7u32, 8, 9]) };
    let bytes = to_bytes(&env).unwrap();

    let mut decoded = Envelope { tag: 0, payload: AnyValue::new(Vec::<u32>::new()) };
    unmarshal(&mut &bytes[..], &mut decoded).unwrap();
    assert_eq!(decoded.tag, 1);
    assert_eq!(decoded.payload.downcast_ref::<Vec<u32>>(), Some(&vec![7u32, 8, 9]));
}

#[test]
fn test_any_value_rebind() {
    let mut holder = AnyValue::empty();
    holder.set(5u16);
    assert_eq!(to_bytes(&holder).unwrap(), [0, 0, 0, 5]);
    assert_eq!(holder.downcast_ref::<u16>(), Some(&5));
    assert_eq!(holder.downcast_ref::<u32>(), None);
    assert_eq!(holder.downcast_mut::<u16>(), Some(&mut 5));
}

// ── Override probe depth ───────────────────────────────────────────────────

#[derive(Debug, Default, PartialEq, Encode, Decode)]
struct Celsius(i32);

struct CelsiusShifted;

// Stores the value shifted by 273 so the wire carries kelvins.
impl OverrideCodec for CelsiusShifted {
    fn encode(&self, enc: &mut Encoder<'_>, value: &dyn Any) -> xdr_wire::Result<usize> {
        let c = value.downcast_ref::<Celsius>().ok_or(Error::Unsupported("Celsius"))?;
        enc.encode_int(c.0 + 273)
    }

    fn decode(&self, dec: &mut Decoder<'_>, target: &mut dyn Any) -> xdr_wire::Result<usize> {
        let c = target.downcast_mut::<Celsius>().ok_or(Error::Unsupported("Celsius"))?;
        let (v, n) = dec.decode_int()?;
        c.0 = v - 273;
        Ok(n)
    }
}

#[test]
fn test_override_applies_inside_containers_and_holders() {
    register::<Celsius>(CelsiusShifted);

    // Vector elements go through the dispatch, so the override applies.
    let v = vec![Celsius(0), Celsius(27)];
    let bytes = to_bytes(&v).unwrap();
    assert_eq!(bytes, [0, 0, 0, 2, 0, 0, 1, 17, 0, 0, 1, 44]); // 273, 300
    assert_eq!(v, from_bytes::<Vec<Celsius>>(&bytes).unwrap());

    // So does a value reached through a dynamic holder.
    let held = AnyValue::new(Celsius(-273));
    assert_eq!(to_bytes(&held).unwrap(), [0, 0, 0, 0]);
}
