//! # xdr-wire
//!
//! Schema-less XDR (eXternal Data Representation, RFC 4506) marshaling: hand
//! in any supported value and get a deterministic byte stream, hand in bytes
//! and a typed target and get it populated. Round-tripping a supported value
//! yields an identical value.
//!
//! ## Overview
//!
//! XDR is the wire encoding used by ONC RPC protocols such as NFS. All
//! values are big-endian (network byte order), and every item occupies a
//! multiple of 4 bytes (padded with zeroes as needed).
//!
//! Dispatch is structure-directed: scalars, strings, fixed and variable
//! sequences, structs, maps, optional and boxed indirection, and dynamic
//! holders all route through [`Encoder::encode_value`] /
//! [`Decoder::decode_value`]. A process-wide [registry](register) of
//! override codecs is consulted first at every step, so a type whose
//! structural encoding would be wrong (timestamps, byte buffers) can be
//! given a different wire form without touching its definition.
//!
//! ## Quick start
//!
//! ```rust
//! use xdr_wire::{from_bytes, to_bytes, Decode, Encode};
//!
//! #[derive(Debug, Default, PartialEq, Encode, Decode)]
//! struct FileHandle {
//!     inode: u64,
//!     generation: u32,
//!     flags: u32,
//! }
//!
//! let fh = FileHandle { inode: 0x0102030405060708, generation: 42, flags: 0 };
//!
//! let bytes = to_bytes(&fh).unwrap();
//! assert_eq!(bytes.len(), 16); // 8 + 4 + 4
//!
//! let decoded: FileHandle = from_bytes(&bytes).unwrap();
//! assert_eq!(fh, decoded);
//! ```
//!
//! ## Streams and byte counts
//!
//! [`marshal`] and [`unmarshal`] work against any `std::io::Write` /
//! `std::io::Read` and return the number of bytes transferred. For the
//! count after a mid-stream failure, drive an [`Encoder`] or [`Decoder`]
//! directly and ask it afterwards.

// Lets derive-generated `::xdr_wire::` paths resolve inside this crate.
extern crate self as xdr_wire;

pub mod codec;
pub mod de;
pub mod error;
pub mod registry;
pub mod ser;

pub use codec::{AnyValue, Decode, Encode, OverrideCodec, Value};
pub use de::{from_bytes, unmarshal, Decoder};
pub use error::{Error, Result};
pub use registry::register;
pub use ser::{marshal, to_bytes, Encoder};
pub use xdr_wire_derive::{Decode, Encode};
