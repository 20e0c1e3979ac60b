use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during XDR encoding or decoding.
#[derive(Debug, Error)]
pub enum Error {
    /// Attempted to encode an `Option` that is `None`. Optional wrappers are
    /// ownership indirection, not wire data; an unset one has nothing to
    /// write.
    #[error("cannot encode an unset optional value")]
    UnsetOption,

    /// An [`AnyValue`](crate::AnyValue) held no concrete value.
    #[error("dynamic value holds no concrete value")]
    EmptyValue,

    /// The boolean encoding was neither 0 nor 1
    #[error("invalid boolean encoding: {0} (must be 0 or 1)")]
    InvalidBool(u32),

    /// A decoded integer does not fit the target's width
    #[error("decoded value {value} overflows {target}")]
    IntegerOverflow { value: i64, target: &'static str },

    /// A length or count prefix exceeded the declared maximum
    #[error("length {got} exceeds maximum {max}")]
    LengthOverflow { max: u32, got: u32 },

    /// The timestamp codec could not parse the decoded string
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A string body contained invalid UTF-8
    #[error("string contains invalid bytes")]
    InvalidString,

    /// An override codec was handed a value of the wrong type
    #[error("no codec for type: {0}")]
    Unsupported(&'static str),

    /// The stream ended in the middle of a primitive
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// An I/O error from the underlying stream, surfaced verbatim
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
