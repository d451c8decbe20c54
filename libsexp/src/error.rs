//! Error types for S-expression parsing.

use thiserror::Error;

/// Result type for S-expression parsing operations.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Render a raw input byte for an error message.
pub(crate) fn describe(byte: u8) -> String {
    match byte {
        0x21..=0x7e => format!("\"{}\"", byte as char),
        b' ' => "space".to_string(),
        _ => format!("0x{:02x}", byte),
    }
}

/// Error type for S-expression parsing.
///
/// Every variant except [`ParseError::Io`] carries the byte offset into the
/// raw input at which the problem was detected.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Input ended while more was required.
    #[error("Unexpected end of input, expected {expected} at byte {offset}")]
    UnexpectedEof { expected: String, offset: u64 },

    /// A delimiter other than the one required was found.
    #[error("Expected {expected}, found {found} at byte {offset}")]
    UnexpectedSymbol {
        expected: String,
        found: String,
        offset: u64,
    },

    /// A symbol that cannot begin an object.
    #[error("Illegal character {found} at byte {offset}")]
    IllegalSymbol { found: String, offset: u64 },

    /// A length prefix with more than eight digits.
    #[error("Decimal {value}... too long at byte {offset}")]
    DecimalTooLong { value: u64, offset: u64 },

    /// A verbatim string with no length prefix.
    #[error("Verbatim string has no length at byte {offset}")]
    MissingLength { offset: u64 },

    /// A backslash escape that quoted strings do not define.
    #[error("Unknown escape {found} at byte {offset}")]
    UnknownEscape { found: String, offset: u64 },

    /// A numeric escape that is malformed or out of range.
    #[error("Bad {kind} escape at byte {offset}")]
    BadEscape { kind: &'static str, offset: u64 },

    /// The decoded byte count differs from the declared length.
    #[error("{kind} length {actual} does not match declared length {declared} at byte {offset}")]
    LengthMismatch {
        kind: &'static str,
        declared: usize,
        actual: usize,
        offset: u64,
    },

    /// A hex or base64 region ended with nonzero buffered bits.
    #[error("{width}-bit region ended with {bits} unused bits at byte {offset}")]
    UnusedBits { width: u8, bits: u32, offset: u64 },

    /// Base64 padding that does not line up with the buffered bits.
    #[error("Bad base64 padding at byte {offset}")]
    BadPadding { offset: u64 },

    /// A symbol outside the alphabet of the active region.
    #[error("Character {found} found in {width}-bit region at byte {offset}")]
    InvalidRegionSymbol {
        found: String,
        width: u8,
        offset: u64,
    },

    /// A hex, base64 or brace region opened while another is being decoded.
    #[error("Nested {width}-bit region at byte {offset}")]
    NestedRegion { width: u8, offset: u64 },

    /// Nesting deeper than the configured limit.
    #[error("Nesting exceeds maximum depth {limit} at byte {offset}")]
    TooDeep { limit: usize, offset: u64 },

    /// Data after the root object.
    #[error("Unexpected extra content at byte {offset}")]
    ExtraContent { offset: u64 },

    /// The byte source failed.
    #[error("Read error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// The byte offset at which the error was detected, if known.
    pub fn offset(&self) -> Option<u64> {
        match self {
            ParseError::UnexpectedEof { offset, .. }
            | ParseError::UnexpectedSymbol { offset, .. }
            | ParseError::IllegalSymbol { offset, .. }
            | ParseError::DecimalTooLong { offset, .. }
            | ParseError::MissingLength { offset }
            | ParseError::UnknownEscape { offset, .. }
            | ParseError::BadEscape { offset, .. }
            | ParseError::LengthMismatch { offset, .. }
            | ParseError::UnusedBits { offset, .. }
            | ParseError::BadPadding { offset }
            | ParseError::InvalidRegionSymbol { offset, .. }
            | ParseError::NestedRegion { offset, .. }
            | ParseError::TooDeep { offset, .. }
            | ParseError::ExtraContent { offset } => Some(*offset),
            ParseError::Io(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        assert_eq!(describe(b'a'), "\"a\"");
        assert_eq!(describe(b' '), "space");
        assert_eq!(describe(0x07), "0x07");
        assert_eq!(describe(0xff), "0xff");
    }

    #[test]
    fn test_offset() {
        let err = ParseError::ExtraContent { offset: 7 };
        assert_eq!(err.offset(), Some(7));
        let err = ParseError::Io(std::io::Error::other("boom"));
        assert_eq!(err.offset(), None);
    }

    #[test]
    fn test_messages() {
        let err = ParseError::DecimalTooLong {
            value: 123456789,
            offset: 8,
        };
        assert_eq!(err.to_string(), "Decimal 123456789... too long at byte 8");
        let err = ParseError::UnusedBits {
            width: 6,
            bits: 4,
            offset: 6,
        };
        assert_eq!(
            err.to_string(),
            "6-bit region ended with 4 unused bits at byte 6"
        );
    }
}
