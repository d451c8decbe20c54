//! Bit-level stream reader.
//!
//! The reader buffers one symbol of lookahead over a sequential byte source.
//! Outside of a region every raw byte is a symbol. Inside a hex (`#...#`) or
//! base64 (`|...|`, `{...}`) region the reader reassembles 8-bit bytes from
//! 4-bit or 6-bit digits, so the scanner above it sees decoded bytes and only
//! the raw closing delimiter, which also switches the width back to 8.

use std::io::{self, Read};

use crate::error::{describe, ParseError, Result};

/// Whitespace: space, tab, VT, FF, CR, LF.
pub fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | 0x0b | 0x0c | b'\r' | b'\n')
}

/// Decode width of the raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// Raw bytes.
    Eight,
    /// Base64 digits.
    Six,
    /// Hex digits.
    Four,
}

impl Width {
    /// Number of bits each raw symbol contributes.
    pub fn bits(self) -> u8 {
        match self {
            Width::Eight => 8,
            Width::Six => 6,
            Width::Four => 4,
        }
    }

    fn digit_value(self, byte: u8) -> Option<u32> {
        let value = match (self, byte) {
            (Width::Six, b'A'..=b'Z') => byte - b'A',
            (Width::Six, b'a'..=b'z') => byte - b'a' + 26,
            (Width::Six, b'0'..=b'9') => byte - b'0' + 52,
            (Width::Six, b'+') => 62,
            (Width::Six, b'/') => 63,
            (Width::Four, b'0'..=b'9') => byte - b'0',
            (Width::Four, b'A'..=b'F') => byte - b'A' + 10,
            (Width::Four, b'a'..=b'f') => byte - b'a' + 10,
            _ => return None,
        };
        Some(u32::from(value))
    }

    fn is_closer(self, byte: u8) -> bool {
        match self {
            Width::Eight => false,
            Width::Six => byte == b'|' || byte == b'}',
            Width::Four => byte == b'#',
        }
    }
}

fn low_mask(bits: u32) -> u32 {
    (1u32 << bits) - 1
}

/// One-symbol lookahead reader with hex/base64 region decoding.
pub struct Reader<R> {
    bytes: io::Bytes<R>,
    consumed: u64,
    current: Option<u8>,
    width: Width,
    accumulator: u32,
    held: u32,
}

impl<R: Read> Reader<R> {
    /// Wrap a byte source and load the first symbol.
    ///
    /// The source is read one byte at a time; wrap files and sockets in a
    /// [`std::io::BufReader`].
    pub fn new(source: R) -> Result<Self> {
        let mut reader = Self {
            bytes: source.bytes(),
            consumed: 0,
            current: None,
            width: Width::Eight,
            accumulator: 0,
            held: 0,
        };
        reader.advance()?;
        Ok(reader)
    }

    /// The buffered symbol, or `None` at end of input.
    pub fn current(&self) -> Option<u8> {
        self.current
    }

    /// Current decode width.
    pub fn width(&self) -> Width {
        self.width
    }

    /// Number of raw bytes consumed from the source so far.
    pub fn offset(&self) -> u64 {
        self.consumed
    }

    /// Switch to a narrow width for the region whose opening delimiter is
    /// the current symbol. The next [`Reader::advance`] decodes.
    pub fn enter(&mut self, width: Width) -> Result<()> {
        if self.width != Width::Eight {
            return Err(ParseError::NestedRegion {
                width: width.bits(),
                offset: self.consumed,
            });
        }
        tracing::trace!(width = width.bits(), offset = self.consumed, "entering region");
        self.width = width;
        self.accumulator = 0;
        self.held = 0;
        Ok(())
    }

    /// Move to the next symbol and return it.
    pub fn advance(&mut self) -> Result<Option<u8>> {
        loop {
            let Some(byte) = self.read_raw()? else {
                self.reset();
                self.current = None;
                return Ok(None);
            };

            let width = self.width;
            if width == Width::Eight {
                self.current = Some(byte);
                return Ok(self.current);
            }

            if width.is_closer(byte) {
                self.close_region()?;
                self.current = Some(byte);
                return Ok(self.current);
            }

            if is_whitespace(byte) {
                continue;
            }

            if width == Width::Six && byte == b'=' {
                self.pad()?;
                continue;
            }

            let value = width
                .digit_value(byte)
                .ok_or_else(|| ParseError::InvalidRegionSymbol {
                    found: describe(byte),
                    width: width.bits(),
                    offset: self.consumed,
                })?;
            self.accumulator = (self.accumulator << width.bits()) | value;
            self.held += u32::from(width.bits());

            if self.held >= 8 {
                self.held -= 8;
                let decoded = (self.accumulator >> self.held) as u8;
                self.accumulator &= low_mask(self.held);
                self.current = Some(decoded);
                return Ok(self.current);
            }
        }
    }

    fn read_raw(&mut self) -> Result<Option<u8>> {
        match self.bytes.next() {
            None => Ok(None),
            Some(Ok(byte)) => {
                self.consumed += 1;
                Ok(Some(byte))
            }
            Some(Err(e)) => Err(e.into()),
        }
    }

    /// Each `=` marks two buffered bits as filler.
    fn pad(&mut self) -> Result<()> {
        if self.held < 2 {
            return Err(ParseError::BadPadding {
                offset: self.consumed,
            });
        }
        if self.accumulator & 0b11 != 0 {
            return Err(ParseError::UnusedBits {
                width: Width::Six.bits(),
                bits: 2,
                offset: self.consumed,
            });
        }
        self.accumulator >>= 2;
        self.held -= 2;
        Ok(())
    }

    fn close_region(&mut self) -> Result<()> {
        if self.held > 0 && self.accumulator & low_mask(self.held) != 0 {
            return Err(ParseError::UnusedBits {
                width: self.width.bits(),
                bits: self.held,
                offset: self.consumed,
            });
        }
        tracing::trace!(
            width = self.width.bits(),
            offset = self.consumed,
            "closing region"
        );
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        self.width = Width::Eight;
        self.accumulator = 0;
        self.held = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Decode everything after the opening delimiter, returning the
    /// decoded bytes and the closing symbol.
    fn decode_region(input: &[u8], width: Width) -> Result<(Vec<u8>, Option<u8>)> {
        let mut reader = Reader::new(input)?;
        reader.enter(width)?;
        let mut out = Vec::new();
        reader.advance()?;
        while reader.width() != Width::Eight {
            if let Some(byte) = reader.current() {
                out.push(byte);
            }
            reader.advance()?;
        }
        Ok((out, reader.current()))
    }

    #[test]
    fn test_raw_bytes_pass_through() {
        let mut reader = Reader::new(&b"ab"[..]).unwrap();
        assert_eq!(reader.current(), Some(b'a'));
        assert_eq!(reader.offset(), 1);
        assert_eq!(reader.advance().unwrap(), Some(b'b'));
        assert_eq!(reader.advance().unwrap(), None);
        assert_eq!(reader.offset(), 2);
    }

    #[test]
    fn test_hex_region() {
        let (bytes, closer) = decode_region(b"#68 65\n6C6c6F#", Width::Four).unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(closer, Some(b'#'));
    }

    #[test]
    fn test_base64_region_with_padding() {
        let (bytes, closer) = decode_region(b"|aGVsbG8=|", Width::Six).unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(closer, Some(b'|'));

        let (bytes, _) = decode_region(b"|YQ==|", Width::Six).unwrap();
        assert_eq!(bytes, b"a");
    }

    #[test]
    fn test_brace_closes_base64_region() {
        let (bytes, closer) = decode_region(b"{KDM6Zm9vKQ==}", Width::Six).unwrap();
        assert_eq!(bytes, b"(3:foo)");
        assert_eq!(closer, Some(b'}'));
    }

    #[test]
    fn test_unused_bits() {
        let err = decode_region(b"|YR|", Width::Six).unwrap_err();
        assert!(matches!(err, ParseError::UnusedBits { width: 6, bits: 4, .. }));

        let err = decode_region(b"#6#", Width::Four).unwrap_err();
        assert!(matches!(err, ParseError::UnusedBits { width: 4, bits: 4, .. }));
    }

    #[test]
    fn test_zero_leftover_bits_are_accepted() {
        let (bytes, _) = decode_region(b"#0#", Width::Four).unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_padding_discarding_set_bits() {
        let err = decode_region(b"|aGVsbG9=|", Width::Six).unwrap_err();
        assert!(matches!(err, ParseError::UnusedBits { bits: 2, .. }));
    }

    #[test]
    fn test_padding_without_buffered_bits() {
        let err = decode_region(b"|=|", Width::Six).unwrap_err();
        assert!(matches!(err, ParseError::BadPadding { .. }));
    }

    #[test]
    fn test_symbol_outside_alphabet() {
        let err = decode_region(b"#6G#", Width::Four).unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidRegionSymbol { width: 4, offset: 3, .. }
        ));
    }

    #[test]
    fn test_end_of_input_resets_width() {
        let mut reader = Reader::new(&b"#61"[..]).unwrap();
        reader.enter(Width::Four).unwrap();
        assert_eq!(reader.advance().unwrap(), Some(b'a'));
        assert_eq!(reader.advance().unwrap(), None);
        assert_eq!(reader.width(), Width::Eight);
    }

    #[test]
    fn test_nested_region_rejected() {
        let mut reader = Reader::new(&b"{"[..]).unwrap();
        reader.enter(Width::Six).unwrap();
        let err = reader.enter(Width::Four).unwrap_err();
        assert!(matches!(err, ParseError::NestedRegion { width: 4, .. }));
    }
}
