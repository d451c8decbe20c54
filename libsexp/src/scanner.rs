//! Scanner
//!
//! The scanner recognizes the five lexical forms of an atom on top of the
//! bit-level reader:
//! - Tokens: `foo`, `rsa-pkcs1`, `*`
//! - Verbatim strings: `3:abc`
//! - Quoted strings: `"abc"`, `3"abc"`
//! - Hex strings: `#616263#`, `3#616263#`
//! - Base64 strings: `|YWJj|`, `3|YWJj|`

use std::io::Read;

use crate::error::{describe, ParseError, Result};
use crate::reader::{is_whitespace, Reader, Width};

/// Longest accepted length prefix, in digits.
const MAX_DECIMAL_DIGITS: u32 = 8;

/// Digits: `0-9`.
pub fn is_digit(byte: u8) -> bool {
    byte.is_ascii_digit()
}

/// Token alphabet: letters, digits, and `- . / _ : * + =`.
pub fn is_token_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(byte, b'-' | b'.' | b'/' | b'_' | b':' | b'*' | b'+' | b'=')
}

/// Lexical scanner for S-expression atoms.
pub struct Scanner<R> {
    reader: Reader<R>,
}

impl<R: Read> Scanner<R> {
    /// Create a scanner positioned on the first symbol of `source`.
    pub fn new(source: R) -> Result<Self> {
        Ok(Self {
            reader: Reader::new(source)?,
        })
    }

    /// The lookahead symbol.
    pub fn current(&self) -> Option<u8> {
        self.reader.current()
    }

    /// Raw bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.reader.offset()
    }

    /// Move past the lookahead symbol.
    pub fn advance(&mut self) -> Result<Option<u8>> {
        self.reader.advance()
    }

    /// Returns `true` while a hex or base64 region is being decoded.
    pub fn in_region(&self) -> bool {
        self.reader.width() != Width::Eight
    }

    /// Start decoding at `width` after the current opening delimiter.
    pub fn enter(&mut self, width: Width) -> Result<()> {
        self.reader.enter(width)
    }

    /// Skip whitespace symbols.
    pub fn skip_whitespace(&mut self) -> Result<()> {
        while self.current().is_some_and(is_whitespace) {
            self.advance()?;
        }
        Ok(())
    }

    /// Require `expected` as the lookahead symbol without consuming it.
    pub fn expect(&self, expected: u8) -> Result<()> {
        match self.current() {
            Some(byte) if byte == expected => Ok(()),
            Some(byte) => Err(ParseError::UnexpectedSymbol {
                expected: describe(expected),
                found: describe(byte),
                offset: self.offset(),
            }),
            None => Err(self.eof(describe(expected))),
        }
    }

    /// Require and consume `expected`.
    pub fn skip_char(&mut self, expected: u8) -> Result<()> {
        self.expect(expected)?;
        self.advance()?;
        Ok(())
    }

    pub(crate) fn eof(&self, expected: impl Into<String>) -> ParseError {
        ParseError::UnexpectedEof {
            expected: expected.into(),
            offset: self.offset(),
        }
    }

    /// Scan a run of token characters.
    pub fn scan_token(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(byte) = self.current().filter(|&b| is_token_char(b)) {
            out.push(byte);
            self.advance()?;
        }
        Ok(out)
    }

    /// Scan a decimal length prefix of at most eight digits.
    pub fn scan_decimal(&mut self) -> Result<usize> {
        let mut value: u64 = 0;
        let mut digits = 0;
        while let Some(byte) = self.current().filter(|&b| is_digit(b)) {
            value = value * 10 + u64::from(byte - b'0');
            digits += 1;
            if digits > MAX_DECIMAL_DIGITS {
                return Err(ParseError::DecimalTooLong {
                    value,
                    offset: self.offset(),
                });
            }
            self.advance()?;
        }
        Ok(value as usize)
    }

    /// Scan `:` followed by exactly `length` bytes.
    pub fn scan_verbatim_string(&mut self, length: Option<usize>) -> Result<Vec<u8>> {
        let Some(length) = length else {
            return Err(ParseError::MissingLength {
                offset: self.offset(),
            });
        };
        self.skip_char(b':')?;

        let region = self.reader.width();
        // The length is untrusted; grow as bytes actually arrive.
        let mut out = Vec::new();
        while out.len() < length {
            let Some(byte) = self.current() else {
                return Err(self.eof(format!("{} more bytes", length - out.len())));
            };
            if self.region_ended(region) {
                return Err(ParseError::LengthMismatch {
                    kind: "Verbatim string",
                    declared: length,
                    actual: out.len(),
                    offset: self.offset(),
                });
            }
            out.push(byte);
            self.advance()?;
        }
        Ok(out)
    }

    /// Scan a double-quoted string with C-like escapes.
    pub fn scan_quoted_string(&mut self, length: Option<usize>) -> Result<Vec<u8>> {
        self.skip_char(b'"')?;

        let region = self.reader.width();
        let mut out = Vec::new();
        loop {
            if let Some(declared) = length.filter(|&n| out.len() > n) {
                return Err(ParseError::LengthMismatch {
                    kind: "Quoted string",
                    declared,
                    actual: out.len(),
                    offset: self.offset(),
                });
            }
            if self.region_ended(region) {
                return Err(self.eof("closing quote"));
            }
            match self.current() {
                None => return Err(self.eof("closing quote")),
                Some(b'"') => {
                    if let Some(declared) = length.filter(|&n| out.len() != n) {
                        return Err(ParseError::LengthMismatch {
                            kind: "Quoted string",
                            declared,
                            actual: out.len(),
                            offset: self.offset(),
                        });
                    }
                    self.advance()?;
                    return Ok(out);
                }
                Some(b'\\') => self.scan_escape(&mut out)?,
                Some(byte) => {
                    out.push(byte);
                    self.advance()?;
                }
            }
        }
    }

    /// Decode one backslash escape, leaving the lookahead after it.
    fn scan_escape(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let Some(c) = self.advance()? else {
            return Err(self.eof("escape character"));
        };
        let decoded = match c {
            b'b' => 0x08,
            b't' => b'\t',
            b'v' => 0x0b,
            b'n' => b'\n',
            b'f' => 0x0c,
            b'r' => b'\r',
            b'\\' | b'"' | b'\'' => c,
            b'0'..=b'7' => {
                let mut value = u32::from(c - b'0');
                for _ in 0..2 {
                    let digit = self.advance()?.and_then(|b| (b as char).to_digit(8));
                    let Some(digit) = digit else {
                        return Err(self.bad_escape("octal"));
                    };
                    value = value * 8 + digit;
                }
                u8::try_from(value).map_err(|_| self.bad_escape("octal"))?
            }
            b'x' => {
                let mut value = 0u32;
                for _ in 0..2 {
                    let digit = self.advance()?.and_then(|b| (b as char).to_digit(16));
                    let Some(digit) = digit else {
                        return Err(self.bad_escape("hex"));
                    };
                    value = value * 16 + digit;
                }
                value as u8
            }
            b'\n' | b'\r' => {
                // Line continuation; a CRLF or LFCR pair counts as one break.
                let pair = if c == b'\n' { b'\r' } else { b'\n' };
                if self.advance()? == Some(pair) {
                    self.advance()?;
                }
                return Ok(());
            }
            _ => {
                return Err(ParseError::UnknownEscape {
                    found: describe(c),
                    offset: self.offset(),
                })
            }
        };
        out.push(decoded);
        self.advance()?;
        Ok(())
    }

    fn bad_escape(&self, kind: &'static str) -> ParseError {
        ParseError::BadEscape {
            kind,
            offset: self.offset(),
        }
    }

    /// Scan a `#...#` region of hex digits.
    pub fn scan_hex_string(&mut self, length: Option<usize>) -> Result<Vec<u8>> {
        self.scan_region(b'#', b'#', Width::Four, "Hex string", length)
    }

    /// Scan a `|...|` region of base64 digits.
    pub fn scan_base64_string(&mut self, length: Option<usize>) -> Result<Vec<u8>> {
        self.scan_region(b'|', b'|', Width::Six, "Base64 string", length)
    }

    fn scan_region(
        &mut self,
        open: u8,
        close: u8,
        width: Width,
        kind: &'static str,
        length: Option<usize>,
    ) -> Result<Vec<u8>> {
        self.expect(open)?;
        self.enter(width)?;
        self.advance()?;

        let mut out = Vec::new();
        while self.reader.width() != Width::Eight {
            let Some(byte) = self.current() else { break };
            out.push(byte);
            self.advance()?;
        }
        let end = self.offset();
        self.skip_char(close)?;

        match length {
            Some(declared) if declared != out.len() => Err(ParseError::LengthMismatch {
                kind,
                declared,
                actual: out.len(),
                offset: end,
            }),
            _ => Ok(out),
        }
    }

    /// Scan any one of the five atom forms, chosen by the lookahead symbol.
    pub fn scan_simple_string(&mut self) -> Result<Vec<u8>> {
        self.skip_whitespace()?;
        let Some(byte) = self.current() else {
            return Err(self.eof("string"));
        };

        if is_token_char(byte) && !is_digit(byte) {
            return self.scan_token();
        }
        if !is_digit(byte) && !matches!(byte, b'"' | b'#' | b'|') {
            return Err(ParseError::IllegalSymbol {
                found: describe(byte),
                offset: self.offset(),
            });
        }

        let length = if is_digit(byte) {
            Some(self.scan_decimal()?)
        } else {
            None
        };
        match self.current() {
            Some(b'"') => self.scan_quoted_string(length),
            Some(b'#') => self.scan_hex_string(length),
            Some(b'|') => self.scan_base64_string(length),
            Some(b':') => self.scan_verbatim_string(length),
            Some(other) => Err(ParseError::UnexpectedSymbol {
                expected: "\":\", '\"', \"#\" or \"|\" after length".to_string(),
                found: describe(other),
                offset: self.offset(),
            }),
            None => Err(self.eof("string after length")),
        }
    }

    /// True when a hex/base64 region that was open at `start` has closed.
    fn region_ended(&self, start: Width) -> bool {
        start != Width::Eight && self.reader.width() == Width::Eight
    }
}
