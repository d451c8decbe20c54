//! Rivest S-expression parser and serializer.
//!
//! S-expressions represent nested, binary-safe data as atoms (byte strings
//! with an optional display hint) and lists. The same tree can be written in
//! several interchangeable encodings; the canonical one is unique per tree
//! and is the form to hash or sign.
//!
//! # Parsing Pipeline
//!
//! The parser is a single pass over a sequential byte source:
//!
//! 1. **Reader**: Buffers one symbol of lookahead and transparently decodes
//!    hex (`#...#`) and base64 (`|...|`, `{...}`) regions into bytes.
//!
//! 2. **Scanner**: Recognizes tokens, length prefixes, and the verbatim,
//!    quoted, hex and base64 string forms.
//!
//! 3. **Object Parser**: Recursively assembles atoms, hints, lists and
//!    base64 regions into a [`Node`] tree.

pub mod encode;
mod error;
mod parser;
mod reader;
mod scanner;
mod value;

use std::io::Read;

pub use encode::{encode, AtomForm, Fallback, Format};
pub use error::{ParseError, Result};
pub use parser::{ParseOptions, Parser, DEFAULT_MAX_DEPTH};
pub use value::{Atom, Find, List, Node};

/// Parse an S-expression from bytes.
///
/// Returns `Ok(None)` if the input holds only whitespace.
///
/// # Example
///
/// ```
/// use libsexp::parse;
///
/// let tree = parse(b"(3:foo3:bar)").unwrap().unwrap();
/// assert_eq!(tree.canonical(), b"(3:foo3:bar)");
/// ```
pub fn parse(input: &[u8]) -> Result<Option<Node>> {
    parse_reader(input)
}

/// Parse an S-expression from a string.
pub fn parse_str(input: &str) -> Result<Option<Node>> {
    parse(input.as_bytes())
}

/// Parse an S-expression from a byte source.
pub fn parse_reader<R: Read>(reader: R) -> Result<Option<Node>> {
    parse_with_options(reader, &ParseOptions::default())
}

/// Parse an S-expression from a byte source with explicit options.
pub fn parse_with_options<R: Read>(reader: R, options: &ParseOptions) -> Result<Option<Node>> {
    Parser::new(reader, options)?.parse_root()
}
