//! Object Parser
//!
//! Recursive-descent builder of the object tree on top of the scanner:
//! - Lists: `(` objects `)`
//! - Atoms: an optional `[hint]` followed by one of the five string forms
//! - Base64 regions: `{` base64 of an object `}`
//!
//! Errors abort the parse; no partial tree is returned.

use std::io::Read;

use crate::error::{describe, ParseError, Result};
use crate::reader::Width;
use crate::scanner::Scanner;
use crate::value::{Atom, List, Node};

/// Default nesting limit for lists and base64 regions.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Parser configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Deepest allowed nesting of `(` and `{`.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Parser over one byte source.
pub struct Parser<R> {
    scanner: Scanner<R>,
    max_depth: usize,
    depth: usize,
}

impl<R: Read> Parser<R> {
    /// Create a parser positioned on the first symbol of `source`.
    pub fn new(source: R, options: &ParseOptions) -> Result<Self> {
        Ok(Self {
            scanner: Scanner::new(source)?,
            max_depth: options.max_depth,
            depth: 0,
        })
    }

    /// Parse a whole document: at most one object, then only whitespace.
    pub fn parse_root(mut self) -> Result<Option<Node>> {
        let object = self.scan_object()?;
        self.scanner.skip_whitespace()?;
        if self.scanner.current().is_some() {
            return Err(ParseError::ExtraContent {
                offset: self.scanner.offset(),
            });
        }
        tracing::debug!(
            bytes = self.scanner.offset(),
            found = object.is_some(),
            "parsed document"
        );
        Ok(object)
    }

    /// Parse the next object, or `None` at end of input.
    pub fn scan_object(&mut self) -> Result<Option<Node>> {
        self.scanner.skip_whitespace()?;
        if self.scanner.current().is_none() {
            return Ok(None);
        }
        self.scan_node().map(Some)
    }

    fn scan_node(&mut self) -> Result<Node> {
        match self.scanner.current() {
            Some(b'{') => self.scan_region(),
            Some(b'(') => self.scan_list().map(Node::List),
            _ => self.scan_string().map(Node::Atom),
        }
    }

    /// Parse `{`, one object in base64, and `}`.
    fn scan_region(&mut self) -> Result<Node> {
        self.descend()?;
        self.scanner.expect(b'{')?;
        self.scanner.enter(Width::Six)?;
        self.scanner.advance()?;

        self.scanner.skip_whitespace()?;
        let node = self.scan_node()?;
        self.scanner.skip_whitespace()?;

        if self.scanner.in_region() {
            // Decoded bytes remain after the object.
            let found = self.scanner.current().map_or_else(|| "end".to_string(), describe);
            return Err(ParseError::UnexpectedSymbol {
                expected: describe(b'}'),
                found,
                offset: self.scanner.offset(),
            });
        }
        self.scanner.skip_char(b'}')?;
        self.ascend();
        Ok(node)
    }

    /// Parse an atom with an optional `[hint]` prefix.
    pub fn scan_string(&mut self) -> Result<Atom> {
        let hint = if self.scanner.current() == Some(b'[') {
            self.scanner.advance()?;
            let hint = self.scanner.scan_simple_string()?;
            self.scanner.skip_whitespace()?;
            self.scanner.skip_char(b']')?;
            self.scanner.skip_whitespace()?;
            Some(hint)
        } else {
            None
        };

        let atom = Atom::new(self.scanner.scan_simple_string()?);
        Ok(match hint {
            Some(hint) => atom.with_hint(hint),
            None => atom,
        })
    }

    /// Parse `(` objects `)`.
    pub fn scan_list(&mut self) -> Result<List> {
        self.descend()?;
        self.scanner.skip_char(b'(')?;

        let mut list = List::new();
        loop {
            self.scanner.skip_whitespace()?;
            match self.scanner.current() {
                None => return Err(self.scanner.eof("closing paren")),
                Some(b')') => {
                    self.scanner.advance()?;
                    break;
                }
                Some(_) => list.push(self.scan_node()?),
            }
        }

        self.ascend();
        Ok(list)
    }

    fn descend(&mut self) -> Result<()> {
        if self.depth >= self.max_depth {
            return Err(ParseError::TooDeep {
                limit: self.max_depth,
                offset: self.scanner.offset(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }
}
