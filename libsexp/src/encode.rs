//! Encode S-expression trees to their textual forms.
//!
//! Four forms are supported:
//! - **Canonical**: length-prefixed, whitespace-free, unique per tree. This is
//!   the form to hash or sign. It may contain arbitrary bytes.
//! - **Advanced**: indented, one child per line, with atoms written as tokens,
//!   quoted strings, or a binary-safe fallback (base64 or hex).
//! - **Compact**: like advanced, but on a single line.
//! - **Transport**: the canonical form in base64, wrapped in braces.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt::Write as FmtWrite;

use crate::scanner::{is_digit, is_token_char};
use crate::value::{Atom, Node};

/// Output form for encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Length-prefixed binary form
    Canonical,
    /// Indented text
    Advanced,
    /// Single-line text
    Compact,
    /// Braced base64 of the canonical form
    Transport,
}

/// Encoding for atoms that are neither tokens nor quotable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fallback {
    /// `|...|`
    #[default]
    Base64,
    /// `#...#`
    Hex,
}

/// How to write a single atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomForm {
    /// Token if possible, then quoted, then the given fallback.
    Auto(Fallback),
    /// Bare token.
    Token,
    /// Double-quoted string.
    Quoted,
    /// `#...#`
    Hex,
    /// `|...|`
    Base64,
}

/// Encode a tree in the given form.
///
/// `fallback` only affects the advanced and compact forms.
pub fn encode(node: &Node, format: Format, fallback: Fallback) -> Vec<u8> {
    let out = match format {
        Format::Canonical => to_canonical(node),
        Format::Advanced => to_advanced(node, fallback).into_bytes(),
        Format::Compact => to_compact(node, fallback).into_bytes(),
        Format::Transport => to_transport(node).into_bytes(),
    };
    tracing::debug!(?format, ?fallback, len = out.len(), "encoded tree");
    out
}

// =============================================================================
// Atom classification
// =============================================================================

/// Every byte is a token character and the first is not a digit.
///
/// The empty string is not a token, since it would vanish from the output.
pub fn can_be_token(bytes: &[u8]) -> bool {
    match bytes.first() {
        None => false,
        Some(&first) if is_digit(first) => false,
        Some(_) => bytes.iter().all(|&b| is_token_char(b)),
    }
}

/// Every byte is printable ASCII or has a named escape.
pub fn can_be_quoted(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .all(|&b| (0x20..0x7f).contains(&b) || named_escape(b).is_some())
}

fn named_escape(byte: u8) -> Option<char> {
    match byte {
        0x08 => Some('b'),
        b'\t' => Some('t'),
        0x0b => Some('v'),
        b'\n' => Some('n'),
        0x0c => Some('f'),
        b'\r' => Some('r'),
        _ => None,
    }
}

fn choose(bytes: &[u8], fallback: Fallback) -> AtomForm {
    if can_be_token(bytes) {
        AtomForm::Token
    } else if can_be_quoted(bytes) {
        AtomForm::Quoted
    } else {
        match fallback {
            Fallback::Base64 => AtomForm::Base64,
            Fallback::Hex => AtomForm::Hex,
        }
    }
}

// =============================================================================
// Canonical
// =============================================================================

/// Canonical encoding: `<len>:<bytes>` atoms, no whitespace.
pub fn to_canonical(node: &Node) -> Vec<u8> {
    let mut out = Vec::new();
    write_canonical(&mut out, node);
    out
}

fn write_canonical(out: &mut Vec<u8>, node: &Node) {
    match node {
        Node::Atom(atom) => {
            if let Some(hint) = atom.hint() {
                out.push(b'[');
                write_verbatim(out, hint);
                out.push(b']');
            }
            write_verbatim(out, atom.as_bytes());
        }
        Node::List(list) => {
            out.push(b'(');
            for item in list {
                write_canonical(out, item);
            }
            out.push(b')');
        }
    }
}

fn write_verbatim(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(bytes.len().to_string().as_bytes());
    out.push(b':');
    out.extend_from_slice(bytes);
}

// =============================================================================
// Advanced and compact
// =============================================================================

/// Indented encoding: children after the first go on their own lines,
/// indented two spaces per level.
pub fn to_advanced(node: &Node, fallback: Fallback) -> String {
    let mut out = String::new();
    write_advanced(&mut out, node, 0, fallback);
    out
}

fn write_advanced(out: &mut String, node: &Node, indent: usize, fallback: Fallback) {
    match node {
        Node::Atom(atom) => write_atom(out, atom, AtomForm::Auto(fallback)),
        Node::List(list) => {
            let indent = indent + 2;
            out.push('(');
            for (i, item) in list.iter().enumerate() {
                if i > 0 {
                    out.push('\n');
                    out.push_str(&" ".repeat(indent));
                }
                write_advanced(out, item, indent, fallback);
            }
            out.push(')');
        }
    }
}

/// Single-line encoding with space-separated siblings.
pub fn to_compact(node: &Node, fallback: Fallback) -> String {
    let mut out = String::new();
    write_compact(&mut out, node, fallback);
    out
}

fn write_compact(out: &mut String, node: &Node, fallback: Fallback) {
    match node {
        Node::Atom(atom) => write_atom(out, atom, AtomForm::Auto(fallback)),
        Node::List(list) => {
            out.push('(');
            for (i, item) in list.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_compact(out, item, fallback);
            }
            out.push(')');
        }
    }
}

/// Transport encoding: `{` base64 of the canonical form `}`.
pub fn to_transport(node: &Node) -> String {
    format!("{{{}}}", STANDARD.encode(to_canonical(node)))
}

// =============================================================================
// Atoms
// =============================================================================

/// Render one atom, with its hint in brackets if it has one.
///
/// The hint always uses the automatic choice. A `Token` or `Quoted` form
/// that does not fit the bytes falls back to the automatic choice too.
pub fn encode_atom(atom: &Atom, form: AtomForm) -> String {
    let mut out = String::new();
    write_atom(&mut out, atom, form);
    out
}

fn write_atom(out: &mut String, atom: &Atom, form: AtomForm) {
    let fallback = match form {
        AtomForm::Auto(fallback) => fallback,
        _ => Fallback::default(),
    };
    if let Some(hint) = atom.hint() {
        out.push('[');
        write_bytes(out, hint, AtomForm::Auto(fallback));
        out.push(']');
    }
    write_bytes(out, atom.as_bytes(), form);
}

fn write_bytes(out: &mut String, bytes: &[u8], form: AtomForm) {
    let form = match form {
        AtomForm::Auto(fallback) => choose(bytes, fallback),
        AtomForm::Token if !can_be_token(bytes) => choose(bytes, Fallback::default()),
        AtomForm::Quoted if !can_be_quoted(bytes) => choose(bytes, Fallback::default()),
        form => form,
    };
    match form {
        AtomForm::Token => out.extend(bytes.iter().map(|&b| b as char)),
        AtomForm::Quoted => write_quoted(out, bytes),
        AtomForm::Hex => {
            out.push('#');
            for byte in bytes {
                let _ = write!(out, "{:02x}", byte);
            }
            out.push('#');
        }
        AtomForm::Base64 | AtomForm::Auto(_) => {
            out.push('|');
            out.push_str(&STANDARD.encode(bytes));
            out.push('|');
        }
    }
}

fn write_quoted(out: &mut String, bytes: &[u8]) {
    out.push('"');
    for &byte in bytes {
        match byte {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            _ => match named_escape(byte) {
                Some(c) => {
                    out.push('\\');
                    out.push(c);
                }
                None => out.push(byte as char),
            },
        }
    }
    out.push('"');
}
