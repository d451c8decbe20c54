//! CBOR transcoding: convert between S-expression trees and CBOR binary data.
//!
//! Mapping from S-expressions to CBOR:
//!   - Atom without hint -> CBOR byte string
//!   - Atom with hint    -> CBOR map with one entry, {hint: data}, both byte strings
//!   - List              -> CBOR array (determinate length)
//!
//! Mapping from CBOR to S-expressions:
//!   - CBOR byte string           -> Atom
//!   - CBOR text string           -> Atom (UTF-8 bytes)
//!   - CBOR unsigned int          -> Atom (minimal big-endian bytes, zero is 0x00)
//!   - CBOR array (det/indet)     -> List
//!   - CBOR map with one entry    -> hinted Atom (key and value must be strings)
//!   - Anything else              -> error (no S-expression equivalent)

use ciborium::value::Value as CborValue;
use libsexp::{Atom, List, Node};
use num_bigint::BigUint;
use std::fmt::Write as FmtWrite;

// ---------------------------------------------------------------------------
// Decode (CBOR -> S-expression)
// ---------------------------------------------------------------------------

/// Decode CBOR bytes into an S-expression tree.
///
/// Returns `Ok(None)` for empty input.
pub fn decode(input: &[u8]) -> Result<Option<Node>, String> {
    if input.is_empty() {
        return Ok(None);
    }
    let cbor_value: CborValue =
        ciborium::de::from_reader(input).map_err(|e| format!("CBOR decode error: {}", e))?;
    cbor_to_node(&cbor_value).map(Some)
}

fn cbor_to_node(cbor: &CborValue) -> Result<Node, String> {
    match cbor {
        CborValue::Array(items) => items
            .iter()
            .map(cbor_to_node)
            .collect::<Result<List, String>>()
            .map(Node::List),
        CborValue::Map(pairs) => match pairs.as_slice() {
            [(hint, data)] => {
                let atom = Atom::new(cbor_to_bytes(data)?).with_hint(cbor_to_bytes(hint)?);
                Ok(Node::Atom(atom))
            }
            _ => Err(format!(
                "CBOR map with {} entries has no S-expression equivalent",
                pairs.len()
            )),
        },
        other => cbor_to_bytes(other).map(Node::from),
    }
}

fn cbor_to_bytes(cbor: &CborValue) -> Result<Vec<u8>, String> {
    match cbor {
        CborValue::Bytes(b) => Ok(b.clone()),
        CborValue::Text(s) => Ok(s.as_bytes().to_vec()),
        CborValue::Integer(i) => {
            let n: i128 = (*i).into();
            let n = u128::try_from(n)
                .map_err(|_| format!("negative CBOR integer {} has no S-expression equivalent", n))?;
            Ok(Atom::from_uint(&BigUint::from(n)).into_bytes())
        }
        CborValue::Tag(tag, _) => Err(format!(
            "CBOR tagged value (tag {}) has no S-expression equivalent",
            tag
        )),
        _ => Err(format!("CBOR value {:?} has no S-expression equivalent", cbor)),
    }
}

// ---------------------------------------------------------------------------
// Encode (S-expression -> CBOR)
//
// Written directly so every length uses the shortest argument and every
// container is determinate.
// ---------------------------------------------------------------------------

/// Encode an S-expression tree as CBOR bytes.
pub fn encode(node: &Node) -> Vec<u8> {
    let mut buf = Vec::new();
    write_node(&mut buf, node);
    buf
}

fn write_node(buf: &mut Vec<u8>, node: &Node) {
    match node {
        Node::Atom(atom) => match atom.hint() {
            Some(hint) => {
                write_type_and_length(buf, 5, 1); // major 5 = map
                write_bytes(buf, hint);
                write_bytes(buf, atom.as_bytes());
            }
            None => write_bytes(buf, atom.as_bytes()),
        },
        Node::List(list) => {
            write_type_and_length(buf, 4, list.len() as u64); // major 4 = array
            for item in list {
                write_node(buf, item);
            }
        }
    }
}

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_type_and_length(buf, 2, bytes.len() as u64); // major 2 = byte string
    buf.extend_from_slice(bytes);
}

/// Write a CBOR major type + length argument.
///
/// CBOR encodes the major type in the high 3 bits and uses the low 5 bits
/// plus optional following bytes for the argument:
///   0-23:    argument in the low 5 bits (1 byte total)
///   24:      1-byte argument follows
///   25:      2-byte argument follows
///   26:      4-byte argument follows
///   27:      8-byte argument follows
fn write_type_and_length(buf: &mut Vec<u8>, major: u8, val: u64) {
    let high = major << 5;
    match val {
        0..=23 => {
            buf.push(high | val as u8);
        }
        24..=0xff => {
            buf.push(high | 24);
            buf.push(val as u8);
        }
        0x100..=0xffff => {
            buf.push(high | 25);
            buf.extend_from_slice(&(val as u16).to_be_bytes());
        }
        0x10000..=0xffff_ffff => {
            buf.push(high | 26);
            buf.extend_from_slice(&(val as u32).to_be_bytes());
        }
        _ => {
            buf.push(high | 27);
            buf.extend_from_slice(&val.to_be_bytes());
        }
    }
}

// ---------------------------------------------------------------------------
// Diagnostic Notation (CBOR -> human-readable text, RFC 8949 §8)
// ---------------------------------------------------------------------------

/// Render CBOR bytes as diagnostic notation (RFC 8949 §8).
///
/// Renders from the CBOR binary rather than from the tree, so it shows the
/// actual wire encoding.
pub fn diagnostic(input: &[u8]) -> Result<String, String> {
    let cbor_value: CborValue =
        ciborium::de::from_reader(input).map_err(|e| format!("CBOR decode error: {}", e))?;
    let mut out = String::new();
    diag_value(&mut out, &cbor_value, 0);
    out.push('\n');
    Ok(out)
}

fn diag_value(out: &mut String, val: &CborValue, indent: usize) {
    match val {
        CborValue::Integer(i) => {
            let n: i128 = (*i).into();
            let _ = write!(out, "{}", n);
        }
        CborValue::Text(s) => diag_text(out, s),
        CborValue::Bytes(b) => {
            out.push_str("h'");
            for byte in b {
                let _ = write!(out, "{:02x}", byte);
            }
            out.push('\'');
        }
        CborValue::Array(arr) => diag_array(out, arr, indent),
        CborValue::Map(pairs) => diag_map(out, pairs, indent),
        CborValue::Tag(tag, inner) => {
            let _ = write!(out, "{}(", tag);
            diag_value(out, inner, indent);
            out.push(')');
        }
        _ => {
            let _ = write!(out, "<?unknown {:?}>", val);
        }
    }
}

fn diag_text(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

fn push_indent(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push(' ');
    }
}

fn diag_array(out: &mut String, arr: &[CborValue], indent: usize) {
    if arr.is_empty() {
        out.push_str("[]");
        return;
    }
    // Small arrays of strings stay on one line
    if arr.len() <= 5 && arr.iter().all(is_simple_value) {
        out.push('[');
        for (i, item) in arr.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            diag_value(out, item, indent);
        }
        out.push(']');
    } else {
        out.push_str("[\n");
        let child_indent = indent + 2;
        for (i, item) in arr.iter().enumerate() {
            push_indent(out, child_indent);
            diag_value(out, item, child_indent);
            if i < arr.len() - 1 {
                out.push(',');
            }
            out.push('\n');
        }
        push_indent(out, indent);
        out.push(']');
    }
}

fn diag_map(out: &mut String, pairs: &[(CborValue, CborValue)], indent: usize) {
    match pairs {
        [] => out.push_str("{}"),
        // A hinted atom
        [(k, v)] if is_simple_value(k) && is_simple_value(v) => {
            out.push('{');
            diag_value(out, k, indent);
            out.push_str(": ");
            diag_value(out, v, indent);
            out.push('}');
        }
        _ => {
            out.push_str("{\n");
            let child_indent = indent + 2;
            for (i, (k, v)) in pairs.iter().enumerate() {
                push_indent(out, child_indent);
                diag_value(out, k, child_indent);
                out.push_str(": ");
                diag_value(out, v, child_indent);
                if i < pairs.len() - 1 {
                    out.push(',');
                }
                out.push('\n');
            }
            push_indent(out, indent);
            out.push('}');
        }
    }
}

fn is_simple_value(val: &CborValue) -> bool {
    matches!(
        val,
        CborValue::Integer(_) | CborValue::Text(_) | CborValue::Bytes(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsexp::parse_str;

    fn tree(text: &str) -> Node {
        parse_str(text).unwrap().unwrap()
    }

    #[test]
    fn test_encode_atom() {
        assert_eq!(encode(&tree("abc")), b"\x43abc");
        assert_eq!(encode(&tree("\"\"")), b"\x40");
    }

    #[test]
    fn test_encode_list() {
        assert_eq!(
            encode(&tree("(3:foo3:bar)")),
            b"\x82\x43foo\x43bar"
        );
        assert_eq!(encode(&tree("()")), b"\x80");
    }

    #[test]
    fn test_encode_hinted_atom() {
        assert_eq!(
            encode(&tree("[mime]data")),
            b"\xa1\x44mime\x44data"
        );
    }

    #[test]
    fn test_encode_long_byte_string() {
        let node = Node::from(vec![0x55u8; 300]);
        let bytes = encode(&node);
        assert_eq!(&bytes[..3], &[0x59, 0x01, 0x2c]);
        assert_eq!(bytes.len(), 303);
    }

    #[test]
    fn test_round_trip() {
        let certificate = tree("(certificate (issuer [text/plain]\"Example CA\") (serial #009f10#) () \"\")");
        let decoded = decode(&encode(&certificate)).unwrap().unwrap();
        assert_eq!(decoded, certificate);
    }

    #[test]
    fn test_decode_empty_input() {
        assert_eq!(decode(b"").unwrap(), None);
    }

    #[test]
    fn test_decode_text_and_integers() {
        // ["hi", 0, 256]
        let node = decode(b"\x83\x62hi\x00\x19\x01\x00").unwrap().unwrap();
        let list = node.as_list().unwrap();
        assert_eq!(list[0], Node::from("hi"));
        assert_eq!(list[1], Node::from(&[0x00u8][..]));
        assert_eq!(list[2], Node::from(&[0x01u8, 0x00][..]));
    }

    #[test]
    fn test_decode_text_hint() {
        // {"mime": h'00'}
        let node = decode(b"\xa1\x64mime\x41\x00").unwrap().unwrap();
        let atom = node.as_atom().unwrap();
        assert_eq!(atom.hint(), Some(&b"mime"[..]));
        assert_eq!(atom.as_bytes(), &[0x00]);
    }

    #[test]
    fn test_decode_rejects_unmapped_values() {
        // -1
        assert!(decode(b"\x20").unwrap_err().contains("negative"));
        // 1.5 as float16
        assert!(decode(b"\xf9\x3e\x00").is_err());
        // true
        assert!(decode(b"\xf5").is_err());
        // {} and a two-entry map
        assert!(decode(b"\xa0").unwrap_err().contains("0 entries"));
        assert!(decode(b"\xa2\x41a\x41b\x41c\x41d").is_err());
        // tag 1 (epoch time)
        assert!(decode(b"\xc1\x00").unwrap_err().contains("tag 1"));
        // map value that is itself a list
        assert!(decode(b"\xa1\x41a\x80").is_err());
    }

    #[test]
    fn test_decode_garbage() {
        assert!(decode(b"\xff").unwrap_err().starts_with("CBOR decode error"));
    }

    #[test]
    fn test_diagnostic_compact_array() {
        let bytes = encode(&tree("(foo bar)"));
        assert_eq!(diagnostic(&bytes).unwrap(), "[h'666f6f', h'626172']\n");
    }

    #[test]
    fn test_diagnostic_nested() {
        let bytes = encode(&tree("(a (b) [h]c)"));
        assert_eq!(
            diagnostic(&bytes).unwrap(),
            "[\n  h'61',\n  [h'62'],\n  {h'68': h'63'}\n]\n"
        );
    }

    #[test]
    fn test_diagnostic_text() {
        assert_eq!(diagnostic(b"\x62a\n").unwrap(), "\"a\\n\"\n");
    }
}
