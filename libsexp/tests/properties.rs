//! End-to-end behavior of the public API.

use libsexp::{
    parse, parse_reader, parse_str, parse_with_options, Atom, AtomForm, List, Node, ParseError,
    ParseOptions,
};

fn atom(bytes: &[u8]) -> Node {
    Node::from(bytes)
}

fn list(items: Vec<Node>) -> Node {
    Node::from(items)
}

/// A tree exercising every atom form, hints and nesting.
fn sample_tree() -> Node {
    list(vec![
        atom(b"certificate"),
        list(vec![
            atom(b"issuer"),
            Node::from(Atom::new("Example CA").with_hint("text/plain")),
        ]),
        list(vec![atom(b"serial"), atom(&[0x00, 0x9f, 0x10])]),
        list(vec![atom(b"empty"), atom(b""), list(vec![])]),
        list(vec![atom(b"digits"), atom(b"12345")]),
        list(vec![atom(b"control"), atom(b"tab\there\x0b")]),
    ])
}

#[test]
fn test_canonical_round_trip() {
    let tree = sample_tree();
    let canonical = tree.canonical();
    let reparsed = parse(&canonical).unwrap().unwrap();
    assert_eq!(reparsed, tree);
    assert_eq!(reparsed.canonical(), canonical);
}

#[test]
fn test_text_forms_round_trip() {
    let tree = sample_tree();
    for text in [
        tree.advanced(libsexp::Fallback::Base64),
        tree.advanced(libsexp::Fallback::Hex),
        tree.compact(),
        tree.transport(),
        tree.to_string(),
    ] {
        assert_eq!(parse_str(&text).unwrap().unwrap(), tree, "{}", text);
    }
}

#[test]
fn test_verbatim_list() {
    let tree = parse(b"(3:foo3:bar)").unwrap().unwrap();
    assert_eq!(tree, list(vec![atom(b"foo"), atom(b"bar")]));
    assert_eq!(tree.canonical(), b"(3:foo3:bar)");
}

#[test]
fn test_quoted_with_declared_length() {
    let tree = parse(b"3\"a\\nb\"").unwrap().unwrap();
    assert_eq!(tree, atom(b"a\nb"));
}

#[test]
fn test_hex_atom_to_base64() {
    let tree = parse(b"#68656C6C6F#").unwrap().unwrap();
    let hello = tree.as_atom().unwrap();
    assert_eq!(hello.as_bytes(), b"hello");
    assert_eq!(hello.encode_as(AtomForm::Base64), "|aGVsbG8=|");
}

#[test]
fn test_transport_equals_canonical() {
    let wrapped = parse(b"{KDM6Zm9vMzpiYXIp}").unwrap().unwrap();
    let plain = parse(b"(3:foo3:bar)").unwrap().unwrap();
    assert_eq!(wrapped, plain);
}

#[test]
fn test_rejections() {
    assert!(matches!(
        parse(b"\"unterminated").unwrap_err(),
        ParseError::UnexpectedEof { .. }
    ));
    assert!(matches!(
        parse(b"123456789:x").unwrap_err(),
        ParseError::DecimalTooLong { .. }
    ));
    assert!(matches!(
        parse(b"3#61626364#").unwrap_err(),
        ParseError::LengthMismatch {
            declared: 3,
            actual: 4,
            ..
        }
    ));
    assert!(matches!(
        parse(b"|YR|").unwrap_err(),
        ParseError::UnusedBits { width: 6, .. }
    ));
}

#[test]
fn test_undeclared_region_lengths_are_not_checked() {
    assert_eq!(parse(b"#61626364#").unwrap().unwrap(), atom(b"abcd"));
    assert_eq!(parse(b"|YWJjZA==|").unwrap().unwrap(), atom(b"abcd"));
}

#[test]
fn test_find_deeply_nested() {
    // (top (shallow x) (a (b (c (target found)))) (other y))
    let text = "(top (shallow x) (a (b (c (target found)))) (other y))";
    let tree = parse_str(text).unwrap().unwrap();
    let root = tree.as_list().unwrap();

    let found: Vec<&List> = root.find("target", true).collect();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0][1], atom(b"found"));
    assert_eq!(root.find("target", false).count(), 0);

    let mut visited = root.find("shallow", true);
    assert!(visited.next().is_some());
    assert!(visited.next().is_none());
}

#[test]
fn test_reader_source() {
    let source = std::io::Cursor::new(b"(a b)".to_vec());
    let tree = parse_reader(source).unwrap().unwrap();
    assert_eq!(tree.compact(), "(a b)");
}

#[test]
fn test_depth_option() {
    let options = ParseOptions { max_depth: 2 };
    assert!(parse_with_options(&b"((a))"[..], &options).is_ok());
    assert!(matches!(
        parse_with_options(&b"({KDM6Zm9vMzpiYXIp})"[..], &options).unwrap_err(),
        ParseError::TooDeep { limit: 2, .. }
    ));
}

#[test]
fn test_io_errors_propagate() {
    struct Broken;
    impl std::io::Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk on fire"))
        }
    }
    let err = parse_reader(Broken).unwrap_err();
    assert!(matches!(err, ParseError::Io(_)));
    assert_eq!(err.offset(), None);
}
