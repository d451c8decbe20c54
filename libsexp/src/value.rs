//! S-expression value representation.

use num_bigint::BigUint;
use num_traits::ToPrimitive;
use std::fmt;
use std::ops::Index;

use crate::encode::{self, AtomForm, Fallback};

/// A leaf: a binary-safe byte string with an optional display hint.
///
/// Hints are plain byte strings; the grammar does not allow a hint to carry
/// a hint of its own.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Atom {
    data: Vec<u8>,
    hint: Option<Vec<u8>>,
}

impl Atom {
    /// Create an atom without a hint.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            hint: None,
        }
    }

    /// Attach a display hint, replacing any previous one.
    pub fn with_hint(mut self, hint: impl Into<Vec<u8>>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// The atom's bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the atom, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// The display hint, if any.
    pub fn hint(&self) -> Option<&[u8]> {
        self.hint.as_deref()
    }

    /// Number of bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the atom has no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The bytes as UTF-8 text, if they are valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    /// Interpret the bytes as a big-endian unsigned integer.
    pub fn to_uint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.data)
    }

    /// Interpret the bytes as a big-endian unsigned integer, if it fits.
    pub fn to_u64(&self) -> Option<u64> {
        self.to_uint().to_u64()
    }

    /// Minimal big-endian encoding of `n`; zero is a single `0x00` byte.
    pub fn from_uint(n: &BigUint) -> Self {
        Self::new(n.to_bytes_be())
    }

    /// Returns `true` if the bytes can be written as a bare token.
    pub fn can_be_token(&self) -> bool {
        encode::can_be_token(&self.data)
    }

    /// Returns `true` if the bytes can be written as a quoted string.
    pub fn can_be_quoted(&self) -> bool {
        encode::can_be_quoted(&self.data)
    }

    /// Render this atom in a specific form. See [`encode::encode_atom`].
    pub fn encode_as(&self, form: AtomForm) -> String {
        encode::encode_atom(self, form)
    }
}

/// An ordered sequence of nodes.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct List {
    items: Vec<Node>,
}

impl List {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node.
    pub fn push(&mut self, node: impl Into<Node>) {
        self.items.push(node.into());
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the list has no children.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The child at `index`.
    pub fn get(&self, index: usize) -> Option<&Node> {
        self.items.get(index)
    }

    /// The first child.
    pub fn first(&self) -> Option<&Node> {
        self.items.first()
    }

    /// The first child, if it is an atom. By convention this names the list.
    pub fn head(&self) -> Option<&Atom> {
        self.first().and_then(Node::as_atom)
    }

    /// Iterate over the children.
    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.items.iter()
    }

    /// The children as a slice.
    pub fn as_slice(&self) -> &[Node] {
        &self.items
    }

    /// Child lists whose first element is an atom equal to `token`.
    ///
    /// With `descend`, every child list is searched recursively as well,
    /// in document order. Hints are ignored when comparing.
    pub fn find<'a, T>(&'a self, token: &'a T, descend: bool) -> Find<'a>
    where
        T: AsRef<[u8]> + ?Sized,
    {
        Find {
            token: token.as_ref(),
            descend,
            stack: vec![self.items.iter()],
        }
    }
}

impl Index<usize> for List {
    type Output = Node;

    fn index(&self, index: usize) -> &Node {
        &self.items[index]
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl IntoIterator for List {
    type Item = Node;
    type IntoIter = std::vec::IntoIter<Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl FromIterator<Node> for List {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// Lazy search over a list's descendants, produced by [`List::find`].
pub struct Find<'a> {
    token: &'a [u8],
    descend: bool,
    stack: Vec<std::slice::Iter<'a, Node>>,
}

impl<'a> Iterator for Find<'a> {
    type Item = &'a List;

    fn next(&mut self) -> Option<&'a List> {
        loop {
            let next = self.stack.last_mut()?.next();
            match next {
                None => {
                    self.stack.pop();
                }
                Some(Node::List(list)) => {
                    if self.descend {
                        self.stack.push(list.items.iter());
                    }
                    if list.head().is_some_and(|atom| atom.as_bytes() == self.token) {
                        return Some(list);
                    }
                }
                Some(Node::Atom(_)) => {}
            }
        }
    }
}

/// A node in an S-expression tree.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Node {
    /// A byte string.
    Atom(Atom),
    /// A list of nodes.
    List(List),
}

impl Node {
    /// Returns the atom if this is an `Atom`.
    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Node::Atom(atom) => Some(atom),
            _ => None,
        }
    }

    /// Returns the list if this is a `List`.
    pub fn as_list(&self) -> Option<&List> {
        match self {
            Node::List(list) => Some(list),
            _ => None,
        }
    }

    /// Returns `true` if this is an `Atom`.
    pub fn is_atom(&self) -> bool {
        matches!(self, Node::Atom(_))
    }

    /// Returns `true` if this is a `List`.
    pub fn is_list(&self) -> bool {
        matches!(self, Node::List(_))
    }

    /// Canonical encoding.
    pub fn canonical(&self) -> Vec<u8> {
        encode::to_canonical(self)
    }

    /// Indented encoding.
    pub fn advanced(&self, fallback: Fallback) -> String {
        encode::to_advanced(self, fallback)
    }

    /// Single-line encoding.
    pub fn compact(&self) -> String {
        encode::to_compact(self, Fallback::default())
    }

    /// Base64 of the canonical encoding in braces.
    pub fn transport(&self) -> String {
        encode::to_transport(self)
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(hint) = &self.hint {
            write!(f, "[")?;
            write_escaped(f, hint)?;
            write!(f, "]")?;
        }
        write_escaped(f, &self.data)
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    write!(f, "b\"")?;
    for byte in bytes {
        write!(f, "{}", std::ascii::escape_default(*byte))?;
    }
    write!(f, "\"")
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.items).finish()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Atom(atom) => fmt::Debug::fmt(atom, f),
            Node::List(list) => fmt::Debug::fmt(list, f),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compact())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode::encode_atom(self, AtomForm::Auto(Fallback::default())))
    }
}

impl fmt::Display for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::from("(");
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&item.compact());
        }
        out.push(')');
        f.write_str(&out)
    }
}

impl From<&str> for Atom {
    fn from(s: &str) -> Self {
        Atom::new(s)
    }
}

impl From<&[u8]> for Atom {
    fn from(b: &[u8]) -> Self {
        Atom::new(b)
    }
}

impl From<Vec<u8>> for Atom {
    fn from(b: Vec<u8>) -> Self {
        Atom::new(b)
    }
}

impl From<Vec<Node>> for List {
    fn from(items: Vec<Node>) -> Self {
        List { items }
    }
}

impl From<Atom> for Node {
    fn from(atom: Atom) -> Self {
        Node::Atom(atom)
    }
}

impl From<List> for Node {
    fn from(list: List) -> Self {
        Node::List(list)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::Atom(Atom::from(s))
    }
}

impl From<&[u8]> for Node {
    fn from(b: &[u8]) -> Self {
        Node::Atom(Atom::from(b))
    }
}

impl From<Vec<u8>> for Node {
    fn from(b: Vec<u8>) -> Self {
        Node::Atom(Atom::from(b))
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::List(List::from(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: Vec<Node>) -> Node {
        Node::from(items)
    }

    /// (root (one (two (three (key 1)))) (other x) (key 2))
    fn sample() -> List {
        let nested = list(vec![
            "one".into(),
            list(vec![
                "two".into(),
                list(vec!["three".into(), list(vec!["key".into(), "1".into()])]),
            ]),
        ]);
        List::from(vec![
            "root".into(),
            nested,
            list(vec!["other".into(), "x".into()]),
            list(vec!["key".into(), "2".into()]),
        ])
    }

    fn second_atoms(found: Vec<&List>) -> Vec<&[u8]> {
        found
            .into_iter()
            .map(|l| l[1].as_atom().unwrap().as_bytes())
            .collect()
    }

    #[test]
    fn test_find_direct_children_only() {
        let root = sample();
        let found: Vec<&List> = root.find("key", false).collect();
        assert_eq!(second_atoms(found), vec![b"2".as_slice()]);
    }

    #[test]
    fn test_find_descends_in_document_order() {
        let root = sample();
        let found: Vec<&List> = root.find("key", true).collect();
        assert_eq!(second_atoms(found), vec![b"1".as_slice(), b"2".as_slice()]);
    }

    #[test]
    fn test_find_descends_into_matches() {
        // (a (a (a x)))
        let root = List::from(vec![list(vec![
            "a".into(),
            list(vec!["a".into(), list(vec!["a".into(), "x".into()])]),
        ])]);
        assert_eq!(root.find("a", true).count(), 3);
        assert_eq!(root.find("a", false).count(), 1);
    }

    #[test]
    fn test_find_is_lazy() {
        let root = sample();
        let mut found = root.find(b"key", true);
        let first = found.next().unwrap();
        assert_eq!(first[1].as_atom().unwrap().as_bytes(), b"1");
        let second = found.next().unwrap();
        assert_eq!(second[1].as_atom().unwrap().as_bytes(), b"2");
        assert!(found.next().is_none());
    }

    #[test]
    fn test_find_ignores_hints_and_empty_lists() {
        let root = List::from(vec![
            Node::List(List::new()),
            list(vec![Atom::new("key").with_hint("h").into(), "v".into()]),
            list(vec![list(vec!["key".into()]), "v".into()]),
        ]);
        assert_eq!(root.find("key", false).count(), 1);
    }

    #[test]
    fn test_integer_helpers() {
        let atom = Atom::new(vec![0x01, 0x00]);
        assert_eq!(atom.to_u64(), Some(256));
        assert_eq!(Atom::from_uint(&BigUint::from(256u32)), atom);
        assert_eq!(Atom::new(vec![0xff; 9]).to_u64(), None);
        assert_eq!(Atom::new(Vec::new()).to_u64(), Some(0));
    }

    #[test]
    fn test_accessors() {
        let atom = Atom::new("data").with_hint("text/plain");
        assert_eq!(atom.as_str(), Some("data"));
        assert_eq!(atom.hint(), Some(b"text/plain".as_slice()));
        assert_eq!(Atom::new(vec![0xff]).as_str(), None);

        let root = sample();
        assert_eq!(root.head().unwrap().as_bytes(), b"root");
        assert_eq!(root.len(), 4);
        assert!(root[1].is_list());
        assert!(root.get(9).is_none());
    }

    #[test]
    fn test_debug_and_display() {
        let atom = Atom::new("a\n").with_hint("h");
        assert_eq!(format!("{:?}", atom), "[b\"h\"]b\"a\\n\"");
        let node = list(vec!["foo".into(), Atom::new("bar baz").into()]);
        assert_eq!(node.to_string(), "(foo \"bar baz\")");
        assert_eq!(node.as_list().unwrap().to_string(), "(foo \"bar baz\")");
    }
}
