use std::collections::BTreeSet;
use std::fmt::{Debug, Display};

use serde::Serialize;

/// Address of a random choice: a single component, or a hierarchical path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Address {
    Symbol(String),
    Index(i64),
    Path(Vec<Address>),
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address::Symbol(s.to_string())
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Address::Symbol(s)
    }
}

impl From<i64> for Address {
    fn from(i: i64) -> Self {
        Address::Index(i)
    }
}

impl From<usize> for Address {
    fn from(i: usize) -> Self {
        Address::Index(i as i64)
    }
}

impl From<&Address> for Address {
    fn from(addr: &Address) -> Self {
        addr.clone()
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Address::Symbol(s) => write!(f, "{}", s),
            Address::Index(i) => write!(f, "{}", i),
            Address::Path(path) => write!(
                f,
                "{}",
                path.iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join("/")
            ),
        }
    }
}

impl Address {
    /// Build a path address, flattening nested paths. A one-component path
    /// collapses to that component so `path!(x)` and `sym!(x)` agree.
    pub fn path<I>(components: I) -> Self
    where
        I: IntoIterator<Item = Address>,
    {
        let mut flat = Vec::new();
        for c in components {
            match c {
                Address::Path(inner) => flat.extend(inner),
                single => flat.push(single),
            }
        }
        if flat.len() == 1 {
            flat.pop().unwrap_or(Address::Path(Vec::new()))
        } else {
            Address::Path(flat)
        }
    }

    /// `name/i`, the address of the i-th element of a repeated choice.
    pub fn indexed(name: &str, i: impl Into<Address>) -> Self {
        Address::path([Address::from(name), i.into()])
    }

    /// Components of this address as a trie path.
    pub fn components(&self) -> Vec<Address> {
        match self {
            Address::Path(components) => components.clone(),
            single => vec![single.clone()],
        }
    }

    /// True if `self` equals `other` or is a strict prefix of it.
    pub fn is_prefix_of(&self, other: &Address) -> bool {
        let mine = self.components();
        let theirs = other.components();
        mine.len() <= theirs.len() && mine.iter().zip(theirs.iter()).all(|(a, b)| a == b)
    }
}

#[macro_export]
macro_rules! sym {
    ($name:ident) => {
        $crate::address::Address::Symbol(stringify!($name).to_string())
    };
    ($name:expr) => {
        $crate::address::Address::from($name)
    };
}

#[macro_export]
macro_rules! path {
    ($($x:expr),+ $(,)?) => {
        $crate::address::Address::path(vec![$($crate::address::Address::from($x)),+])
    };
}

/// A set of addresses picked out of a trace.
///
/// Selecting an address also selects everything nested beneath it, so
/// selecting `height` picks `height/0/3`.
#[derive(Clone, PartialEq, Debug)]
pub enum Selection {
    All,
    None,
    Select(BTreeSet<Address>),
    Complement(Box<Selection>),
    And(Box<Selection>, Box<Selection>),
    Or(Box<Selection>, Box<Selection>),
}

impl Selection {
    pub fn contains(&self, addr: &Address) -> bool {
        match self {
            Selection::All => true,
            Selection::None => false,
            Selection::Select(addrs) => addrs.iter().any(|a| a.is_prefix_of(addr)),
            Selection::Complement(inner) => !inner.contains(addr),
            Selection::And(left, right) => left.contains(addr) && right.contains(addr),
            Selection::Or(left, right) => left.contains(addr) || right.contains(addr),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Selection::None => true,
            Selection::Select(addrs) => addrs.is_empty(),
            _ => false,
        }
    }
}

impl From<&[Address]> for Selection {
    fn from(addresses: &[Address]) -> Self {
        if addresses.is_empty() {
            Selection::None
        } else {
            Selection::Select(addresses.iter().cloned().collect())
        }
    }
}

impl From<Vec<Address>> for Selection {
    fn from(addresses: Vec<Address>) -> Self {
        Selection::from(addresses.as_slice())
    }
}

impl From<Address> for Selection {
    fn from(address: Address) -> Self {
        Selection::Select(BTreeSet::from([address]))
    }
}

impl From<&str> for Selection {
    fn from(name: &str) -> Self {
        Selection::from(Address::from(name))
    }
}

impl std::ops::BitOr for Selection {
    type Output = Selection;

    fn bitor(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Selection::None, other) | (other, Selection::None) => other,
            (Selection::All, _) | (_, Selection::All) => Selection::All,
            (Selection::Select(mut a), Selection::Select(b)) => {
                a.extend(b);
                Selection::Select(a)
            }
            (lhs, rhs) => Selection::Or(Box::new(lhs), Box::new(rhs)),
        }
    }
}

impl std::ops::BitAnd for Selection {
    type Output = Selection;

    fn bitand(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Selection::None, _) | (_, Selection::None) => Selection::None,
            (Selection::All, other) | (other, Selection::All) => other,
            (lhs, rhs) => Selection::And(Box::new(lhs), Box::new(rhs)),
        }
    }
}

impl std::ops::Not for Selection {
    type Output = Selection;

    fn not(self) -> Self::Output {
        match self {
            Selection::All => Selection::None,
            Selection::None => Selection::All,
            Selection::Complement(inner) => *inner,
            other => Selection::Complement(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{path, sym};

    #[test]
    fn test_address_macros() {
        assert_eq!(sym!(x), Address::Symbol("x".to_string()));
        assert_eq!(sym!("hello"), Address::Symbol("hello".to_string()));
        assert_eq!(path!("x", "y"), Address::Path(vec![sym!(x), sym!(y)]));
        assert_eq!(path!("x"), sym!(x));
        assert_eq!(
            path!(path!("a", "b"), 3i64),
            Address::Path(vec![sym!(a), sym!(b), Address::Index(3)])
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Address::indexed("die", 2usize).to_string(), "die/2");
        assert_eq!(path!("height", 0usize, 4usize).to_string(), "height/0/4");
    }

    #[test]
    fn test_selection_hierarchical() {
        let sel = Selection::from("height");
        assert!(sel.contains(&sym!(height)));
        assert!(sel.contains(&path!("height", 0usize, 1usize)));
        assert!(!sel.contains(&sym!(num_genes)));
    }

    #[test]
    fn test_selection_algebra() {
        let a = Selection::from("a");
        let b = Selection::from("b");

        let either = a.clone() | b.clone();
        assert!(either.contains(&sym!(a)));
        assert!(either.contains(&sym!(b)));

        let both = a.clone() & b;
        assert!(!both.contains(&sym!(a)));

        let not_a = !a;
        assert!(!not_a.contains(&sym!(a)));
        assert!(not_a.contains(&sym!(c)));

        assert!(Selection::All.contains(&sym!(anything)));
        assert!(!Selection::None.contains(&sym!(anything)));
        assert!(Selection::from(Vec::<Address>::new()).is_empty());
    }
}
