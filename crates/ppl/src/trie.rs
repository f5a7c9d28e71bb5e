use std::collections::BTreeMap;

use crate::address::Address;

/// A trie keyed by address components.
///
/// Leaves and internal nodes live in separate maps so a component can hold a
/// value and a sub-trie at once. Ordered maps keep iteration deterministic,
/// which seeded inference relies on.
#[derive(Debug, Clone, PartialEq)]
pub struct Trie<T> {
    leaf: BTreeMap<Address, T>,
    internal: BTreeMap<Address, Trie<T>>,
}

impl<T> Default for Trie<T> {
    fn default() -> Self {
        Self {
            leaf: BTreeMap::new(),
            internal: BTreeMap::new(),
        }
    }
}

impl<T: Clone> Trie<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invariant: internal nodes are never empty.
    pub fn is_empty(&self) -> bool {
        self.leaf.is_empty() && self.internal.is_empty()
    }

    pub fn len(&self) -> usize {
        self.leaf.len() + self.internal.values().map(Trie::len).sum::<usize>()
    }

    pub fn contains(&self, path: &[Address]) -> bool {
        self.get(path).is_some()
    }

    pub fn get(&self, path: &[Address]) -> Option<&T> {
        match path {
            [] => None,
            [last] => self.leaf.get(last),
            [first, rest @ ..] => self.internal.get(first)?.get(rest),
        }
    }

    pub fn get_subtrie(&self, path: &[Address]) -> Option<&Trie<T>> {
        match path {
            [] => Some(self),
            [first, rest @ ..] => self.internal.get(first)?.get_subtrie(rest),
        }
    }

    /// Insert a value, returning the one it replaced.
    pub fn insert(&mut self, path: &[Address], value: T) -> Option<T> {
        match path {
            [] => None,
            [last] => self.leaf.insert(last.clone(), value),
            [first, rest @ ..] => self
                .internal
                .entry(first.clone())
                .or_default()
                .insert(rest, value),
        }
    }

    pub fn remove(&mut self, path: &[Address]) -> Option<T> {
        match path {
            [] => None,
            [last] => self.leaf.remove(last),
            [first, rest @ ..] => {
                let node = self.internal.get_mut(first)?;
                let removed = node.remove(rest);
                if node.is_empty() {
                    self.internal.remove(first);
                }
                removed
            }
        }
    }

    /// Merge `other` into `self`; values in `other` win.
    pub fn merge(&mut self, other: Trie<T>) {
        self.leaf.extend(other.leaf);
        for (addr, subtrie) in other.internal {
            self.internal.entry(addr).or_default().merge(subtrie);
        }
    }

    pub fn iter(&self) -> TrieIter<'_, T> {
        let mut items = Vec::with_capacity(self.len());
        self.collect_into(&mut Vec::new(), &mut items);
        TrieIter {
            inner: items.into_iter(),
        }
    }

    fn collect_into<'a>(&'a self, prefix: &mut Vec<Address>, out: &mut Vec<(Vec<Address>, &'a T)>) {
        for (addr, value) in &self.leaf {
            let mut path = prefix.clone();
            path.push(addr.clone());
            out.push((path, value));
        }
        for (addr, subtrie) in &self.internal {
            prefix.push(addr.clone());
            subtrie.collect_into(prefix, out);
            prefix.pop();
        }
    }
}

/// Depth-first iterator over `(path, value)` pairs, leaves of a node first.
pub struct TrieIter<'a, T> {
    inner: std::vec::IntoIter<(Vec<Address>, &'a T)>,
}

impl<'a, T> Iterator for TrieIter<'a, T> {
    type Item = (Vec<Address>, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sym;

    #[test]
    fn test_trie_insert_get_remove() {
        let mut trie = Trie::new();
        assert!(trie.is_empty());

        trie.insert(&[sym!(x)], 1);
        trie.insert(&[sym!(x), sym!(y)], 2);
        assert_eq!(trie.get(&[sym!(x)]), Some(&1));
        assert_eq!(trie.get(&[sym!(x), sym!(y)]), Some(&2));
        assert_eq!(trie.len(), 2);

        assert_eq!(trie.insert(&[sym!(x)], 10), Some(1));

        assert_eq!(trie.remove(&[sym!(x), sym!(y)]), Some(2));
        assert!(!trie.contains(&[sym!(x), sym!(y)]));
        assert!(trie.get_subtrie(&[sym!(x)]).is_none());
        assert_eq!(trie.remove(&[sym!(z)]), None);
    }

    #[test]
    fn test_trie_iter_is_ordered() {
        let mut trie = Trie::new();
        trie.insert(&[sym!(z)], 3);
        trie.insert(&[sym!(a), Address::Index(1)], 2);
        trie.insert(&[sym!(a), Address::Index(0)], 1);

        let pairs: Vec<_> = trie.iter().map(|(p, v)| (p, *v)).collect();
        assert_eq!(
            pairs,
            vec![
                (vec![sym!(z)], 3),
                (vec![sym!(a), Address::Index(0)], 1),
                (vec![sym!(a), Address::Index(1)], 2),
            ]
        );
    }

    #[test]
    fn test_trie_merge() {
        let mut trie1 = Trie::new();
        trie1.insert(&[sym!(x)], 1);
        trie1.insert(&[sym!(y)], 2);

        let mut trie2 = Trie::new();
        trie2.insert(&[sym!(y)], 20);
        trie2.insert(&[sym!(x), sym!(a)], 4);

        trie1.merge(trie2);

        assert_eq!(trie1.get(&[sym!(x)]), Some(&1));
        assert_eq!(trie1.get(&[sym!(y)]), Some(&20));
        assert_eq!(trie1.get(&[sym!(x), sym!(a)]), Some(&4));
    }
}
