use std::fmt::Debug;

use crate::address::{Address, Selection};
use crate::trie::Trie;
use crate::value::Value;

/// A record for a choice in a trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub value: Value,
    /// Log density of `value` under the distribution it was drawn from.
    pub score: f64,
    /// Observations are scored but never resampled.
    pub observed: bool,
}

impl Record {
    pub fn latent(value: Value, score: f64) -> Self {
        Self {
            value,
            score,
            observed: false,
        }
    }

    pub fn observed(value: Value, score: f64) -> Self {
        Self {
            value,
            score,
            observed: true,
        }
    }
}

/// Hierarchical map from addresses to values.
///
/// Constraints passed to `generate`/`update` are `ChoiceMap<Value>`; a
/// trace keeps its choices as `ChoiceMap<Record>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceMap<V> {
    trie: Trie<V>,
}

impl<V> Default for ChoiceMap<V> {
    fn default() -> Self {
        Self {
            trie: Trie::default(),
        }
    }
}

impl<V: Clone + Debug> ChoiceMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, addr: &Address) -> bool {
        self.trie.contains(&addr.components())
    }

    pub fn get(&self, addr: &Address) -> Option<&V> {
        self.trie.get(&addr.components())
    }

    pub fn insert(&mut self, addr: impl Into<Address>, value: V) -> Option<V> {
        self.trie.insert(&addr.into().components(), value)
    }

    pub fn remove(&mut self, addr: &Address) -> Option<V> {
        self.trie.remove(&addr.components())
    }

    /// Merge `other` into this map; values in `other` take precedence.
    pub fn merge(&mut self, other: &Self) {
        self.trie.merge(other.trie.clone());
    }

    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    pub fn len(&self) -> usize {
        self.trie.len()
    }

    /// Iterate over all `(address, value)` pairs in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (Address, &V)> + '_ {
        self.trie
            .iter()
            .map(|(path, value)| (Address::path(path), value))
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.iter().map(|(addr, _)| addr).collect()
    }

    pub fn filter(&self, selection: &Selection) -> Self {
        let mut filtered = Self::new();
        for (addr, value) in self.iter() {
            if selection.contains(&addr) {
                filtered.insert(addr, value.clone());
            }
        }
        filtered
    }

    /// A selection that picks exactly the addresses in this map.
    pub fn selection(&self) -> Selection {
        Selection::from(self.addresses())
    }
}

impl ChoiceMap<Record> {
    /// Plain values, observations included.
    pub fn values(&self) -> ChoiceMap<Value> {
        let mut out = ChoiceMap::new();
        for (addr, record) in self.iter() {
            out.insert(addr, record.value.clone());
        }
        out
    }

    /// Addresses of the latent (non-observed) choices.
    pub fn latent_addresses(&self) -> Vec<Address> {
        self.iter()
            .filter(|(_, record)| !record.observed)
            .map(|(addr, _)| addr)
            .collect()
    }
}

impl<A: Into<Address>, V: Clone + Debug> FromIterator<(A, V)> for ChoiceMap<V> {
    fn from_iter<I: IntoIterator<Item = (A, V)>>(iter: I) -> Self {
        let mut map = ChoiceMap::new();
        for (addr, value) in iter {
            map.insert(addr, value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{path, sym};

    #[test]
    fn test_choice_map_paths() {
        let mut map = ChoiceMap::new();
        map.insert("slope", Value::Float(3.0));
        map.insert(path!("y", 0usize), Value::Float(7.69));
        map.insert(path!("y", 1usize), Value::Float(13.3));

        assert_eq!(map.len(), 3);
        assert_eq!(map.get(&sym!(slope)), Some(&Value::Float(3.0)));
        assert!(map.contains(&path!("y", 1usize)));
        assert!(!map.contains(&sym!(y)));

        let ys = map.filter(&Selection::from("y"));
        assert_eq!(ys.len(), 2);
        assert_eq!(ys.addresses(), vec![path!("y", 0usize), path!("y", 1usize)]);
    }

    #[test]
    fn test_latent_addresses() {
        let map: ChoiceMap<Record> = vec![
            ("a", Record::latent(Value::Integer(1), -1.0)),
            ("b", Record::observed(Value::Float(0.1), -0.5)),
        ]
        .into_iter()
        .collect();

        assert_eq!(map.latent_addresses(), vec![sym!(a)]);
        assert_eq!(map.values().get(&sym!(b)), Some(&Value::Float(0.1)));
    }
}
