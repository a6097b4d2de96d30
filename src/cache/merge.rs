//! Merge-on-read support
//!
//! When several nodes hold a copy of the same logical key, `get` folds all of
//! them into one collection. Collection payloads contribute their elements,
//! scalar payloads contribute themselves.

use std::fmt;

use crate::cluster::{ClientRoute, DomainPair, NodeId};

// == Aggregate ==
/// A payload that can be folded into a merged, cross-node result.
pub trait Aggregate: Sized {
    /// Element type of the merged collection.
    type Item;

    /// Splits the payload into the items it contributes to a merge.
    fn into_items(self) -> Vec<Self::Item>;
}

impl<T> Aggregate for Vec<T> {
    type Item = T;

    fn into_items(self) -> Vec<T> {
        self
    }
}

impl Aggregate for serde_json::Value {
    type Item = serde_json::Value;

    fn into_items(self) -> Vec<serde_json::Value> {
        match self {
            serde_json::Value::Array(items) => items,
            other => vec![other],
        }
    }
}

/// Implements [`Aggregate`] for payloads that merge as a single item.
#[macro_export]
macro_rules! scalar_aggregate {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::cache::Aggregate for $ty {
                type Item = $ty;

                fn into_items(self) -> Vec<$ty> {
                    vec![self]
                }
            }
        )*
    };
}

scalar_aggregate!(String, bool, i64, u64, f64, NodeId, DomainPair, ClientRoute);

// == Lookup ==
/// Result of a `get` that found at least one physical entry.
pub enum Lookup<V: Aggregate> {
    /// Exactly one node holds the key
    Single(V),
    /// Several nodes hold the key; their payloads were flattened together
    Merged(Vec<V::Item>),
}

impl<V: Aggregate> Lookup<V> {
    /// Folds several decoded copies into one merged lookup.
    pub fn merge(values: impl IntoIterator<Item = V>) -> Self {
        Lookup::Merged(values.into_iter().flat_map(Aggregate::into_items).collect())
    }

    /// Returns the value when only one node held the key.
    pub fn single(self) -> Option<V> {
        match self {
            Lookup::Single(value) => Some(value),
            Lookup::Merged(_) => None,
        }
    }

    pub fn is_merged(&self) -> bool {
        matches!(self, Lookup::Merged(_))
    }

    /// Uniform view over both shapes: the items this lookup contributes.
    pub fn into_items(self) -> Vec<V::Item> {
        match self {
            Lookup::Single(value) => value.into_items(),
            Lookup::Merged(items) => items,
        }
    }
}

impl<V> fmt::Debug for Lookup<V>
where
    V: Aggregate + fmt::Debug,
    V::Item: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Single(value) => f.debug_tuple("Single").field(value).finish(),
            Lookup::Merged(items) => f.debug_tuple("Merged").field(items).finish(),
        }
    }
}

impl<V> PartialEq for Lookup<V>
where
    V: Aggregate + PartialEq,
    V::Item: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Lookup::Single(a), Lookup::Single(b)) => a == b,
            (Lookup::Merged(a), Lookup::Merged(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_flattens_lists() {
        let merged = Lookup::merge(vec![vec![1, 2], vec![3]]);
        assert_eq!(merged, Lookup::Merged(vec![1, 2, 3]));
    }

    #[test]
    fn test_merge_collects_scalars() {
        let merged = Lookup::merge(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(merged.into_items(), vec!["a", "b"]);
    }

    #[test]
    fn test_merge_dynamic_values() {
        let merged = Lookup::merge(vec![json!(["x", "y"]), json!("z")]);
        assert_eq!(
            merged,
            Lookup::Merged(vec![json!("x"), json!("y"), json!("z")])
        );
    }

    #[test]
    fn test_single_shape_is_distinguishable() {
        let single: Lookup<Vec<String>> = Lookup::Single(vec!["only".to_string()]);
        assert!(!single.is_merged());
        assert_eq!(single.single(), Some(vec!["only".to_string()]));

        let merged: Lookup<Vec<String>> = Lookup::merge(vec![vec!["only".to_string()]]);
        assert!(merged.is_merged());
        assert_eq!(merged.single(), None);
    }
}
