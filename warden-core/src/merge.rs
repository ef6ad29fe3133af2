//! Reconciling result sets produced by two independent stores.

use crate::{PolicyRecord, PublishedPolicy, StatusEntry};
use std::collections::HashSet;
use std::hash::Hash;

/// Identity used to detect the same record coming from two stores.
pub trait MergeKey {
    type Key: Eq + Hash;

    fn merge_key(&self) -> Self::Key;
}

impl MergeKey for String {
    type Key = String;

    fn merge_key(&self) -> String {
        self.clone()
    }
}

impl MergeKey for PolicyRecord {
    type Key = String;

    fn merge_key(&self) -> String {
        self.policy_id.clone()
    }
}

impl MergeKey for PublishedPolicy {
    type Key = String;

    fn merge_key(&self) -> String {
        self.policy_id.clone()
    }
}

impl MergeKey for StatusEntry {
    type Key = uuid::Uuid;

    fn merge_key(&self) -> uuid::Uuid {
        self.entry_id
    }
}

/// Combine two collections with first-seen precedence.
///
/// The output holds every element of `primary` in order, followed by each
/// element of `secondary` whose key has not been seen yet. Duplicates inside
/// `secondary` collapse to their first occurrence.
pub fn merge_dedup<T>(primary: &[T], secondary: &[T]) -> Vec<T>
where
    T: MergeKey + Clone,
{
    let mut seen: HashSet<T::Key> = primary.iter().map(MergeKey::merge_key).collect();
    let mut merged = primary.to_vec();
    for item in secondary {
        if seen.insert(item.merge_key()) {
            merged.push(item.clone());
        }
    }
    merged
}
