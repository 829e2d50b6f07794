//! List operations

use crate::value::Value;
use std::collections::HashSet;
use std::fmt::Debug;

/// Remove duplicates, keeping the first occurrence of each item
pub(crate) fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// `+` operator: two scalars are joined, anything involving a list
/// concatenates the items, an empty scalar counting as the empty list.
pub(crate) fn concat(left: Value, right: Value) -> Value {
    match (left, right) {
        (Value::Scalar(mut left), Value::Scalar(right)) => {
            left.push_str(&right);
            Value::Scalar(left)
        }
        (left, right) => {
            let mut items = left.into_list();
            items.extend(right.into_list());
            Value::List(items)
        }
    }
}

/// Reduces a list to its informative items.
///
/// Implementations must keep the relative order of the items they retain,
/// and must return the same output for the same input.
pub trait WinnowPolicy: Send + Sync + Debug {
    fn winnow(&self, items: Vec<String>) -> Vec<String>;
}

/// Drops empty strings. This is the default policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct DropEmpty;

impl WinnowPolicy for DropEmpty {
    fn winnow(&self, items: Vec<String>) -> Vec<String> {
        items.into_iter().filter(|item| !item.is_empty()).collect()
    }
}

/// Drops empty strings and every item that is a strict prefix of another
/// item ending at a `/`, `?` or `#` boundary, so `http://a.com` is dropped
/// when `http://a.com/page` is also present.
#[derive(Debug, Clone, Copy, Default)]
pub struct DropSubsumed;

const BOUNDARIES: [char; 3] = ['/', '?', '#'];

impl WinnowPolicy for DropSubsumed {
    fn winnow(&self, items: Vec<String>) -> Vec<String> {
        // Items sharing a prefix are adjacent once sorted, so each check is a
        // binary search for the first item at or after the prefix.
        let mut sorted: Vec<&str> = items.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        sorted.dedup();

        let extended = |prefix: &str, strictly_longer: bool| {
            let pos = sorted.partition_point(|item| {
                if strictly_longer {
                    *item <= prefix
                } else {
                    *item < prefix
                }
            });
            sorted.get(pos).is_some_and(|item| item.starts_with(prefix))
        };
        let subsumed = |item: &str| {
            if item.ends_with(BOUNDARIES) {
                extended(item, true)
            } else {
                BOUNDARIES
                    .iter()
                    .any(|sep| extended(&format!("{item}{sep}"), false))
            }
        };

        let keep: Vec<bool> = items
            .iter()
            .map(|item| !item.is_empty() && !subsumed(item))
            .collect();

        items
            .into_iter()
            .zip(keep)
            .filter_map(|(item, keep)| keep.then_some(item))
            .collect()
    }
}
