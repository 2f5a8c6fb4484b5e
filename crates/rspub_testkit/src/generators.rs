//! Property-based test generators using proptest.
//!
//! Trees are maps from relative path to content. Paths use at most two
//! directory levels and never start with a dot, so the default gate accepts
//! every generated file.

use crate::fixtures::TestPublisher;
use proptest::prelude::*;
use std::collections::BTreeMap;

/// A change to a resource tree between two runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Create or overwrite a file.
    Write(String, Vec<u8>),
    /// Delete a file if present.
    Delete(String),
}

/// Strategy for relative file paths like `a/b1.txt`.
pub fn file_name_strategy() -> impl Strategy<Value = String> {
    (
        prop::collection::vec("[a-c]", 0..=2),
        prop::string::string_regex("[a-z][a-z0-9]{0,5}\\.txt").expect("Invalid regex"),
    )
        .prop_map(|(dirs, name)| {
            let mut path = dirs.join("/");
            if !path.is_empty() {
                path.push('/');
            }
            path.push_str(&name);
            path
        })
}

fn content_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

/// Strategy for resource trees of up to `max` files.
///
/// Paths that would need a file and a directory of the same name are
/// dropped.
pub fn tree_strategy(max: usize) -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    prop::collection::btree_map(file_name_strategy(), content_strategy(), 0..=max).prop_map(
        |mut tree| {
            let names: Vec<String> = tree.keys().cloned().collect();
            tree.retain(|name, _| {
                !names
                    .iter()
                    .any(|other| other.starts_with(&format!("{name}/")))
            });
            tree
        },
    )
}

/// Strategy for a mutation against files named like [`file_name_strategy`].
pub fn mutation_strategy() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        3 => (file_name_strategy(), content_strategy()).prop_map(|(n, c)| Mutation::Write(n, c)),
        1 => file_name_strategy().prop_map(Mutation::Delete),
    ]
}

/// Applies a mutation to a publisher's tree and to a model of it.
///
/// Writes that would turn a file into a directory or the reverse are
/// skipped so the model stays a plain file map.
pub fn apply_mutation(
    publisher: &TestPublisher,
    model: &mut BTreeMap<String, Vec<u8>>,
    mutation: &Mutation,
) {
    match mutation {
        Mutation::Write(name, content) => {
            let clashes = model.keys().any(|other| {
                other.starts_with(&format!("{name}/")) || name.starts_with(&format!("{other}/"))
            });
            if clashes {
                return;
            }
            publisher.write(name, content);
            model.insert(name.clone(), content.clone());
        }
        Mutation::Delete(name) => {
            if model.remove(name).is_some() {
                publisher.delete(name);
            }
        }
    }
}
