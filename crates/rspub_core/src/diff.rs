//! Classification of the current resources against a snapshot.

use rspub_model::{ChangeKind, ChangeRecord, ChangeSummary, ResourceDescriptor, Snapshot};
use std::collections::BTreeMap;

/// Output of [`diff`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// Created, updated and deleted resources, sorted by identity.
    pub records: Vec<ChangeRecord>,
    /// Counts per kind, including unchanged resources.
    pub summary: ChangeSummary,
}

impl Diff {
    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Compares `current` with `previous`.
///
/// Each identity appears in at most one record. When `current` holds an
/// identity twice the first occurrence wins.
#[must_use]
pub fn diff(previous: &Snapshot, current: &[ResourceDescriptor]) -> Diff {
    let mut by_identity: BTreeMap<&str, &ResourceDescriptor> = BTreeMap::new();
    for resource in current {
        by_identity.entry(resource.identity.as_str()).or_insert(resource);
    }

    let mut records = Vec::new();
    let mut summary = ChangeSummary::default();

    for (identity, resource) in &by_identity {
        match previous.get(identity) {
            None => {
                records.push(ChangeRecord::created((*resource).clone()));
                summary.record(ChangeKind::Created);
            }
            Some(entry) if entry.descriptor.differs_from(resource) => {
                records.push(ChangeRecord::updated(
                    entry.descriptor.clone(),
                    (*resource).clone(),
                ));
                summary.record(ChangeKind::Updated);
            }
            Some(_) => summary.unchanged += 1,
        }
    }

    for (identity, entry) in previous.iter() {
        if !by_identity.contains_key(identity.as_str()) {
            records.push(ChangeRecord::deleted(entry.descriptor.clone()));
            summary.record(ChangeKind::Deleted);
        }
    }

    records.sort_by(|a, b| a.identity.cmp(&b.identity));
    Diff { records, summary }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rspub_model::{DocumentId, Fingerprint};
    use std::collections::BTreeSet;
    use std::time::{Duration, UNIX_EPOCH};

    fn resource(name: &str, size: u64, secs: u64) -> ResourceDescriptor {
        let path = format!("/r/{name}");
        ResourceDescriptor::new(&path, &path, size, UNIX_EPOCH + Duration::from_secs(secs))
    }

    fn snapshot(resources: &[ResourceDescriptor]) -> Snapshot {
        Snapshot::from_resources(resources, DocumentId::new(1, 1))
    }

    #[test]
    fn empty_previous_creates_everything() {
        let current = vec![resource("b", 1, 1), resource("a", 1, 1)];
        let diff = diff(&Snapshot::new(), &current);
        assert_eq!(diff.summary.created, 2);
        assert!(diff.records.iter().all(|r| r.kind == ChangeKind::Created));
        assert_eq!(diff.records[0].identity, "/r/a");
    }

    #[test]
    fn classifies_each_kind() {
        let previous = snapshot(&[
            resource("same", 1, 1),
            resource("grown", 1, 1),
            resource("touched", 1, 1),
            resource("gone", 1, 1),
        ]);
        let current = vec![
            resource("same", 1, 1),
            resource("grown", 2, 1),
            resource("touched", 1, 2),
            resource("new", 1, 1),
        ];

        let diff = diff(&previous, &current);
        let kinds: Vec<_> = diff
            .records
            .iter()
            .map(|r| (r.identity.as_str(), r.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("/r/gone", ChangeKind::Deleted),
                ("/r/grown", ChangeKind::Updated),
                ("/r/new", ChangeKind::Created),
                ("/r/touched", ChangeKind::Updated),
            ]
        );
        assert_eq!(
            diff.summary,
            ChangeSummary {
                created: 1,
                updated: 2,
                deleted: 1,
                unchanged: 1
            }
        );

        let deleted = &diff.records[0];
        assert!(deleted.new.is_none());
        assert_eq!(deleted.old.as_ref().unwrap().identity, "/r/gone");
    }

    #[test]
    fn fingerprints_take_precedence() {
        let same = Fingerprint([1; 32]);
        let previous = snapshot(&[resource("a", 1, 1).with_fingerprint(same)]);

        // Touched but identical content.
        let touched = diff(&previous, &[resource("a", 1, 99).with_fingerprint(same)]);
        assert!(touched.is_empty());

        // Same size and time, different content.
        let edited = diff(
            &previous,
            &[resource("a", 1, 1).with_fingerprint(Fingerprint([2; 32]))],
        );
        assert_eq!(edited.summary.updated, 1);
    }

    #[test]
    fn duplicate_identities_yield_one_record() {
        let current = vec![resource("a", 1, 1), resource("a", 5, 5)];
        let diff = diff(&Snapshot::new(), &current);
        assert_eq!(diff.records.len(), 1);
        assert_eq!(diff.records[0].new.as_ref().unwrap().size, 1);
    }

    fn arb_resources() -> impl Strategy<Value = Vec<ResourceDescriptor>> {
        proptest::collection::btree_map("[a-f]{1,2}", (0u64..3, 0u64..3), 0..12).prop_map(|map| {
            map.into_iter()
                .map(|(name, (size, secs))| resource(&name, size, secs))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn applying_diff_reproduces_current(
            before in arb_resources(),
            after in arb_resources(),
        ) {
            let mut state = snapshot(&before);
            let diff = diff(&state, &after);
            for record in &diff.records {
                state.apply(record, DocumentId::new(1, 2));
            }
            prop_assert!(state.same_resources(&snapshot(&after)));
        }

        #[test]
        fn records_are_sorted_and_unique(
            before in arb_resources(),
            after in arb_resources(),
        ) {
            let diff = diff(&snapshot(&before), &after);
            let identities: Vec<_> = diff.records.iter().map(|r| r.identity.clone()).collect();
            let unique: BTreeSet<_> = identities.iter().cloned().collect();
            prop_assert_eq!(identities.len(), unique.len());
            prop_assert!(identities.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(diff.summary.total_changes(), diff.records.len());
            prop_assert_eq!(diff.summary.created + diff.summary.updated + diff.summary.unchanged, after.len());
        }

        #[test]
        fn diff_against_self_is_empty(current in arb_resources()) {
            prop_assert!(diff(&snapshot(&current), &current).is_empty());
        }
    }
}
