//! The diff engine: compares two snapshots of the same kind.
//!
//! Only additions and status changes are observable. A record that disappears
//! between two polls produces no event.

use std::collections::HashMap;

use crate::{Record, Snapshot};

/// A detected transition between two snapshots of the same kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent<T> {
    /// The key was absent from the previous snapshot.
    Created(T),
    /// The key was present and its status-relevant field differs.
    Updated { previous: T, current: T },
}

impl<T: Record> ChangeEvent<T> {
    /// Returns the record as it is now.
    pub fn current(&self) -> &T {
        match self {
            Self::Created(current) | Self::Updated { current, .. } => current,
        }
    }

    /// Returns the record as it was before, if it existed.
    pub fn previous(&self) -> Option<&T> {
        match self {
            Self::Created(_) => None,
            Self::Updated { previous, .. } => Some(previous),
        }
    }

    /// Returns the identity of the changed record.
    pub fn key(&self) -> &T::Key {
        self.current().key()
    }
}

/// Computes the change events between `old` and `new`, in the order of `new`.
pub fn diff<T: Record>(old: &Snapshot<T>, new: &Snapshot<T>) -> Vec<ChangeEvent<T>> {
    if old.ptr_eq(new) {
        return Vec::new();
    }

    let index: HashMap<&T::Key, &T> = old.iter().map(|record| (record.key(), record)).collect();

    new.iter()
        .filter_map(|current| match index.get(current.key()) {
            None => Some(ChangeEvent::Created(current.clone())),
            Some(previous) if previous.status_field() != current.status_field() => {
                Some(ChangeEvent::Updated {
                    previous: (*previous).clone(),
                    current: current.clone(),
                })
            }
            Some(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{
        ApplicationName, BuildId, BuildRecord, BuildStatus, EnvironmentHealth, EnvironmentName,
        EnvironmentRecord, EnvironmentStatus, ProjectName, VersionLabel,
    };

    fn build(id: &str, status: &str) -> BuildRecord {
        BuildRecord {
            id: BuildId::new(id).unwrap(),
            project_name: ProjectName::new("web").unwrap(),
            status: BuildStatus::from(status),
            start_time: None,
        }
    }

    fn env(name: &str, status: &str, health: &str) -> EnvironmentRecord {
        EnvironmentRecord {
            name: EnvironmentName::new(name).unwrap(),
            application_name: ApplicationName::new("shop").unwrap(),
            health: EnvironmentHealth::from(health),
            status: EnvironmentStatus::new(status),
            version_label: VersionLabel::new("v1"),
            updated_at: None,
        }
    }

    #[test]
    fn status_change_yields_one_update() {
        let old = Snapshot::capture(vec![build("b1", "IN_PROGRESS")]);
        let new = Snapshot::capture(vec![build("b1", "SUCCEEDED")]);

        let events = diff(&old, &new);

        assert_eq!(
            events,
            vec![ChangeEvent::Updated {
                previous: build("b1", "IN_PROGRESS"),
                current: build("b1", "SUCCEEDED"),
            }]
        );
    }

    #[test]
    fn new_key_yields_created() {
        let old = Snapshot::empty();
        let new = Snapshot::capture(vec![build("b2", "IN_PROGRESS")]);

        assert_eq!(diff(&old, &new), vec![ChangeEvent::Created(build("b2", "IN_PROGRESS"))]);
    }

    #[test]
    fn removed_records_are_not_observable() {
        let old = Snapshot::capture(vec![env("e1", "Ready", "Green")]);
        let new = Snapshot::capture(Vec::new());

        assert!(diff(&old, &new).is_empty());
    }

    #[test]
    fn environments_compare_status_not_health() {
        let old = Snapshot::capture(vec![env("e1", "Ready", "Green"), env("e2", "Ready", "Green")]);
        let new = Snapshot::capture(vec![env("e1", "Updating", "Green"), env("e2", "Ready", "Red")]);

        let events = diff(&old, &new);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].key().as_str(), "e1");
        assert_eq!(events[0].previous().unwrap().status.as_str(), "Ready");
    }

    #[test]
    fn other_attribute_changes_are_ignored() {
        let old = Snapshot::capture(vec![env("e1", "Ready", "Green")]);
        let mut changed = env("e1", "Ready", "Green");
        changed.version_label = VersionLabel::new("v2");
        changed.application_name = ApplicationName::new("other").unwrap();
        let new = Snapshot::capture(vec![changed]);

        assert!(diff(&old, &new).is_empty());
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let old = Snapshot::capture(vec![build("b1", "SUCCEEDED")]);
        let new = Snapshot::capture(vec![build("b1", "succeeded")]);

        assert_eq!(diff(&old, &new).len(), 1);
    }

    #[test]
    fn events_follow_the_order_of_the_new_snapshot() {
        let old = Snapshot::capture(vec![build("b1", "IN_PROGRESS")]);
        let new = Snapshot::capture(vec![
            build("b3", "IN_PROGRESS"),
            build("b1", "FAILED"),
            build("b2", "IN_PROGRESS"),
        ]);

        let keys: Vec<_> = diff(&old, &new).iter().map(|e| e.key().to_string()).collect();
        assert_eq!(keys, ["b3", "b1", "b2"]);
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    const STATUSES: [&str; 6] = ["IN_PROGRESS", "SUCCEEDED", "FAILED", "FAULT", "TIMED_OUT", "QUEUED"];

    fn arb_builds() -> impl Strategy<Value = Vec<BuildRecord>> {
        prop::collection::vec((0u8..24, 0usize..STATUSES.len()), 0..20).prop_map(|rows| {
            rows.into_iter()
                .map(|(id, status)| build(&format!("b{id}"), STATUSES[status]))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn diff_of_identical_content_is_empty(records in arb_builds()) {
            let a = Snapshot::capture(records.clone());
            let b = Snapshot::capture(records);
            prop_assert!(diff(&a, &a).is_empty());
            prop_assert!(diff(&a, &b).is_empty());
        }

        #[test]
        fn adding_a_fresh_key_creates_exactly_it(records in arb_builds(), status in 0usize..STATUSES.len()) {
            let old = Snapshot::capture(records.clone());
            let fresh = build("fresh", STATUSES[status]);
            let mut grown = records;
            grown.push(fresh.clone());
            let new = Snapshot::capture(grown);

            let events = diff(&old, &new);
            prop_assert_eq!(events, vec![ChangeEvent::Created(fresh)]);
        }

        #[test]
        fn every_event_refers_to_a_record_in_new(old in arb_builds(), new in arb_builds()) {
            let old = Snapshot::capture(old);
            let new = Snapshot::capture(new);
            for event in diff(&old, &new) {
                prop_assert!(new.iter().any(|r| r == event.current()));
                if let Some(previous) = event.previous() {
                    prop_assert_ne!(previous.status_field(), event.current().status_field());
                }
            }
        }
    }
}
