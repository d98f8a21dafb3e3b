use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Record, RecordId};

/// The full set of records representing a document at one instant.
///
/// A snapshot is a mapping from [`RecordId`] to [`Record`]. Ids are unique
/// and ordering is irrelevant. Snapshot-level migrators receive the whole
/// mapping at once so they can add, remove, or rekey entire record types.
///
/// # Example
///
/// ```
/// use doc_store::{Record, Snapshot};
/// use serde_json::json;
///
/// let mut snapshot = Snapshot::new();
/// snapshot.insert(
///     "page:1",
///     Record::from_value(json!({ "id": "page:1", "typeName": "page" })).unwrap(),
/// );
///
/// assert_eq!(snapshot.len(), 1);
/// assert!(snapshot.contains("page:1"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<RecordId, Record>);

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record under `id`, returning the record it replaced if any.
    pub fn insert(&mut self, id: impl Into<RecordId>, record: Record) -> Option<Record> {
        self.0.insert(id.into(), record)
    }

    /// Get the record stored under `id`.
    #[must_use]
    pub fn get(&self, id: impl Into<RecordId>) -> Option<&Record> {
        self.0.get(&id.into())
    }

    /// Get the record stored under `id` mutably.
    pub fn get_mut(&mut self, id: impl Into<RecordId>) -> Option<&mut Record> {
        self.0.get_mut(&id.into())
    }

    /// Remove the record stored under `id`.
    pub fn remove(&mut self, id: impl Into<RecordId>) -> Option<Record> {
        self.0.remove(&id.into())
    }

    /// Whether a record is stored under `id`.
    #[must_use]
    pub fn contains(&self, id: impl Into<RecordId>) -> bool {
        self.0.contains_key(&id.into())
    }

    /// Number of records in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the snapshot holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(id, record)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &Record)> {
        self.0.iter()
    }

    /// Iterate over records.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.0.values()
    }

    /// Iterate over ids.
    pub fn ids(&self) -> impl Iterator<Item = &RecordId> {
        self.0.keys()
    }

    /// Keep only the entries for which the predicate returns `true`.
    ///
    /// This is the workhorse of snapshot-level migrators that retire whole
    /// record types.
    pub fn retain(&mut self, mut keep: impl FnMut(&RecordId, &Record) -> bool) {
        self.0.retain(|id, record| keep(id, record));
    }
}

impl FromIterator<Record> for Snapshot {
    /// Collect records keyed by their own `id` field.
    ///
    /// Records without an `id` are skipped; a snapshot entry must be
    /// addressable to be migrated.
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for record in iter {
            if let Some(id) = record.id() {
                let id = RecordId::new(id);
                snapshot.insert(id, record);
            }
        }
        snapshot
    }
}

impl IntoIterator for Snapshot {
    type Item = (RecordId, Record);
    type IntoIter = std::collections::btree_map::IntoIter<RecordId, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, type_name: &str) -> Record {
        Record::from_value(json!({ "id": id, "typeName": type_name })).unwrap()
    }

    #[test]
    fn insert_get_remove() {
        let mut snapshot = Snapshot::new();
        assert!(snapshot.insert("page:1", record("page:1", "page")).is_none());
        assert_eq!(snapshot.get("page:1").unwrap().type_name(), Some("page"));
        assert!(snapshot.remove("page:1").is_some());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn collect_keys_by_record_id() {
        let snapshot: Snapshot = [record("shape:a", "shape"), record("shape:b", "shape")]
            .into_iter()
            .collect();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains("shape:a"));
        assert!(snapshot.contains("shape:b"));
    }

    #[test]
    fn collect_skips_records_without_ids() {
        let snapshot: Snapshot = [Record::new(), record("shape:a", "shape")]
            .into_iter()
            .collect();
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn retain_filters_by_type() {
        let mut snapshot: Snapshot = [
            record("shape:a", "shape"),
            record("user:1", "user"),
            record("user:2", "user"),
        ]
        .into_iter()
        .collect();

        snapshot.retain(|_, record| record.type_name() != Some("user"));
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains("shape:a"));
    }

    #[test]
    fn serde_round_trip() {
        let snapshot: Snapshot = [record("shape:a", "shape")].into_iter().collect();
        let text = serde_json::to_string(&snapshot).unwrap();
        let back: Snapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(snapshot, back);
    }
}
