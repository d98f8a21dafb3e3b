//! The migration runner: brings tagged snapshots and records to the
//! version vector the running code expects.
//!
//! A run is a pure, sequential fold with no suspension points: the
//! snapshot-level chain first (it can add, remove, or retype whole record
//! types, changing which per-type tables even apply), then every record's
//! own chain, then validation. The input is never mutated — a run either
//! returns a fully migrated snapshot or fails without observable partial
//! state.

use doc_store::{Record, RecordId, Snapshot};

use crate::{MigrationError, MigrationFailure, SchemaRegistry, VersionVector};

/// What to do with a record that failed migration or validation.
///
/// The runner never decides this itself; the caller-supplied
/// [`FailureHandler`] does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Remove the record from the migrated snapshot.
    Drop,
    /// Fail the whole run.
    Abort,
    /// Keep the record in the state it reached (unmigrated for a migrator
    /// failure, migrated-but-invalid for a validation failure).
    KeepAsIs,
}

/// Caller-supplied policy decision for per-record failures.
///
/// Invoked for a migrator precondition violation
/// ([`MigrationError::Unsupported`]) or a post-migration validation
/// failure ([`MigrationError::Validation`]). Structural run errors —
/// unknown types, out-of-range versions, missing down-paths — are not
/// policy questions and always fail the run.
///
/// Closures implement the trait directly:
///
/// ```
/// use doc_migrate::{FailureHandler, FailurePolicy, MigrationError};
/// use doc_store::Record;
///
/// let drop_bad_records =
///     |_record: &Record, _error: &MigrationError| FailurePolicy::Drop;
/// let _: &dyn FailureHandler = &drop_bad_records;
/// ```
pub trait FailureHandler: Send + Sync {
    /// Decide what to do with `record`, which failed with `error`.
    fn on_failure(&self, record: &Record, error: &MigrationError) -> FailurePolicy;
}

impl<F> FailureHandler for F
where
    F: Fn(&Record, &MigrationError) -> FailurePolicy + Send + Sync,
{
    fn on_failure(&self, record: &Record, error: &MigrationError) -> FailurePolicy {
        self(record, error)
    }
}

/// Default handler: any failure aborts the run.
pub(crate) struct AbortOnFailure;

impl FailureHandler for AbortOnFailure {
    fn on_failure(&self, _record: &Record, _error: &MigrationError) -> FailurePolicy {
        FailurePolicy::Abort
    }
}

/// Outcome of migrating one record, after the failure policy has spoken.
/// `Dropped` keeps the error that triggered the drop so single-record
/// callers can still report it.
enum Outcome {
    Keep(Record),
    Dropped(MigrationError),
}

impl SchemaRegistry {
    /// Migrate a whole snapshot from the version vector it was tagged with
    /// to the registry's current vector.
    ///
    /// This is the top-level entry point for loading persisted documents.
    pub fn migrate_snapshot(
        &self,
        snapshot: &Snapshot,
        source: &VersionVector,
    ) -> Result<Snapshot, MigrationFailure> {
        self.run(snapshot, source, &self.current_version_vector(), true)
    }

    /// Migrate a whole snapshot to an arbitrary target vector, e.g. an
    /// older client's vector for interoperability.
    ///
    /// Post-migration validators describe the *current* shape, so they only
    /// run when `target` is the registry's current vector.
    pub fn migrate_snapshot_to(
        &self,
        snapshot: &Snapshot,
        source: &VersionVector,
        target: &VersionVector,
    ) -> Result<Snapshot, MigrationFailure> {
        let validate = *target == self.current_version_vector();
        self.run(snapshot, source, target, validate)
    }

    /// Migrate a single record to the registry's current vector.
    ///
    /// For callers that only ever hold one record (e.g. incoming real-time
    /// updates) and already know snapshot-level migrations don't apply.
    /// There is no snapshot to drop the record from, so a
    /// [`FailurePolicy::Drop`] decision surfaces as the error that caused
    /// it.
    pub fn migrate_record(
        &self,
        record: &Record,
        source: &VersionVector,
    ) -> Result<Record, MigrationFailure> {
        let target = self.current_version_vector();
        let id = RecordId::new(record.id().unwrap_or_default());
        match self.migrate_one(record, source, &target, true) {
            Ok(Outcome::Keep(migrated)) => Ok(migrated),
            Ok(Outcome::Dropped(error)) | Err(error) => {
                Err(MigrationFailure::Record { id, error })
            }
        }
    }

    fn run(
        &self,
        snapshot: &Snapshot,
        source: &VersionVector,
        target: &VersionVector,
        validate: bool,
    ) -> Result<Snapshot, MigrationFailure> {
        // Snapshot-level pass first, in both directions: it may add new
        // synthetic records, delete records of retired types, or rekey
        // existing ones, so it decides which per-type tables apply below.
        let working = self
            .snapshot_table
            .migrate(snapshot, source.snapshot_version, target.snapshot_version)
            .map_err(|error| MigrationFailure::Snapshot { error })?;

        let mut migrated = Snapshot::new();
        for (id, record) in working.iter() {
            match self.migrate_one(record, source, target, validate) {
                Ok(Outcome::Keep(record)) => {
                    migrated.insert(id.clone(), record);
                }
                Ok(Outcome::Dropped(_)) => {}
                Err(error) => {
                    return Err(MigrationFailure::Record {
                        id: id.clone(),
                        error,
                    })
                }
            }
        }

        if validate {
            if let Some(validator) = &self.snapshot_validator {
                validator
                    .validate(&migrated)
                    .map_err(|error| MigrationFailure::Snapshot {
                        error: MigrationError::Validation(error),
                    })?;
            }
        }

        Ok(migrated)
    }

    fn migrate_one(
        &self,
        record: &Record,
        source: &VersionVector,
        target: &VersionVector,
        validate: bool,
    ) -> Result<Outcome, MigrationError> {
        let type_name = record.type_name().ok_or(MigrationError::UnknownType {
            type_name: String::new(),
        })?;

        let table = self
            .record_tables
            .get(type_name)
            .ok_or_else(|| MigrationError::UnknownType {
                type_name: type_name.to_owned(),
            })?;

        // A type absent from the target vector does not exist at the
        // target version; the snapshot-level pass is responsible for
        // removing its records, so any survivor is an error.
        let to = target
            .type_versions(type_name)
            .cloned()
            .ok_or_else(|| MigrationError::UnknownType {
                type_name: type_name.to_owned(),
            })?;

        // A type absent from the source vector cannot have been persisted
        // by the writer; its records were synthesized by the snapshot-level
        // pass, already at the target shape.
        let from = source.type_versions(type_name).cloned().unwrap_or_else(|| to.clone());

        let migrated = match table.migrate_record(record, &from, &to) {
            Ok(migrated) => migrated,
            Err(error @ MigrationError::Unsupported { .. }) => {
                return self.apply_policy(record, error)
            }
            Err(error) => return Err(error),
        };

        if validate {
            if let Some(validator) = self.validators.get(type_name) {
                match validator.validate(&migrated) {
                    Ok(valid) => return Ok(Outcome::Keep(valid)),
                    Err(error) => {
                        return self.apply_policy(&migrated, MigrationError::Validation(error))
                    }
                }
            }
        }

        Ok(Outcome::Keep(migrated))
    }

    fn apply_policy(
        &self,
        record: &Record,
        error: MigrationError,
    ) -> Result<Outcome, MigrationError> {
        match self.failure_handler.on_failure(record, &error) {
            FailurePolicy::Drop => Ok(Outcome::Dropped(error)),
            FailurePolicy::KeepAsIs => Ok(Outcome::Keep(record.clone())),
            FailurePolicy::Abort => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MigrationTable, Migrator};
    use doc_store::ValidationError;
    use serde_json::json;

    fn record(id: &str, type_name: &str) -> Record {
        Record::from_value(json!({ "id": id, "typeName": type_name })).unwrap()
    }

    fn add_field_table(field: &'static str) -> MigrationTable<Record> {
        MigrationTable::builder(0, 1)
            .migrator(Migrator::new(
                1,
                move |r: &Record| {
                    let mut r = r.clone();
                    r.insert(field, json!(false));
                    Ok(r)
                },
                move |r: &Record| {
                    let mut r = r.clone();
                    r.remove(field);
                    Ok(r)
                },
            ))
            .build()
            .unwrap()
    }

    fn registry() -> SchemaRegistry {
        SchemaRegistry::builder()
            .record_type("document", add_field_table("name"))
            .record_type("camera", MigrationTable::empty())
            .build()
            .unwrap()
    }

    fn source_at_baseline() -> VersionVector {
        VersionVector::new(0)
            .with_type("document", crate::TypeVersions::new(0))
            .with_type("camera", crate::TypeVersions::new(0))
    }

    #[test]
    fn migrates_every_record_to_current() {
        let registry = registry();
        let snapshot: Snapshot = [record("document:doc", "document"), record("camera:main", "camera")]
            .into_iter()
            .collect();

        let migrated = registry
            .migrate_snapshot(&snapshot, &source_at_baseline())
            .unwrap();

        assert_eq!(migrated.len(), 2);
        assert_eq!(
            migrated.get("document:doc").unwrap().get("name"),
            Some(&json!(false))
        );
    }

    #[test]
    fn input_snapshot_is_untouched() {
        let registry = registry();
        let snapshot: Snapshot = [record("document:doc", "document")].into_iter().collect();
        let copy = snapshot.clone();

        registry
            .migrate_snapshot(&snapshot, &source_at_baseline())
            .unwrap();
        assert_eq!(snapshot, copy);
    }

    #[test]
    fn unknown_type_is_fatal() {
        let registry = registry();
        let snapshot: Snapshot = [record("widget:1", "widget")].into_iter().collect();

        let failure = registry
            .migrate_snapshot(&snapshot, &source_at_baseline())
            .unwrap_err();
        assert_eq!(
            failure,
            MigrationFailure::Record {
                id: RecordId::new("widget:1"),
                error: MigrationError::UnknownType {
                    type_name: "widget".into()
                },
            }
        );
    }

    #[test]
    fn record_without_type_name_is_fatal() {
        let registry = registry();
        let mut untyped = Record::new();
        untyped.insert("id", json!("mystery:1"));
        let snapshot: Snapshot = [untyped].into_iter().collect();

        let failure = registry
            .migrate_snapshot(&snapshot, &source_at_baseline())
            .unwrap_err();
        assert!(matches!(
            failure,
            MigrationFailure::Record {
                error: MigrationError::UnknownType { .. },
                ..
            }
        ));
    }

    fn failing_validator_registry(policy: FailurePolicy) -> SchemaRegistry {
        SchemaRegistry::builder()
            .record_type("document", add_field_table("name"))
            .validator("document", |_record: &Record| {
                Err(ValidationError::new("always invalid").with_type("document"))
            })
            .failure_handler(move |_record: &Record, _error: &MigrationError| policy)
            .build()
            .unwrap()
    }

    #[test]
    fn validation_failure_drop_policy_removes_the_record() {
        let registry = failing_validator_registry(FailurePolicy::Drop);
        let snapshot: Snapshot = [record("document:doc", "document")].into_iter().collect();

        let migrated = registry
            .migrate_snapshot(&snapshot, &source_at_baseline())
            .unwrap();
        assert!(migrated.is_empty());
    }

    #[test]
    fn validation_failure_keep_policy_keeps_the_migrated_value() {
        let registry = failing_validator_registry(FailurePolicy::KeepAsIs);
        let snapshot: Snapshot = [record("document:doc", "document")].into_iter().collect();

        let migrated = registry
            .migrate_snapshot(&snapshot, &source_at_baseline())
            .unwrap();
        // The record kept the migrated (post-`name`) shape despite failing
        // validation.
        assert_eq!(
            migrated.get("document:doc").unwrap().get("name"),
            Some(&json!(false))
        );
    }

    #[test]
    fn validation_failure_aborts_by_default() {
        let registry = SchemaRegistry::builder()
            .record_type("document", add_field_table("name"))
            .validator("document", |_record: &Record| {
                Err(ValidationError::new("always invalid"))
            })
            .build()
            .unwrap();
        let snapshot: Snapshot = [record("document:doc", "document")].into_iter().collect();

        let failure = registry
            .migrate_snapshot(&snapshot, &source_at_baseline())
            .unwrap_err();
        assert!(matches!(
            failure,
            MigrationFailure::Record {
                error: MigrationError::Validation(_),
                ..
            }
        ));
    }

    #[test]
    fn unsupported_migrator_failure_goes_through_policy() {
        let registry = SchemaRegistry::builder()
            .record_type(
                "document",
                MigrationTable::builder(0, 1)
                    .migrator(Migrator::new(
                        1,
                        |record: &Record| {
                            record.get("name").ok_or(MigrationError::Unsupported {
                                version: 1,
                                reason: "expected a `name` field".into(),
                            })?;
                            Ok(record.clone())
                        },
                        |record: &Record| Ok(record.clone()),
                    ))
                    .build()
                    .unwrap(),
            )
            .failure_handler(|_: &Record, _: &MigrationError| FailurePolicy::Drop)
            .build()
            .unwrap();

        let snapshot: Snapshot = [record("document:doc", "document")].into_iter().collect();
        let migrated = registry
            .migrate_snapshot(&snapshot, &VersionVector::new(0).with_type("document", crate::TypeVersions::new(0)))
            .unwrap();
        assert!(migrated.is_empty());
    }

    #[test]
    fn migrate_record_convenience() {
        let registry = registry();
        let migrated = registry
            .migrate_record(&record("document:doc", "document"), &source_at_baseline())
            .unwrap();
        assert_eq!(migrated.get("name"), Some(&json!(false)));
    }

    #[test]
    fn migrate_record_drop_surfaces_the_original_error() {
        let registry = failing_validator_registry(FailurePolicy::Drop);
        let failure = registry
            .migrate_record(&record("document:doc", "document"), &source_at_baseline())
            .unwrap_err();
        // The caller gets the validation failure that triggered the drop,
        // not a synthetic stand-in.
        assert!(matches!(
            failure,
            MigrationFailure::Record {
                error: MigrationError::Validation(_),
                ..
            }
        ));
    }

    #[test]
    fn snapshot_validator_runs_once_at_the_end() {
        let registry = SchemaRegistry::builder()
            .record_type("camera", MigrationTable::empty())
            .snapshot_validator(|snapshot: &Snapshot| {
                if snapshot.contains("camera:main") {
                    Ok(())
                } else {
                    Err(ValidationError::new("camera:main must exist"))
                }
            })
            .build()
            .unwrap();

        let empty = Snapshot::new();
        let failure = registry
            .migrate_snapshot(&empty, &registry.current_version_vector())
            .unwrap_err();
        assert!(matches!(failure, MigrationFailure::Snapshot { .. }));
    }

    #[test]
    fn source_equal_to_target_is_a_no_op() {
        let registry = registry();
        let snapshot: Snapshot = [record("camera:main", "camera")].into_iter().collect();
        let current = registry.current_version_vector();

        let migrated = registry.migrate_snapshot(&snapshot, &current).unwrap();
        assert_eq!(migrated, snapshot);
    }

    #[test]
    fn migrate_snapshot_to_supports_older_targets() {
        let registry = registry();
        let current = registry.current_version_vector();
        let snapshot: Snapshot = [record("document:doc", "document")].into_iter().collect();

        // Bring the snapshot up, then back down for an older peer.
        let migrated = registry.migrate_snapshot(&snapshot, &source_at_baseline()).unwrap();
        let downgraded = registry
            .migrate_snapshot_to(&migrated, &current, &source_at_baseline())
            .unwrap();

        assert_eq!(downgraded, snapshot);
    }
}
