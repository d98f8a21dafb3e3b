use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use doc_store::{Record, RecordValidator, Snapshot, SnapshotValidator};

use crate::runner::{AbortOnFailure, FailureHandler};
use crate::{MigrationTable, RegistrationError, VersionVector};

/// The aggregate schema of a document store: one migration table per record
/// type, one table for snapshot-level changes, plus the validation hooks.
///
/// A registry is built once at process start from the caller-supplied
/// declarative definitions and is immutable (and freely shareable across
/// threads) thereafter. Its notion of "current" is always the maximum
/// version reachable via the registered migrators — there is no separately
/// declared current version that could drift from the table contents.
///
/// # Example
///
/// ```
/// use doc_migrate::{MigrationTable, SchemaRegistry};
///
/// let registry = SchemaRegistry::builder()
///     .record_type("camera", MigrationTable::empty())
///     .record_type("page", MigrationTable::empty())
///     .build()
///     .expect("static migration tables must be well-formed");
///
/// let current = registry.current_version_vector();
/// assert_eq!(current.snapshot_version, 0);
/// assert_eq!(current.type_versions("camera").unwrap().version, 0);
/// ```
pub struct SchemaRegistry {
    pub(crate) record_tables: BTreeMap<String, MigrationTable<Record>>,
    pub(crate) snapshot_table: MigrationTable<Snapshot>,
    pub(crate) validators: BTreeMap<String, Arc<dyn RecordValidator>>,
    pub(crate) snapshot_validator: Option<Arc<dyn SnapshotValidator>>,
    pub(crate) failure_handler: Arc<dyn FailureHandler>,
}

impl SchemaRegistry {
    /// Start building a registry.
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder {
            record_tables: Vec::new(),
            snapshot_tables: Vec::new(),
            validators: Vec::new(),
            snapshot_validator: None,
            failure_handler: Arc::new(AbortOnFailure),
        }
    }

    /// The migration table registered for a record type.
    #[must_use]
    pub fn table(&self, type_name: &str) -> Option<&MigrationTable<Record>> {
        self.record_tables.get(type_name)
    }

    /// The snapshot-level migration table.
    #[must_use]
    pub fn snapshot_table(&self) -> &MigrationTable<Snapshot> {
        &self.snapshot_table
    }

    /// Registered record type names, in sorted order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.record_tables.keys().map(String::as_str)
    }

    /// The version vector the running code expects, derived entirely from
    /// the registered tables.
    #[must_use]
    pub fn current_version_vector(&self) -> VersionVector {
        VersionVector {
            snapshot_version: self.snapshot_table.current_version(),
            record_versions: self
                .record_tables
                .iter()
                .map(|(name, table)| (name.clone(), table.versions()))
                .collect(),
        }
    }

    /// Whether a value tagged with `source` needs any migration at all.
    #[must_use]
    pub fn needs_migration(&self, source: &VersionVector) -> bool {
        *source != self.current_version_vector()
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("record_tables", &self.record_tables)
            .field("snapshot_table", &self.snapshot_table)
            .field("validators", &self.validators.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`SchemaRegistry`].
///
/// Registration-time failures (`DuplicateType`) are programming errors in
/// the declarative tables; `build` reports them so startup code can fail
/// fast.
pub struct SchemaRegistryBuilder {
    record_tables: Vec<(String, MigrationTable<Record>)>,
    snapshot_tables: Vec<MigrationTable<Snapshot>>,
    validators: Vec<(String, Arc<dyn RecordValidator>)>,
    snapshot_validator: Option<Arc<dyn SnapshotValidator>>,
    failure_handler: Arc<dyn FailureHandler>,
}

impl SchemaRegistryBuilder {
    /// Register one record type's migration table.
    #[must_use]
    pub fn record_type(
        mut self,
        type_name: impl Into<String>,
        table: MigrationTable<Record>,
    ) -> Self {
        self.record_tables.push((type_name.into(), table));
        self
    }

    /// Register the snapshot-level migration table.
    ///
    /// Defaults to a baseline (v0, empty) table when never called.
    #[must_use]
    pub fn snapshot_migrations(mut self, table: MigrationTable<Snapshot>) -> Self {
        self.snapshot_tables.push(table);
        self
    }

    /// Register the post-migration validator for a record type.
    #[must_use]
    pub fn validator(
        mut self,
        type_name: impl Into<String>,
        validator: impl RecordValidator + 'static,
    ) -> Self {
        self.validators.push((type_name.into(), Arc::new(validator)));
        self
    }

    /// Register a whole-snapshot validator, run once after a full migration.
    #[must_use]
    pub fn snapshot_validator(mut self, validator: impl SnapshotValidator + 'static) -> Self {
        self.snapshot_validator = Some(Arc::new(validator));
        self
    }

    /// Set the policy handler consulted on per-record failures.
    ///
    /// The default handler aborts the whole run on any failure.
    #[must_use]
    pub fn failure_handler(mut self, handler: impl FailureHandler + 'static) -> Self {
        self.failure_handler = Arc::new(handler);
        self
    }

    /// Validate and build the registry.
    pub fn build(self) -> Result<SchemaRegistry, RegistrationError> {
        let mut record_tables = BTreeMap::new();
        for (type_name, table) in self.record_tables {
            if record_tables.insert(type_name.clone(), table).is_some() {
                return Err(RegistrationError::DuplicateType { type_name });
            }
        }

        let mut snapshot_tables = self.snapshot_tables;
        if snapshot_tables.len() > 1 {
            return Err(RegistrationError::DuplicateType {
                type_name: "snapshot".into(),
            });
        }
        let snapshot_table = snapshot_tables.pop().unwrap_or_else(MigrationTable::empty);

        let mut validators = BTreeMap::new();
        for (type_name, validator) in self.validators {
            if validators.insert(type_name.clone(), validator).is_some() {
                return Err(RegistrationError::DuplicateType { type_name });
            }
        }

        Ok(SchemaRegistry {
            record_tables,
            snapshot_table,
            validators,
            snapshot_validator: self.snapshot_validator,
            failure_handler: self.failure_handler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Migrator;
    use serde_json::json;

    fn noop_migrator(version: u32) -> Migrator<Record> {
        Migrator::new(
            version,
            |record: &Record| Ok(record.clone()),
            |record: &Record| Ok(record.clone()),
        )
    }

    #[test]
    fn duplicate_type_fails() {
        let result = SchemaRegistry::builder()
            .record_type("camera", MigrationTable::empty())
            .record_type("camera", MigrationTable::empty())
            .build();
        assert_eq!(
            result.unwrap_err(),
            RegistrationError::DuplicateType {
                type_name: "camera".into()
            }
        );
    }

    #[test]
    fn duplicate_snapshot_table_fails() {
        let result = SchemaRegistry::builder()
            .snapshot_migrations(MigrationTable::empty())
            .snapshot_migrations(MigrationTable::empty())
            .build();
        assert!(matches!(
            result.unwrap_err(),
            RegistrationError::DuplicateType { .. }
        ));
    }

    #[test]
    fn current_vector_is_a_pure_projection() {
        let registry = SchemaRegistry::builder()
            .record_type("camera", MigrationTable::empty())
            .record_type(
                "document",
                MigrationTable::builder(0, 2)
                    .migrator(noop_migrator(1))
                    .migrator(noop_migrator(2))
                    .build()
                    .unwrap(),
            )
            .record_type(
                "shape",
                MigrationTable::builder(0, 1)
                    .migrator(noop_migrator(1))
                    .subtype_key("type")
                    .subtype("geo", MigrationTable::empty())
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        let current = registry.current_version_vector();
        assert_eq!(current.snapshot_version, 0);
        assert_eq!(current.type_versions("camera").unwrap().version, 0);
        assert_eq!(current.type_versions("document").unwrap().version, 2);

        let shape = current.type_versions("shape").unwrap();
        assert_eq!(shape.version, 1);
        assert_eq!(shape.subtype_key.as_deref(), Some("type"));
        assert_eq!(shape.subtype_versions.get("geo"), Some(&0));
    }

    #[test]
    fn needs_migration_compares_vectors() {
        let registry = SchemaRegistry::builder()
            .record_type(
                "document",
                MigrationTable::builder(0, 1)
                    .migrator(noop_migrator(1))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        assert!(!registry.needs_migration(&registry.current_version_vector()));
        assert!(registry.needs_migration(&VersionVector::new(0)));
    }

    #[test]
    fn registry_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SchemaRegistry>();
    }

    #[test]
    fn validators_are_recorded_per_type() {
        let registry = SchemaRegistry::builder()
            .record_type("camera", MigrationTable::empty())
            .validator("camera", |record: &Record| {
                if record.get("x").is_some() {
                    Ok(record.clone())
                } else {
                    Err(doc_store::ValidationError::new("camera requires x").with_type("camera"))
                }
            })
            .build()
            .unwrap();

        let validator = registry.validators.get("camera").unwrap();
        let good = Record::from_value(json!({ "x": 0 })).unwrap();
        assert!(validator.validate(&good).is_ok());
    }
}
