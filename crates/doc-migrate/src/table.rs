use std::collections::BTreeMap;
use std::fmt;

use doc_store::Record;

use crate::{MigrationError, Migrator, RegistrationError, TypeVersions};

/// An ordered, gap-free collection of [`Migrator`]s for one logical entity
/// (a record type, or the whole-snapshot pseudo-entity), bounded by a first
/// and current version.
///
/// Invariants, enforced at construction:
///
/// - `first_version <= current_version`;
/// - every version in `(first_version, current_version]` has exactly one
///   migrator; `first_version` itself has none (it is the implicit
///   baseline).
///
/// A table for a polymorphic record type additionally names a discriminant
/// field (`subtype_key`) and carries one nested table per subtype value,
/// each with its own independent version counter.
///
/// # Example
///
/// ```
/// use doc_migrate::{MigrationTable, Migrator};
/// use doc_store::Record;
/// use serde_json::json;
///
/// let table: MigrationTable<Record> = MigrationTable::builder(0, 1)
///     .migrator(Migrator::new(
///         1,
///         |r: &Record| {
///             let mut r = r.clone();
///             r.insert("name", json!(""));
///             Ok(r)
///         },
///         |r: &Record| {
///             let mut r = r.clone();
///             r.remove("name");
///             Ok(r)
///         },
///     ))
///     .build()
///     .unwrap();
///
/// let old = Record::from_value(json!({ "id": "document:doc" })).unwrap();
/// let new = table.migrate(&old, 0, 1).unwrap();
/// assert_eq!(new.get("name"), Some(&json!("")));
/// ```
pub struct MigrationTable<T> {
    first_version: u32,
    current_version: u32,
    migrators: BTreeMap<u32, Migrator<T>>,
    subtype_key: Option<String>,
    subtypes: BTreeMap<String, MigrationTable<T>>,
}

impl<T> MigrationTable<T> {
    /// Start building a table spanning `[first, current]`.
    pub fn builder(first: u32, current: u32) -> MigrationTableBuilder<T> {
        MigrationTableBuilder {
            first_version: first,
            current_version: current,
            migrators: Vec::new(),
            subtype_key: None,
            subtypes: Vec::new(),
        }
    }

    /// A baseline table: `first_version == current_version == 0`, no
    /// migrators. Every type starts its life with one of these.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            first_version: 0,
            current_version: 0,
            migrators: BTreeMap::new(),
            subtype_key: None,
            subtypes: BTreeMap::new(),
        }
    }

    /// The implicit baseline version.
    #[must_use]
    pub fn first_version(&self) -> u32 {
        self.first_version
    }

    /// The version the running code expects.
    #[must_use]
    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    /// The discriminant field name, when this table is polymorphic.
    #[must_use]
    pub fn subtype_key(&self) -> Option<&str> {
        self.subtype_key.as_deref()
    }

    /// The nested table for a subtype value.
    #[must_use]
    pub fn subtype(&self, value: &str) -> Option<&MigrationTable<T>> {
        self.subtypes.get(value)
    }

    /// Project this table's current version state, including subtypes.
    #[must_use]
    pub fn versions(&self) -> TypeVersions {
        TypeVersions {
            version: self.current_version,
            subtype_key: self.subtype_key.clone(),
            subtype_versions: self
                .subtypes
                .iter()
                .map(|(value, table)| (value.clone(), table.current_version))
                .collect(),
        }
    }

    fn check_range(&self, version: u32) -> Result<(), MigrationError> {
        if version < self.first_version || version > self.current_version {
            return Err(MigrationError::VersionOutOfRange {
                requested: version,
                first: self.first_version,
                current: self.current_version,
            });
        }
        Ok(())
    }
}

impl<T: Clone> MigrationTable<T> {
    /// Apply every migrator strictly between `from` and `to`, feeding each
    /// step's output to the next.
    ///
    /// `from < to` runs up-migrators in ascending order; `from > to` runs
    /// down-migrators in descending order; `from == to` is the identity.
    /// Up and down are never mixed in one call.
    ///
    /// For a polymorphic table this covers the *root* chain only; use
    /// [`MigrationTable::migrate_record`] to also dispatch through the
    /// subtype tables.
    pub fn migrate(&self, value: &T, from: u32, to: u32) -> Result<T, MigrationError> {
        self.check_range(from)?;
        self.check_range(to)?;

        let mut current = value.clone();
        if from < to {
            for (_, migrator) in self.migrators.range(from + 1..=to) {
                current = migrator.up(&current)?;
            }
        } else if from > to {
            for (_, migrator) in self.migrators.range(to + 1..=from).rev() {
                current = migrator.down(&current)?;
            }
        }
        Ok(current)
    }
}

impl MigrationTable<Record> {
    /// Migrate a record through the root chain and then, for polymorphic
    /// tables, through the subtype table named by its discriminant.
    ///
    /// The root chain runs fully first: shared-envelope migrators may
    /// rewrite the discriminant itself, and the subtype dispatched on is
    /// the (possibly now up-to-date) value. Subtype ranges are read from
    /// `from`/`to` independently of the root range; a subtype value absent
    /// from `from` is taken to already be at its target version (such
    /// records can only have been synthesized during the snapshot-level
    /// pass).
    ///
    /// Fails with [`MigrationError::UnknownType`] when the record's
    /// discriminant names a subtype the table does not carry — an
    /// unmigratable record must never pass through silently.
    pub fn migrate_record(
        &self,
        record: &Record,
        from: &TypeVersions,
        to: &TypeVersions,
    ) -> Result<Record, MigrationError> {
        let migrated = self.migrate(record, from.version, to.version)?;

        let Some(key) = &self.subtype_key else {
            return Ok(migrated);
        };

        let discriminant = migrated
            .discriminant(key)
            .ok_or_else(|| MigrationError::Unsupported {
                version: to.version,
                reason: format!("record has no `{key}` discriminant field"),
            })?
            .to_owned();

        let subtable = self
            .subtypes
            .get(&discriminant)
            .ok_or_else(|| MigrationError::UnknownType {
                type_name: discriminant.clone(),
            })?;

        let sub_to = match to.subtype_versions.get(&discriminant) {
            Some(&version) => version,
            None => {
                return Err(MigrationError::UnknownType {
                    type_name: discriminant,
                })
            }
        };
        let sub_from = from
            .subtype_versions
            .get(&discriminant)
            .copied()
            .unwrap_or(sub_to);

        subtable.migrate(&migrated, sub_from, sub_to)
    }
}

impl<T> fmt::Debug for MigrationTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationTable")
            .field("first_version", &self.first_version)
            .field("current_version", &self.current_version)
            .field("migrators", &self.migrators.len())
            .field("subtype_key", &self.subtype_key)
            .field("subtypes", &self.subtypes.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`MigrationTable`]. Validation happens in
/// [`build`](MigrationTableBuilder::build): duplicate versions, gaps in the
/// chain, migrators outside the declared range, duplicate subtype values,
/// and subtype tables without a discriminant key are all registration
/// errors.
pub struct MigrationTableBuilder<T> {
    first_version: u32,
    current_version: u32,
    migrators: Vec<Migrator<T>>,
    subtype_key: Option<String>,
    subtypes: Vec<(String, MigrationTable<T>)>,
}

impl<T> MigrationTableBuilder<T> {
    /// Register a migrator.
    #[must_use]
    pub fn migrator(mut self, migrator: Migrator<T>) -> Self {
        self.migrators.push(migrator);
        self
    }

    /// Declare the discriminant field for a polymorphic record type.
    #[must_use]
    pub fn subtype_key(mut self, key: impl Into<String>) -> Self {
        self.subtype_key = Some(key.into());
        self
    }

    /// Register the nested table for one subtype value.
    #[must_use]
    pub fn subtype(mut self, value: impl Into<String>, table: MigrationTable<T>) -> Self {
        self.subtypes.push((value.into(), table));
        self
    }

    /// Validate and build the table.
    pub fn build(self) -> Result<MigrationTable<T>, RegistrationError> {
        let (first, current) = (self.first_version, self.current_version);
        if first > current {
            return Err(RegistrationError::InvalidRange { first, current });
        }

        let mut migrators = BTreeMap::new();
        for migrator in self.migrators {
            let version = migrator.version();
            if version <= first || version > current {
                return Err(RegistrationError::NonContiguous { version });
            }
            if migrators.insert(version, migrator).is_some() {
                return Err(RegistrationError::DuplicateVersion { version });
            }
        }
        for version in first + 1..=current {
            if !migrators.contains_key(&version) {
                return Err(RegistrationError::NonContiguous { version });
            }
        }

        let mut subtypes = BTreeMap::new();
        for (value, table) in self.subtypes {
            if subtypes.insert(value.clone(), table).is_some() {
                return Err(RegistrationError::DuplicateType { type_name: value });
            }
        }
        // A subtype table is unreachable without a discriminant key; that
        // would let records slip through with their subtype chain unrun.
        if self.subtype_key.is_none() && !subtypes.is_empty() {
            return Err(RegistrationError::MissingSubtypeKey);
        }

        Ok(MigrationTable {
            first_version: first,
            current_version: current,
            migrators,
            subtype_key: self.subtype_key,
            subtypes,
        })
    }
}
