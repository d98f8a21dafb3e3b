use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The version state of one record type: its root version plus, for
/// polymorphic types, one independent version per subtype value.
///
/// Subtype version counters are independent of each other and of the root:
/// bumping the `"arrow"` subtype never moves the `"geo"` subtype.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeVersions {
    /// The root table's version (fields shared by all subtypes).
    pub version: u32,
    /// The discriminant field name, when the type is polymorphic.
    #[serde(
        rename = "subTypeKey",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub subtype_key: Option<String>,
    /// Per-subtype-value versions, keyed by discriminant value.
    #[serde(
        rename = "subTypeVersions",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub subtype_versions: BTreeMap<String, u32>,
}

impl TypeVersions {
    /// A monomorphic type at `version`.
    pub fn new(version: u32) -> Self {
        Self {
            version,
            subtype_key: None,
            subtype_versions: BTreeMap::new(),
        }
    }

    /// Set the discriminant field name.
    #[must_use]
    pub fn with_subtype_key(mut self, key: impl Into<String>) -> Self {
        self.subtype_key = Some(key.into());
        self
    }

    /// Record a subtype value's version.
    #[must_use]
    pub fn with_subtype(mut self, value: impl Into<String>, version: u32) -> Self {
        self.subtype_versions.insert(value.into(), version);
        self
    }
}

/// The persisted version tag: a mapping from every versioned namespace
/// (the snapshot itself, each record type, each subtype value) to the
/// integer version a value was written under.
///
/// The tag accompanies every stored snapshot and is the source of truth
/// for *where a value currently is*; the registry only knows where the
/// running code expects values to be. The serialized form uses the same
/// camelCase field names the tag is persisted with:
///
/// ```json
/// {
///   "snapshotVersion": 2,
///   "recordVersions": {
///     "shape": {
///       "version": 1,
///       "subTypeKey": "type",
///       "subTypeVersions": { "geo": 1, "arrow": 0 }
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionVector {
    /// Version of the snapshot-level migration table.
    #[serde(rename = "snapshotVersion")]
    pub snapshot_version: u32,
    /// Version state per record type name.
    #[serde(rename = "recordVersions", default)]
    pub record_versions: BTreeMap<String, TypeVersions>,
}

impl VersionVector {
    /// Create a vector with the given snapshot version and no record types.
    pub fn new(snapshot_version: u32) -> Self {
        Self {
            snapshot_version,
            record_versions: BTreeMap::new(),
        }
    }

    /// Record a type's version state.
    #[must_use]
    pub fn with_type(mut self, type_name: impl Into<String>, versions: TypeVersions) -> Self {
        self.record_versions.insert(type_name.into(), versions);
        self
    }

    /// The version state for a type, if the tag knows it.
    #[must_use]
    pub fn type_versions(&self, type_name: &str) -> Option<&TypeVersions> {
        self.record_versions.get(type_name)
    }
}
