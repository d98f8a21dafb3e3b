use std::fmt;

use doc_store::{RecordId, ValidationError};

/// Error constructing a migration table or schema registry.
///
/// These indicate a programming error in the declarative tables and are
/// detectable entirely from the static definitions, so callers fail fast at
/// startup (typically with `expect`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// Two migrators were registered for the same version.
    DuplicateVersion {
        /// The doubly-registered version.
        version: u32,
    },
    /// The chain is broken at `version`: either no migrator covers it, or a
    /// migrator was registered outside the table's declared range.
    NonContiguous {
        /// The version at which the chain breaks.
        version: u32,
    },
    /// A record type (or subtype value) was registered twice.
    DuplicateType {
        /// The doubly-registered type or subtype name.
        type_name: String,
    },
    /// The declared range has `first_version > current_version`.
    InvalidRange {
        /// Declared first version.
        first: u32,
        /// Declared current version.
        current: u32,
    },
    /// Subtype tables were registered without naming the discriminant
    /// field, so no record could ever dispatch into them.
    MissingSubtypeKey,
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateVersion { version } => {
                write!(f, "duplicate migrator for v{version}")
            }
            Self::NonContiguous { version } => {
                write!(f, "migration chain is broken at v{version}")
            }
            Self::DuplicateType { type_name } => {
                write!(f, "record type `{type_name}` registered twice")
            }
            Self::InvalidRange { first, current } => {
                write!(f, "invalid version range: first v{first} > current v{current}")
            }
            Self::MissingSubtypeKey => {
                write!(f, "subtype tables registered without a subtype key")
            }
        }
    }
}

impl std::error::Error for RegistrationError {}

/// Error while migrating one value (a record or a whole snapshot).
///
/// Run-time errors occur when loading data written under an incompatible
/// version; they are recoverable at the granularity of one record or one
/// snapshot and never corrupt sibling records.
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationError {
    /// A requested version falls outside the table's
    /// `[first_version, current_version]` range.
    VersionOutOfRange {
        /// The requested version.
        requested: u32,
        /// The table's first version.
        first: u32,
        /// The table's current version.
        current: u32,
    },
    /// A down-migration was requested past a version whose migrator has no
    /// down step (the forward change was irreversible).
    NoPathDown {
        /// The version whose migrator is up-only.
        version: u32,
    },
    /// A record claims a type name (or subtype value) the registry does not
    /// know. Fatal: the running code cannot interpret the record at all.
    UnknownType {
        /// The unrecognized type or subtype name.
        type_name: String,
    },
    /// A migrator's precondition was violated: the value is genuinely
    /// outside the shape the migrator was written for (corrupt or
    /// hand-edited data). Fatal for that record, not retried.
    Unsupported {
        /// The version of the failing migrator.
        version: u32,
        /// What the migrator found.
        reason: String,
    },
    /// The post-migration structural check failed.
    Validation(ValidationError),
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VersionOutOfRange {
                requested,
                first,
                current,
            } => write!(
                f,
                "version v{requested} is outside the registered range v{first}..=v{current}"
            ),
            Self::NoPathDown { version } => {
                write!(f, "no down migration registered for v{version}")
            }
            Self::UnknownType { type_name } if type_name.is_empty() => {
                write!(f, "record carries no type name")
            }
            Self::UnknownType { type_name } => {
                write!(f, "unknown record type `{type_name}`")
            }
            Self::Unsupported { version, reason } => {
                write!(f, "migrator v{version} given an unsupported value: {reason}")
            }
            Self::Validation(err) => write!(f, "validation failed: {err}"),
        }
    }
}

impl std::error::Error for MigrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for MigrationError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

/// Top-level failure of a migration run.
///
/// Carries enough context to tell a snapshot-level failure apart from a
/// failure migrating one particular record.
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationFailure {
    /// The snapshot-level pass (or snapshot validation) failed.
    Snapshot {
        /// The underlying error.
        error: MigrationError,
    },
    /// Migrating or validating one record failed.
    Record {
        /// Id of the failing record.
        id: RecordId,
        /// The underlying error.
        error: MigrationError,
    },
}

impl MigrationFailure {
    /// The underlying [`MigrationError`], regardless of where it occurred.
    #[must_use]
    pub fn error(&self) -> &MigrationError {
        match self {
            Self::Snapshot { error } | Self::Record { error, .. } => error,
        }
    }
}

impl fmt::Display for MigrationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snapshot { error } => write!(f, "snapshot migration failed: {error}"),
            Self::Record { id, error } => {
                write!(f, "migration of record `{id}` failed: {error}")
            }
        }
    }
}

impl std::error::Error for MigrationFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error())
    }
}
