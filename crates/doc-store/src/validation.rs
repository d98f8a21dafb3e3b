use std::fmt;

use crate::{Record, Snapshot};

/// A structural validation error with context about where it occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The record type being validated, if known.
    pub type_name: Option<String>,
    /// The offending field, if the failure is field-level.
    pub field: Option<String>,
    /// Human-readable description of the failure.
    pub message: String,
}

impl ValidationError {
    /// Create an error with a bare message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            type_name: None,
            field: None,
            message: message.into(),
        }
    }

    /// Attach the record type being validated.
    #[must_use]
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Attach the offending field.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ctx = Vec::new();
        if let Some(t) = &self.type_name {
            ctx.push(format!("type={t}"));
        }
        if let Some(field) = &self.field {
            ctx.push(format!("field={field}"));
        }
        if ctx.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "[{}] {}", ctx.join(", "), self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// Post-migration structural check for a single record.
///
/// Validators are external collaborators: the engine never inspects record
/// fields itself, it only promises to call the registered validator after
/// every record finishes migrating. A validator returns the (possibly
/// canonicalized) record on success.
///
/// Plain functions and closures implement this trait directly:
///
/// ```
/// use doc_store::{Record, RecordValidator, ValidationError};
///
/// let require_id = |record: &Record| -> Result<Record, ValidationError> {
///     if record.id().is_none() {
///         return Err(ValidationError::new("record has no id"));
///     }
///     Ok(record.clone())
/// };
///
/// assert!(require_id.validate(&Record::new()).is_err());
/// ```
pub trait RecordValidator: Send + Sync {
    /// Check one record, returning it (or a canonicalized copy) on success.
    fn validate(&self, record: &Record) -> Result<Record, ValidationError>;
}

impl<F> RecordValidator for F
where
    F: Fn(&Record) -> Result<Record, ValidationError> + Send + Sync,
{
    fn validate(&self, record: &Record) -> Result<Record, ValidationError> {
        self(record)
    }
}

/// Post-migration structural check for a whole snapshot.
///
/// Runs once, after every record in the snapshot has been migrated and
/// validated individually. Useful for cross-record invariants (e.g. every
/// singleton type present exactly once).
pub trait SnapshotValidator: Send + Sync {
    /// Check the migrated snapshot.
    fn validate(&self, snapshot: &Snapshot) -> Result<(), ValidationError>;
}

impl<F> SnapshotValidator for F
where
    F: Fn(&Snapshot) -> Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, snapshot: &Snapshot) -> Result<(), ValidationError> {
        self(snapshot)
    }
}
