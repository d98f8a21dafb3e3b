use std::fmt;
use std::sync::Arc;

use crate::MigrationError;

/// A single migration step function.
///
/// Steps borrow their input and return a fresh value, so a migrator can
/// never mutate the stored value it was given — the same persisted record
/// may be migrated along multiple paths or re-validated afterward.
pub type StepFn<T> = Arc<dyn Fn(&T) -> Result<T, MigrationError> + Send + Sync>;

/// A single `{version, up, down}` transformation for one entity shape.
///
/// `up` transforms a value written at `version - 1` into one valid at
/// `version`; `down` is its inverse. Both must be pure: no I/O, no
/// mutation of the argument (enforced by the `&T -> T` signature), and
/// deterministic.
///
/// `down` may be omitted with [`Migrator::one_way`] when the forward change
/// is irreversible; down-migration across such a version fails with
/// [`MigrationError::NoPathDown`]. A *lossy but still reversible-in-shape*
/// migrator should instead provide a `down` that substitutes a documented
/// sentinel value — losing information deliberately is a policy, not an
/// error.
///
/// # Example
///
/// ```
/// use doc_migrate::Migrator;
/// use doc_store::Record;
/// use serde_json::json;
///
/// let add_is_locked = Migrator::new(
///     1,
///     |record: &Record| {
///         let mut record = record.clone();
///         record.insert("isLocked", json!(false));
///         Ok(record)
///     },
///     |record: &Record| {
///         let mut record = record.clone();
///         record.remove("isLocked");
///         Ok(record)
///     },
/// );
/// assert_eq!(add_is_locked.version(), 1);
/// assert!(add_is_locked.has_down());
/// ```
pub struct Migrator<T> {
    version: u32,
    up: StepFn<T>,
    down: Option<StepFn<T>>,
}

impl<T> Migrator<T> {
    /// Create a migrator with both directions.
    pub fn new<U, D>(version: u32, up: U, down: D) -> Self
    where
        U: Fn(&T) -> Result<T, MigrationError> + Send + Sync + 'static,
        D: Fn(&T) -> Result<T, MigrationError> + Send + Sync + 'static,
    {
        Self {
            version,
            up: Arc::new(up),
            down: Some(Arc::new(down)),
        }
    }

    /// Create an up-only migrator for an irreversible structural change.
    pub fn one_way<U>(version: u32, up: U) -> Self
    where
        U: Fn(&T) -> Result<T, MigrationError> + Send + Sync + 'static,
    {
        Self {
            version,
            up: Arc::new(up),
            down: None,
        }
    }

    /// The version this migrator produces when run upward.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Whether this migrator can run downward.
    #[must_use]
    pub fn has_down(&self) -> bool {
        self.down.is_some()
    }

    /// Transform a value valid at `version - 1` into one valid at `version`.
    pub fn up(&self, value: &T) -> Result<T, MigrationError> {
        (self.up)(value)
    }

    /// Transform a value valid at `version` into one valid at `version - 1`.
    pub fn down(&self, value: &T) -> Result<T, MigrationError> {
        match &self.down {
            Some(down) => down(value),
            None => Err(MigrationError::NoPathDown {
                version: self.version,
            }),
        }
    }
}

impl<T> Clone for Migrator<T> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            up: Arc::clone(&self.up),
            down: self.down.as_ref().map(Arc::clone),
        }
    }
}

impl<T> fmt::Debug for Migrator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migrator")
            .field("version", &self.version)
            .field("has_down", &self.down.is_some())
            .finish()
    }
}
