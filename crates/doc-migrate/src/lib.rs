//! # doc-migrate
//!
//! Versioned schema migrations for record-oriented document stores built on
//! [`doc-store`](doc_store).
//!
//! When a document's schema evolves between application versions,
//! `doc-migrate` brings persisted snapshots forward to the shape the
//! running code expects — or backward to an older shape for
//! interoperability with older peers.
//!
//! ## How It Works
//!
//! 1. Every record type declares an ordered, gap-free chain of
//!    [`Migrator`]s in a [`MigrationTable`]; the collection as a whole
//!    declares its own snapshot-level table whose migrators can add,
//!    remove, or restructure entire record types.
//! 2. All tables are gathered into a [`SchemaRegistry`] at startup; the
//!    registry's [`current_version_vector`](SchemaRegistry::current_version_vector)
//!    is derived entirely from the tables, so it can never drift from them.
//! 3. A persisted snapshot arrives tagged with the [`VersionVector`] it was
//!    written under. [`migrate_snapshot`](SchemaRegistry::migrate_snapshot)
//!    runs the snapshot-level chain first, then each record's own chain
//!    (dispatching through subtype tables for polymorphic types), then the
//!    registered validators.
//!
//! ## Key Concepts
//!
//! - **Linear chains**: migrations run v1→v2→v3→…, never skipping steps,
//!   with up and down never mixed within one namespace.
//! - **Pure steps**: migrators borrow their input and return a new value;
//!   two runs over the same data produce identical results.
//! - **The tag is the truth**: the persisted [`VersionVector`] says where a
//!   value *is*; the registry only says where current code expects it to be.
//! - **Policy at the edges**: what to do with a record that fails migration
//!   or validation is the caller's call, via [`FailureHandler`].
//!
//! ## Quick Start
//!
//! ```
//! use doc_migrate::{MigrationTable, Migrator, SchemaRegistry, VersionVector, TypeVersions};
//! use doc_store::{Record, Snapshot};
//! use serde_json::json;
//!
//! // v1 adds a `name` field to document records.
//! let documents = MigrationTable::builder(0, 1)
//!     .migrator(Migrator::new(
//!         1,
//!         |r: &Record| {
//!             let mut r = r.clone();
//!             r.insert("name", json!(""));
//!             Ok(r)
//!         },
//!         |r: &Record| {
//!             let mut r = r.clone();
//!             r.remove("name");
//!             Ok(r)
//!         },
//!     ))
//!     .build()
//!     .unwrap();
//!
//! let registry = SchemaRegistry::builder()
//!     .record_type("document", documents)
//!     .build()
//!     .unwrap();
//!
//! let snapshot: Snapshot = [Record::from_value(json!({
//!     "id": "document:doc",
//!     "typeName": "document",
//! }))
//! .unwrap()]
//! .into_iter()
//! .collect();
//!
//! // The snapshot was written before documents had names.
//! let source = VersionVector::new(0).with_type("document", TypeVersions::new(0));
//! let migrated = registry.migrate_snapshot(&snapshot, &source).unwrap();
//!
//! assert_eq!(
//!     migrated.get("document:doc").unwrap().get("name"),
//!     Some(&json!(""))
//! );
//! ```

#![warn(missing_docs)]

mod error;
mod migrator;
mod registry;
mod runner;
mod table;
mod vector;

pub use error::{MigrationError, MigrationFailure, RegistrationError};
pub use migrator::{Migrator, StepFn};
pub use registry::{SchemaRegistry, SchemaRegistryBuilder};
pub use runner::{FailureHandler, FailurePolicy};
pub use table::{MigrationTable, MigrationTableBuilder};
pub use vector::{TypeVersions, VersionVector};
