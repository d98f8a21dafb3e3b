//! # doc-store
//!
//! The record/snapshot data model for a versioned, record-oriented document
//! store.
//!
//! A document is a [`Snapshot`]: a mapping from [`RecordId`] to [`Record`].
//! Records are untyped JSON objects carrying at least an `id` and a
//! `typeName` field; everything else is a matter between the application's
//! declarative record definitions and the migration engine that brings
//! persisted documents forward (or backward) across schema versions.
//!
//! This crate also defines the validation seam: [`RecordValidator`] and
//! [`SnapshotValidator`] are the hooks a migration runner calls after
//! migrating a value, with [`ValidationError`] carrying the structured
//! failure.
//!
//! ## Quick Start
//!
//! ```
//! use doc_store::{Record, Snapshot};
//! use serde_json::json;
//!
//! let shape = Record::from_value(json!({
//!     "id": "shape:1",
//!     "typeName": "shape",
//!     "type": "geo",
//! }))
//! .unwrap();
//!
//! let snapshot: Snapshot = [shape].into_iter().collect();
//! assert!(snapshot.contains("shape:1"));
//! ```

#![warn(missing_docs)]

mod record;
mod snapshot;
mod validation;

pub use record::{Record, RecordId};
pub use snapshot::Snapshot;
pub use validation::{RecordValidator, SnapshotValidator, ValidationError};
