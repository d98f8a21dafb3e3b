//! Example: Loading an old document after the schema has evolved.

use doc_migrate::{MigrationTable, Migrator, SchemaRegistry, TypeVersions, VersionVector};
use doc_store::{Record, Snapshot};
use serde_json::json;

fn shape_table() -> MigrationTable<Record> {
    MigrationTable::builder(0, 2)
        // v1: every shape gained an `isLocked` field.
        .migrator(Migrator::new(
            1,
            |record: &Record| {
                let mut record = record.clone();
                record.insert("isLocked", json!(false));
                Ok(record)
            },
            |record: &Record| {
                let mut record = record.clone();
                record.remove("isLocked");
                Ok(record)
            },
        ))
        // v2: `props.size` was renamed to `props.scale`.
        .migrator(Migrator::new(
            2,
            |record: &Record| {
                let mut record = record.clone();
                if let Some(props) = record.get_mut("props").and_then(|v| v.as_object_mut()) {
                    if let Some(size) = props.remove("size") {
                        props.insert("scale".into(), size);
                    }
                }
                Ok(record)
            },
            |record: &Record| {
                let mut record = record.clone();
                if let Some(props) = record.get_mut("props").and_then(|v| v.as_object_mut()) {
                    if let Some(scale) = props.remove("scale") {
                        props.insert("size".into(), scale);
                    }
                }
                Ok(record)
            },
        ))
        .build()
        .expect("static migration tables must be well-formed")
}

fn main() {
    let registry = SchemaRegistry::builder()
        .record_type("shape", shape_table())
        .record_type("page", MigrationTable::empty())
        .build()
        .expect("static migration tables must be well-formed");

    // A document persisted two schema versions ago, tagged with the
    // version vector its writer was running.
    let old_document: Snapshot = [
        Record::from_value(json!({
            "id": "page:main",
            "typeName": "page",
            "name": "Page 1",
        }))
        .unwrap(),
        Record::from_value(json!({
            "id": "shape:box",
            "typeName": "shape",
            "props": { "size": 2, "color": "blue" },
        }))
        .unwrap(),
    ]
    .into_iter()
    .collect();

    let written_at = VersionVector::new(0)
        .with_type("shape", TypeVersions::new(0))
        .with_type("page", TypeVersions::new(0));

    println!("Document needs migration: {}", registry.needs_migration(&written_at));

    let migrated = registry
        .migrate_snapshot(&old_document, &written_at)
        .expect("migration of a well-formed old document succeeds");

    let shape = migrated.get("shape:box").unwrap();
    println!("\nMigrated shape:");
    println!("{}", serde_json::to_string_pretty(shape.as_map()).unwrap());

    // The same document can be handed back to an older peer.
    let downgraded = registry
        .migrate_snapshot_to(&migrated, &registry.current_version_vector(), &written_at)
        .expect("every migrator in this schema has a down step");

    let shape = downgraded.get("shape:box").unwrap();
    println!("\nDowngraded back for an old client:");
    println!("{}", serde_json::to_string_pretty(shape.as_map()).unwrap());
}
