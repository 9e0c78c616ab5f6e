use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use rosterd::backup;
use rosterd::roster::{Roster, SeedPolicy};
use rosterd::store::JsonFileStore;

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

#[test]
fn zip_export_and_import_roundtrip() {
    let workspace = temp_dir("rosterd-backup-src");
    let workspace2 = temp_dir("rosterd-backup-dst");
    let out_dir = temp_dir("rosterd-backup-out");

    let store = JsonFileStore::open(&workspace).expect("open store");
    let mut roster = Roster::open(Box::new(store), SeedPolicy::SampleData).expect("open roster");
    roster.delete_student("STU002").expect("delete");
    let students = roster.students().to_vec();
    let grades = roster.grades().to_vec();
    drop(roster);

    let bundle_path = out_dir.join("roster.backup.zip");
    let export = backup::export_roster_bundle(&workspace, &bundle_path).expect("export bundle");
    assert_eq!(export.bundle_format, backup::BUNDLE_FORMAT_V1);
    assert_eq!(export.entry_count, 3);

    let f = File::open(&bundle_path).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    assert!(manifest.contains(backup::BUNDLE_FORMAT_V1));
    assert!(manifest.contains("checksums"));
    archive
        .by_name("data/students.json")
        .expect("students entry in bundle");
    archive
        .by_name("data/grades.json")
        .expect("grades entry in bundle");

    let import = backup::import_roster_bundle(&bundle_path, &workspace2).expect("import bundle");
    assert_eq!(import.bundle_format_detected, backup::BUNDLE_FORMAT_V1);
    assert_eq!(import.collections_restored, 2);

    let store = JsonFileStore::open(&workspace2).expect("open restored store");
    let restored = Roster::open(Box::new(store), SeedPolicy::Empty).expect("open restored roster");
    assert_eq!(restored.students(), students.as_slice());
    assert_eq!(restored.grades(), grades.as_slice());

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(workspace2);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn corrupted_bundle_entries_are_rejected() {
    let workspace = temp_dir("rosterd-backup-corrupt-src");
    let workspace2 = temp_dir("rosterd-backup-corrupt-dst");
    let out_dir = temp_dir("rosterd-backup-corrupt-out");

    let store = JsonFileStore::open(&workspace).expect("open store");
    let _ = Roster::open(Box::new(store), SeedPolicy::SampleData).expect("open roster");

    let bundle_path = out_dir.join("roster.backup.zip");
    backup::export_roster_bundle(&workspace, &bundle_path).expect("export bundle");

    // Rewrite the bundle with a tampered students entry but the original
    // manifest. Import must refuse it on the checksum check.
    let tampered_path = out_dir.join("roster.tampered.zip");
    {
        let f = File::open(&bundle_path).expect("open bundle");
        let mut archive = zip::ZipArchive::new(f).expect("open archive");
        let mut manifest = String::new();
        archive
            .by_name("manifest.json")
            .expect("manifest")
            .read_to_string(&mut manifest)
            .expect("read manifest");
        let mut grades = String::new();
        archive
            .by_name("data/grades.json")
            .expect("grades")
            .read_to_string(&mut grades)
            .expect("read grades");

        let out = File::create(&tampered_path).expect("create tampered bundle");
        let mut writer = zip::ZipWriter::new(out);
        let opts = zip::write::FileOptions::default();
        use std::io::Write;
        writer.start_file("manifest.json", opts).expect("start");
        writer.write_all(manifest.as_bytes()).expect("write");
        writer.start_file("data/students.json", opts).expect("start");
        writer.write_all(b"[]").expect("write");
        writer.start_file("data/grades.json", opts).expect("start");
        writer.write_all(grades.as_bytes()).expect("write");
        writer.finish().expect("finish");
    }

    let err = backup::import_roster_bundle(&tampered_path, &workspace2)
        .expect_err("tampered bundle must fail");
    assert!(err.to_string().contains("checksum mismatch"));
    // Nothing was restored.
    assert!(!workspace2.join("students.json").exists());

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(workspace2);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn bad_later_entry_does_not_restore_earlier_entries() {
    let workspace = temp_dir("rosterd-backup-late-src");
    let workspace2 = temp_dir("rosterd-backup-late-dst");
    let out_dir = temp_dir("rosterd-backup-late-out");

    let store = JsonFileStore::open(&workspace).expect("open store");
    let _ = Roster::open(Box::new(store), SeedPolicy::SampleData).expect("open roster");

    let bundle_path = out_dir.join("roster.backup.zip");
    backup::export_roster_bundle(&workspace, &bundle_path).expect("export bundle");

    // Keep the students entry intact and tamper with the grades entry,
    // which imports after it. The earlier entry must not land either.
    let tampered_path = out_dir.join("roster.tampered.zip");
    {
        let f = File::open(&bundle_path).expect("open bundle");
        let mut archive = zip::ZipArchive::new(f).expect("open archive");
        let mut manifest = String::new();
        archive
            .by_name("manifest.json")
            .expect("manifest")
            .read_to_string(&mut manifest)
            .expect("read manifest");
        let mut students = String::new();
        archive
            .by_name("data/students.json")
            .expect("students")
            .read_to_string(&mut students)
            .expect("read students");

        let out = File::create(&tampered_path).expect("create tampered bundle");
        let mut writer = zip::ZipWriter::new(out);
        let opts = zip::write::FileOptions::default();
        use std::io::Write;
        writer.start_file("manifest.json", opts).expect("start");
        writer.write_all(manifest.as_bytes()).expect("write");
        writer.start_file("data/students.json", opts).expect("start");
        writer.write_all(students.as_bytes()).expect("write");
        writer.start_file("data/grades.json", opts).expect("start");
        writer.write_all(b"[]").expect("write");
        writer.finish().expect("finish");
    }

    let err = backup::import_roster_bundle(&tampered_path, &workspace2)
        .expect_err("tampered bundle must fail");
    assert!(err.to_string().contains("checksum mismatch"));
    assert!(!workspace2.join("students.json").exists());
    assert!(!workspace2.join("grades.json").exists());

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(workspace2);
    let _ = std::fs::remove_dir_all(out_dir);
}
