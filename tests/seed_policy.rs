use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use rosterd::roster::{Roster, SeedPolicy};
use rosterd::store::{JsonFileStore, MemoryStore};

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
fn sample_data_policy_populates_a_fresh_roster() {
    let roster =
        Roster::open(Box::new(MemoryStore::new()), SeedPolicy::SampleData).expect("open roster");
    assert_eq!(roster.students().len(), 4);
    assert_eq!(roster.grades().len(), 8);

    let ids: Vec<&str> = roster.students().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["STU001", "STU002", "STU003", "STU004"]);
    assert!(roster.grades().iter().all(|g| ids.contains(&g.student_id.as_str())));
}

#[test]
fn empty_policy_stays_empty() {
    let roster =
        Roster::open(Box::new(MemoryStore::new()), SeedPolicy::Empty).expect("open roster");
    assert!(roster.students().is_empty());
    assert!(roster.grades().is_empty());
}

#[test]
fn seed_is_persisted_and_never_reapplied() {
    let workspace = temp_dir("rosterd-seed");

    let store = JsonFileStore::open(&workspace).expect("open store");
    let mut roster = Roster::open(Box::new(store), SeedPolicy::SampleData).expect("open roster");
    roster.delete_student("STU004").expect("delete");
    drop(roster);

    // Reopening with the seed policy must not resurrect deleted records:
    // the collection is non-empty, so the policy does not apply.
    let store = JsonFileStore::open(&workspace).expect("reopen store");
    let reloaded = Roster::open(Box::new(store), SeedPolicy::SampleData).expect("reopen roster");
    assert_eq!(reloaded.students().len(), 3);
    assert!(reloaded.student("STU004").is_none());

    let _ = std::fs::remove_dir_all(workspace);
}
