use chrono::NaiveDate;

use rosterd::calc::{DEFAULT_AT_RISK_THRESHOLD, DEFAULT_BAND_CUTS, DEFAULT_PASS_THRESHOLD};
use rosterd::roster::{NewGrade, NewStudent, Roster, SeedPolicy};
use rosterd::store::MemoryStore;

fn seeded_roster() -> Roster {
    Roster::open(Box::new(MemoryStore::new()), SeedPolicy::SampleData).expect("open roster")
}

#[test]
fn sample_roster_analytics_match_known_values() {
    let roster = seeded_roster();

    // Per-student averages, in insertion order.
    let rows = roster.student_averages();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].id, "STU001");
    assert!((rows[0].average - 91.5).abs() < 1e-9);
    assert!((rows[1].average - 86.0).abs() < 1e-9);
    assert!((rows[2].average - 80.5).abs() < 1e-9);
    assert!((rows[3].average - 70.0).abs() < 1e-9);

    let top = roster.top_performers(2);
    assert_eq!(top[0].id, "STU001");
    assert_eq!(top[1].id, "STU002");

    // David averages 70.0 exactly: not below the threshold, not at risk.
    assert!(roster.at_risk(DEFAULT_AT_RISK_THRESHOLD).is_empty());
    let at_risk = roster.at_risk(80.0);
    assert_eq!(at_risk.len(), 1);
    assert_eq!(at_risk[0].id, "STU004");

    let extremes = roster.extremes().expect("extremes");
    assert_eq!(extremes.highest, 95);
    assert_eq!(extremes.lowest, 68);

    assert_eq!(roster.pass_rate(DEFAULT_PASS_THRESHOLD), Some(75.0));

    let bands = roster.grade_distribution(DEFAULT_BAND_CUTS);
    let total: usize = bands.iter().map(|b| b.count).sum();
    assert_eq!(total, roster.grades().len());

    // All seed grades fall in January 2025.
    let months = roster.average_by_month();
    assert_eq!(months.len(), 1);
    assert_eq!(months[0].label, "Jan 2025");
    assert_eq!(months[0].count, 8);
}

#[test]
fn student_appears_in_averages_with_their_first_grade() {
    let mut roster = seeded_roster();
    roster
        .add_student(NewStudent {
            id: "STU005".to_string(),
            name: "Eve Adams".to_string(),
            email: None,
            class_label: "10A".to_string(),
            phone: None,
        })
        .expect("add student");

    assert!(roster.average_for_student("STU005").is_none());
    assert!(roster
        .student_averages()
        .iter()
        .all(|row| row.id != "STU005"));

    roster
        .add_grade(NewGrade {
            student_id: "STU005".to_string(),
            subject: "Science".to_string(),
            score: 83,
            kind: "quiz".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 2, 1).expect("date"),
        })
        .expect("add grade");

    assert_eq!(roster.average_for_student("STU005"), Some(83.0));
    let row = roster
        .student_averages()
        .into_iter()
        .find(|row| row.id == "STU005")
        .expect("newly graded student appears");
    assert_eq!(row.average, 83.0);
}

#[test]
fn search_and_class_labels_cover_the_roster() {
    let roster = seeded_roster();

    assert_eq!(roster.class_labels(), vec!["10A", "10B"]);

    let by_name = roster.search_students("alice", None);
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].id, "STU001");

    let by_email = roster.search_students("bob.smith@", None);
    assert_eq!(by_email.len(), 1);
    assert_eq!(by_email[0].id, "STU002");

    let by_class = roster.search_students("", Some("10B"));
    let ids: Vec<&str> = by_class.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["STU003", "STU004"]);

    assert!(roster.search_students("zzz", None).is_empty());
}

#[test]
fn grades_listing_orders_by_date_desc_without_mutating_state() {
    let roster = seeded_roster();
    let before: Vec<String> = roster.grades().iter().map(|g| g.id.clone()).collect();

    let listed = roster.grades_by_date_desc();
    assert_eq!(listed.len(), 8);
    for pair in listed.windows(2) {
        assert!(pair[0].date >= pair[1].date);
    }

    let after: Vec<String> = roster.grades().iter().map(|g| g.id.clone()).collect();
    assert_eq!(before, after);
}
