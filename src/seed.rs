use chrono::{NaiveDate, Utc};

use crate::roster::{Grade, Student};

/// Deterministic sample roster for fresh workspaces: four students
/// (STU001-STU004) and eight grades (GRD001-GRD008). Optional scaffolding,
/// not a contract; disabled by opening with `SeedPolicy::Empty`.
pub fn sample_roster() -> (Vec<Student>, Vec<Grade>) {
    let added_at = Utc::now().to_rfc3339();

    let student = |id: &str, name: &str, email: &str, class_label: &str, phone: &str| Student {
        id: id.to_string(),
        name: name.to_string(),
        email: Some(email.to_string()),
        class_label: class_label.to_string(),
        phone: Some(phone.to_string()),
        added_at: added_at.clone(),
    };
    let students = vec![
        student(
            "STU001",
            "Alice Johnson",
            "alice.johnson@school.edu",
            "10A",
            "+1-555-0101",
        ),
        student(
            "STU002",
            "Bob Smith",
            "bob.smith@school.edu",
            "10A",
            "+1-555-0102",
        ),
        student(
            "STU003",
            "Carol Davis",
            "carol.davis@school.edu",
            "10B",
            "+1-555-0103",
        ),
        student(
            "STU004",
            "David Wilson",
            "david.wilson@school.edu",
            "10B",
            "+1-555-0104",
        ),
    ];

    let grade = |id: &str, student_id: &str, subject: &str, score: i64, kind: &str, date: (i32, u32, u32)| Grade {
        id: id.to_string(),
        student_id: student_id.to_string(),
        subject: subject.to_string(),
        score,
        kind: kind.to_string(),
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).expect("valid seed date"),
    };
    let grades = vec![
        grade("GRD001", "STU001", "Mathematics", 95, "exam", (2025, 1, 15)),
        grade("GRD002", "STU001", "Science", 88, "quiz", (2025, 1, 14)),
        grade("GRD003", "STU002", "Mathematics", 82, "exam", (2025, 1, 15)),
        grade("GRD004", "STU002", "English", 90, "assignment", (2025, 1, 13)),
        grade("GRD005", "STU003", "Science", 76, "quiz", (2025, 1, 14)),
        grade("GRD006", "STU003", "History", 85, "project", (2025, 1, 12)),
        grade("GRD007", "STU004", "Mathematics", 68, "exam", (2025, 1, 15)),
        grade("GRD008", "STU004", "English", 72, "assignment", (2025, 1, 13)),
    ];

    (students, grades)
}
