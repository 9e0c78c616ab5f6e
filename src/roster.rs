use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calc;
use crate::seed;
use crate::store::{Store, GRADES_KEY, STUDENTS_KEY};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub class_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub added_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: String,
    pub student_id: String,
    pub subject: String,
    pub score: i64,
    /// Open enumeration: exam, quiz, assignment, project, or free text.
    pub kind: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub class_label: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewGrade {
    pub student_id: String,
    pub subject: String,
    pub score: i64,
    pub kind: String,
    pub date: NaiveDate,
}

/// Shallow-merge patch: `None` leaves a field unchanged. Optional record
/// fields use a nested Option so callers can clear them (`Some(None)`)
/// without clobbering on every update.
#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<Option<String>>,
    pub class_label: Option<String>,
    pub phone: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct GradePatch {
    pub student_id: Option<String>,
    pub subject: Option<String>,
    pub score: Option<i64>,
    pub kind: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug)]
pub enum RosterError {
    DuplicateId { id: String },
    NotFound { kind: &'static str, id: String },
    Store(anyhow::Error),
}

impl RosterError {
    pub fn code(&self) -> &'static str {
        match self {
            RosterError::DuplicateId { .. } => "duplicate_id",
            RosterError::NotFound { .. } => "not_found",
            RosterError::Store(_) => "store_failure",
        }
    }
}

impl std::fmt::Display for RosterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterError::DuplicateId { id } => {
                write!(f, "identifier already in use: {}", id)
            }
            RosterError::NotFound { kind, id } => write!(f, "{} not found: {}", kind, id),
            RosterError::Store(e) => write!(f, "store operation failed: {}", e),
        }
    }
}

impl std::error::Error for RosterError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedPolicy {
    /// Start empty when the store has no student collection.
    Empty,
    /// Populate the documented sample roster when the student collection
    /// is empty after load.
    SampleData,
}

/// Owns the student and grade collections, enforces identifier uniqueness
/// and referential integrity, and keeps the injected store in step with
/// every successful mutation.
pub struct Roster {
    store: Box<dyn Store>,
    students: Vec<Student>,
    grades: Vec<Grade>,
}

impl Roster {
    /// Loads both collections from the store. Absent keys start empty;
    /// with `SeedPolicy::SampleData` an empty student collection is
    /// populated with the sample roster and persisted.
    pub fn open(store: Box<dyn Store>, seed: SeedPolicy) -> Result<Self, RosterError> {
        let mut roster = Self {
            store,
            students: Vec::new(),
            grades: Vec::new(),
        };

        if let Some(text) = roster.store.load(STUDENTS_KEY).map_err(RosterError::Store)? {
            roster.students = serde_json::from_str(&text)
                .map_err(|e| RosterError::Store(anyhow::Error::new(e)))?;
        }
        if let Some(text) = roster.store.load(GRADES_KEY).map_err(RosterError::Store)? {
            roster.grades = serde_json::from_str(&text)
                .map_err(|e| RosterError::Store(anyhow::Error::new(e)))?;
        }

        if roster.students.is_empty() && seed == SeedPolicy::SampleData {
            let (students, grades) = seed::sample_roster();
            roster.students = students;
            roster.grades = grades;
            roster.persist_students()?;
            roster.persist_grades()?;
        }

        Ok(roster)
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn grades(&self) -> &[Grade] {
        &self.grades
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    pub fn grade(&self, id: &str) -> Option<&Grade> {
        self.grades.iter().find(|g| g.id == id)
    }

    pub fn add_student(&mut self, new: NewStudent) -> Result<Student, RosterError> {
        if self.students.iter().any(|s| s.id == new.id) {
            return Err(RosterError::DuplicateId { id: new.id });
        }
        let student = Student {
            id: new.id,
            name: new.name,
            email: new.email,
            class_label: new.class_label,
            phone: new.phone,
            added_at: Utc::now().to_rfc3339(),
        };
        self.students.push(student.clone());
        if let Err(e) = self.persist_students() {
            self.students.pop();
            return Err(e);
        }
        Ok(student)
    }

    /// Shallow merge. Renaming the identifier rechecks uniqueness against
    /// every other student and rewrites the owning id on the student's
    /// grades in the same step, so no grade is ever orphaned by a rename.
    pub fn update_student(
        &mut self,
        id: &str,
        patch: StudentPatch,
    ) -> Result<Student, RosterError> {
        let pos = self
            .students
            .iter()
            .position(|s| s.id == id)
            .ok_or(RosterError::NotFound {
                kind: "student",
                id: id.to_string(),
            })?;

        if let Some(new_id) = patch.id.as_deref() {
            if new_id != id && self.students.iter().any(|s| s.id == new_id) {
                return Err(RosterError::DuplicateId {
                    id: new_id.to_string(),
                });
            }
        }

        let students_before = self.students.clone();
        let grades_before = self.grades.clone();

        let renamed = patch.id.clone().filter(|new_id| new_id.as_str() != id);
        {
            let student = &mut self.students[pos];
            if let Some(new_id) = patch.id {
                student.id = new_id;
            }
            if let Some(name) = patch.name {
                student.name = name;
            }
            if let Some(email) = patch.email {
                student.email = email;
            }
            if let Some(class_label) = patch.class_label {
                student.class_label = class_label;
            }
            if let Some(phone) = patch.phone {
                student.phone = phone;
            }
        }
        if let Some(new_id) = renamed.as_deref() {
            for grade in self.grades.iter_mut().filter(|g| g.student_id == id) {
                grade.student_id = new_id.to_string();
            }
        }

        let result = if renamed.is_some() {
            self.persist_students().and_then(|_| self.persist_grades())
        } else {
            self.persist_students()
        };
        if let Err(e) = result {
            self.students = students_before;
            self.grades = grades_before;
            self.repair_store();
            return Err(e);
        }
        Ok(self.students[pos].clone())
    }

    /// Cascade delete: the student and every grade they own disappear as
    /// one atomic step. A partial cascade is never observable.
    pub fn delete_student(&mut self, id: &str) -> Result<(), RosterError> {
        if !self.students.iter().any(|s| s.id == id) {
            return Err(RosterError::NotFound {
                kind: "student",
                id: id.to_string(),
            });
        }
        let students_before = self.students.clone();
        let grades_before = self.grades.clone();

        self.students.retain(|s| s.id != id);
        self.grades.retain(|g| g.student_id != id);

        if let Err(e) = self.persist_students().and_then(|_| self.persist_grades()) {
            self.students = students_before;
            self.grades = grades_before;
            self.repair_store();
            return Err(e);
        }
        Ok(())
    }

    pub fn add_grade(&mut self, new: NewGrade) -> Result<Grade, RosterError> {
        if !self.students.iter().any(|s| s.id == new.student_id) {
            return Err(RosterError::NotFound {
                kind: "student",
                id: new.student_id,
            });
        }
        let grade = Grade {
            id: Uuid::new_v4().to_string(),
            student_id: new.student_id,
            subject: new.subject,
            score: new.score,
            kind: new.kind,
            date: new.date,
        };
        self.grades.push(grade.clone());
        if let Err(e) = self.persist_grades() {
            self.grades.pop();
            return Err(e);
        }
        Ok(grade)
    }

    pub fn update_grade(&mut self, id: &str, patch: GradePatch) -> Result<Grade, RosterError> {
        let pos = self
            .grades
            .iter()
            .position(|g| g.id == id)
            .ok_or(RosterError::NotFound {
                kind: "grade",
                id: id.to_string(),
            })?;

        if let Some(student_id) = patch.student_id.as_deref() {
            if !self.students.iter().any(|s| s.id == student_id) {
                return Err(RosterError::NotFound {
                    kind: "student",
                    id: student_id.to_string(),
                });
            }
        }

        let before = self.grades[pos].clone();
        {
            let grade = &mut self.grades[pos];
            if let Some(student_id) = patch.student_id {
                grade.student_id = student_id;
            }
            if let Some(subject) = patch.subject {
                grade.subject = subject;
            }
            if let Some(score) = patch.score {
                grade.score = score;
            }
            if let Some(kind) = patch.kind {
                grade.kind = kind;
            }
            if let Some(date) = patch.date {
                grade.date = date;
            }
        }
        if let Err(e) = self.persist_grades() {
            self.grades[pos] = before;
            self.repair_store();
            return Err(e);
        }
        Ok(self.grades[pos].clone())
    }

    pub fn delete_grade(&mut self, id: &str) -> Result<(), RosterError> {
        let pos = self
            .grades
            .iter()
            .position(|g| g.id == id)
            .ok_or(RosterError::NotFound {
                kind: "grade",
                id: id.to_string(),
            })?;
        let removed = self.grades.remove(pos);
        if let Err(e) = self.persist_grades() {
            self.grades.insert(pos, removed);
            self.repair_store();
            return Err(e);
        }
        Ok(())
    }

    // Aggregation queries. All pure reads over current state; the zero-record
    // case yields None rather than an error.

    pub fn average_for_student(&self, id: &str) -> Option<f64> {
        calc::average_for_student(&self.grades, id)
    }

    pub fn student_averages(&self) -> Vec<calc::StudentAverage> {
        calc::student_averages(&self.students, &self.grades)
    }

    pub fn top_performers(&self, n: usize) -> Vec<calc::StudentAverage> {
        calc::top_performers(&self.students, &self.grades, n)
    }

    pub fn at_risk(&self, threshold: f64) -> Vec<calc::StudentAverage> {
        calc::at_risk(&self.students, &self.grades, threshold)
    }

    pub fn grade_distribution(&self, cuts: [i64; 4]) -> Vec<calc::DistributionBand> {
        calc::grade_distribution(&self.grades, cuts)
    }

    pub fn average_by_subject(&self) -> Vec<calc::SubjectAverage> {
        calc::average_by_subject(&self.grades)
    }

    pub fn average_by_month(&self) -> Vec<calc::MonthlyAverage> {
        calc::average_by_month(&self.grades)
    }

    pub fn extremes(&self) -> Option<calc::Extremes> {
        calc::extremes(&self.grades)
    }

    pub fn pass_rate(&self, threshold: i64) -> Option<f64> {
        calc::pass_rate(&self.grades, threshold)
    }

    pub fn improvement_rate(&self) -> f64 {
        calc::improvement_rate(&self.grades)
    }

    pub fn overview(&self) -> calc::Overview {
        calc::overview(&self.students, &self.grades)
    }

    pub fn class_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for s in &self.students {
            if !labels.iter().any(|l| l == &s.class_label) {
                labels.push(s.class_label.clone());
            }
        }
        labels.sort();
        labels
    }

    /// Case-insensitive substring match on name, id, and email, with an
    /// optional exact class filter. Insertion order preserved.
    pub fn search_students(&self, query: &str, class_label: Option<&str>) -> Vec<&Student> {
        let needle = query.to_lowercase();
        self.students
            .iter()
            .filter(|s| {
                let matches_query = needle.is_empty()
                    || s.name.to_lowercase().contains(&needle)
                    || s.id.to_lowercase().contains(&needle)
                    || s.email
                        .as_deref()
                        .map(|e| e.to_lowercase().contains(&needle))
                        .unwrap_or(false);
                let matches_class = class_label
                    .map(|c| s.class_label == c)
                    .unwrap_or(true);
                matches_query && matches_class
            })
            .collect()
    }

    pub fn grades_for_student(&self, id: &str) -> Vec<&Grade> {
        self.grades.iter().filter(|g| g.student_id == id).collect()
    }

    /// Newest first, stable on equal dates. Leaves stored order untouched.
    pub fn grades_by_date_desc(&self) -> Vec<&Grade> {
        let mut rows: Vec<&Grade> = self.grades.iter().collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        rows
    }

    fn persist_students(&mut self) -> Result<(), RosterError> {
        let payload = serde_json::to_string(&self.students)
            .map_err(|e| RosterError::Store(anyhow::Error::new(e)))?;
        self.store
            .save(STUDENTS_KEY, &payload)
            .map_err(RosterError::Store)
    }

    fn persist_grades(&mut self) -> Result<(), RosterError> {
        let payload = serde_json::to_string(&self.grades)
            .map_err(|e| RosterError::Store(anyhow::Error::new(e)))?;
        self.store
            .save(GRADES_KEY, &payload)
            .map_err(RosterError::Store)
    }

    /// After a failed multi-key write the in-memory state has been restored;
    /// try to bring any key that was written before the failure back in
    /// line. The store stays authoritative for whatever it last accepted.
    fn repair_store(&mut self) {
        let _ = self.persist_students();
        let _ = self.persist_grades();
    }
}
