use serde::Serialize;
use std::collections::BTreeMap;

use crate::roster::{Grade, Student};

pub const DEFAULT_TOP_PERFORMERS: usize = 5;
pub const DEFAULT_AT_RISK_THRESHOLD: f64 = 70.0;
pub const DEFAULT_PASS_THRESHOLD: i64 = 70;
/// Cut points for the default bands [90,100], [80,89], [70,79], [60,69], [0,59].
pub const DEFAULT_BAND_CUTS: [i64; 4] = [90, 80, 70, 60];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAverage {
    pub id: String,
    pub name: String,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionBand {
    pub label: String,
    pub floor: i64,
    pub ceiling: i64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAverage {
    pub subject: String,
    pub average: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAverage {
    pub year: i32,
    pub month: u32,
    pub label: String,
    pub average: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extremes {
    pub highest: i64,
    pub lowest: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub student_count: usize,
    pub grade_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
}

fn mean_of<I>(scores: I) -> Option<f64>
where
    I: IntoIterator<Item = i64>,
{
    let mut sum = 0_i64;
    let mut count = 0_usize;
    for s in scores {
        sum += s;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum as f64 / count as f64)
    }
}

/// `None` means the student has no grades, which callers must keep
/// distinct from an average of 0.
pub fn average_for_student(grades: &[Grade], student_id: &str) -> Option<f64> {
    mean_of(
        grades
            .iter()
            .filter(|g| g.student_id == student_id)
            .map(|g| g.score),
    )
}

/// One row per student with at least one grade, in student insertion order.
/// Students without grades are excluded on purpose: the top-performer and
/// at-risk views must not show anyone who has never been assessed.
pub fn student_averages(students: &[Student], grades: &[Grade]) -> Vec<StudentAverage> {
    students
        .iter()
        .filter_map(|s| {
            average_for_student(grades, &s.id).map(|average| StudentAverage {
                id: s.id.clone(),
                name: s.name.clone(),
                average,
            })
        })
        .collect()
}

/// Descending by average; ties keep insertion order (stable sort).
pub fn top_performers(students: &[Student], grades: &[Grade], n: usize) -> Vec<StudentAverage> {
    let mut rows = student_averages(students, grades);
    rows.sort_by(|a, b| {
        b.average
            .partial_cmp(&a.average)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows.truncate(n);
    rows
}

/// Averages strictly below the threshold, original relative order preserved.
pub fn at_risk(students: &[Student], grades: &[Grade], threshold: f64) -> Vec<StudentAverage> {
    student_averages(students, grades)
        .into_iter()
        .filter(|row| row.average < threshold)
        .collect()
}

/// Five bands from four cut points. Membership is tested high-to-low with
/// `score >= floor`, so a score of exactly 90 lands in the top band and
/// every grade lands in exactly one band. Out-of-domain scores fall into
/// the nearest band (above 100 the top one, below 0 the bottom one).
pub fn grade_distribution(grades: &[Grade], cuts: [i64; 4]) -> Vec<DistributionBand> {
    let mut bands: Vec<DistributionBand> = Vec::with_capacity(5);
    let mut ceiling = 100_i64;
    for floor in cuts {
        bands.push(DistributionBand {
            label: format!("{}-{}", floor, ceiling),
            floor,
            ceiling,
            count: 0,
        });
        ceiling = floor - 1;
    }
    bands.push(DistributionBand {
        label: format!("0-{}", ceiling),
        floor: 0,
        ceiling,
        count: 0,
    });

    let last = bands.len() - 1;
    for g in grades {
        let idx = bands
            .iter()
            .position(|b| g.score >= b.floor)
            .unwrap_or(last);
        bands[idx].count += 1;
    }
    bands
}

/// Mean per subject label, labels in first-seen order.
pub fn average_by_subject(grades: &[Grade]) -> Vec<SubjectAverage> {
    let mut totals: Vec<(String, i64, usize)> = Vec::new();
    for g in grades {
        match totals
            .iter_mut()
            .find(|(subject, _, _)| *subject == g.subject)
        {
            Some(entry) => {
                entry.1 += g.score;
                entry.2 += 1;
            }
            None => totals.push((g.subject.clone(), g.score, 1)),
        }
    }
    totals
        .into_iter()
        .map(|(subject, sum, count)| SubjectAverage {
            subject,
            average: sum as f64 / count as f64,
            count,
        })
        .collect()
}

/// Grouped by the calendar year+month of the grade date, chronologically
/// ascending. Sorting happens on (year, month), never on the display label:
/// a lexicographic sort on "Feb 2025" / "Jan 2026" style labels misorders
/// across year boundaries.
pub fn average_by_month(grades: &[Grade]) -> Vec<MonthlyAverage> {
    use chrono::Datelike;

    let mut groups: BTreeMap<(i32, u32), (i64, usize, String)> = BTreeMap::new();
    for g in grades {
        let key = (g.date.year(), g.date.month());
        let entry = groups
            .entry(key)
            .or_insert_with(|| (0, 0, g.date.format("%b %Y").to_string()));
        entry.0 += g.score;
        entry.1 += 1;
    }
    groups
        .into_iter()
        .map(|((year, month), (sum, count, label))| MonthlyAverage {
            year,
            month,
            label,
            average: sum as f64 / count as f64,
            count,
        })
        .collect()
}

pub fn extremes(grades: &[Grade]) -> Option<Extremes> {
    let highest = grades.iter().map(|g| g.score).max()?;
    let lowest = grades.iter().map(|g| g.score).min()?;
    Some(Extremes { highest, lowest })
}

/// Percentage (0-100) of grades at or above the threshold; `None` when
/// there are no grades.
pub fn pass_rate(grades: &[Grade], threshold: i64) -> Option<f64> {
    if grades.is_empty() {
        return None;
    }
    let passing = grades.iter().filter(|g| g.score >= threshold).count();
    Some(passing as f64 / grades.len() as f64 * 100.0)
}

/// Sorts a local copy by date descending (stable, ties keep stored order),
/// splits it into a recent half of floor(n/2) grades and an older half that
/// takes the remainder, and compares the two means. An older mean of zero
/// yields 0 rather than a division error. Stored order is never touched.
pub fn improvement_rate(grades: &[Grade]) -> f64 {
    if grades.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<&Grade> = grades.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));

    let split = sorted.len() / 2;
    let recent_mean = mean_of(sorted[..split].iter().map(|g| g.score)).unwrap_or(0.0);
    let older_mean = mean_of(sorted[split..].iter().map(|g| g.score)).unwrap_or(0.0);

    if older_mean == 0.0 {
        0.0
    } else {
        (recent_mean - older_mean) / older_mean * 100.0
    }
}

pub fn overview(students: &[Student], grades: &[Grade]) -> Overview {
    Overview {
        student_count: students.len(),
        grade_count: grades.len(),
        average: mean_of(grades.iter().map(|g| g.score)),
    }
}
