use chrono::NaiveDate;
use serde_json::json;

use crate::ipc::error::ok;
use crate::ipc::helpers::{get_opt_str, get_patch_str, get_required_str, require_roster, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::roster::{Grade, GradePatch, NewGrade, Roster};

fn parse_date(raw: &str, key: &str) -> Result<NaiveDate, HandlerErr> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| HandlerErr::bad_params(format!("{} must be a YYYY-MM-DD date", key)))
}

fn grade_row(roster: &Roster, grade: &Grade) -> serde_json::Value {
    let mut row = serde_json::to_value(grade).unwrap_or_else(|_| json!({}));
    row["studentName"] = json!(roster
        .student(&grade.student_id)
        .map(|s| s.name.clone())
        .unwrap_or_else(|| "Unknown Student".to_string()));
    row
}

fn list(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_opt_str(params, "studentId")?;
    let roster: &Roster = require_roster(state)?;
    let rows: Vec<serde_json::Value> = match student_id.as_deref() {
        // Per-student listing keeps insertion order.
        Some(id) => roster
            .grades_for_student(id)
            .into_iter()
            .map(|g| grade_row(roster, g))
            .collect(),
        // The full table reads newest-first.
        None => roster
            .grades_by_date_desc()
            .into_iter()
            .map(|g| grade_row(roster, g))
            .collect(),
    };
    Ok(json!({ "grades": rows }))
}

fn create(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let score = params
        .get("score")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params("missing/invalid score"))?;
    let new = NewGrade {
        student_id: get_required_str(params, "studentId")?,
        subject: get_required_str(params, "subject")?,
        score,
        kind: get_required_str(params, "kind")?,
        date: parse_date(&get_required_str(params, "date")?, "date")?,
    };
    let roster = require_roster(state)?;
    let grade = roster.add_grade(new)?;
    Ok(json!({ "grade": serde_json::to_value(&grade).unwrap_or_else(|_| json!({})) }))
}

fn update(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let grade_id = get_required_str(params, "gradeId")?;
    let Some(patch_obj) = params.get("patch").and_then(|v| v.as_object()) else {
        return Err(HandlerErr::bad_params("missing/invalid patch"));
    };

    let score = match patch_obj.get("score") {
        None => None,
        Some(v) => Some(
            v.as_i64()
                .ok_or_else(|| HandlerErr::bad_params("patch.score must be an integer"))?,
        ),
    };
    let date = match get_patch_str(patch_obj, "date")? {
        None => None,
        Some(raw) => Some(parse_date(&raw, "patch.date")?),
    };
    let patch = GradePatch {
        student_id: get_patch_str(patch_obj, "studentId")?,
        subject: get_patch_str(patch_obj, "subject")?,
        score,
        kind: get_patch_str(patch_obj, "kind")?,
        date,
    };

    let roster = require_roster(state)?;
    let grade = roster.update_grade(&grade_id, patch)?;
    Ok(json!({ "grade": serde_json::to_value(&grade).unwrap_or_else(|_| json!({})) }))
}

fn delete(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let grade_id = get_required_str(params, "gradeId")?;
    let roster = require_roster(state)?;
    roster.delete_grade(&grade_id)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "grades.list" => list(state, &req.params),
        "grades.create" => create(state, &req.params),
        "grades.update" => update(state, &req.params),
        "grades.delete" => delete(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(value) => ok(&req.id, value),
        Err(e) => e.response(&req.id),
    })
}
