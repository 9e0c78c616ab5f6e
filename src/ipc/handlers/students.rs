use serde_json::json;

use crate::ipc::error::ok;
use crate::ipc::helpers::{
    get_opt_str, get_patch_opt_str, get_patch_str, get_required_str, require_roster, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::roster::{NewStudent, Roster, Student, StudentPatch};

fn student_row(roster: &Roster, student: &Student) -> serde_json::Value {
    let mut row = serde_json::to_value(student).unwrap_or_else(|_| json!({}));
    // The average is a derived field for display; null means no grades yet.
    row["average"] = json!(roster.average_for_student(&student.id));
    row
}

fn list(state: &mut AppState, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let roster: &Roster = require_roster(state)?;
    let rows: Vec<serde_json::Value> = roster
        .students()
        .iter()
        .map(|s| student_row(roster, s))
        .collect();
    Ok(json!({ "students": rows }))
}

fn search(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let query = get_opt_str(params, "query")?.unwrap_or_default();
    let class_label = get_opt_str(params, "classLabel")?;
    let roster: &Roster = require_roster(state)?;
    let rows: Vec<serde_json::Value> = roster
        .search_students(&query, class_label.as_deref())
        .into_iter()
        .map(|s| student_row(roster, s))
        .collect();
    Ok(json!({ "students": rows }))
}

fn create(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let new = NewStudent {
        id: get_required_str(params, "id")?,
        name: get_required_str(params, "name")?,
        email: get_opt_str(params, "email")?,
        class_label: get_required_str(params, "classLabel")?,
        phone: get_opt_str(params, "phone")?,
    };
    let roster = require_roster(state)?;
    let student = roster.add_student(new)?;
    Ok(json!({ "student": serde_json::to_value(&student).unwrap_or_else(|_| json!({})) }))
}

fn update(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let Some(patch_obj) = params.get("patch").and_then(|v| v.as_object()) else {
        return Err(HandlerErr::bad_params("missing/invalid patch"));
    };

    let patch = StudentPatch {
        id: get_patch_str(patch_obj, "id")?,
        name: get_patch_str(patch_obj, "name")?,
        email: get_patch_opt_str(patch_obj, "email")?,
        class_label: get_patch_str(patch_obj, "classLabel")?,
        phone: get_patch_opt_str(patch_obj, "phone")?,
    };

    let roster = require_roster(state)?;
    let student = roster.update_student(&student_id, patch)?;
    Ok(json!({ "student": serde_json::to_value(&student).unwrap_or_else(|_| json!({})) }))
}

fn delete(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let roster = require_roster(state)?;
    roster.delete_student(&student_id)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.list" => list(state, &req.params),
        "students.search" => search(state, &req.params),
        "students.create" => create(state, &req.params),
        "students.update" => update(state, &req.params),
        "students.delete" => delete(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(value) => ok(&req.id, value),
        Err(e) => e.response(&req.id),
    })
}
