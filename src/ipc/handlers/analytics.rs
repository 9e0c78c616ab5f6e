use serde_json::json;

use crate::calc;
use crate::ipc::error::ok;
use crate::ipc::helpers::{require_roster, HandlerErr};
use crate::ipc::types::{AppState, Request};

fn to_rows<T: serde::Serialize>(rows: &[T]) -> serde_json::Value {
    serde_json::to_value(rows).unwrap_or_else(|_| json!([]))
}

fn overview(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let roster = require_roster(state)?;
    Ok(serde_json::to_value(roster.overview()).unwrap_or_else(|_| json!({})))
}

fn student_averages(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let roster = require_roster(state)?;
    Ok(json!({ "students": to_rows(&roster.student_averages()) }))
}

fn top_performers(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let limit = match params.get("limit") {
        None => calc::DEFAULT_TOP_PERFORMERS,
        Some(v) => v
            .as_u64()
            .ok_or_else(|| HandlerErr::bad_params("limit must be a non-negative integer"))?
            as usize,
    };
    let roster = require_roster(state)?;
    Ok(json!({ "students": to_rows(&roster.top_performers(limit)) }))
}

fn at_risk(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let threshold = match params.get("threshold") {
        None => calc::DEFAULT_AT_RISK_THRESHOLD,
        Some(v) => v
            .as_f64()
            .ok_or_else(|| HandlerErr::bad_params("threshold must be a number"))?,
    };
    let roster = require_roster(state)?;
    Ok(json!({
        "threshold": threshold,
        "students": to_rows(&roster.at_risk(threshold)),
    }))
}

fn grade_distribution(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let cuts = match params.get("cuts") {
        None => calc::DEFAULT_BAND_CUTS,
        Some(v) => {
            let arr = v
                .as_array()
                .ok_or_else(|| HandlerErr::bad_params("cuts must be an array of 4 integers"))?;
            if arr.len() != 4 {
                return Err(HandlerErr::bad_params("cuts must be an array of 4 integers"));
            }
            let mut cuts = [0_i64; 4];
            for (i, x) in arr.iter().enumerate() {
                cuts[i] = x
                    .as_i64()
                    .ok_or_else(|| HandlerErr::bad_params("cuts must be an array of 4 integers"))?;
            }
            cuts
        }
    };
    let roster = require_roster(state)?;
    Ok(json!({ "bands": to_rows(&roster.grade_distribution(cuts)) }))
}

fn subject_averages(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let roster = require_roster(state)?;
    Ok(json!({ "subjects": to_rows(&roster.average_by_subject()) }))
}

fn monthly_averages(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let roster = require_roster(state)?;
    Ok(json!({ "months": to_rows(&roster.average_by_month()) }))
}

fn performance_metrics(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let pass_threshold = match params.get("passThreshold") {
        None => calc::DEFAULT_PASS_THRESHOLD,
        Some(v) => v
            .as_i64()
            .ok_or_else(|| HandlerErr::bad_params("passThreshold must be an integer"))?,
    };
    let roster = require_roster(state)?;
    // Nulls mean "no grades yet", which the original UI rendered as "-".
    Ok(json!({
        "extremes": roster.extremes().map(|e| serde_json::to_value(e).unwrap_or_else(|_| json!({}))),
        "passRate": roster.pass_rate(pass_threshold),
        "improvementRate": roster.improvement_rate(),
    }))
}

fn class_labels(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let roster = require_roster(state)?;
    Ok(json!({ "classLabels": roster.class_labels() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "analytics.overview" => overview(state),
        "analytics.studentAverages" => student_averages(state),
        "analytics.topPerformers" => top_performers(state, &req.params),
        "analytics.atRisk" => at_risk(state, &req.params),
        "analytics.gradeDistribution" => grade_distribution(state, &req.params),
        "analytics.subjectAverages" => subject_averages(state),
        "analytics.monthlyAverages" => monthly_averages(state),
        "analytics.performanceMetrics" => performance_metrics(state, &req.params),
        "analytics.classLabels" => class_labels(state),
        _ => return None,
    };
    Some(match result {
        Ok(value) => ok(&req.id, value),
        Err(e) => e.response(&req.id),
    })
}
