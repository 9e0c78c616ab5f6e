use serde_json::json;
use std::path::PathBuf;

use crate::backup;
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::roster::{Roster, SeedPolicy};
use crate::store::JsonFileStore;

fn require_workspace(state: &AppState) -> Result<PathBuf, HandlerErr> {
    state.workspace.clone().ok_or(HandlerErr {
        code: "no_workspace",
        message: "select a workspace first".to_string(),
        details: None,
    })
}

fn export(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let out_path = PathBuf::from(get_required_str(params, "outPath")?);
    let workspace = require_workspace(state)?;
    let summary =
        backup::export_roster_bundle(&workspace, &out_path).map_err(|e| HandlerErr {
            code: "store_failure",
            message: format!("{e:?}"),
            details: None,
        })?;
    Ok(json!({
        "bundleFormat": summary.bundle_format,
        "entryCount": summary.entry_count,
        "outPath": out_path.to_string_lossy(),
    }))
}

fn import(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let in_path = PathBuf::from(get_required_str(params, "inPath")?);
    let workspace = require_workspace(state)?;
    let summary =
        backup::import_roster_bundle(&in_path, &workspace).map_err(|e| HandlerErr {
            code: "store_failure",
            message: format!("{e:?}"),
            details: None,
        })?;

    // Bundles restore the JSON collection files, so the session continues
    // on the file backend. Never seed over restored data.
    let store = JsonFileStore::open(&workspace).map_err(|e| HandlerErr {
        code: "store_failure",
        message: format!("{e:?}"),
        details: None,
    })?;
    let roster = Roster::open(Box::new(store), SeedPolicy::Empty).map_err(|e| HandlerErr {
        code: e.code(),
        message: e.to_string(),
        details: None,
    })?;
    state.roster = Some(roster);

    Ok(json!({
        "bundleFormatDetected": summary.bundle_format_detected,
        "collectionsRestored": summary.collections_restored,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "backup.export" => export(state, &req.params),
        "backup.import" => import(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(value) => ok(&req.id, value),
        Err(e) => e.response(&req.id),
    })
}
