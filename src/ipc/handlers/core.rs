use serde_json::json;
use std::path::PathBuf;

use crate::db::SqliteStore;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::HandlerErr;
use crate::ipc::types::{AppState, Request};
use crate::roster::{Roster, SeedPolicy};
use crate::store::{JsonFileStore, Store};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn open_store(backend: &str, path: &PathBuf) -> Result<Box<dyn Store>, HandlerErr> {
    match backend {
        "json" => JsonFileStore::open(path)
            .map(|s| Box::new(s) as Box<dyn Store>)
            .map_err(|e| HandlerErr {
                code: "store_failure",
                message: format!("{e:?}"),
                details: None,
            }),
        "sqlite" => SqliteStore::open(path)
            .map(|s| Box::new(s) as Box<dyn Store>)
            .map_err(|e| HandlerErr {
                code: "store_failure",
                message: format!("{e:?}"),
                details: None,
            }),
        other => Err(HandlerErr::bad_params(format!(
            "unknown backend: {} (expected json or sqlite)",
            other
        ))),
    }
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    let backend = req
        .params
        .get("backend")
        .and_then(|v| v.as_str())
        .unwrap_or("json");
    let seed = if req.params.get("seed").and_then(|v| v.as_bool()).unwrap_or(true) {
        SeedPolicy::SampleData
    } else {
        SeedPolicy::Empty
    };

    let store = match open_store(backend, &path) {
        Ok(s) => s,
        Err(e) => return e.response(&req.id),
    };
    match Roster::open(store, seed) {
        Ok(roster) => {
            state.workspace = Some(path.clone());
            state.roster = Some(roster);
            ok(
                &req.id,
                json!({
                    "workspacePath": path.to_string_lossy(),
                    "backend": backend,
                }),
            )
        }
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
