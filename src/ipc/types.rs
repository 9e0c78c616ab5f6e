use std::path::PathBuf;

use serde::Deserialize;

use crate::roster::Roster;

#[derive(Debug, Deserialize)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub roster: Option<Roster>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            roster: None,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
