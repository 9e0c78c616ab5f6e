use crate::ipc::error::err;
use crate::ipc::types::AppState;
use crate::roster::{Roster, RosterError};

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<RosterError> for HandlerErr {
    fn from(e: RosterError) -> Self {
        Self {
            code: e.code(),
            message: e.to_string(),
            details: None,
        }
    }
}

pub fn require_roster(state: &mut AppState) -> Result<&mut Roster, HandlerErr> {
    state.roster.as_mut().ok_or(HandlerErr {
        code: "no_workspace",
        message: "select a workspace first".to_string(),
        details: None,
    })
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_opt_str(params: &serde_json::Value, key: &str) -> Result<Option<String>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a string", key))),
    }
}

/// Patch-field semantics: absent leaves the field alone, null clears it,
/// a string sets it.
pub fn get_patch_opt_str(
    patch: &serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Result<Option<Option<String>>, HandlerErr> {
    match patch.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(Some(None)),
        Some(v) => v
            .as_str()
            .map(|s| Some(Some(s.to_string())))
            .ok_or_else(|| HandlerErr::bad_params(format!("patch.{} must be a string or null", key))),
    }
}

pub fn get_patch_str(
    patch: &serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Result<Option<String>, HandlerErr> {
    match patch.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| HandlerErr::bad_params(format!("patch.{} must be a string", key))),
    }
}
