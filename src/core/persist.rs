use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::types::Scenario;

pub const DEFAULT_STATE_FILE: &str = "disbursal-simulator-storage.json";

// Undo history is deliberately not persisted; a relaunch starts with a
// clean stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub scenarios: Vec<Scenario>,
    pub active_scenario_id: String,
    pub dark_mode: bool,
}

pub fn load_state(path: &Path) -> io::Result<Option<PersistedState>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let state = serde_json::from_str(&raw)
        .map_err(|e| io::Error::new(ErrorKind::InvalidData, format!("{}: {e}", path.display())))?;
    Ok(Some(state))
}

pub fn save_state(path: &Path, state: &PersistedState) -> io::Result<()> {
    let json = serde_json::to_string_pretty(state)
        .map_err(|e| io::Error::new(ErrorKind::InvalidData, e.to_string()))?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, json)
}
