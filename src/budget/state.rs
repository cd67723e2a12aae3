//! On-disk session snapshot. Writing and reloading must reproduce identical
//! budget and usage values so a crashed run can resume its accounting.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ResourceBudget, ResourceUsage, TrackerError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SessionState {
    pub session_id: String,
    pub budget: ResourceBudget,
    pub usage: ResourceUsage,
    pub last_updated: DateTime<Utc>,
}

pub(crate) fn load(path: &Path) -> Result<Option<SessionState>, TrackerError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    let state = serde_json::from_str(&raw)?;
    Ok(Some(state))
}

pub(crate) fn save(path: &Path, state: &SessionState) -> Result<(), TrackerError> {
    let raw = serde_json::to_string_pretty(state)?;
    fs::write(path, raw)?;
    Ok(())
}
