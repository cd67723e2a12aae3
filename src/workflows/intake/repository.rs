use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::domain::RouteDecision;

/// Collection names in the workspace database.
pub const INTAKE_SUBMISSIONS: &str = "intake_submissions";
pub const FUNNEL_TRACKER: &str = "funnel_tracker";
pub const ENGAGEMENT_SIGNALS: &str = "engagement_signals";

/// A keyed property record as stored by the workspace database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub id: String,
    pub fields: BTreeMap<String, Value>,
}

impl StoreRecord {
    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        match self.fields.get(field) {
            Some(Value::Number(n)) => n.as_f64(),
            // Numeric fields sometimes arrive as free text from the form.
            Some(Value::String(s)) => s.trim().replace(',', "").parse().ok(),
            _ => None,
        }
    }

    pub fn boolean(&self, field: &str) -> bool {
        matches!(self.fields.get(field), Some(Value::Bool(true)))
    }
}

/// Equality filter over record fields; an empty filter matches everything.
pub type StoreFilter = BTreeMap<String, Value>;

/// Abstract workspace-database collaborator. Field names and filter shapes
/// are caller concerns; the core treats this purely as a property store.
pub trait WorkspaceStore: Send + Sync {
    fn query(&self, collection: &str, filter: &StoreFilter) -> Result<Vec<StoreRecord>, StoreError>;
    fn create(
        &self,
        collection: &str,
        fields: BTreeMap<String, Value>,
    ) -> Result<StoreRecord, StoreError>;
    fn update(
        &self,
        record_id: &str,
        fields: BTreeMap<String, Value>,
    ) -> Result<StoreRecord, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("store rejected the request: {0}")]
    Rejected(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// One routing decision as handed to the audit collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub signal_category: String,
    pub target: String,
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub action: RouteDecision,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_text: Option<String>,
}

/// Best-effort audit collaborator. Callers swallow failures; an erroring sink
/// must never affect routing output.
pub trait AuditSink: Send + Sync {
    fn record_routing_decision(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}

/// Audit dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit transport unavailable: {0}")]
    Transport(String),
    #[error("audit write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("audit entry not serializable: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Append-only JSONL audit log, one timestamped entry per line.
pub struct JsonlAuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlAuditLog {
    pub fn open(path: &Path) -> Result<Self, AuditError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonlAuditLog {
    fn record_routing_decision(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(&json!({
            "timestamp": Utc::now(),
            "entry": entry,
        }))?;
        line.push('\n');

        let mut file = self
            .file
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// In-memory workspace store used by the binary's serve mode and tests.
#[derive(Default)]
pub struct MemoryWorkspace {
    records: Mutex<Vec<StoreRecord>>,
    sequence: Mutex<u64>,
}

impl MemoryWorkspace {
    pub fn seed(&self, collection: &str, fields: BTreeMap<String, Value>) -> StoreRecord {
        // Seeding reuses create, which cannot fail for the memory store.
        self.create(collection, fields)
            .unwrap_or_else(|_| unreachable!("memory store create is infallible"))
    }

    fn next_id(&self, collection: &str) -> String {
        let mut sequence = self
            .sequence
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *sequence += 1;
        format!("{collection}-{:04}", *sequence)
    }
}

const COLLECTION_FIELD: &str = "__collection";

impl WorkspaceStore for MemoryWorkspace {
    fn query(&self, collection: &str, filter: &StoreFilter) -> Result<Vec<StoreRecord>, StoreError> {
        let records = self
            .records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(records
            .iter()
            .filter(|record| record.text(COLLECTION_FIELD) == Some(collection))
            .filter(|record| {
                filter
                    .iter()
                    .all(|(field, expected)| record.fields.get(field) == Some(expected))
            })
            .cloned()
            .collect())
    }

    fn create(
        &self,
        collection: &str,
        mut fields: BTreeMap<String, Value>,
    ) -> Result<StoreRecord, StoreError> {
        fields.insert(COLLECTION_FIELD.to_string(), json!(collection));
        let record = StoreRecord {
            id: self.next_id(collection),
            fields,
        };
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        records.push(record.clone());
        Ok(record)
    }

    fn update(
        &self,
        record_id: &str,
        fields: BTreeMap<String, Value>,
    ) -> Result<StoreRecord, StoreError> {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let record = records
            .iter_mut()
            .find(|record| record.id == record_id)
            .ok_or(StoreError::NotFound)?;
        record.fields.extend(fields);
        Ok(record.clone())
    }
}
