use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use crate::workflows::intake::domain::{EngagementSignal, SignalType, Submission};
use crate::workflows::intake::repository::{
    AuditEntry, AuditError, AuditSink, MemoryWorkspace, StoreError, StoreFilter, StoreRecord,
    WorkspaceStore,
};
use crate::workflows::intake::routing::IntakeRouter;
use crate::workflows::intake::scoring::LeadScorer;
use crate::workflows::intake::service::IntakeService;

pub(super) fn reference_time() -> DateTime<Utc> {
    "2026-08-01T12:00:00Z"
        .parse()
        .expect("valid reference time")
}

pub(super) fn signal(
    signal_type: SignalType,
    days_ago: i64,
    now: DateTime<Utc>,
) -> EngagementSignal {
    EngagementSignal::new(signal_type, now - Duration::days(days_ago))
}

/// The engagement history from the scoring scenario: one strong inbound
/// request plus a trail of older touches.
pub(super) fn scenario_signals(now: DateTime<Utc>) -> Vec<EngagementSignal> {
    vec![
        signal(SignalType::InboundRequest, 2, now),
        signal(SignalType::MeetingCompleted, 5, now),
        signal(SignalType::EmailReply, 10, now),
        signal(SignalType::EmailOpen, 15, now),
        signal(SignalType::LinkedinConnect, 30, now),
    ]
}

pub(super) fn inbound_demo_submission() -> Submission {
    Submission {
        id: "sub-001".to_string(),
        org_name: Some("Acme Corp".to_string()),
        contact_name: None,
        email: Some("ceo@acme.com".to_string()),
        source: Some("inbound".to_string()),
        intent_signal: Some("demo_request".to_string()),
        message: None,
        estimated_deal_size: Some(500_000.0),
        org_employee_count: None,
        existing_contact: false,
        contact_id: None,
    }
}

pub(super) fn spam_submission() -> Submission {
    Submission {
        id: "sub-spam".to_string(),
        org_name: None,
        contact_name: None,
        email: Some("winner@tempmail.example".to_string()),
        source: Some("referral".to_string()),
        intent_signal: None,
        message: Some("Exclusive crypto airdrop for your fund".to_string()),
        estimated_deal_size: None,
        org_employee_count: None,
        existing_contact: false,
        contact_id: None,
    }
}

pub(super) fn referral_submission() -> Submission {
    Submission {
        id: "sub-ref".to_string(),
        org_name: Some("Globex".to_string()),
        contact_name: Some("Jordan Vale".to_string()),
        email: Some("jordan@globex.com".to_string()),
        source: Some("referral".to_string()),
        intent_signal: None,
        message: None,
        estimated_deal_size: None,
        org_employee_count: Some(80),
        existing_contact: false,
        contact_id: Some("contact-77".to_string()),
    }
}

pub(super) fn build_service() -> (Arc<IntakeService<MemoryWorkspace>>, Arc<MemoryWorkspace>) {
    let store = Arc::new(MemoryWorkspace::default());
    let service = Arc::new(IntakeService::new(
        IntakeRouter::new(LeadScorer::default()),
        store.clone(),
    ));
    (service, store)
}

pub(super) fn seed_submission(
    store: &MemoryWorkspace,
    fields: &[(&str, serde_json::Value)],
) -> StoreRecord {
    let mut map = BTreeMap::new();
    map.insert("status".to_string(), json!("New"));
    for (field, value) in fields {
        map.insert((*field).to_string(), value.clone());
    }
    store.seed(crate::workflows::intake::repository::INTAKE_SUBMISSIONS, map)
}

#[derive(Default)]
pub(super) struct MemoryAudit {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAudit {
    pub(super) fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditSink for MemoryAudit {
    fn record_routing_decision(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.entries
            .lock()
            .expect("audit mutex poisoned")
            .push(entry.clone());
        Ok(())
    }
}

pub(super) struct FailingAudit;

impl AuditSink for FailingAudit {
    fn record_routing_decision(&self, _entry: &AuditEntry) -> Result<(), AuditError> {
        Err(AuditError::Transport("audit channel down".to_string()))
    }
}

/// Store whose engagement-signal collection is offline; everything else
/// delegates to the in-memory store.
pub(super) struct FlakySignalStore {
    pub(super) inner: MemoryWorkspace,
}

impl WorkspaceStore for FlakySignalStore {
    fn query(&self, collection: &str, filter: &StoreFilter) -> Result<Vec<StoreRecord>, StoreError> {
        if collection == crate::workflows::intake::repository::ENGAGEMENT_SIGNALS {
            return Err(StoreError::Unavailable("signal index offline".to_string()));
        }
        self.inner.query(collection, filter)
    }

    fn create(
        &self,
        collection: &str,
        fields: BTreeMap<String, serde_json::Value>,
    ) -> Result<StoreRecord, StoreError> {
        self.inner.create(collection, fields)
    }

    fn update(
        &self,
        record_id: &str,
        fields: BTreeMap<String, serde_json::Value>,
    ) -> Result<StoreRecord, StoreError> {
        self.inner.update(record_id, fields)
    }
}

/// Store that refuses every request, for hard-failure paths.
pub(super) struct OfflineStore;

impl WorkspaceStore for OfflineStore {
    fn query(
        &self,
        _collection: &str,
        _filter: &StoreFilter,
    ) -> Result<Vec<StoreRecord>, StoreError> {
        Err(StoreError::Unavailable("workspace offline".to_string()))
    }

    fn create(
        &self,
        _collection: &str,
        _fields: BTreeMap<String, serde_json::Value>,
    ) -> Result<StoreRecord, StoreError> {
        Err(StoreError::Unavailable("workspace offline".to_string()))
    }

    fn update(
        &self,
        _record_id: &str,
        _fields: BTreeMap<String, serde_json::Value>,
    ) -> Result<StoreRecord, StoreError> {
        Err(StoreError::Unavailable("workspace offline".to_string()))
    }
}
