use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::domain::{
    EngagementSignal, IntakeStatus, LeadScore, RouteDecision, RoutingResult, Submission,
};
use super::repository::{
    StoreError, StoreRecord, WorkspaceStore, ENGAGEMENT_SIGNALS, FUNNEL_TRACKER,
    INTAKE_SUBMISSIONS,
};
use super::routing::IntakeRouter;

/// Service composing the rule router and the workspace-store collaborator.
/// The routing decision logic never depends on the store's record shape; the
/// store is consulted only for history lookup and write-back side effects.
pub struct IntakeService<S> {
    router: IntakeRouter,
    store: Arc<S>,
}

impl<S> IntakeService<S>
where
    S: WorkspaceStore + 'static,
{
    pub fn new(router: IntakeRouter, store: Arc<S>) -> Self {
        Self { router, store }
    }

    pub fn router(&self) -> &IntakeRouter {
        &self.router
    }

    /// Score an ad-hoc signal set against an explicit reference time.
    pub fn score_signals(
        &self,
        contact_id: &str,
        signals: &[EngagementSignal],
        org_id: Option<&str>,
        reference_time: Option<DateTime<Utc>>,
    ) -> LeadScore {
        match reference_time {
            Some(now) => self
                .router
                .scorer()
                .calculate_at(contact_id, signals, org_id, now),
            None => self.router.scorer().calculate(contact_id, signals, org_id),
        }
    }

    /// Route one submission, folding in any engagement history recorded for
    /// its contact. A history lookup failure downgrades to an empty history.
    pub fn route_submission(&self, submission: &Submission) -> RoutingResult {
        let history = self.engagement_history(submission);
        self.router.route_with_history(submission, &history)
    }

    fn engagement_history(&self, submission: &Submission) -> Vec<EngagementSignal> {
        let Some(contact_id) = submission.contact_id.as_deref() else {
            return Vec::new();
        };

        let mut filter = BTreeMap::new();
        filter.insert("contact_id".to_string(), json!(contact_id));

        let records = match self.store.query(ENGAGEMENT_SIGNALS, &filter) {
            Ok(records) => records,
            Err(error) => {
                warn!(%error, %contact_id, "engagement history unavailable, routing without it");
                return Vec::new();
            }
        };

        records
            .into_iter()
            .filter_map(|record| signal_from_record(&record))
            .collect()
    }

    /// Pull unprocessed submissions, route each, write back status and
    /// decision, and open a funnel record unless rejected. Write-back
    /// failures are logged without dropping the routing result; only the
    /// initial query is a hard error.
    pub fn process_new_submissions(&self) -> Result<Vec<RoutingResult>, IntakeServiceError> {
        let mut filter = BTreeMap::new();
        filter.insert("status".to_string(), json!(IntakeStatus::New.label()));

        let pending = self.store.query(INTAKE_SUBMISSIONS, &filter)?;
        info!(count = pending.len(), "processing new intake submissions");

        let mut results = Vec::with_capacity(pending.len());
        for record in pending {
            let submission = submission_from_record(&record);
            let result = self.route_submission(&submission);

            self.write_back(&record, &submission, &result);
            results.push(result);
        }

        Ok(results)
    }

    fn write_back(&self, record: &StoreRecord, submission: &Submission, result: &RoutingResult) {
        let status = if result.decision == RouteDecision::Reject {
            IntakeStatus::Rejected
        } else {
            IntakeStatus::Triaged
        };

        let mut updates = BTreeMap::new();
        updates.insert("status".to_string(), json!(status.label()));
        updates.insert(
            "routing_decision".to_string(),
            json!(truncated(&result.reasoning, 200)),
        );
        updates.insert("routing_confidence".to_string(), json!(result.confidence));
        updates.insert("routed_at".to_string(), json!(result.timestamp));

        if let Err(error) = self.store.update(&record.id, updates) {
            warn!(%error, submission = %record.id, "failed to update intake status");
        }

        if result.decision == RouteDecision::Reject {
            return;
        }
        let Some(stage) = result.target_stage else {
            return;
        };

        let mut fields = BTreeMap::new();
        fields.insert(
            "name".to_string(),
            json!(submission.org_name.as_deref().unwrap_or("Unknown")),
        );
        fields.insert("stage".to_string(), json!(stage.label()));
        fields.insert(
            "owner".to_string(),
            json!(result.assigned_team.map(|team| team.team())),
        );
        fields.insert("source_submission".to_string(), json!(record.id));
        fields.insert("routing_confidence".to_string(), json!(result.confidence));
        fields.insert("created".to_string(), json!(result.timestamp));

        if let Err(error) = self.store.create(FUNNEL_TRACKER, fields) {
            warn!(%error, submission = %record.id, "failed to create funnel record");
        }
    }
}

fn truncated(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Map a store record onto the typed submission the rules evaluate. Missing
/// or malformed fields become absent rather than errors.
pub(crate) fn submission_from_record(record: &StoreRecord) -> Submission {
    Submission {
        id: record.id.clone(),
        org_name: record.text("org_name").map(str::to_string),
        contact_name: record.text("contact_name").map(str::to_string),
        email: record.text("email").map(str::to_string),
        source: record.text("source").map(str::to_string),
        intent_signal: record.text("intent_signal").map(str::to_string),
        message: record.text("message").map(str::to_string),
        estimated_deal_size: record.number("estimated_deal_size"),
        org_employee_count: record
            .number("org_employee_count")
            .map(|count| count.max(0.0) as u32),
        existing_contact: record.boolean("existing_contact"),
        contact_id: record.text("contact_id").map(str::to_string),
    }
}

fn signal_from_record(record: &StoreRecord) -> Option<EngagementSignal> {
    let value = Value::Object(
        record
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    );
    serde_json::from_value(value).ok()
}

/// Error raised by the intake service.
#[derive(Debug, thiserror::Error)]
pub enum IntakeServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
}
