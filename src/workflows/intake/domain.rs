use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Engagement event kinds recognized by the scoring engine. Anything else
/// deserializes to `Unknown` and scores zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    EmailOpen,
    EmailReply,
    MeetingScheduled,
    MeetingCompleted,
    WebsiteVisit,
    ContentDownload,
    LinkedinConnect,
    LinkedinEngage,
    Referral,
    InboundRequest,
    DealStageAdvance,
    #[serde(other)]
    Unknown,
}

impl SignalType {
    pub const fn label(self) -> &'static str {
        match self {
            SignalType::EmailOpen => "email_open",
            SignalType::EmailReply => "email_reply",
            SignalType::MeetingScheduled => "meeting_scheduled",
            SignalType::MeetingCompleted => "meeting_completed",
            SignalType::WebsiteVisit => "website_visit",
            SignalType::ContentDownload => "content_download",
            SignalType::LinkedinConnect => "linkedin_connect",
            SignalType::LinkedinEngage => "linkedin_engage",
            SignalType::Referral => "referral",
            SignalType::InboundRequest => "inbound_request",
            SignalType::DealStageAdvance => "deal_stage_advance",
            SignalType::Unknown => "unknown",
        }
    }
}

fn default_signal_source() -> String {
    "unknown".to_string()
}

/// A single timestamped engagement event. Immutable scoring input produced by
/// upstream activity capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementSignal {
    pub signal_type: SignalType,
    pub timestamp: DateTime<Utc>,
    #[serde(default = "default_signal_source")]
    pub source: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl EngagementSignal {
    pub fn new(signal_type: SignalType, timestamp: DateTime<Utc>) -> Self {
        Self {
            signal_type,
            timestamp,
            source: default_signal_source(),
            metadata: BTreeMap::new(),
        }
    }
}

/// Categorical engagement bucket derived from a decayed score via thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementTier {
    Hot,
    Warm,
    Cold,
    Dormant,
}

impl EngagementTier {
    pub const fn label(self) -> &'static str {
        match self {
            EngagementTier::Hot => "hot",
            EngagementTier::Warm => "warm",
            EngagementTier::Cold => "cold",
            EngagementTier::Dormant => "dormant",
        }
    }
}

/// Calculated score for one contact. Derived and immutable; recomputed on
/// demand rather than persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadScore {
    pub contact_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    pub raw_score: f64,
    pub decayed_score: f64,
    pub tier: EngagementTier,
    pub signal_count: usize,
    pub last_activity: Option<DateTime<Utc>>,
    pub top_signals: Vec<SignalType>,
    pub calculated_at: DateTime<Utc>,
}

/// Org-level aggregate of contact scores, champion-weighted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgScore {
    pub org_id: String,
    pub score: f64,
    pub tier: EngagementTier,
    pub contact_count: usize,
    pub champions: Vec<String>,
    pub avg_contact_score: f64,
}

/// BD funnel stages mirroring the workspace database select options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStage {
    Contact,
    Qualification,
    Diligence,
    Closing,
    Won,
    Lost,
}

impl FunnelStage {
    /// Label as stored in the workspace database.
    pub const fn label(self) -> &'static str {
        match self {
            FunnelStage::Contact => "A–Contact",
            FunnelStage::Qualification => "B–Qualification",
            FunnelStage::Diligence => "C–Diligence",
            FunnelStage::Closing => "D–Closing",
            FunnelStage::Won => "Won",
            FunnelStage::Lost => "Lost",
        }
    }
}

/// Intake record statuses tracked in the submissions collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeStatus {
    New,
    Triaged,
    Processed,
    Rejected,
}

impl IntakeStatus {
    pub const fn label(self) -> &'static str {
        match self {
            IntakeStatus::New => "New",
            IntakeStatus::Triaged => "Triaged",
            IntakeStatus::Processed => "Processed",
            IntakeStatus::Rejected => "Rejected",
        }
    }
}

/// Routing decision categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteDecision {
    AutoQualify,
    StandardTriage,
    Nurture,
    Reject,
    Escalate,
}

impl RouteDecision {
    pub const fn label(self) -> &'static str {
        match self {
            RouteDecision::AutoQualify => "auto_qualify",
            RouteDecision::StandardTriage => "standard_triage",
            RouteDecision::Nurture => "nurture",
            RouteDecision::Reject => "reject",
            RouteDecision::Escalate => "escalate",
        }
    }
}

/// Owning teams submissions can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    Outreach,
    Research,
    Qualification,
    Closing,
}

impl TeamRole {
    /// Display name of the owning team in the workspace database.
    pub const fn team(self) -> &'static str {
        match self {
            TeamRole::Outreach => "Liaison Team",
            TeamRole::Research => "Research Team",
            TeamRole::Qualification => "Sales Growth Engine",
            TeamRole::Closing => "IC Committee",
        }
    }
}

/// An intake form submission as seen by the router. Every field is optional
/// so arbitrary upstream payloads deserialize without error; the rules decide
/// what absence means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub org_name: Option<String>,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub intent_signal: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub estimated_deal_size: Option<f64>,
    #[serde(default)]
    pub org_employee_count: Option<u32>,
    #[serde(default)]
    pub existing_contact: bool,
    #[serde(default)]
    pub contact_id: Option<String>,
}

impl Submission {
    pub fn source_is(&self, expected: &str) -> bool {
        self.source.as_deref() == Some(expected)
    }
}

/// Evidence gathered while routing one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoutingSignal {
    LeadScore { value: f64, tier: EngagementTier },
    RuleError { rule: String, error: String },
}

impl RoutingSignal {
    /// Short form used in the reasoning string. Errors are excluded there.
    pub fn summary(&self) -> Option<String> {
        match self {
            RoutingSignal::LeadScore { value, tier } => {
                Some(format!("lead_score={value:.1} ({})", tier.label()))
            }
            RoutingSignal::RuleError { .. } => None,
        }
    }
}

/// Outcome of routing one submission. Produced exactly once per `route` call
/// and owned by the caller for persistence and audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingResult {
    pub submission_id: String,
    pub decision: RouteDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_stage: Option<FunnelStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_team: Option<TeamRole>,
    pub confidence: f64,
    pub matched_rule: String,
    pub reasoning: String,
    pub signals: Vec<RoutingSignal>,
    pub timestamp: DateTime<Utc>,
}
