//! BD intake pipeline: engagement scoring, rule-based funnel routing, and the
//! workspace-store triage service.

pub mod domain;
pub mod repository;
pub mod router;
pub mod routing;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    EngagementSignal, EngagementTier, FunnelStage, IntakeStatus, LeadScore, OrgScore,
    RouteDecision, RoutingResult, RoutingSignal, SignalType, Submission, TeamRole,
};
pub use repository::{
    AuditEntry, AuditError, AuditSink, JsonlAuditLog, MemoryWorkspace, StoreError, StoreFilter,
    StoreRecord, WorkspaceStore, ENGAGEMENT_SIGNALS, FUNNEL_TRACKER, INTAKE_SUBMISSIONS,
};
pub use router::intake_router;
pub use routing::{IntakeRouter, RoutingRule, RuleEvaluationError};
pub use scoring::{LeadScorer, ScoringConfigError, ScoringWeights};
pub use service::{IntakeService, IntakeServiceError};
