mod rules;

pub use rules::{RoutingRule, RuleEvaluationError, RulePredicate};

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use super::domain::{
    EngagementSignal, EngagementTier, FunnelStage, LeadScore, RouteDecision, RoutingResult,
    RoutingSignal, Submission, TeamRole,
};
use super::repository::{AuditEntry, AuditSink};
use super::scoring::LeadScorer;

/// Routes intake submissions to funnel stages and owning teams via a
/// priority-ordered, first-match rule walk. Stateless after construction;
/// concurrent `route` calls need no locking.
pub struct IntakeRouter {
    scorer: LeadScorer,
    rules: Vec<RoutingRule>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl Default for IntakeRouter {
    fn default() -> Self {
        Self::new(LeadScorer::default())
    }
}

impl IntakeRouter {
    pub fn new(scorer: LeadScorer) -> Self {
        Self::with_rules(scorer, rules::default_rules())
    }

    /// Build a router over a custom rule set. Rules are sorted once by
    /// descending priority; the sort is stable, so equal priorities keep
    /// their declaration order.
    pub fn with_rules(scorer: LeadScorer, mut rules: Vec<RoutingRule>) -> Self {
        rules.sort_by_key(|rule| std::cmp::Reverse(rule.priority));
        Self {
            scorer,
            rules,
            audit: None,
        }
    }

    /// Attach a best-effort audit sink. Sink failures are logged and
    /// swallowed; they never affect the returned result.
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn scorer(&self) -> &LeadScorer {
        &self.scorer
    }

    /// Route a submission with no prior engagement history.
    pub fn route(&self, submission: &Submission) -> RoutingResult {
        self.route_with_history(submission, &[])
    }

    /// Route a submission, folding prior engagement history into the decision
    /// as a lead-score signal. Never errors: a faulty rule is recorded and
    /// skipped, and a missing catch-all falls back to escalation.
    pub fn route_with_history(
        &self,
        submission: &Submission,
        history: &[EngagementSignal],
    ) -> RoutingResult {
        let mut signals = Vec::new();

        let lead_score = if history.is_empty() {
            None
        } else {
            let contact_id = submission
                .contact_id
                .as_deref()
                .unwrap_or(submission.id.as_str());
            let score = self.scorer.calculate(contact_id, history, None);
            signals.push(RoutingSignal::LeadScore {
                value: score.decayed_score,
                tier: score.tier,
            });
            Some(score)
        };

        for rule in &self.rules {
            match (rule.predicate)(submission) {
                Ok(true) => {
                    let confidence = self.confidence_for(submission, rule, lead_score.as_ref());
                    let reasoning = reasoning_for(rule, &signals);
                    let result = RoutingResult {
                        submission_id: submission.id.clone(),
                        decision: rule.decision,
                        target_stage: rule.target_stage,
                        assigned_team: rule.assigned_team,
                        confidence,
                        matched_rule: rule.name.clone(),
                        reasoning,
                        signals,
                        timestamp: Utc::now(),
                    };
                    self.record_audit(submission, &result);
                    return result;
                }
                Ok(false) => continue,
                Err(error) => {
                    warn!(rule = %rule.name, %error, "routing rule failed, continuing");
                    signals.push(RoutingSignal::RuleError {
                        rule: rule.name.clone(),
                        error: error.to_string(),
                    });
                }
            }
        }

        // Only reachable when the rule set lacks a catch-all.
        let result = RoutingResult {
            submission_id: submission.id.clone(),
            decision: RouteDecision::Escalate,
            target_stage: Some(FunnelStage::Contact),
            assigned_team: Some(TeamRole::Qualification),
            confidence: 0.0,
            matched_rule: "fallback".to_string(),
            reasoning: "No rules matched; escalating for human review".to_string(),
            signals,
            timestamp: Utc::now(),
        };
        self.record_audit(submission, &result);
        result
    }

    /// Explainable confidence estimate: base 0.5, boosted for rule
    /// specificity, lead-tier alignment, and submission completeness.
    fn confidence_for(
        &self,
        submission: &Submission,
        rule: &RoutingRule,
        lead_score: Option<&LeadScore>,
    ) -> f64 {
        let mut confidence: f64 = 0.5;

        if rule.priority >= 80 {
            confidence += 0.2;
        } else if rule.priority >= 50 {
            confidence += 0.1;
        }

        if let Some(score) = lead_score {
            if score.tier == EngagementTier::Hot && rule.decision == RouteDecision::AutoQualify {
                confidence += 0.2;
            } else if score.tier == EngagementTier::Cold && rule.decision == RouteDecision::Nurture
            {
                confidence += 0.15;
            }
        }

        let expected_fields = [
            submission.org_name.is_some(),
            submission.email.is_some(),
            submission.contact_name.is_some(),
            submission.intent_signal.is_some(),
            submission.source.is_some(),
        ];
        let completeness = expected_fields.iter().filter(|present| **present).count() as f64
            / expected_fields.len() as f64;
        confidence += completeness * 0.1;

        confidence.min(1.0)
    }

    fn record_audit(&self, submission: &Submission, result: &RoutingResult) {
        let Some(audit) = &self.audit else {
            return;
        };

        let entry = AuditEntry {
            signal_category: "informational".to_string(),
            target: result
                .assigned_team
                .map(|team| team.team().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            confidence: result.confidence,
            evidence: vec![result.matched_rule.clone(), result.reasoning.clone()],
            action: result.decision,
            session_id: result.submission_id.clone(),
            input_text: Some(format!("Intake submission {}", submission.id)),
        };

        if let Err(error) = audit.record_routing_decision(&entry) {
            warn!(%error, submission = %submission.id, "audit sink rejected routing decision");
        }
    }
}

/// Deterministic, human-readable reasoning consumed by downstream audit
/// display. Rule errors are excluded from the signal summary.
fn reasoning_for(rule: &RoutingRule, signals: &[RoutingSignal]) -> String {
    let mut parts = vec![format!("Matched rule: {}", rule.name)];

    match rule.decision {
        RouteDecision::AutoQualify => {
            parts.push("High-value signals detected, fast-tracking to qualification.".to_string());
        }
        RouteDecision::Nurture => {
            parts.push("Low intent signals, adding to nurture sequence.".to_string());
        }
        RouteDecision::Reject => {
            parts.push("Spam indicators detected, rejecting submission.".to_string());
        }
        RouteDecision::Escalate => {
            parts.push("Unclear routing criteria, escalating for human review.".to_string());
        }
        RouteDecision::StandardTriage => {}
    }

    let summary: Vec<String> = signals
        .iter()
        .filter_map(RoutingSignal::summary)
        .collect();
    if !summary.is_empty() {
        parts.push(format!("Signals: {}", summary.join(", ")));
    }

    parts.join(" ")
}
