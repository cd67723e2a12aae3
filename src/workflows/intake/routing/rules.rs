//! The default routing rule table: ordered data, not branching code, so the
//! rule set can be tested or replaced independently of the evaluation loop.

use super::super::domain::{FunnelStage, RouteDecision, Submission, TeamRole};

/// A predicate failure inside one rule. Recovered by the router: the rule is
/// skipped and evaluation continues.
#[derive(Debug, thiserror::Error)]
#[error("rule predicate failed: {0}")]
pub struct RuleEvaluationError(pub String);

pub type RulePredicate = Box<dyn Fn(&Submission) -> Result<bool, RuleEvaluationError> + Send + Sync>;

/// A named, prioritized predicate-to-decision mapping. Higher priority is
/// checked first; ties keep declaration order.
pub struct RoutingRule {
    pub name: String,
    pub predicate: RulePredicate,
    pub decision: RouteDecision,
    pub target_stage: Option<FunnelStage>,
    pub assigned_team: Option<TeamRole>,
    pub priority: i32,
}

impl RoutingRule {
    pub fn new(
        name: &str,
        priority: i32,
        decision: RouteDecision,
        predicate: impl Fn(&Submission) -> Result<bool, RuleEvaluationError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            predicate: Box::new(predicate),
            decision,
            target_stage: None,
            assigned_team: None,
            priority,
        }
    }

    pub fn stage(mut self, stage: FunnelStage) -> Self {
        self.target_stage = Some(stage);
        self
    }

    pub fn team(mut self, team: TeamRole) -> Self {
        self.assigned_team = Some(team);
        self
    }
}

impl std::fmt::Debug for RoutingRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingRule")
            .field("name", &self.name)
            .field("decision", &self.decision)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

const DISPOSABLE_EMAIL_DOMAINS: [&str; 4] = ["mailinator", "tempmail", "throwaway", "test.com"];

const SPAM_KEYWORDS: [&str; 4] = [
    "viagra",
    "crypto airdrop",
    "nigerian prince",
    "mlm opportunity",
];

/// Deal size in dollars: explicit when provided, otherwise tiered by org
/// headcount.
pub(crate) fn estimate_deal_size(submission: &Submission) -> f64 {
    if let Some(size) = submission.estimated_deal_size {
        return size;
    }

    match submission.org_employee_count.unwrap_or(0) {
        count if count > 1000 => 500_000.0,
        count if count > 100 => 100_000.0,
        count if count > 10 => 25_000.0,
        _ => 10_000.0,
    }
}

/// Absent or blank intent. Intake forms submit empty strings for untouched
/// fields, which must read the same as a missing field.
fn blank_intent(submission: &Submission) -> bool {
    submission
        .intent_signal
        .as_deref()
        .map_or(true, |intent| intent.trim().is_empty())
}

fn missing_org_name(submission: &Submission) -> bool {
    submission
        .org_name
        .as_deref()
        .map_or(true, |name| name.trim().is_empty())
}

fn disposable_email(submission: &Submission) -> bool {
    let email = submission.email.as_deref().unwrap_or_default();
    DISPOSABLE_EMAIL_DOMAINS
        .iter()
        .any(|domain| email.contains(domain))
}

fn spam_keywords(submission: &Submission) -> bool {
    let message = submission
        .message
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    SPAM_KEYWORDS.iter().any(|word| message.contains(word))
}

/// Count of independent spam indicators; two or more reject the submission.
pub(crate) fn spam_indicator_count(submission: &Submission) -> usize {
    [
        missing_org_name(submission),
        disposable_email(submission),
        spam_keywords(submission),
    ]
    .into_iter()
    .filter(|hit| *hit)
    .count()
}

pub(crate) fn is_spam(submission: &Submission) -> bool {
    spam_indicator_count(submission) >= 2
}

const CLEAR_INTENTS: [&str; 3] = ["demo_request", "pricing_inquiry", "partnership"];

/// The default ruleset. Declaration order only matters for equal priorities;
/// the router sorts by descending priority before evaluation.
pub(crate) fn default_rules() -> Vec<RoutingRule> {
    vec![
        // Spam indicators → reject, checked first after the sort.
        RoutingRule::new("spam_filter", 200, RouteDecision::Reject, |s| {
            Ok(is_spam(s))
        }),
        // High-value inbound → fast-track.
        RoutingRule::new("inbound_high_value", 100, RouteDecision::AutoQualify, |s| {
            Ok(s.source_is("inbound") && estimate_deal_size(s) >= 1_000_000.0)
        })
        .stage(FunnelStage::Qualification)
        .team(TeamRole::Qualification),
        // Referral → fast-track.
        RoutingRule::new("referral", 90, RouteDecision::AutoQualify, |s| {
            Ok(s.source_is("referral"))
        })
        .stage(FunnelStage::Qualification)
        .team(TeamRole::Qualification),
        // Known org with an existing relationship.
        RoutingRule::new(
            "existing_relationship",
            80,
            RouteDecision::StandardTriage,
            |s| Ok(s.existing_contact),
        )
        .stage(FunnelStage::Qualification)
        .team(TeamRole::Qualification),
        // Inbound with recognized intent.
        RoutingRule::new(
            "inbound_clear_intent",
            70,
            RouteDecision::StandardTriage,
            |s| {
                Ok(s.source_is("inbound")
                    && s.intent_signal
                        .as_deref()
                        .is_some_and(|intent| CLEAR_INTENTS.contains(&intent)))
            },
        )
        .stage(FunnelStage::Contact)
        .team(TeamRole::Outreach),
        // Outbound research target.
        RoutingRule::new("research_target", 60, RouteDecision::StandardTriage, |s| {
            Ok(s.source_is("research_identified"))
        })
        .stage(FunnelStage::Contact)
        .team(TeamRole::Research),
        // Low-signal inbound → nurture drip.
        RoutingRule::new("low_signal_inbound", 30, RouteDecision::Nurture, |s| {
            Ok(s.source_is("inbound") && blank_intent(s))
        })
        .stage(FunnelStage::Contact)
        .team(TeamRole::Outreach),
        // Unclear → escalate for human review. The unconditional catch-all
        // guarantees totality of the match.
        RoutingRule::new("escalate_unclear", 0, RouteDecision::Escalate, |_| Ok(true))
            .stage(FunnelStage::Contact)
            .team(TeamRole::Qualification),
    ]
}
