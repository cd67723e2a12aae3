mod config;
mod decay;

pub use config::{ScoringConfigError, ScoringWeights};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::domain::{EngagementSignal, EngagementTier, LeadScore, OrgScore, SignalType};

/// Stateless engine converting engagement signals into comparable priority
/// scores. Weights recent activity higher via half-life decay and a recency
/// boost.
#[derive(Debug, Clone)]
pub struct LeadScorer {
    weights: ScoringWeights,
}

impl Default for LeadScorer {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
        }
    }
}

impl LeadScorer {
    /// Build a scorer, rejecting malformed weight/threshold tables.
    pub fn new(weights: ScoringWeights) -> Result<Self, ScoringConfigError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score a contact using the current wall clock as the reference time.
    pub fn calculate(
        &self,
        contact_id: &str,
        signals: &[EngagementSignal],
        org_id: Option<&str>,
    ) -> LeadScore {
        self.calculate_at(contact_id, signals, org_id, Utc::now())
    }

    /// Score a contact against an explicit reference time.
    pub fn calculate_at(
        &self,
        contact_id: &str,
        signals: &[EngagementSignal],
        org_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> LeadScore {
        if signals.is_empty() {
            return LeadScore {
                contact_id: contact_id.to_string(),
                org_id: org_id.map(str::to_string),
                raw_score: 0.0,
                decayed_score: 0.0,
                tier: EngagementTier::Dormant,
                signal_count: 0,
                last_activity: None,
                top_signals: Vec::new(),
                calculated_at: now,
            };
        }

        let mut raw_score = 0.0;
        let mut decayed_score = 0.0;
        let mut contributions: Vec<(SignalType, f64)> = Vec::with_capacity(signals.len());

        for signal in signals {
            let weight = f64::from(self.weights.weight_for(signal.signal_type));
            raw_score += weight;

            let age = decay::age_days(signal.timestamp, now);
            let decay = decay::decay_factor(age, self.weights.decay_half_life_days);
            let recency = decay::recency_multiplier(
                age,
                self.weights.recency_boost_days,
                self.weights.recency_boost_multiplier,
            );

            let adjusted = weight * decay * recency;
            decayed_score += adjusted;
            contributions.push((signal.signal_type, adjusted));
        }

        // Stable sort: equal contributions keep input order.
        contributions.sort_by(|a, b| b.1.total_cmp(&a.1));
        let top_signals = contributions
            .iter()
            .take(3)
            .map(|(signal_type, _)| *signal_type)
            .collect();

        let last_activity = signals.iter().map(|signal| signal.timestamp).max();

        LeadScore {
            contact_id: contact_id.to_string(),
            org_id: org_id.map(str::to_string),
            raw_score,
            decayed_score,
            tier: self.weights.tier_for(decayed_score),
            signal_count: signals.len(),
            last_activity,
            top_signals,
            calculated_at: now,
        }
    }

    /// Aggregate contact scores into an org-level score. Hot contacts weigh 3,
    /// warm 2, everything else 1; champions are the hot subset.
    pub fn calculate_org_score(&self, org_id: &str, contact_scores: &[LeadScore]) -> OrgScore {
        if contact_scores.is_empty() {
            return OrgScore {
                org_id: org_id.to_string(),
                score: 0.0,
                tier: EngagementTier::Dormant,
                contact_count: 0,
                champions: Vec::new(),
                avg_contact_score: 0.0,
            };
        }

        let champions = contact_scores
            .iter()
            .filter(|score| score.tier == EngagementTier::Hot)
            .map(|score| score.contact_id.clone())
            .collect();

        let mut total_weight = 0.0;
        let mut weighted_sum = 0.0;
        for score in contact_scores {
            let weight = match score.tier {
                EngagementTier::Hot => 3.0,
                EngagementTier::Warm => 2.0,
                _ => 1.0,
            };
            weighted_sum += score.decayed_score * weight;
            total_weight += weight;
        }

        let org_score = weighted_sum / total_weight;
        let avg_contact_score = contact_scores
            .iter()
            .map(|score| score.decayed_score)
            .sum::<f64>()
            / contact_scores.len() as f64;

        OrgScore {
            org_id: org_id.to_string(),
            score: org_score,
            tier: self.weights.tier_for(org_score),
            contact_count: contact_scores.len(),
            champions,
            avg_contact_score,
        }
    }

    /// Score multiple contacts using the current wall clock.
    pub fn batch_score(&self, leads: &BTreeMap<String, Vec<EngagementSignal>>) -> Vec<LeadScore> {
        self.batch_score_at(leads, Utc::now())
    }

    /// Score multiple contacts against a shared reference time.
    pub fn batch_score_at(
        &self,
        leads: &BTreeMap<String, Vec<EngagementSignal>>,
        now: DateTime<Utc>,
    ) -> Vec<LeadScore> {
        leads
            .iter()
            .map(|(contact_id, signals)| self.calculate_at(contact_id, signals, None, now))
            .collect()
    }

    /// Prioritize leads for outreach: optional tier filter, then descending
    /// by (decayed score, last activity), truncated to `limit`. Recency only
    /// breaks ties between equal scores.
    pub fn prioritize(
        &self,
        scores: Vec<LeadScore>,
        limit: usize,
        tier_filter: Option<EngagementTier>,
    ) -> Vec<LeadScore> {
        let mut filtered: Vec<LeadScore> = match tier_filter {
            Some(tier) => scores.into_iter().filter(|s| s.tier == tier).collect(),
            None => scores,
        };

        // Stable sort preserves submission order for fully tied leads.
        filtered.sort_by(|a, b| {
            b.decayed_score
                .total_cmp(&a.decayed_score)
                .then_with(|| b.last_activity.cmp(&a.last_activity))
        });

        filtered.truncate(limit);
        filtered
    }
}
