use serde::{Deserialize, Serialize};

use super::super::domain::{EngagementTier, SignalType};

/// Scoring configuration: per-signal point weights, decay and recency-boost
/// parameters, and the tier thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    // Activity points
    pub email_open: u32,
    pub email_reply: u32,
    pub meeting_scheduled: u32,
    pub meeting_completed: u32,
    pub website_visit: u32,
    pub content_download: u32,
    pub linkedin_connect: u32,
    pub linkedin_engage: u32,
    pub referral: u32,
    pub inbound_request: u32,
    pub deal_stage_advance: u32,

    // Decay settings
    pub decay_half_life_days: f64,
    pub recency_boost_days: f64,
    pub recency_boost_multiplier: f64,

    // Tier thresholds, inclusive lower bounds
    pub hot_threshold: f64,
    pub warm_threshold: f64,
    pub cold_threshold: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            email_open: 1,
            email_reply: 10,
            meeting_scheduled: 15,
            meeting_completed: 25,
            website_visit: 2,
            content_download: 5,
            linkedin_connect: 3,
            linkedin_engage: 5,
            referral: 30,
            inbound_request: 40,
            deal_stage_advance: 20,
            decay_half_life_days: 30.0,
            recency_boost_days: 7.0,
            recency_boost_multiplier: 1.5,
            hot_threshold: 80.0,
            warm_threshold: 40.0,
            cold_threshold: 10.0,
        }
    }
}

impl ScoringWeights {
    /// Point weight for a signal type. Unrecognized types contribute nothing.
    pub fn weight_for(&self, signal_type: SignalType) -> u32 {
        match signal_type {
            SignalType::EmailOpen => self.email_open,
            SignalType::EmailReply => self.email_reply,
            SignalType::MeetingScheduled => self.meeting_scheduled,
            SignalType::MeetingCompleted => self.meeting_completed,
            SignalType::WebsiteVisit => self.website_visit,
            SignalType::ContentDownload => self.content_download,
            SignalType::LinkedinConnect => self.linkedin_connect,
            SignalType::LinkedinEngage => self.linkedin_engage,
            SignalType::Referral => self.referral,
            SignalType::InboundRequest => self.inbound_request,
            SignalType::DealStageAdvance => self.deal_stage_advance,
            SignalType::Unknown => 0,
        }
    }

    /// Classify a decayed score, hot first. Thresholds are inclusive lower
    /// bounds.
    pub fn tier_for(&self, score: f64) -> EngagementTier {
        if score >= self.hot_threshold {
            EngagementTier::Hot
        } else if score >= self.warm_threshold {
            EngagementTier::Warm
        } else if score >= self.cold_threshold {
            EngagementTier::Cold
        } else {
            EngagementTier::Dormant
        }
    }

    /// Validate the static configuration. Invalid tables are fatal at scorer
    /// construction.
    pub fn validate(&self) -> Result<(), ScoringConfigError> {
        if !(self.decay_half_life_days.is_finite() && self.decay_half_life_days > 0.0) {
            return Err(ScoringConfigError::InvalidHalfLife(
                self.decay_half_life_days,
            ));
        }
        if !(self.recency_boost_days.is_finite() && self.recency_boost_days >= 0.0) {
            return Err(ScoringConfigError::InvalidBoostWindow(
                self.recency_boost_days,
            ));
        }
        if !(self.recency_boost_multiplier.is_finite() && self.recency_boost_multiplier >= 0.0) {
            return Err(ScoringConfigError::InvalidBoostMultiplier(
                self.recency_boost_multiplier,
            ));
        }
        let ascending = self.cold_threshold < self.warm_threshold
            && self.warm_threshold < self.hot_threshold;
        if !ascending
            || !self.cold_threshold.is_finite()
            || !self.warm_threshold.is_finite()
            || !self.hot_threshold.is_finite()
        {
            return Err(ScoringConfigError::ThresholdsNotAscending {
                cold: self.cold_threshold,
                warm: self.warm_threshold,
                hot: self.hot_threshold,
            });
        }
        Ok(())
    }
}

/// Configuration errors raised when building a scorer.
#[derive(Debug, thiserror::Error)]
pub enum ScoringConfigError {
    #[error("decay half-life must be a positive number of days, got {0}")]
    InvalidHalfLife(f64),
    #[error("recency boost window must be a non-negative number of days, got {0}")]
    InvalidBoostWindow(f64),
    #[error("recency boost multiplier must be finite and non-negative, got {0}")]
    InvalidBoostMultiplier(f64),
    #[error("tier thresholds must be strictly ascending (cold {cold} < warm {warm} < hot {hot})")]
    ThresholdsNotAscending { cold: f64, warm: f64, hot: f64 },
}
