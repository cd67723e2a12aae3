//! Per-session resource accounting: token, API-call, runtime, and persona
//! consumption against configurable ceilings, with crash-resume persistence.
//!
//! Limit breaches are reported through [`LimitCheck`], never raised as
//! errors; the owning runner decides whether to halt. Only persistence I/O
//! surfaces as [`TrackerError`].

mod state;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use state::SessionState;

/// Hard and soft ceilings for one agent session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceBudget {
    pub max_tokens: u64,
    pub max_api_calls: u32,
    pub max_runtime_seconds: u64,
    pub max_retries_per_step: u32,
    pub max_personas: usize,

    // Soft limits: warn without flipping `ok`.
    pub warn_at_token_pct: f64,
    pub warn_at_time_pct: f64,
}

impl Default for ResourceBudget {
    fn default() -> Self {
        Self::standard()
    }
}

impl ResourceBudget {
    /// Minimal budget for smoke tests.
    pub fn dry_run() -> Self {
        Self {
            max_tokens: 20_000,
            max_api_calls: 10,
            max_runtime_seconds: 300,
            max_retries_per_step: 2,
            max_personas: 3,
            warn_at_token_pct: 0.7,
            warn_at_time_pct: 0.8,
        }
    }

    /// Standard overnight run.
    pub fn standard() -> Self {
        Self {
            max_tokens: 100_000,
            max_api_calls: 50,
            max_runtime_seconds: 600,
            max_retries_per_step: 2,
            max_personas: 5,
            warn_at_token_pct: 0.7,
            warn_at_time_pct: 0.8,
        }
    }

    /// Resource-intensive run.
    pub fn heavy() -> Self {
        Self {
            max_tokens: 500_000,
            max_api_calls: 200,
            max_runtime_seconds: 1_800,
            max_retries_per_step: 2,
            max_personas: 10,
            warn_at_token_pct: 0.7,
            warn_at_time_pct: 0.8,
        }
    }
}

/// Current consumption counters. Monotonically non-decreasing between start
/// and stop, except `personas_loaded` which is append-if-absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub tokens_used: u64,
    pub api_calls_made: u32,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub personas_loaded: Vec<String>,
    pub steps_completed: u32,
    pub steps_failed: u32,
    pub retries_total: u32,
}

impl ResourceUsage {
    /// Wall-clock runtime; frozen at the stop timestamp once `stop` was
    /// called, zero before `start`.
    pub fn runtime_seconds(&self, now: DateTime<Utc>) -> f64 {
        let Some(start) = self.start_time else {
            return 0.0;
        };
        let end = self.end_time.unwrap_or(now);
        (end - start).num_milliseconds() as f64 / 1_000.0
    }
}

/// Structured limit-check result returned by every mutating operation.
/// `ok = false` iff a hard ceiling is met or exceeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitCheck {
    pub ok: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Full session summary for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub budget: ResourceBudget,
    pub usage: ResourceUsage,
    pub status: LimitCheck,
    pub tokens_per_step: f64,
    pub success_rate: f64,
    pub retry_rate: f64,
}

/// Persistence I/O failures. Limit conditions are never errors.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("tracker state io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("tracker state not parseable: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Tracks and reports resource consumption for one session. Thread-safe: all
/// mutating operations hold one lock across the read-modify-persist sequence,
/// so the on-disk snapshot is consistent after every mutation.
pub struct ResourceTracker {
    session_id: String,
    budget: ResourceBudget,
    usage: Mutex<ResourceUsage>,
    state_file: Option<PathBuf>,
}

impl ResourceTracker {
    /// Tracker without disk persistence.
    pub fn ephemeral(session_id: &str, budget: ResourceBudget) -> Self {
        Self {
            session_id: session_id.to_string(),
            budget,
            usage: Mutex::new(ResourceUsage::default()),
            state_file: None,
        }
    }

    /// Tracker persisted under `state_dir`, keyed by session id. When a
    /// snapshot for the session already exists, its budget and usage are
    /// reloaded verbatim so a crashed run resumes where it left off.
    pub fn persistent(
        session_id: &str,
        budget: ResourceBudget,
        state_dir: &Path,
    ) -> Result<Self, TrackerError> {
        std::fs::create_dir_all(state_dir)?;
        let state_file = state_dir.join(format!("{session_id}.json"));

        let (budget, usage) = match state::load(&state_file)? {
            Some(snapshot) => (snapshot.budget, snapshot.usage),
            None => (budget, ResourceUsage::default()),
        };

        Ok(Self {
            session_id: session_id.to_string(),
            budget,
            usage: Mutex::new(usage),
            state_file: Some(state_file),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn budget(&self) -> &ResourceBudget {
        &self.budget
    }

    pub fn usage(&self) -> ResourceUsage {
        self.lock_usage().clone()
    }

    /// Mark session start. Idempotent: a resumed session keeps its original
    /// start time.
    pub fn start(&self) -> Result<(), TrackerError> {
        let mut usage = self.lock_usage();
        if usage.start_time.is_none() {
            usage.start_time = Some(Utc::now());
            self.persist(&usage)?;
        }
        Ok(())
    }

    /// Mark session end, freezing the runtime clock.
    pub fn stop(&self) -> Result<(), TrackerError> {
        let mut usage = self.lock_usage();
        usage.end_time = Some(Utc::now());
        self.persist(&usage)
    }

    pub fn add_tokens(&self, count: u64) -> Result<LimitCheck, TrackerError> {
        let mut usage = self.lock_usage();
        usage.tokens_used += count;
        self.persist(&usage)?;
        Ok(check_limits(&self.budget, &usage, Utc::now()))
    }

    pub fn add_api_call(&self) -> Result<LimitCheck, TrackerError> {
        let mut usage = self.lock_usage();
        usage.api_calls_made += 1;
        self.persist(&usage)?;
        Ok(check_limits(&self.budget, &usage, Utc::now()))
    }

    /// Track a persona load; loading the same persona twice counts once.
    pub fn load_persona(&self, persona_id: &str) -> Result<LimitCheck, TrackerError> {
        let mut usage = self.lock_usage();
        if !usage.personas_loaded.iter().any(|p| p == persona_id) {
            usage.personas_loaded.push(persona_id.to_string());
        }
        self.persist(&usage)?;
        Ok(check_limits(&self.budget, &usage, Utc::now()))
    }

    pub fn complete_step(&self, success: bool, retries: u32) -> Result<LimitCheck, TrackerError> {
        let mut usage = self.lock_usage();
        if success {
            usage.steps_completed += 1;
        } else {
            usage.steps_failed += 1;
        }
        usage.retries_total += retries;
        self.persist(&usage)?;
        Ok(check_limits(&self.budget, &usage, Utc::now()))
    }

    /// Non-mutating limit check.
    pub fn check(&self) -> LimitCheck {
        let usage = self.lock_usage();
        check_limits(&self.budget, &usage, Utc::now())
    }

    /// Advisory: the owning runner terminates work in response, nothing here
    /// does.
    pub fn can_continue(&self) -> bool {
        self.check().ok
    }

    pub fn summary(&self) -> SessionSummary {
        let usage = self.lock_usage().clone();
        let status = check_limits(&self.budget, &usage, Utc::now());
        let attempted = u64::from(usage.steps_completed + usage.steps_failed).max(1);

        SessionSummary {
            session_id: self.session_id.clone(),
            budget: self.budget.clone(),
            usage: usage.clone(),
            status,
            tokens_per_step: usage.tokens_used as f64 / u64::from(usage.steps_completed).max(1) as f64,
            success_rate: f64::from(usage.steps_completed) / attempted as f64,
            retry_rate: f64::from(usage.retries_total) / attempted as f64,
        }
    }

    /// Delete the state file. Call only after a session closed successfully.
    pub fn cleanup(&self) -> Result<(), TrackerError> {
        if let Some(path) = &self.state_file {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    fn lock_usage(&self) -> std::sync::MutexGuard<'_, ResourceUsage> {
        self.usage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, usage: &ResourceUsage) -> Result<(), TrackerError> {
        let Some(path) = &self.state_file else {
            return Ok(());
        };
        state::save(
            path,
            &SessionState {
                session_id: self.session_id.clone(),
                budget: self.budget.clone(),
                usage: usage.clone(),
                last_updated: Utc::now(),
            },
        )
    }
}

/// Pure limit evaluation so the thresholds stay unit-testable without clocks
/// or disks.
fn check_limits(budget: &ResourceBudget, usage: &ResourceUsage, now: DateTime<Utc>) -> LimitCheck {
    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    let token_pct = usage.tokens_used as f64 / budget.max_tokens as f64;
    if usage.tokens_used >= budget.max_tokens {
        errors.push(format!("Token limit exceeded: {}", usage.tokens_used));
    } else if token_pct >= budget.warn_at_token_pct {
        warnings.push(format!("Token usage at {:.0}%", token_pct * 100.0));
    }

    if usage.api_calls_made >= budget.max_api_calls {
        errors.push(format!("API call limit exceeded: {}", usage.api_calls_made));
    }

    let runtime = usage.runtime_seconds(now);
    let runtime_pct = runtime / budget.max_runtime_seconds as f64;
    if runtime >= budget.max_runtime_seconds as f64 {
        errors.push(format!("Runtime limit exceeded: {runtime:.0}s"));
    } else if runtime_pct >= budget.warn_at_time_pct {
        warnings.push(format!("Runtime at {:.0}%", runtime_pct * 100.0));
    }

    if usage.personas_loaded.len() >= budget.max_personas {
        errors.push(format!(
            "Persona limit exceeded: {}",
            usage.personas_loaded.len()
        ));
    }

    LimitCheck {
        ok: errors.is_empty(),
        warnings,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn fresh_tracker_is_within_limits() {
        let tracker = ResourceTracker::ephemeral("t-1", ResourceBudget::dry_run());
        let check = tracker.check();
        assert!(check.ok);
        assert!(check.warnings.is_empty());
        assert!(check.errors.is_empty());
    }

    #[test]
    fn token_ceiling_flips_ok_when_met() {
        let tracker = ResourceTracker::ephemeral("t-2", ResourceBudget::dry_run());
        let check = tracker.add_tokens(20_000).expect("no persistence");
        assert!(!check.ok);
        assert!(check.errors.iter().any(|e| e.contains("Token limit")));
        assert!(!tracker.can_continue());
    }

    #[test]
    fn soft_token_warning_does_not_flip_ok() {
        let tracker = ResourceTracker::ephemeral("t-3", ResourceBudget::dry_run());
        let check = tracker.add_tokens(15_000).expect("no persistence");
        assert!(check.ok);
        assert!(check.warnings.iter().any(|w| w.contains("Token usage")));
    }

    #[test]
    fn api_call_ceiling_is_met_or_exceeded() {
        let tracker = ResourceTracker::ephemeral("t-4", ResourceBudget::dry_run());
        for _ in 0..9 {
            assert!(tracker.add_api_call().expect("no persistence").ok);
        }
        assert!(!tracker.add_api_call().expect("no persistence").ok);
    }

    #[test]
    fn persona_loads_are_deduplicated() {
        let tracker = ResourceTracker::ephemeral("t-5", ResourceBudget::dry_run());
        tracker.load_persona("navigator").expect("no persistence");
        tracker.load_persona("navigator").expect("no persistence");
        assert_eq!(tracker.usage().personas_loaded.len(), 1);
    }

    #[test]
    fn runtime_freezes_after_stop() {
        let mut usage = ResourceUsage::default();
        let start = Utc::now() - Duration::seconds(120);
        usage.start_time = Some(start);
        usage.end_time = Some(start + Duration::seconds(30));

        let frozen = usage.runtime_seconds(Utc::now());
        assert!((frozen - 30.0).abs() < 0.5);
    }

    #[test]
    fn runtime_limit_reports_error() {
        let mut usage = ResourceUsage::default();
        usage.start_time = Some(Utc::now() - Duration::seconds(400));

        let check = check_limits(&ResourceBudget::dry_run(), &usage, Utc::now());
        assert!(!check.ok);
        assert!(check.errors.iter().any(|e| e.contains("Runtime limit")));
    }

    #[test]
    fn summary_reports_efficiency_ratios() {
        let tracker = ResourceTracker::ephemeral("t-6", ResourceBudget::standard());
        tracker.add_tokens(900).expect("no persistence");
        tracker.complete_step(true, 1).expect("no persistence");
        tracker.complete_step(true, 0).expect("no persistence");
        tracker.complete_step(false, 2).expect("no persistence");

        let summary = tracker.summary();
        assert!((summary.tokens_per_step - 450.0).abs() < f64::EPSILON);
        assert!((summary.success_rate - 2.0 / 3.0).abs() < 1e-12);
        assert!((summary.retry_rate - 1.0).abs() < f64::EPSILON);
    }
}
