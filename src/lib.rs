//! Business-development intake automation: time-decayed lead scoring,
//! priority-ordered funnel routing, and per-session resource budgets.

pub mod budget;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
