//! Validation policy: duration cap, enabled checks, and reporting mode
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Default upper bound for a single class-time slot, in minutes.
pub const DEFAULT_MAX_DURATION_MINUTES: u32 = 240;

/// Which overlap checks run. Range and duration checks always run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSet {
    #[serde(default = "enabled")]
    pub section_overlap: bool,
    #[serde(default = "enabled")]
    pub room_conflict: bool,
    #[serde(default = "enabled")]
    pub instructor_conflict: bool,
}

fn enabled() -> bool {
    true
}

impl Default for CheckSet {
    fn default() -> Self {
        Self {
            section_overlap: true,
            room_conflict: true,
            instructor_conflict: true,
        }
    }
}

/// How many failures a validation run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// Stop at the first failing check.
    #[default]
    FirstError,
    /// Report every conflicting slot, each under the first check it fails.
    CollectAll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    #[serde(default = "default_max_duration_minutes")]
    pub max_duration_minutes: u32,
    #[serde(default)]
    pub checks: CheckSet,
    #[serde(default)]
    pub report: ReportMode,
}

fn default_max_duration_minutes() -> u32 {
    DEFAULT_MAX_DURATION_MINUTES
}

impl ValidationPolicy {
    pub fn with_max_duration_minutes(mut self, minutes: u32) -> Self {
        self.max_duration_minutes = minutes;
        self
    }

    pub fn with_report(mut self, report: ReportMode) -> Self {
        self.report = report;
        self
    }

    pub fn with_checks(mut self, checks: CheckSet) -> Self {
        self.checks = checks;
        self
    }

    pub fn max_duration(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.max_duration_minutes))
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            max_duration_minutes: DEFAULT_MAX_DURATION_MINUTES,
            checks: CheckSet::default(),
            report: ReportMode::default(),
        }
    }
}
