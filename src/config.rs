//! Engine configuration
//!
//! Policy knobs the source deployments disagree on are explicit settings
//! here: the gap tolerance, the bout merge scope, the optional
//! minimum-duration filter, and the interbout grouping.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Default gap tolerance between intervals of one bout, in seconds
pub const DEFAULT_GAP_TOLERANCE_SEC: f64 = 10.0;

/// Scope over which a subject's intervals are merged into bouts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeScope {
    /// Merge separately per (subject, observation date)
    #[default]
    ObservationDate,
    /// Merge a subject's intervals across all dates on one timeline.
    /// Observation times are session-relative seconds, so this treats every
    /// date's timeline as the same clock.
    Subject,
}

/// Which predecessor an interbout gap is measured against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterboutGrouping {
    /// Previous interval of the same behavior within the observation
    #[default]
    WithinBehavior,
    /// Previous interval of any behavior within the observation
    AcrossBehaviors,
}

/// Settings for one engine invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum gap between merged ranges that still joins them into one bout
    pub gap_tolerance_sec: f64,
    pub merge_scope: MergeScope,
    /// When set, matched intervals shorter than this are discarded after
    /// matching and before merging. Unmatched STARTs are unaffected.
    pub min_interval_sec: Option<f64>,
    pub interbout_grouping: InterboutGrouping,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gap_tolerance_sec: DEFAULT_GAP_TOLERANCE_SEC,
            merge_scope: MergeScope::default(),
            min_interval_sec: None,
            interbout_grouping: InterboutGrouping::default(),
        }
    }
}

impl EngineConfig {
    /// Check the settings are usable before a run.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.gap_tolerance_sec.is_finite() || self.gap_tolerance_sec < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "gap tolerance must be a non-negative number of seconds, got {}",
                self.gap_tolerance_sec
            )));
        }
        if let Some(min) = self.min_interval_sec {
            if !min.is_finite() || min < 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "minimum interval duration must be a non-negative number of seconds, got {min}"
                )));
            }
        }
        Ok(())
    }

    /// Load configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
