//! Core types for the bout pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: normalized events, matched intervals, bouts, and summary
//! statistics.

use serde::{Deserialize, Serialize};

use crate::schema::RawEvent;

/// A raw observation event annotated with its split behavior and modifier.
///
/// Produced by the normalizer from [`RawEvent`]; the raw record is carried
/// along untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// The unmodified input record
    pub event: RawEvent,
    /// Behavior name: the label head before the first underscore
    pub behavior: String,
    /// Modifier: the label tail after the first underscore, "" when absent
    pub modifier: String,
}

/// A single START/STOP pair representing one behavior occurrence.
///
/// `stop_time` is `None` for a START that never found its STOP; such
/// intervals have no duration, take no part in bout merging, and are kept in
/// the output as a data-quality signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedInterval {
    pub subject: String,
    pub behavior: String,
    pub modifier: String,
    pub observation_id: String,
    pub observation_date: String,
    /// Seconds from the start of the observation
    pub start_time: f64,
    /// Seconds from the start of the observation, absent for unmatched STARTs
    pub stop_time: Option<f64>,
}

impl MatchedInterval {
    /// Occurrence duration in seconds, `None` when the stop is unresolved.
    pub fn duration(&self) -> Option<f64> {
        self.stop_time.map(|stop| stop - self.start_time)
    }
}

/// A continuous behavioral episode formed by merging overlapping or
/// closely-spaced matched intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bout {
    pub subject: String,
    /// Date of the earliest member interval
    pub observation_date: String,
    /// Positive, unique within (subject, date), increasing with start time;
    /// numbering continues across a subject's successive dates
    pub bout_id: u32,
    pub start_time: f64,
    pub stop_time: f64,
    /// Indexes into the subject's matched-interval list
    pub member_intervals: Vec<usize>,
    /// True when member intervals span two or more distinct behaviors
    pub mixed: bool,
}

impl Bout {
    /// Wall-clock extent of the bout range in seconds.
    pub fn span(&self) -> f64 {
        self.stop_time - self.start_time
    }
}

/// Descriptive statistics over a set of duration samples.
///
/// `mean` is undefined for an empty sample, `variance` and `std_dev` below
/// two samples (sample variance, n - 1 denominator). Undefined moments fill
/// as 0 when pivoted into output tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub count: usize,
    pub sum: f64,
    pub mean: Option<f64>,
    pub variance: Option<f64>,
    pub std_dev: Option<f64>,
}
