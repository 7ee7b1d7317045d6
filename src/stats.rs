//! Statistics aggregation
//!
//! Four independent aggregations over one subject's intervals and bouts:
//! behavior/modifier duration statistics, bout-level statistics split by
//! pure/mixed, interbout-interval statistics, and time-proportion
//! partitioning. All are pure functions producing [`Table`]s; grouping is
//! done with explicit maps keyed by composite tuples, and a naming function
//! produces the documented column labels.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::InterboutGrouping;
use crate::table::{Cell, Table};
use crate::types::{Bout, MatchedInterval, SummaryStats};

/// Count/sum/mean/sample-variance/standard-deviation of a sample.
pub fn summarize(values: &[f64]) -> SummaryStats {
    let count = values.len();
    let sum: f64 = values.iter().sum();
    let mean = (count > 0).then(|| sum / count as f64);

    let variance = match (count, mean) {
        (n, Some(m)) if n >= 2 => {
            let squared: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
            Some(squared / (n - 1) as f64)
        }
        _ => None,
    };

    SummaryStats {
        count,
        sum,
        mean,
        variance,
        std_dev: variance.map(f64::sqrt),
    }
}

/// Label for a behavior/modifier pair: `behavior_modifier`, or the bare
/// behavior when the modifier is empty.
fn pair_label(behavior: &str, modifier: &str) -> String {
    if modifier.is_empty() {
        behavior.to_string()
    } else {
        format!("{behavior}_{modifier}")
    }
}

/// Column label for the empty modifier in the proportion table.
fn modifier_label(modifier: &str) -> &str {
    if modifier.is_empty() {
        "(none)"
    } else {
        modifier
    }
}

const STAT_SUFFIXES: [&str; 5] = [
    "bout count",
    "total bout length (s)",
    "mean bout length (s)",
    "bout length variance",
    "bout length standard deviation",
];

/// Behavior/modifier duration statistics, pivoted to one row.
///
/// The occurrence count includes unmatched STARTs; the duration moments use
/// resolved durations only. Undefined moments fill as 0.
pub fn duration_statistics(intervals: &[MatchedInterval]) -> Table {
    let mut groups: BTreeMap<(String, String), (usize, Vec<f64>)> = BTreeMap::new();
    for interval in intervals {
        let key = (interval.behavior.clone(), interval.modifier.clone());
        let entry = groups.entry(key).or_default();
        entry.0 += 1;
        if let Some(duration) = interval.duration() {
            entry.1.push(duration);
        }
    }

    let mut columns = Vec::with_capacity(groups.len() * STAT_SUFFIXES.len());
    let mut row = Vec::with_capacity(groups.len() * STAT_SUFFIXES.len());
    for ((behavior, modifier), (occurrences, durations)) in &groups {
        let label = pair_label(behavior, modifier);
        let stats = summarize(durations);
        for suffix in STAT_SUFFIXES {
            columns.push(format!("{label} {suffix}"));
        }
        row.push(Cell::number(*occurrences as f64));
        row.push(Cell::number(stats.sum));
        row.push(Cell::or_zero(stats.mean));
        row.push(Cell::or_zero(stats.variance));
        row.push(Cell::or_zero(stats.std_dev));
    }

    let mut table = Table::new("Duration statistics", columns);
    table.push_row(row);
    table
}

/// Total behavior time inside one bout: the sum of member durations.
pub fn bout_duration(bout: &Bout, intervals: &[MatchedInterval]) -> f64 {
    bout.member_intervals
        .iter()
        .filter_map(|&idx| intervals[idx].duration())
        .sum()
}

/// Bout-level statistics by category: Pure, Mixed, and their union All.
///
/// The categories are discrete rows; All is formed by uniting the pure and
/// mixed samples, never by a second pass over raw data. All three rows are
/// always present, zero-filled when a category has no bouts.
pub fn bout_statistics(bouts: &[Bout], intervals: &[MatchedInterval]) -> Table {
    let mut pure = Vec::new();
    let mut mixed = Vec::new();
    for bout in bouts {
        let duration = bout_duration(bout, intervals);
        if bout.mixed {
            mixed.push(duration);
        } else {
            pure.push(duration);
        }
    }
    let mut all = pure.clone();
    all.extend_from_slice(&mixed);

    let mut table = Table::new(
        "Bout statistics",
        vec![
            "Category".to_string(),
            "Bout count".to_string(),
            "Total bout length (s)".to_string(),
            "Mean bout length (s)".to_string(),
            "Bout length variance".to_string(),
            "Bout length standard deviation".to_string(),
        ],
    );
    for (category, durations) in [("Pure", &pure), ("Mixed", &mixed), ("All", &all)] {
        let stats = summarize(durations);
        table.push_row(vec![
            Cell::text(category),
            Cell::number(stats.count as f64),
            Cell::number(stats.sum),
            Cell::or_zero(stats.mean),
            Cell::or_zero(stats.variance),
            Cell::or_zero(stats.std_dev),
        ]);
    }
    table
}

/// Interbout gap of one interval: the time since its predecessor ended.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InterboutGap {
    /// Stop time of the preceding interval in the group, when resolved
    pub previous_stop: Option<f64>,
    /// `start - previous_stop`; undefined for the first interval of a group
    /// and whenever the predecessor's stop is unresolved
    pub gap: Option<f64>,
}

/// Per-interval interbout gaps, parallel to the input slice.
///
/// Groups are `(observation, behavior)` or `(observation)` depending on the
/// configured grouping; within a group intervals are taken in start-time
/// order.
pub fn interbout_durations(
    intervals: &[MatchedInterval],
    grouping: InterboutGrouping,
) -> Vec<InterboutGap> {
    let mut groups: BTreeMap<(String, String, String), Vec<usize>> = BTreeMap::new();
    for (idx, interval) in intervals.iter().enumerate() {
        let behavior = match grouping {
            InterboutGrouping::WithinBehavior => interval.behavior.clone(),
            InterboutGrouping::AcrossBehaviors => String::new(),
        };
        groups
            .entry((
                interval.observation_date.clone(),
                interval.observation_id.clone(),
                behavior,
            ))
            .or_default()
            .push(idx);
    }

    let mut gaps = vec![InterboutGap::default(); intervals.len()];
    for members in groups.into_values() {
        let mut ordered = members;
        ordered.sort_by(|&a, &b| {
            intervals[a]
                .start_time
                .total_cmp(&intervals[b].start_time)
                .then_with(|| a.cmp(&b))
        });

        for pair in ordered.windows(2) {
            let previous_stop = intervals[pair[0]].stop_time;
            gaps[pair[1]] = InterboutGap {
                previous_stop,
                gap: previous_stop.map(|stop| intervals[pair[1]].start_time - stop),
            };
        }
    }
    gaps
}

/// Aggregate interbout statistics for one subject.
pub fn interbout_statistics(gaps: &[InterboutGap]) -> Table {
    let defined: Vec<f64> = gaps.iter().filter_map(|g| g.gap).collect();
    let stats = summarize(&defined);

    let mut table = Table::new(
        "Interbout duration statistics",
        vec![
            "Interbout count".to_string(),
            "Mean interbout duration (s)".to_string(),
            "Interbout duration variance".to_string(),
            "Interbout duration standard deviation".to_string(),
        ],
    );
    table.push_row(vec![
        Cell::number(stats.count as f64),
        Cell::or_zero(stats.mean),
        Cell::or_zero(stats.variance),
        Cell::or_zero(stats.std_dev),
    ]);
    table
}

/// Time-proportion partition: per behavior, each modifier's share of the
/// behavior's total duration. A zero total defines every share as 0 rather
/// than NaN so downstream consumers never see undefined values.
pub fn time_proportions(intervals: &[MatchedInterval]) -> Table {
    let mut totals: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    let mut modifiers: BTreeSet<String> = BTreeSet::new();
    for interval in intervals {
        let duration = interval.duration().unwrap_or(0.0);
        *totals
            .entry(interval.behavior.clone())
            .or_default()
            .entry(interval.modifier.clone())
            .or_default() += duration;
        modifiers.insert(interval.modifier.clone());
    }

    let mut columns = vec!["Behavior".to_string()];
    columns.extend(modifiers.iter().map(|m| modifier_label(m).to_string()));

    let mut table = Table::new("Time proportions", columns);
    for (behavior, by_modifier) in &totals {
        let behavior_total: f64 = by_modifier.values().sum();
        let mut row = Vec::with_capacity(modifiers.len() + 1);
        row.push(Cell::text(behavior.clone()));
        for modifier in &modifiers {
            let share = if behavior_total > 0.0 {
                by_modifier.get(modifier).copied().unwrap_or(0.0) / behavior_total
            } else {
                0.0
            };
            row.push(Cell::number(share));
        }
        table.push_row(row);
    }
    table
}
