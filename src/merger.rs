//! Bout merging
//!
//! Turns one subject's matched intervals into bouts. Two passes over the
//! sorted intervals: an overlap merge (classic sweep, touching ranges
//! combine) followed by a gap merge that joins ranges separated by at most
//! the configured tolerance, so a bout models one behavioral episode
//! tolerating short interruptions. Merged ranges then get sequential bout
//! ids and every member interval is assigned its containing bout by binary
//! search.
//!
//! A single sort plus linear scan is all the merge needs; no interval tree
//! is kept at runtime.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{EngineConfig, MergeScope};
use crate::error::EngineError;
use crate::types::{Bout, MatchedInterval};

/// Result of merging one subject's intervals
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// Bouts ordered by (date group, start time); ids start at 1 and
    /// continue across the subject's observation dates
    pub bouts: Vec<Bout>,
    /// Bout id per input interval, parallel to the input slice; `None` for
    /// intervals with an unresolved stop
    pub assignments: Vec<Option<u32>>,
}

/// Merger building bouts from matched intervals
pub struct BoutMerger;

#[derive(Debug, Clone, Copy)]
struct Range {
    begin: f64,
    end: f64,
}

impl BoutMerger {
    /// Merge one subject's intervals into bouts.
    ///
    /// Intervals without a resolved stop take no part in merging and keep a
    /// `None` assignment. An empty scope yields no bouts. An interval whose
    /// start falls in no merged range is an internal-consistency failure
    /// and aborts the subject.
    pub fn merge(
        intervals: &[MatchedInterval],
        config: &EngineConfig,
    ) -> Result<MergeOutcome, EngineError> {
        let mut outcome = MergeOutcome {
            bouts: Vec::new(),
            assignments: vec![None; intervals.len()],
        };

        // Scope groups in date order so bout numbering is reproducible.
        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (idx, interval) in intervals.iter().enumerate() {
            if interval.stop_time.is_none() {
                continue;
            }
            let key = match config.merge_scope {
                MergeScope::ObservationDate => interval.observation_date.as_str(),
                MergeScope::Subject => "",
            };
            groups.entry(key).or_default().push(idx);
        }

        let mut next_bout_id: u32 = 1;
        for members in groups.into_values() {
            next_bout_id = merge_group(
                intervals,
                &members,
                config.gap_tolerance_sec,
                next_bout_id,
                &mut outcome,
            )?;
        }

        Ok(outcome)
    }
}

/// Merge one scope group; returns the next free bout id.
fn merge_group(
    intervals: &[MatchedInterval],
    member_indices: &[usize],
    gap_tolerance: f64,
    first_bout_id: u32,
    outcome: &mut MergeOutcome,
) -> Result<u32, EngineError> {
    if member_indices.is_empty() {
        return Ok(first_bout_id);
    }

    let mut spans: Vec<(Range, usize)> = member_indices
        .iter()
        .map(|&idx| {
            let interval = &intervals[idx];
            // Unreachable for open intervals; callers filter them out.
            let end = interval.stop_time.unwrap_or(interval.start_time);
            (Range { begin: interval.start_time, end }, idx)
        })
        .collect();
    spans.sort_by(|a, b| {
        a.0.begin
            .total_cmp(&b.0.begin)
            .then_with(|| a.0.end.total_cmp(&b.0.end))
    });

    // Pass 1: combine overlapping or touching ranges.
    let mut ranges: Vec<Range> = Vec::new();
    for &(span, _) in &spans {
        match ranges.last_mut() {
            Some(current) if span.begin <= current.end => {
                current.end = current.end.max(span.end);
            }
            _ => ranges.push(span),
        }
    }

    // Pass 2: combine ranges separated by at most the gap tolerance.
    let mut merged: Vec<Range> = Vec::new();
    for range in ranges {
        match merged.last_mut() {
            Some(current) if range.begin - current.end <= gap_tolerance => {
                current.end = current.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }

    // Containment lookup by binary search over the sorted, disjoint ranges.
    let mut bout_members: Vec<Vec<usize>> = vec![Vec::new(); merged.len()];
    for &(span, idx) in &spans {
        let position = merged.partition_point(|r| r.begin <= span.begin);
        let assigned = position
            .checked_sub(1)
            .filter(|&p| span.begin <= merged[p].end);
        match assigned {
            Some(p) => {
                bout_members[p].push(idx);
                outcome.assignments[idx] = Some(first_bout_id + p as u32);
            }
            None => {
                let interval = &intervals[idx];
                return Err(EngineError::UnassignedInterval {
                    behavior: interval.behavior.clone(),
                    start_time: interval.start_time,
                });
            }
        }
    }

    for (offset, (range, members)) in merged.iter().zip(bout_members).enumerate() {
        let behaviors: BTreeSet<&str> = members
            .iter()
            .map(|&idx| intervals[idx].behavior.as_str())
            .collect();
        // Every merged range contains at least the span that created it.
        let Some(earliest) = members.iter().copied().min_by(|&a, &b| {
            intervals[a]
                .start_time
                .total_cmp(&intervals[b].start_time)
                .then_with(|| a.cmp(&b))
        }) else {
            continue;
        };

        outcome.bouts.push(Bout {
            subject: intervals[earliest].subject.clone(),
            observation_date: intervals[earliest].observation_date.clone(),
            bout_id: first_bout_id + offset as u32,
            start_time: range.begin,
            stop_time: range.end,
            member_intervals: members,
            mixed: behaviors.len() > 1,
        });
    }

    Ok(first_bout_id + merged.len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_interval(
        behavior: &str,
        date: &str,
        start: f64,
        stop: Option<f64>,
    ) -> MatchedInterval {
        MatchedInterval {
            subject: "s1".to_string(),
            behavior: behavior.to_string(),
            modifier: String::new(),
            observation_id: "obs-1".to_string(),
            observation_date: date.to_string(),
            start_time: start,
            stop_time: stop,
        }
    }

    fn merge_default(intervals: &[MatchedInterval]) -> MergeOutcome {
        BoutMerger::merge(intervals, &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_gap_within_tolerance_forms_one_bout() {
        // foraging 0-5 then 12-20: gap 7 <= 10 merges into one episode.
        let intervals = vec![
            make_interval("foraging", "d1", 0.0, Some(5.0)),
            make_interval("foraging", "d1", 12.0, Some(20.0)),
        ];
        let outcome = merge_default(&intervals);

        assert_eq!(outcome.bouts.len(), 1);
        let bout = &outcome.bouts[0];
        assert_eq!(bout.bout_id, 1);
        assert_eq!(bout.start_time, 0.0);
        assert_eq!(bout.stop_time, 20.0);
        assert!(!bout.mixed);
        assert_eq!(outcome.assignments, vec![Some(1), Some(1)]);
    }

    #[test]
    fn test_gap_beyond_tolerance_splits_bouts() {
        // grooming 0-5 then 30-40: gap 25 > 10 stays two episodes.
        let intervals = vec![
            make_interval("grooming", "d1", 0.0, Some(5.0)),
            make_interval("grooming", "d1", 30.0, Some(40.0)),
        ];
        let outcome = merge_default(&intervals);

        assert_eq!(outcome.bouts.len(), 2);
        assert_eq!(outcome.bouts[0].stop_time, 5.0);
        assert_eq!(outcome.bouts[1].start_time, 30.0);
        assert_eq!(outcome.assignments, vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_overlapping_behaviors_form_mixed_bout() {
        let intervals = vec![
            make_interval("a", "d1", 0.0, Some(10.0)),
            make_interval("b", "d1", 5.0, Some(15.0)),
        ];
        let outcome = merge_default(&intervals);

        assert_eq!(outcome.bouts.len(), 1);
        let bout = &outcome.bouts[0];
        assert_eq!(bout.start_time, 0.0);
        assert_eq!(bout.stop_time, 15.0);
        assert!(bout.mixed);
        assert_eq!(bout.member_intervals, vec![0, 1]);
    }

    #[test]
    fn test_touching_ranges_merge() {
        let intervals = vec![
            make_interval("a", "d1", 0.0, Some(5.0)),
            make_interval("a", "d1", 5.0, Some(9.0)),
        ];
        let outcome = merge_default(&intervals);
        assert_eq!(outcome.bouts.len(), 1);
        assert_eq!(outcome.bouts[0].stop_time, 9.0);
    }

    #[test]
    fn test_same_behavior_in_one_bout_is_pure() {
        let intervals = vec![
            make_interval("a", "d1", 0.0, Some(5.0)),
            make_interval("a", "d1", 8.0, Some(12.0)),
        ];
        let outcome = merge_default(&intervals);
        assert!(!outcome.bouts[0].mixed);
    }

    #[test]
    fn test_empty_interval_set_yields_no_bouts() {
        let outcome = merge_default(&[]);
        assert!(outcome.bouts.is_empty());
        assert!(outcome.assignments.is_empty());
    }

    #[test]
    fn test_open_intervals_skip_merging() {
        let intervals = vec![
            make_interval("a", "d1", 0.0, Some(5.0)),
            make_interval("a", "d1", 7.0, None),
        ];
        let outcome = merge_default(&intervals);

        assert_eq!(outcome.bouts.len(), 1);
        assert_eq!(outcome.bouts[0].member_intervals, vec![0]);
        assert_eq!(outcome.assignments, vec![Some(1), None]);
    }

    #[test]
    fn test_only_open_intervals_is_empty_scope() {
        let intervals = vec![make_interval("a", "d1", 0.0, None)];
        let outcome = merge_default(&intervals);
        assert!(outcome.bouts.is_empty());
        assert_eq!(outcome.assignments, vec![None]);
    }

    #[test]
    fn test_bout_ids_continue_across_dates() {
        let intervals = vec![
            make_interval("a", "2024-03-01", 0.0, Some(5.0)),
            make_interval("a", "2024-03-01", 40.0, Some(45.0)),
            make_interval("a", "2024-03-02", 0.0, Some(5.0)),
        ];
        let outcome = merge_default(&intervals);

        let ids: Vec<u32> = outcome.bouts.iter().map(|b| b.bout_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(outcome.bouts[2].observation_date, "2024-03-02");
    }

    #[test]
    fn test_subject_scope_merges_across_dates() {
        let config = EngineConfig {
            merge_scope: MergeScope::Subject,
            ..EngineConfig::default()
        };
        let intervals = vec![
            make_interval("a", "2024-03-01", 0.0, Some(5.0)),
            make_interval("a", "2024-03-02", 8.0, Some(12.0)),
        ];
        let outcome = BoutMerger::merge(&intervals, &config).unwrap();

        // One shared timeline: 0-5 and 8-12 are within the gap tolerance.
        assert_eq!(outcome.bouts.len(), 1);
        assert_eq!(outcome.bouts[0].observation_date, "2024-03-01");
    }

    #[test]
    fn test_bout_ids_increase_with_start_time() {
        let intervals = vec![
            make_interval("a", "d1", 100.0, Some(110.0)),
            make_interval("a", "d1", 0.0, Some(5.0)),
            make_interval("a", "d1", 50.0, Some(60.0)),
        ];
        let outcome = merge_default(&intervals);

        let mut sorted = outcome.bouts.clone();
        sorted.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        let ids: Vec<u32> = sorted.iter().map(|b| b.bout_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_merged_ranges_disjoint_beyond_tolerance() {
        let intervals = vec![
            make_interval("a", "d1", 0.0, Some(20.0)),
            make_interval("b", "d1", 3.0, Some(8.0)),
            make_interval("a", "d1", 25.0, Some(30.0)),
            make_interval("b", "d1", 55.0, Some(70.0)),
            make_interval("a", "d1", 90.0, Some(95.0)),
        ];
        let outcome = merge_default(&intervals);

        for pair in outcome.bouts.windows(2) {
            assert!(pair[1].start_time - pair[0].stop_time > 10.0);
        }
    }

    #[test]
    fn test_coverage_of_input_ranges() {
        let intervals = vec![
            make_interval("a", "d1", 0.0, Some(20.0)),
            make_interval("b", "d1", 3.0, Some(8.0)),
            make_interval("a", "d1", 25.0, Some(30.0)),
            make_interval("b", "d1", 55.0, Some(70.0)),
        ];
        let outcome = merge_default(&intervals);

        for interval in &intervals {
            let stop = interval.stop_time.unwrap();
            let covered = outcome
                .bouts
                .iter()
                .any(|b| b.start_time <= interval.start_time && stop <= b.stop_time);
            assert!(covered, "interval {}-{stop} not covered", interval.start_time);
        }
    }

    #[test]
    fn test_merge_is_idempotent_on_own_output() {
        let intervals = vec![
            make_interval("a", "d1", 0.0, Some(5.0)),
            make_interval("a", "d1", 12.0, Some(20.0)),
            make_interval("b", "d1", 50.0, Some(60.0)),
            make_interval("b", "d1", 64.0, Some(66.0)),
            make_interval("a", "d1", 100.0, Some(130.0)),
        ];
        let first = merge_default(&intervals);

        let as_intervals: Vec<MatchedInterval> = first
            .bouts
            .iter()
            .map(|b| make_interval("a", "d1", b.start_time, Some(b.stop_time)))
            .collect();
        let second = merge_default(&as_intervals);

        let first_ranges: Vec<(f64, f64)> =
            first.bouts.iter().map(|b| (b.start_time, b.stop_time)).collect();
        let second_ranges: Vec<(f64, f64)> =
            second.bouts.iter().map(|b| (b.start_time, b.stop_time)).collect();
        assert_eq!(first_ranges, second_ranges);
    }

    #[test]
    fn test_every_closed_interval_assigned_exactly_one_bout() {
        let intervals = vec![
            make_interval("a", "d1", 0.0, Some(4.0)),
            make_interval("b", "d1", 2.0, Some(9.0)),
            make_interval("a", "d1", 30.0, Some(31.0)),
        ];
        let outcome = merge_default(&intervals);

        for (idx, assignment) in outcome.assignments.iter().enumerate() {
            let id = assignment.expect("closed interval must have a bout");
            let bout = outcome.bouts.iter().find(|b| b.bout_id == id).unwrap();
            assert!(bout.member_intervals.contains(&idx));
        }
    }
}
