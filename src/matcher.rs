//! Start/stop matching
//!
//! Pairs START and STOP events into matched intervals, one per behavior
//! occurrence. Events are partitioned by (subject, behavior, modifier,
//! observation id, observation date, observation duration); within a
//! partition the START and STOP sub-sequences are joined by ordinal
//! position, outer-left from the STARTs.
//!
//! Ordinal pairing assumes the within-partition order is chronologically
//! correct START-to-STOP; no nearest-neighbor search is attempted. Upstream
//! data must satisfy this.

use std::collections::BTreeMap;

use log::warn;

use crate::schema::EventKind;
use crate::types::{MatchedInterval, NormalizedEvent};

/// Matcher pairing START and STOP events into intervals
pub struct StartStopMatcher;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct PartitionKey {
    subject: String,
    behavior: String,
    modifier: String,
    observation_id: String,
    observation_date: String,
    // f64 bit pattern; only used for grouping and deterministic ordering
    duration_bits: u64,
}

impl PartitionKey {
    fn for_event(event: &NormalizedEvent) -> Self {
        Self {
            subject: event.event.subject.clone(),
            behavior: event.behavior.clone(),
            modifier: event.modifier.clone(),
            observation_id: event.event.observation_id.clone(),
            observation_date: event.event.observation_date.clone(),
            duration_bits: event.event.observation_duration.to_bits(),
        }
    }
}

#[derive(Default)]
struct Partition {
    starts: Vec<f64>,
    stops: Vec<f64>,
}

impl StartStopMatcher {
    /// Match a batch of normalized events into intervals.
    ///
    /// Every START yields exactly one interval; a START with no STOP at its
    /// ordinal gets `stop_time = None`. STOPs beyond the last START ordinal
    /// are dropped. Both conditions are logged as data-quality warnings.
    /// Output is sorted by (date, observation, start time, behavior,
    /// modifier) for deterministic downstream indexing.
    pub fn match_events(events: &[NormalizedEvent]) -> Vec<MatchedInterval> {
        let mut partitions: BTreeMap<PartitionKey, Partition> = BTreeMap::new();

        for event in events {
            let partition = partitions.entry(PartitionKey::for_event(event)).or_default();
            match event.event.kind {
                EventKind::Start => partition.starts.push(event.event.time),
                EventKind::Stop => partition.stops.push(event.event.time),
            }
        }

        let mut intervals = Vec::new();
        let mut unmatched_starts = 0usize;
        let mut surplus_stops = 0usize;
        let mut misordered_stops = 0usize;

        for (key, mut partition) in partitions {
            // Stable sort: arrival order breaks time ties.
            partition.starts.sort_by(|a, b| a.total_cmp(b));
            partition.stops.sort_by(|a, b| a.total_cmp(b));

            if partition.stops.len() > partition.starts.len() {
                surplus_stops += partition.stops.len() - partition.starts.len();
            }

            for (ordinal, &start_time) in partition.starts.iter().enumerate() {
                // A STOP ordinal earlier than its START violates the
                // chronological-pairing contract; the occurrence is treated
                // as unresolved rather than given a negative duration.
                let stop_time = match partition.stops.get(ordinal).copied() {
                    Some(stop) if stop < start_time => {
                        misordered_stops += 1;
                        None
                    }
                    Some(stop) => Some(stop),
                    None => {
                        unmatched_starts += 1;
                        None
                    }
                };
                intervals.push(MatchedInterval {
                    subject: key.subject.clone(),
                    behavior: key.behavior.clone(),
                    modifier: key.modifier.clone(),
                    observation_id: key.observation_id.clone(),
                    observation_date: key.observation_date.clone(),
                    start_time,
                    stop_time,
                });
            }
        }

        if unmatched_starts > 0 {
            warn!("{unmatched_starts} START event(s) had no matching STOP");
        }
        if surplus_stops > 0 {
            warn!("{surplus_stops} STOP event(s) had no matching START and were dropped");
        }
        if misordered_stops > 0 {
            warn!(
                "{misordered_stops} STOP event(s) preceded their paired START; \
                 occurrences left unresolved"
            );
        }

        intervals.sort_by(|a, b| {
            a.observation_date
                .cmp(&b.observation_date)
                .then_with(|| a.observation_id.cmp(&b.observation_id))
                .then_with(|| a.start_time.total_cmp(&b.start_time))
                .then_with(|| a.behavior.cmp(&b.behavior))
                .then_with(|| a.modifier.cmp(&b.modifier))
        });

        intervals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::EventNormalizer;
    use crate::schema::{EventKind, RawEvent};

    fn make_event(label: &str, kind: EventKind, time: f64) -> RawEvent {
        RawEvent {
            observation_id: "obs-1".to_string(),
            subject: "s1".to_string(),
            behavior_label: label.to_string(),
            kind,
            time,
            observation_date: "2024-03-01".to_string(),
            observation_duration: 600.0,
        }
    }

    fn match_raw(events: &[RawEvent]) -> Vec<MatchedInterval> {
        StartStopMatcher::match_events(&EventNormalizer::normalize(events))
    }

    #[test]
    fn test_single_pair() {
        let intervals = match_raw(&[
            make_event("groom", EventKind::Start, 2.0),
            make_event("groom", EventKind::Stop, 8.0),
        ]);

        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].start_time, 2.0);
        assert_eq!(intervals[0].stop_time, Some(8.0));
        assert_eq!(intervals[0].duration(), Some(6.0));
    }

    #[test]
    fn test_sequential_occurrences_pair_by_ordinal() {
        let intervals = match_raw(&[
            make_event("groom", EventKind::Start, 0.0),
            make_event("groom", EventKind::Stop, 5.0),
            make_event("groom", EventKind::Start, 30.0),
            make_event("groom", EventKind::Stop, 40.0),
        ]);

        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].stop_time, Some(5.0));
        assert_eq!(intervals[1].start_time, 30.0);
        assert_eq!(intervals[1].stop_time, Some(40.0));
    }

    #[test]
    fn test_ordinal_pairing_of_overlapping_occurrences() {
        // Two STARTs before either STOP: ordinal pairing joins first START
        // to first STOP. Chronological correctness is the upstream contract.
        let intervals = match_raw(&[
            make_event("climb", EventKind::Start, 0.0),
            make_event("climb", EventKind::Start, 5.0),
            make_event("climb", EventKind::Stop, 10.0),
            make_event("climb", EventKind::Stop, 15.0),
        ]);

        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].stop_time, Some(10.0));
        assert_eq!(intervals[1].stop_time, Some(15.0));
    }

    #[test]
    fn test_trailing_start_left_unmatched() {
        let intervals = match_raw(&[
            make_event("groom", EventKind::Start, 0.0),
            make_event("groom", EventKind::Stop, 5.0),
            make_event("groom", EventKind::Start, 50.0),
        ]);

        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[1].start_time, 50.0);
        assert_eq!(intervals[1].stop_time, None);
        assert_eq!(intervals[1].duration(), None);
    }

    #[test]
    fn test_surplus_and_misordered_stops() {
        let intervals = match_raw(&[
            make_event("groom", EventKind::Stop, 5.0),
            make_event("groom", EventKind::Start, 10.0),
            make_event("groom", EventKind::Stop, 20.0),
        ]);

        // Ordinal join: START#0 meets STOP#0 at time 5.0, which precedes it.
        // The occurrence is left unresolved instead of getting a negative
        // duration; the surplus STOP is dropped.
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].stop_time, None);
    }

    #[test]
    fn test_modifier_separates_partitions() {
        let intervals = match_raw(&[
            make_event("groom_face", EventKind::Start, 0.0),
            make_event("groom_tail", EventKind::Stop, 5.0),
        ]);

        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].modifier, "face");
        assert_eq!(intervals[0].stop_time, None);
    }

    #[test]
    fn test_observation_id_separates_partitions() {
        let mut other = make_event("groom", EventKind::Stop, 5.0);
        other.observation_id = "obs-2".to_string();
        let intervals = match_raw(&[make_event("groom", EventKind::Start, 0.0), other]);

        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].stop_time, None);
    }

    #[test]
    fn test_unsorted_input_pairs_chronologically() {
        let intervals = match_raw(&[
            make_event("groom", EventKind::Stop, 40.0),
            make_event("groom", EventKind::Start, 30.0),
            make_event("groom", EventKind::Stop, 5.0),
            make_event("groom", EventKind::Start, 0.0),
        ]);

        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].start_time, 0.0);
        assert_eq!(intervals[0].stop_time, Some(5.0));
        assert_eq!(intervals[1].start_time, 30.0);
        assert_eq!(intervals[1].stop_time, Some(40.0));
    }

    #[test]
    fn test_output_sorted_by_start_time() {
        let intervals = match_raw(&[
            make_event("walk", EventKind::Start, 20.0),
            make_event("walk", EventKind::Stop, 25.0),
            make_event("groom", EventKind::Start, 1.0),
            make_event("groom", EventKind::Stop, 3.0),
        ]);

        assert_eq!(intervals[0].behavior, "groom");
        assert_eq!(intervals[1].behavior, "walk");
    }
}
