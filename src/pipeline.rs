//! Pipeline orchestration
//!
//! This module provides the public API of the engine. It drives the full
//! pipeline per subject (normalize → match → merge → aggregate → assemble)
//! and isolates each subject's failures so one bad subject never aborts the
//! rest of the batch. The engine is stateless across invocations: identical
//! input always produces identical output tables.

use std::collections::BTreeMap;

use log::debug;

use crate::assembler::{self, AnalysisReport, ResultAssembler, SubjectBundle};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::matcher::StartStopMatcher;
use crate::merger::BoutMerger;
use crate::normalizer::EventNormalizer;
use crate::schema::RawEvent;
use crate::stats;
use crate::types::NormalizedEvent;

/// Run the whole pipeline over a batch of raw events (one-shot).
///
/// # Example
/// ```ignore
/// let report = analyze_events(&events, EngineConfig::default())?;
/// ```
pub fn analyze_events(
    events: &[RawEvent],
    config: EngineConfig,
) -> Result<AnalysisReport, EngineError> {
    let engine = BoutEngine::with_config(config)?;
    Ok(engine.process(events))
}

/// The bout reconstruction and aggregation engine.
///
/// Holds only configuration; every call to [`BoutEngine::process`]
/// recomputes from scratch.
pub struct BoutEngine {
    config: EngineConfig,
}

impl Default for BoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BoutEngine {
    /// Create an engine with default settings
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Create an engine with validated settings
    pub fn with_config(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Process a batch of raw events into the per-subject report.
    pub fn process(&self, events: &[RawEvent]) -> AnalysisReport {
        // Stage 1: split behavior labels into behavior and modifier
        let normalized = EventNormalizer::normalize(events);

        // Stage 2: partition by subject; each subject's pipeline is
        // independent from here on
        let mut by_subject: BTreeMap<String, Vec<NormalizedEvent>> = BTreeMap::new();
        for event in normalized {
            by_subject
                .entry(event.event.subject.clone())
                .or_default()
                .push(event);
        }

        let outcomes = by_subject
            .into_iter()
            .map(|(subject, events)| {
                debug!("processing subject {subject}: {} event(s)", events.len());
                let result = self.process_subject(&subject, &events);
                (subject, result)
            })
            .collect();

        ResultAssembler::assemble(&self.config, outcomes)
    }

    fn process_subject(
        &self,
        subject: &str,
        events: &[NormalizedEvent],
    ) -> Result<SubjectBundle, EngineError> {
        // Stage 3: pair STARTs with STOPs
        let mut intervals = StartStopMatcher::match_events(events);

        // Policy filter: drop short matched intervals before merging.
        // Unmatched STARTs have no duration and pass through.
        if let Some(min) = self.config.min_interval_sec {
            let before = intervals.len();
            intervals.retain(|i| i.duration().map_or(true, |d| d >= min));
            let dropped = before - intervals.len();
            if dropped > 0 {
                debug!("subject {subject}: dropped {dropped} interval(s) shorter than {min}s");
            }
        }

        // Stage 4: merge intervals into bouts
        let merge = BoutMerger::merge(&intervals, &self.config)?;

        // Stage 5: aggregate
        let gaps = stats::interbout_durations(&intervals, self.config.interbout_grouping);

        // Stage 6: marshal the bundle
        Ok(SubjectBundle {
            subject: subject.to_string(),
            intervals: assembler::interval_table(
                &intervals,
                &merge.assignments,
                &merge.bouts,
                &gaps,
            ),
            bouts: assembler::bout_table(&merge.bouts, &intervals),
            duration_stats: stats::duration_statistics(&intervals),
            bout_stats: stats::bout_statistics(&merge.bouts, &intervals),
            interbout_stats: stats::interbout_statistics(&gaps),
            time_proportions: stats::time_proportions(&intervals),
        })
    }
}
