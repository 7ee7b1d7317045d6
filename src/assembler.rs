//! Result assembly
//!
//! Marshals one subject's matched data, bouts, and statistics into a named
//! table bundle, collects per-subject failures without aborting siblings,
//! and builds the all-subjects combined views. No computation happens here.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::stats::InterboutGap;
use crate::table::{Cell, Table};
use crate::types::{Bout, MatchedInterval};
use crate::{ENGINE_VERSION, PRODUCER_NAME};

/// The raw matched-interval view: one row per occurrence, with its bout
/// assignment, mixed flag, and interbout gap. Unresolved values stay empty,
/// never zero.
pub fn interval_table(
    intervals: &[MatchedInterval],
    assignments: &[Option<u32>],
    bouts: &[Bout],
    gaps: &[InterboutGap],
) -> Table {
    let mixed_by_id: BTreeMap<u32, bool> =
        bouts.iter().map(|b| (b.bout_id, b.mixed)).collect();

    let mut table = Table::new(
        "Matched intervals",
        vec![
            "Observation id".to_string(),
            "Observation date".to_string(),
            "Behavior".to_string(),
            "Modifier".to_string(),
            "Start (s)".to_string(),
            "Stop (s)".to_string(),
            "Duration (s)".to_string(),
            "Bout id".to_string(),
            "Mixed bout".to_string(),
            "End of previous interval (s)".to_string(),
            "Interbout duration (s)".to_string(),
        ],
    );

    for (idx, interval) in intervals.iter().enumerate() {
        let assignment = assignments.get(idx).copied().flatten();
        let mixed = assignment
            .and_then(|id| mixed_by_id.get(&id).copied())
            .map(Cell::Bool)
            .unwrap_or(Cell::Empty);
        let gap = gaps.get(idx).copied().unwrap_or_default();

        table.push_row(vec![
            Cell::text(interval.observation_id.clone()),
            Cell::text(interval.observation_date.clone()),
            Cell::text(interval.behavior.clone()),
            Cell::text(interval.modifier.clone()),
            Cell::number(interval.start_time),
            Cell::from_option(interval.stop_time),
            Cell::from_option(interval.duration()),
            Cell::from_option(assignment.map(|id| id as f64)),
            mixed,
            Cell::from_option(gap.previous_stop),
            Cell::from_option(gap.gap),
        ]);
    }
    table
}

/// One row per bout: range, total behavior time, membership, mixed flag.
pub fn bout_table(bouts: &[Bout], intervals: &[MatchedInterval]) -> Table {
    let mut table = Table::new(
        "Bouts",
        vec![
            "Observation date".to_string(),
            "Bout id".to_string(),
            "Start (s)".to_string(),
            "Stop (s)".to_string(),
            "Span (s)".to_string(),
            "Total behavior time (s)".to_string(),
            "Interval count".to_string(),
            "Mixed".to_string(),
        ],
    );
    for bout in bouts {
        table.push_row(vec![
            Cell::text(bout.observation_date.clone()),
            Cell::number(bout.bout_id as f64),
            Cell::number(bout.start_time),
            Cell::number(bout.stop_time),
            Cell::number(bout.span()),
            Cell::number(crate::stats::bout_duration(bout, intervals)),
            Cell::number(bout.member_intervals.len() as f64),
            Cell::Bool(bout.mixed),
        ]);
    }
    table
}

/// One subject's named table bundle
#[derive(Debug, Clone, Serialize)]
pub struct SubjectBundle {
    pub subject: String,
    pub intervals: Table,
    pub bouts: Table,
    pub duration_stats: Table,
    pub bout_stats: Table,
    pub interbout_stats: Table,
    pub time_proportions: Table,
}

impl SubjectBundle {
    fn tables(&self) -> [&Table; 6] {
        [
            &self.intervals,
            &self.bouts,
            &self.duration_stats,
            &self.bout_stats,
            &self.interbout_stats,
            &self.time_proportions,
        ]
    }
}

/// A subject whose pipeline failed, with the reason
#[derive(Debug, Clone, Serialize)]
pub struct SubjectFailure {
    pub subject: String,
    pub error: String,
}

/// Engine provenance stamped on every report
#[derive(Debug, Clone, Serialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// The full result of one engine invocation
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub producer: Producer,
    pub computed_at_utc: String,
    pub config: EngineConfig,
    /// Successful subjects, sorted by subject id
    pub subjects: Vec<SubjectBundle>,
    /// Failed subjects, reported without aborting the others
    pub failures: Vec<SubjectFailure>,
    /// All-subjects views: each table kind united over the successful
    /// subjects with a Subject column
    pub combined: Vec<Table>,
}

/// Bundle table names, in [`SubjectBundle::tables`] order
const TABLE_NAMES: [&str; 6] = [
    "Matched intervals",
    "Bouts",
    "Duration statistics",
    "Bout statistics",
    "Interbout duration statistics",
    "Time proportions",
];

/// Assembler packaging per-subject outcomes into the final report
pub struct ResultAssembler;

impl ResultAssembler {
    pub fn assemble(
        config: &EngineConfig,
        outcomes: Vec<(String, Result<SubjectBundle, EngineError>)>,
    ) -> AnalysisReport {
        let mut subjects = Vec::new();
        let mut failures = Vec::new();
        for (subject, outcome) in outcomes {
            match outcome {
                Ok(bundle) => subjects.push(bundle),
                Err(error) => failures.push(SubjectFailure {
                    subject,
                    error: error.to_string(),
                }),
            }
        }
        subjects.sort_by(|a, b| a.subject.cmp(&b.subject));
        failures.sort_by(|a, b| a.subject.cmp(&b.subject));

        let combined = TABLE_NAMES
            .iter()
            .enumerate()
            .map(|(kind, name)| {
                let per_subject: Vec<(&str, &Table)> = subjects
                    .iter()
                    .map(|bundle| (bundle.subject.as_str(), bundle.tables()[kind]))
                    .collect();
                Table::combined(*name, &per_subject)
            })
            .collect();

        AnalysisReport {
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: ENGINE_VERSION.to_string(),
                instance_id: Uuid::new_v4().to_string(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            config: config.clone(),
            subjects,
            failures,
            combined,
        }
    }
}
