//! Observation event record definition
//!
//! One record per exported log row: a START or STOP mark for one behavior,
//! stamped with the subject, observation identity, and time in seconds from
//! the start of the observation. Readers are provided for tab/comma
//! delimited exports (the common case) and for JSON / NDJSON re-encodings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::EngineError;

/// Column names the input contract requires, in contract order.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "Observation id",
    "Subject",
    "Behavior",
    "Behavior type",
    "Time",
    "Observation date",
    "Observation duration",
];

/// Whether an event marks the beginning or the end of a behavior occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Start,
    Stop,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Start => "START",
            EventKind::Stop => "STOP",
        }
    }

    fn parse(field: &str) -> Option<Self> {
        match field.trim() {
            "START" => Some(EventKind::Start),
            "STOP" => Some(EventKind::Stop),
            _ => None,
        }
    }
}

/// A single observation log record.
///
/// `behavior_label` is the raw exported label and may encode a modifier as
/// `"behavior_modifier"`; splitting is the normalizer's job, not the
/// reader's. `observation_date` is an opaque grouping key; the engine never
/// does calendar arithmetic on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub observation_id: String,
    pub subject: String,
    pub behavior_label: String,
    pub kind: EventKind,
    /// Seconds from the start of the observation
    pub time: f64,
    pub observation_date: String,
    /// Total observation length in seconds
    pub observation_duration: f64,
}

/// Per-record validation failures
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("time is not a finite number")]
    NonFiniteTime,

    #[error("time is negative: {0}")]
    NegativeTime(f64),

    #[error("observation duration is not a finite number")]
    NonFiniteDuration,

    #[error("subject is empty")]
    EmptySubject,

    #[error("behavior label is empty")]
    EmptyBehavior,
}

impl RawEvent {
    /// Validate a single record against the input contract.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.time.is_finite() {
            return Err(ValidationError::NonFiniteTime);
        }
        if self.time < 0.0 {
            return Err(ValidationError::NegativeTime(self.time));
        }
        if !self.observation_duration.is_finite() {
            return Err(ValidationError::NonFiniteDuration);
        }
        if self.subject.trim().is_empty() {
            return Err(ValidationError::EmptySubject);
        }
        if self.behavior_label.trim().is_empty() {
            return Err(ValidationError::EmptyBehavior);
        }
        Ok(())
    }
}

/// Reader for observation log inputs
pub struct RecordReader;

impl RecordReader {
    /// Parse a delimited-text export (TSV with `'\t'`, CSV with `','`).
    ///
    /// The first non-empty line is the header. Required columns are located
    /// by name; extra columns are ignored. Fields must not themselves
    /// contain the delimiter; quoting is not part of the export contract.
    pub fn parse_delimited(text: &str, delimiter: char) -> Result<Vec<RawEvent>, EngineError> {
        let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

        let (_, header) = lines
            .next()
            .ok_or_else(|| EngineError::Parse("input is empty".to_string()))?;
        let columns: Vec<&str> = header.split(delimiter).map(str::trim).collect();

        let mut indices = [0usize; REQUIRED_COLUMNS.len()];
        let mut missing = Vec::new();
        for (slot, name) in REQUIRED_COLUMNS.iter().enumerate() {
            match columns.iter().position(|c| c == name) {
                Some(idx) => indices[slot] = idx,
                None => missing.push(name.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(EngineError::MissingColumns(missing));
        }

        let mut events = Vec::new();
        for (line_idx, line) in lines {
            let fields: Vec<&str> = line.split(delimiter).collect();
            let line_num = line_idx + 1;
            let field = |slot: usize| pick_field(&fields, indices[slot], line_num);

            let kind_field = field(3)?;
            let kind = EventKind::parse(kind_field).ok_or_else(|| {
                EngineError::Parse(format!(
                    "line {}: behavior type must be START or STOP, found '{}'",
                    line_num,
                    kind_field.trim()
                ))
            })?;

            let time = parse_seconds(field(4)?, "time", line_num)?;
            let observation_duration =
                parse_seconds(field(6)?, "observation duration", line_num)?;

            events.push(RawEvent {
                observation_id: field(0)?.trim().to_string(),
                subject: field(1)?.trim().to_string(),
                behavior_label: field(2)?.trim().to_string(),
                kind,
                time,
                observation_date: field(5)?.trim().to_string(),
                observation_duration,
            });
        }

        Ok(events)
    }

    /// Parse a JSON array of records.
    pub fn parse_array(json: &str) -> Result<Vec<RawEvent>, EngineError> {
        let events: Vec<RawEvent> = serde_json::from_str(json)?;
        Ok(events)
    }

    /// Parse NDJSON (newline-delimited JSON), one record per line.
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawEvent>, EngineError> {
        let mut events = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawEvent>(trimmed) {
                Ok(event) => events.push(event),
                Err(e) => {
                    return Err(EngineError::Parse(format!(
                        "failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(events)
    }

    /// Validate a batch; returns `(index, error)` for every failing record.
    pub fn validate_events(events: &[RawEvent]) -> Vec<(usize, ValidationError)> {
        events
            .iter()
            .enumerate()
            .filter_map(|(idx, event)| event.validate().err().map(|e| (idx, e)))
            .collect()
    }
}

fn pick_field<'a>(fields: &[&'a str], index: usize, line_num: usize) -> Result<&'a str, EngineError> {
    fields.get(index).copied().ok_or_else(|| {
        EngineError::Parse(format!(
            "line {}: expected at least {} fields, found {}",
            line_num,
            index + 1,
            fields.len()
        ))
    })
}

fn parse_seconds(field: &str, what: &str, line_num: usize) -> Result<f64, EngineError> {
    field.trim().parse::<f64>().map_err(|_| {
        EngineError::Parse(format!(
            "line {}: {} must be numeric seconds, found '{}'",
            line_num,
            what,
            field.trim()
        ))
    })
}
