//! Output table representation
//!
//! Named, rectangular tables are the engine's output currency: explicit
//! column vectors and cell rows keyed by composite tuples, with a combined
//! all-subjects view built by column union. The rendering/export
//! collaborator consumes these as already-typed data.

use std::collections::BTreeSet;

use serde::Serialize;

/// One table cell. `Empty` marks a defined-but-undefined value (an
/// unresolved duration, a first-in-group interbout gap) and serializes to
/// JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Number(f64),
    Bool(bool),
    Text(String),
}

impl Cell {
    pub fn number(value: f64) -> Self {
        Cell::Number(value)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// `Empty` when the value is undefined.
    pub fn from_option(value: Option<f64>) -> Self {
        match value {
            Some(v) => Cell::Number(v),
            None => Cell::Empty,
        }
    }

    /// Zero-fill policy for pivoted statistics: undefined moments become 0.
    pub fn or_zero(value: Option<f64>) -> Self {
        Cell::Number(value.unwrap_or(0.0))
    }
}

/// A named rectangular table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len(), "row width mismatch");
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Build the all-subjects view of one table kind: the union of the
    /// per-subject tables with a `Subject` column prepended. Columns after
    /// `Subject` are sorted by name; a column a subject's table lacks is
    /// filled with 0 so the combined table stays rectangular.
    pub fn combined(name: impl Into<String>, per_subject: &[(&str, &Table)]) -> Table {
        let union: BTreeSet<&str> = per_subject
            .iter()
            .flat_map(|(_, table)| table.columns.iter().map(String::as_str))
            .collect();

        let mut columns = Vec::with_capacity(union.len() + 1);
        columns.push("Subject".to_string());
        columns.extend(union.iter().map(|c| c.to_string()));

        let mut combined = Table::new(name, columns);
        for (subject, table) in per_subject {
            for row in &table.rows {
                let mut cells = Vec::with_capacity(union.len() + 1);
                cells.push(Cell::text(*subject));
                for column in &union {
                    match table.columns.iter().position(|c| c.as_str() == *column) {
                        Some(idx) => cells.push(row[idx].clone()),
                        None => cells.push(Cell::Number(0.0)),
                    }
                }
                combined.rows.push(cells);
            }
        }
        combined
    }
}
