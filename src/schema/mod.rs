//! Observation log input schema
//!
//! This module defines the input contract for behavioral observation exports:
//! the raw event record, the required column set, and readers for delimited
//! text and JSON inputs.

mod record;

pub use record::*;
