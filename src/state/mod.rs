//! State module
//!
//! Remembers when the last successful run started, so the next run can ask
//! only for records changed since then.
//!
//! # Overview
//!
//! - [`RunLog`] - append-only text file with one timestamp per line
//! - An absent, empty or unreadable log means "run from scratch"

mod run_log;

pub use run_log::{format_timestamp, parse_timestamp, RunLog};
