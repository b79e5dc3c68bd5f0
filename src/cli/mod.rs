//! CLI module for argument parsing and report rendering.
//!
//! Argument parsing is hand-rolled; report formatters are shared with the
//! library pipeline, which uses them to write `results.json` and
//! `results-junit.xml`.

pub mod args;
pub mod output;
