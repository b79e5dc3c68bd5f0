//! Integration tests for cert-preflight.
//!
//! These tests drive the public API with scripted checks and an in-process
//! catalog.

pub mod cli_tests;
pub mod engine_tests;
pub mod output_tests;
pub mod pipeline_tests;
pub mod policy_tests;
