//! Check engine.
//!
//! Provides the run context, target resolution, sequential check execution,
//! and result aggregation.

pub mod context;
pub mod orchestrator;
pub mod report;
pub mod result;
pub mod target;

pub use context::{CancellationToken, RunContext};
pub use orchestrator::{CheckEngine, EngineError, PolicyEngine};
pub use report::{CheckExecutionInfo, ResultsReport, UserResponse};
pub use result::{CheckOutcome, CheckResult, ClusterVersion, ErroredCheck, ResultAggregator, Results};
pub use target::{ImageReference, PreconditionError, ReferenceResolver, TargetResolver};
