//! matrixci - typed model of a Travis-style CI pipeline descriptor.
//!
//! This library parses a pipeline descriptor (branch filters, build matrix,
//! stages, addon package lists, script hooks, notifications), expands the
//! job matrix, validates the configuration-consistency properties, and
//! folds job outcomes into a pipeline verdict under fast_finish /
//! allow_failures semantics. It never executes jobs; the CI provider is an
//! external collaborator.

pub mod descriptor;
pub mod error;
pub mod hooks;
pub mod matrix;
pub mod outcome;
pub mod suite;
pub mod validate;

// Re-export commonly used types
pub use descriptor::{JobEnv, PipelineDescriptor};
pub use error::{ConfigError, Result};
pub use matrix::{expand, MatrixJob};
pub use outcome::{evaluate, JobOutcome, PipelineReport, PipelineVerdict};
pub use suite::TestSuite;
pub use validate::{is_acceptable, validate, Finding, Severity};
