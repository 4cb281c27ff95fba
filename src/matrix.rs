//! Matrix expansion.
//!
//! The provider cross-produces the top-level axes (python × os × env) into
//! one job per combination, then appends the explicit `jobs.include` rows.
//! Jobs are immutable once expanded; allow_failure and stage assignment are
//! resolved here so downstream consumers never re-derive them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::descriptor::{JobEnv, MatrixEntry, PipelineDescriptor};
use crate::suite::TestSuite;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixJob {
    pub id: Uuid,
    pub python: Option<String>,
    pub os: String,
    pub env: JobEnv,
    pub stage: String,
    pub allow_failure: bool,
    pub created_at: DateTime<Utc>,
}

impl MatrixJob {
    pub fn suite(&self) -> Option<TestSuite> {
        self.env.suite()
    }

    /// Entrypoint script this job dispatches to, when its suite is known.
    pub fn entrypoint(&self) -> Option<String> {
        self.suite().map(|s| s.entrypoint())
    }
}

/// Expand a descriptor into its concrete job list.
pub fn expand(descriptor: &PipelineDescriptor) -> Vec<MatrixJob> {
    let allowed: Vec<String> = descriptor
        .jobs
        .allow_failures
        .iter()
        .map(|a| a.env.canonical())
        .collect();
    let default_stage = descriptor.default_stage().to_string();

    let mut jobs = Vec::new();

    // With no top-level axes, the include rows *are* the matrix; the
    // implicit default job only exists when there are no include rows.
    let no_axes = descriptor.python.is_empty()
        && descriptor.os.is_empty()
        && descriptor.env.is_empty();
    let skip_axis_jobs = no_axes && !descriptor.jobs.include.is_empty();

    // Axis cross product. Absent axes contribute a single default slot.
    let pythons: Vec<Option<String>> = if descriptor.python.is_empty() {
        vec![None]
    } else {
        descriptor.python.as_slice().iter().cloned().map(Some).collect()
    };
    let oses: Vec<String> = if descriptor.os.is_empty() {
        vec!["linux".to_string()]
    } else {
        descriptor.os.as_slice().to_vec()
    };
    let envs: Vec<JobEnv> = if descriptor.env.is_empty() {
        vec![JobEnv::default()]
    } else {
        descriptor.env.as_slice().to_vec()
    };

    if !skip_axis_jobs {
        for python in &pythons {
            for os in &oses {
                for env in &envs {
                    jobs.push(make_job(
                        python.clone(),
                        os.clone(),
                        env.clone(),
                        default_stage.clone(),
                        &allowed,
                    ));
                }
            }
        }
    }

    // Explicit include rows; their stage wins over the default.
    for entry in &descriptor.jobs.include {
        jobs.push(job_from_entry(entry, &default_stage, &allowed));
    }

    debug!(jobs = jobs.len(), "expanded job matrix");
    jobs
}

fn make_job(
    python: Option<String>,
    os: String,
    env: JobEnv,
    stage: String,
    allowed: &[String],
) -> MatrixJob {
    let allow_failure = allowed.iter().any(|a| *a == env.canonical());
    MatrixJob {
        id: Uuid::new_v4(),
        python,
        os,
        env,
        stage,
        allow_failure,
        created_at: Utc::now(),
    }
}

fn job_from_entry(entry: &MatrixEntry, default_stage: &str, allowed: &[String]) -> MatrixJob {
    let env = entry.env.clone().unwrap_or_default();
    let stage = entry
        .stage
        .clone()
        .unwrap_or_else(|| default_stage.to_string());
    make_job(
        entry.python.clone(),
        entry.os.clone().unwrap_or_else(|| "linux".to_string()),
        env,
        stage,
        allowed,
    )
}
