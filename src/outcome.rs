//! Pipeline outcome evaluation.
//!
//! Error propagation is exit-code only: a nonzero exit fails the job, a
//! failed required job fails its stage, and a failed stage blocks every
//! later stage. allow_failure jobs never fail anything. With fast_finish
//! the pipeline verdict is reported as soon as every required job has
//! finished, without waiting on still-running allowed-failure jobs.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::matrix::MatrixJob;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: Uuid,
    pub exit_code: i32,
    pub finished_at: DateTime<Utc>,
}

impl JobOutcome {
    pub fn new(job_id: Uuid, exit_code: i32) -> Self {
        JobOutcome {
            job_id,
            exit_code,
            finished_at: Utc::now(),
        }
    }

    pub fn status(&self) -> JobStatus {
        if self.exit_code == 0 {
            JobStatus::Success
        } else {
            JobStatus::Failed
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Passed,
    Failed,
    /// An earlier stage failed; this stage never runs.
    Blocked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub name: String,
    pub status: StageStatus,
    pub job_statuses: Vec<(Uuid, JobStatus)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineVerdict {
    Pending,
    Passed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub verdict: PipelineVerdict,
    pub stages: Vec<StageResult>,
}

/// Fold job outcomes into per-stage results and an overall verdict.
///
/// `stage_order` is the declared stage list; jobs whose stage is not
/// declared are grouped into a trailing stage in first-seen order (the
/// validator flags that situation separately).
pub fn evaluate(
    jobs: &[MatrixJob],
    outcomes: &HashMap<Uuid, JobOutcome>,
    stage_order: &[String],
    fast_finish: bool,
) -> PipelineReport {
    let mut order: Vec<String> = stage_order.to_vec();
    for job in jobs {
        if !order.contains(&job.stage) {
            order.push(job.stage.clone());
        }
    }

    let status_of = |job: &MatrixJob| -> JobStatus {
        outcomes
            .get(&job.id)
            .map(JobOutcome::status)
            .unwrap_or(JobStatus::Pending)
    };

    let mut stages = Vec::new();
    let mut earlier_failed = false;
    for stage_name in &order {
        let stage_jobs: Vec<&MatrixJob> =
            jobs.iter().filter(|j| &j.stage == stage_name).collect();
        if stage_jobs.is_empty() {
            continue;
        }

        let job_statuses: Vec<(Uuid, JobStatus)> =
            stage_jobs.iter().map(|j| (j.id, status_of(j))).collect();

        let status = if earlier_failed {
            StageStatus::Blocked
        } else {
            let any_required_failed = stage_jobs
                .iter()
                .filter(|j| !j.allow_failure)
                .any(|j| status_of(j) == JobStatus::Failed);
            let any_required_pending = stage_jobs
                .iter()
                .filter(|j| !j.allow_failure)
                .any(|j| status_of(j) == JobStatus::Pending);
            if any_required_failed {
                StageStatus::Failed
            } else if any_required_pending {
                StageStatus::Pending
            } else {
                StageStatus::Passed
            }
        };
        if status == StageStatus::Failed {
            earlier_failed = true;
        }

        stages.push(StageResult {
            name: stage_name.clone(),
            status,
            job_statuses,
        });
    }

    let verdict = overall_verdict(jobs, &status_of, fast_finish, &stages);
    PipelineReport { verdict, stages }
}

fn overall_verdict(
    jobs: &[MatrixJob],
    status_of: &dyn Fn(&MatrixJob) -> JobStatus,
    fast_finish: bool,
    stages: &[StageResult],
) -> PipelineVerdict {
    if stages.iter().any(|s| s.status == StageStatus::Failed) {
        return PipelineVerdict::Failed;
    }
    let required_pending = jobs
        .iter()
        .filter(|j| !j.allow_failure)
        .any(|j| status_of(j) == JobStatus::Pending);
    if required_pending {
        return PipelineVerdict::Pending;
    }
    if fast_finish {
        // Allowed-failure jobs still running do not hold up the verdict.
        return PipelineVerdict::Passed;
    }
    let any_pending = jobs.iter().any(|j| status_of(j) == JobStatus::Pending);
    if any_pending {
        PipelineVerdict::Pending
    } else {
        PipelineVerdict::Passed
    }
}
