//! Configuration-consistency checks.
//!
//! The descriptor carries no logic of its own, so "testing" it reduces to
//! checking that its parts agree with each other: suite names are known,
//! SPEC only appears where the build suite can consume it, the docker job
//! is covered by allow_failures, stage references resolve, coverage is only
//! requested where it can be produced, and the branch patterns compile.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::descriptor::PipelineDescriptor;
use crate::matrix::{expand, MatrixJob};
use crate::suite::{TestSuite, KNOWN_BUILD_SPECS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
}

impl Finding {
    fn error(code: &'static str, message: String) -> Self {
        Finding {
            severity: Severity::Error,
            code,
            message,
        }
    }

    fn warning(code: &'static str, message: String) -> Self {
        Finding {
            severity: Severity::Warning,
            code,
            message,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{level}[{}]: {}", self.code, self.message)
    }
}

/// Run every consistency check against a descriptor.
pub fn validate(descriptor: &PipelineDescriptor) -> Vec<Finding> {
    let mut findings = Vec::new();
    let jobs = expand(descriptor);

    if jobs.is_empty() {
        findings.push(Finding::warning(
            "no-jobs",
            "descriptor expands to no jobs".to_string(),
        ));
    }

    check_branch_patterns(descriptor, &mut findings);
    check_suites(&jobs, &mut findings);
    check_specs(&jobs, &mut findings);
    check_docker_job(&jobs, &mut findings);
    check_allow_failures(descriptor, &jobs, &mut findings);
    check_stages(descriptor, &jobs, &mut findings);
    check_coverage(&jobs, &mut findings);
    check_duplicates(&jobs, &mut findings);

    for finding in &findings {
        warn!(code = finding.code, "{}", finding.message);
    }
    findings
}

/// True when no error-severity finding is present.
pub fn is_acceptable(findings: &[Finding]) -> bool {
    findings.iter().all(|f| f.severity != Severity::Error)
}

fn check_branch_patterns(descriptor: &PipelineDescriptor, findings: &mut Vec<Finding>) {
    if let Err(err) = descriptor.branch_filter() {
        findings.push(Finding::error("branch-pattern", err.to_string()));
    }
}

fn check_suites(jobs: &[MatrixJob], findings: &mut Vec<Finding>) {
    for job in jobs {
        match &job.env.test_suite {
            None => findings.push(Finding::warning(
                "missing-suite",
                format!("job in stage '{}' sets no TEST_SUITE", job.stage),
            )),
            Some(raw) if job.suite().is_none() => findings.push(Finding::error(
                "unknown-suite",
                format!("TEST_SUITE={raw} is not a known suite"),
            )),
            Some(_) => {}
        }
    }
}

fn check_specs(jobs: &[MatrixJob], findings: &mut Vec<Finding>) {
    for job in jobs {
        let Some(spec) = &job.env.spec else { continue };
        match job.suite() {
            Some(suite) if suite.accepts_spec() => {
                if !KNOWN_BUILD_SPECS.contains(&spec.as_str()) {
                    findings.push(Finding::error(
                        "unknown-spec",
                        format!("SPEC={spec} is not a known build spec"),
                    ));
                }
            }
            _ => findings.push(Finding::error(
                "spec-outside-build",
                format!("SPEC={spec} set on a non-build job"),
            )),
        }
    }
}

fn check_docker_job(jobs: &[MatrixJob], findings: &mut Vec<Finding>) {
    // The docker build is the pipeline's one sanctioned smoke job: exactly
    // one job selects it.
    let count = jobs
        .iter()
        .filter(|j| j.suite() == Some(TestSuite::Docker))
        .count();
    if count != 1 {
        findings.push(Finding::warning(
            "docker-count",
            format!("expected exactly one docker job, found {count}"),
        ));
    }
}

fn check_allow_failures(
    descriptor: &PipelineDescriptor,
    jobs: &[MatrixJob],
    findings: &mut Vec<Finding>,
) {
    // Every job of a may-fail suite must be covered by allow_failures, or a
    // red docker build would fail the whole pipeline.
    for job in jobs {
        if job.suite().is_some_and(|s| s.may_fail()) && !job.allow_failure {
            findings.push(Finding::error(
                "docker-not-allowed",
                format!(
                    "job '{}' belongs to an allowed-to-fail suite but is not in allow_failures",
                    job.env.canonical()
                ),
            ));
        }
    }

    // allow_failures rows that select no job are dead configuration.
    for allow in &descriptor.jobs.allow_failures {
        if !jobs.iter().any(|j| j.env.matches(&allow.env)) {
            findings.push(Finding::warning(
                "allow-failure-unmatched",
                format!("allow_failures entry '{}' matches no job", allow.env.canonical()),
            ));
        }
    }
}

fn check_stages(
    descriptor: &PipelineDescriptor,
    jobs: &[MatrixJob],
    findings: &mut Vec<Finding>,
) {
    if descriptor.stages.is_empty() {
        return;
    }
    let declared: HashSet<&str> = descriptor.stages.iter().map(String::as_str).collect();
    for job in jobs {
        if !declared.contains(job.stage.as_str()) {
            findings.push(Finding::error(
                "undeclared-stage",
                format!("job '{}' references undeclared stage '{}'", job.env.canonical(), job.stage),
            ));
        }
    }
    for stage in &descriptor.stages {
        if !jobs.iter().any(|j| &j.stage == stage) {
            findings.push(Finding::warning(
                "dead-stage",
                format!("declared stage '{stage}' has no jobs"),
            ));
        }
    }
}

fn check_coverage(jobs: &[MatrixJob], findings: &mut Vec<Finding>) {
    for job in jobs {
        if job.env.coverage_enabled() && !job.suite().is_some_and(|s| s.coverage_capable()) {
            findings.push(Finding::warning(
                "coverage-unsupported",
                format!(
                    "COVERAGE=true on job '{}' whose suite produces no coverage",
                    job.env.canonical()
                ),
            ));
        }
    }
}

fn check_duplicates(jobs: &[MatrixJob], findings: &mut Vec<Finding>) {
    let mut seen = HashSet::new();
    for job in jobs {
        let key = (
            job.python.clone(),
            job.os.clone(),
            job.env.canonical(),
            job.stage.clone(),
        );
        if !seen.insert(key) {
            findings.push(Finding::warning(
                "duplicate-job",
                format!("duplicate job definition '{}' in stage '{}'", job.env.canonical(), job.stage),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PipelineDescriptor;

    fn findings_for(yaml: &str) -> Vec<Finding> {
        validate(&PipelineDescriptor::from_yaml(yaml).unwrap())
    }

    fn codes(findings: &[Finding]) -> Vec<&'static str> {
        findings.iter().map(|f| f.code).collect()
    }

    #[test]
    fn test_clean_descriptor_passes() {
        let findings = findings_for(
            r#"
stages: ['style checks', 'build tests']
jobs:
  include:
    - stage: 'style checks'
      env: TEST_SUITE=flake8
    - stage: 'build tests'
      env: TEST_SUITE=build SPEC=mpich
    - stage: 'build tests'
      env: TEST_SUITE=docker
  allow_failures:
    - env: TEST_SUITE=docker
"#,
        );
        assert!(findings.is_empty(), "unexpected findings: {findings:?}");
        assert!(is_acceptable(&findings));
    }

    #[test]
    fn test_unknown_suite_flagged() {
        let findings = findings_for(
            r#"
jobs:
  include:
    - env: TEST_SUITE=integration
"#,
        );
        assert!(codes(&findings).contains(&"unknown-suite"));
        assert!(!is_acceptable(&findings));
    }

    #[test]
    fn test_spec_checks() {
        let findings = findings_for(
            r#"
jobs:
  include:
    - env: TEST_SUITE=build SPEC=not-a-package
    - env: TEST_SUITE=unit SPEC=mpich
"#,
        );
        let codes = codes(&findings);
        assert!(codes.contains(&"unknown-spec"));
        assert!(codes.contains(&"spec-outside-build"));
    }

    #[test]
    fn test_docker_must_be_allowed_to_fail() {
        let findings = findings_for(
            r#"
jobs:
  include:
    - env: TEST_SUITE=docker
"#,
        );
        assert!(codes(&findings).contains(&"docker-not-allowed"));

        let covered = findings_for(
            r#"
jobs:
  include:
    - env: TEST_SUITE=docker
  allow_failures:
    - env: TEST_SUITE=docker
"#,
        );
        assert!(!codes(&covered).contains(&"docker-not-allowed"));
    }

    #[test]
    fn test_docker_job_count() {
        let none = findings_for(
            r#"
jobs:
  include:
    - env: TEST_SUITE=unit
"#,
        );
        assert!(codes(&none).contains(&"docker-count"));

        let two = findings_for(
            r#"
jobs:
  include:
    - python: "2.7"
      env: TEST_SUITE=docker
    - python: "3.7"
      env: TEST_SUITE=docker
  allow_failures:
    - env: TEST_SUITE=docker
"#,
        );
        assert!(codes(&two).contains(&"docker-count"));

        let one = findings_for(
            r#"
jobs:
  include:
    - env: TEST_SUITE=unit
    - env: TEST_SUITE=docker
  allow_failures:
    - env: TEST_SUITE=docker
"#,
        );
        assert!(!codes(&one).contains(&"docker-count"));
    }

    #[test]
    fn test_stage_membership_and_dead_stage() {
        let findings = findings_for(
            r#"
stages: ['style checks', 'unit tests']
jobs:
  include:
    - stage: 'build tests'
      env: TEST_SUITE=build SPEC=tut
    - stage: 'style checks'
      env: TEST_SUITE=flake8
"#,
        );
        let codes = codes(&findings);
        assert!(codes.contains(&"undeclared-stage"));
        assert!(codes.contains(&"dead-stage"));
    }

    #[test]
    fn test_coverage_only_where_supported() {
        let findings = findings_for(
            r#"
jobs:
  include:
    - env: TEST_SUITE=doc COVERAGE=true
"#,
        );
        assert!(codes(&findings).contains(&"coverage-unsupported"));
    }

    #[test]
    fn test_duplicate_jobs_flagged() {
        let findings = findings_for(
            r#"
jobs:
  include:
    - python: "2.7"
      env: TEST_SUITE=unit
    - python: "2.7"
      env: TEST_SUITE=unit
"#,
        );
        assert!(codes(&findings).contains(&"duplicate-job"));
    }

    #[test]
    fn test_bad_branch_pattern_flagged() {
        let findings = findings_for(
            r#"
branches:
  only:
    - /releases/(/
jobs:
  include:
    - env: TEST_SUITE=unit
"#,
        );
        assert!(codes(&findings).contains(&"branch-pattern"));
        assert!(!is_acceptable(&findings));
    }

    #[test]
    fn test_unmatched_allow_failure_is_dead_config() {
        let findings = findings_for(
            r#"
jobs:
  include:
    - env: TEST_SUITE=unit
  allow_failures:
    - env: TEST_SUITE=docker
"#,
        );
        assert!(codes(&findings).contains(&"allow-failure-unmatched"));
    }
}
