//! Per-job setup and post-run hooks.
//!
//! These produce *descriptions* of work (ordered shell command lists, an
//! upload record, a notify decision); nothing here executes anything. The
//! provider owns execution.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptor::{EmailNotification, PipelineDescriptor};
use crate::matrix::MatrixJob;
use crate::outcome::PipelineVerdict;
use crate::suite::TestSuite;

/// System packages installed on linux workers before the script step.
pub const LINUX_APT_PACKAGES: &[&str] = &[
    "ccache",
    "cmake",
    "gfortran",
    "graphviz",
    "mercurial",
    "ninja-build",
    "r-base",
    "zsh",
];

/// Homebrew packages installed on macos workers.
pub const MACOS_BREW_PACKAGES: &[&str] = &["python@2", "gcc", "ccache", "dash"];

/// Directories persisted across job runs when the descriptor declares no
/// cache block. Caches are advisory: concurrent jobs may race on them, and
/// a miss only costs time.
pub const CACHE_DIRECTORIES: &[&str] = &["~/.cache/pip", "~/.ccache", "~/.mirror"];

/// Cached directories for a descriptor: the package-manager cache, the
/// compiler cache and any extra directories it declares.
pub fn cache_directories(descriptor: &PipelineDescriptor) -> Vec<String> {
    match &descriptor.cache {
        Some(cache) => {
            let mut dirs = Vec::new();
            if cache.pip {
                dirs.push("~/.cache/pip".to_string());
            }
            if cache.ccache {
                dirs.push("~/.ccache".to_string());
            }
            dirs.extend(cache.directories.iter().cloned());
            dirs
        }
        None => CACHE_DIRECTORIES.iter().map(|d| d.to_string()).collect(),
    }
}

/// Ordered shell commands preparing a job's worker: cache restore, addon
/// package installation, the fixed pre-script git setup, and the
/// config-copy step for build jobs.
pub fn setup_plan(
    descriptor: &PipelineDescriptor,
    job: &MatrixJob,
    target_branch: &str,
) -> Vec<String> {
    let mut commands = Vec::new();

    for dir in cache_directories(descriptor) {
        commands.push(format!("mkdir -p {dir}"));
    }

    match job.os.as_str() {
        "osx" | "macos" => {
            let packages = descriptor
                .addons
                .as_ref()
                .and_then(|a| a.homebrew.as_ref())
                .map(|b| b.packages.clone())
                .unwrap_or_else(|| {
                    MACOS_BREW_PACKAGES.iter().map(|p| p.to_string()).collect()
                });
            if !packages.is_empty() {
                commands.push(format!("brew install {}", packages.join(" ")));
            }
        }
        _ => {
            let packages = descriptor
                .addons
                .as_ref()
                .and_then(|a| a.apt.as_ref())
                .map(|a| a.packages.clone())
                .unwrap_or_else(|| {
                    LINUX_APT_PACKAGES.iter().map(|p| p.to_string()).collect()
                });
            if !packages.is_empty() {
                commands.push(format!("sudo apt-get install -y {}", packages.join(" ")));
            }
        }
    }

    // Unit and bootstrap suites exercise git-facing code paths, so every
    // worker gets an identity and the target branch fetched.
    commands.push("git config --global user.email \"ci@example.com\"".to_string());
    commands.push("git config --global user.name \"CI User\"".to_string());
    commands.push(format!(
        "git fetch origin {target_branch}:refs/remotes/origin/{target_branch}"
    ));

    if job.suite() == Some(TestSuite::Build) {
        commands.push("cp share/spack/qa/configuration/*.yaml etc/spack/".to_string());
    }

    debug!(job = %job.id, commands = commands.len(), "built setup plan");
    commands
}

/// Coverage upload record for a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageUpload {
    /// Interpreter version tag, from PYTHON_VERSION or the python axis.
    pub python_version: String,
    /// Upload flag combining the suite and the OS name.
    pub flags: String,
}

/// Coverage is uploaded only for coverage-capable suites that opted in
/// with `COVERAGE=true`.
pub fn coverage_upload(job: &MatrixJob) -> Option<CoverageUpload> {
    if !job.env.coverage_enabled() {
        return None;
    }
    let suite = job.suite()?;
    if !suite.coverage_capable() {
        return None;
    }
    let python_version = job
        .env
        .python_version
        .clone()
        .or_else(|| job.python.clone())
        .unwrap_or_else(|| "unknown".to_string());
    Some(CoverageUpload {
        python_version,
        flags: format!("{}tests,{}", suite.wire_name(), job.os),
    })
}

/// Whether the email hook fires for a build that went `previous -> current`.
pub fn should_notify(
    email: &EmailNotification,
    previous: Option<PipelineVerdict>,
    current: PipelineVerdict,
) -> bool {
    if current == PipelineVerdict::Pending {
        return false;
    }
    if email.on_failure && current == PipelineVerdict::Failed {
        return true;
    }
    if email.on_change {
        return match previous {
            Some(prev) => prev != current,
            // First completed build establishes the status.
            None => true,
        };
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{OneOrMany, PipelineDescriptor};
    use crate::matrix::expand;

    fn jobs_for(yaml: &str) -> (PipelineDescriptor, Vec<MatrixJob>) {
        let desc = PipelineDescriptor::from_yaml(yaml).unwrap();
        let jobs = expand(&desc);
        (desc, jobs)
    }

    #[test]
    fn test_linux_setup_uses_apt_addon() {
        let (desc, jobs) = jobs_for(
            r#"
addons:
  apt:
    packages: [ccache, gfortran]
jobs:
  include:
    - os: linux
      env: TEST_SUITE=unit
"#,
        );
        let plan = setup_plan(&desc, &jobs[0], "develop");
        assert!(plan.contains(&"sudo apt-get install -y ccache gfortran".to_string()));
        assert!(plan.iter().any(|c| c.contains("git fetch origin develop")));
        assert!(!plan.iter().any(|c| c.contains("configuration/*.yaml")));
    }

    #[test]
    fn test_cache_restore_precedes_package_install() {
        let (desc, jobs) = jobs_for(
            r#"
cache:
  pip: true
  ccache: true
  directories:
    - ~/.mirror
jobs:
  include:
    - env: TEST_SUITE=unit
"#,
        );
        assert_eq!(
            cache_directories(&desc),
            ["~/.cache/pip", "~/.ccache", "~/.mirror"]
        );
        let plan = setup_plan(&desc, &jobs[0], "develop");
        assert_eq!(plan[0], "mkdir -p ~/.cache/pip");
        assert_eq!(plan[1], "mkdir -p ~/.ccache");
        assert_eq!(plan[2], "mkdir -p ~/.mirror");
        assert!(plan[3].starts_with("sudo apt-get install"));
    }

    #[test]
    fn test_cache_defaults_when_undeclared() {
        let (desc, _) = jobs_for("language: python");
        assert_eq!(cache_directories(&desc), CACHE_DIRECTORIES);
    }

    #[test]
    fn test_osx_setup_uses_brew() {
        let (desc, jobs) = jobs_for(
            r#"
jobs:
  include:
    - os: osx
      env: TEST_SUITE=unit PYTHON_VERSION=2.7
"#,
        );
        let plan = setup_plan(&desc, &jobs[0], "develop");
        assert!(plan.contains(&"brew install python@2 gcc ccache dash".to_string()));
    }

    #[test]
    fn test_build_jobs_copy_example_configs() {
        let (desc, jobs) = jobs_for(
            r#"
jobs:
  include:
    - env: TEST_SUITE=build SPEC=tut
"#,
        );
        let plan = setup_plan(&desc, &jobs[0], "develop");
        assert!(plan.last().unwrap().contains("configuration/*.yaml"));
    }

    #[test]
    fn test_coverage_upload_only_for_opted_in_unit_jobs() {
        let (_, jobs) = jobs_for(
            r#"
jobs:
  include:
    - python: "3.7"
      env: TEST_SUITE=unit COVERAGE=true
    - python: "3.7"
      env: TEST_SUITE=unit
    - python: "2.7"
      env: TEST_SUITE=build SPEC=mpich COVERAGE=true
"#,
        );
        let upload = coverage_upload(&jobs[0]).unwrap();
        assert_eq!(upload.python_version, "3.7");
        assert_eq!(upload.flags, "unittests,linux");
        assert!(coverage_upload(&jobs[1]).is_none());
        // Build suite is not coverage capable even when opted in.
        assert!(coverage_upload(&jobs[2]).is_none());
    }

    #[test]
    fn test_coverage_prefers_env_python_version() {
        let (_, jobs) = jobs_for(
            r#"
jobs:
  include:
    - os: osx
      env: TEST_SUITE=unit PYTHON_VERSION=2.7 COVERAGE=true
"#,
        );
        let upload = coverage_upload(&jobs[0]).unwrap();
        assert_eq!(upload.python_version, "2.7");
        assert_eq!(upload.flags, "unittests,osx");
    }

    fn email(on_change: bool, on_failure: bool) -> EmailNotification {
        EmailNotification {
            recipients: OneOrMany::One("maintainers@example.com".to_string()),
            on_change,
            on_failure,
        }
    }

    #[test]
    fn test_notify_on_failure() {
        let e = email(false, true);
        assert!(should_notify(&e, Some(PipelineVerdict::Failed), PipelineVerdict::Failed));
        assert!(!should_notify(&e, Some(PipelineVerdict::Passed), PipelineVerdict::Passed));
    }

    #[test]
    fn test_notify_on_change() {
        let e = email(true, false);
        assert!(should_notify(&e, Some(PipelineVerdict::Failed), PipelineVerdict::Passed));
        assert!(!should_notify(&e, Some(PipelineVerdict::Passed), PipelineVerdict::Passed));
        assert!(should_notify(&e, None, PipelineVerdict::Passed));
    }

    #[test]
    fn test_pending_never_notifies() {
        let e = email(true, true);
        assert!(!should_notify(&e, None, PipelineVerdict::Pending));
    }
}
