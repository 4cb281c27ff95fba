//! Job-kind dispatch.
//!
//! The descriptor selects behavior per job through a `TEST_SUITE` binding.
//! Rather than branching on the raw string everywhere, the suite is an
//! explicit enum and everything keyed on it (entrypoint script, whether a
//! `SPEC` is accepted, whether coverage can be produced, whether the job is
//! expected to be allowed to fail) lives in one dispatch table here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Package specs the build suite knows how to exercise.
pub const KNOWN_BUILD_SPECS: &[&str] = &["mpich", "astyle", "tut", "py-setuptools"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestSuite {
    Flake8,
    Bootstrap,
    Unit,
    Doc,
    Build,
    Docker,
}

impl TestSuite {
    pub const ALL: &'static [TestSuite] = &[
        TestSuite::Flake8,
        TestSuite::Bootstrap,
        TestSuite::Unit,
        TestSuite::Doc,
        TestSuite::Build,
        TestSuite::Docker,
    ];

    /// The value as it appears in `TEST_SUITE=...` bindings.
    pub fn wire_name(&self) -> &'static str {
        match self {
            TestSuite::Flake8 => "flake8",
            TestSuite::Bootstrap => "bootstrap",
            TestSuite::Unit => "unit",
            TestSuite::Doc => "doc",
            TestSuite::Build => "build",
            TestSuite::Docker => "docker",
        }
    }

    /// Entrypoint script the job runs, relative to the repository root.
    pub fn entrypoint(&self) -> String {
        format!("share/spack/qa/run-{}-tests", self.wire_name())
    }

    /// Whether the suite consumes a `SPEC` binding naming a package to build.
    pub fn accepts_spec(&self) -> bool {
        matches!(self, TestSuite::Build)
    }

    /// Whether the suite can emit coverage artifacts for upload.
    pub fn coverage_capable(&self) -> bool {
        matches!(self, TestSuite::Unit)
    }

    /// Whether jobs of this suite are expected to appear in allow_failures.
    pub fn may_fail(&self) -> bool {
        matches!(self, TestSuite::Docker)
    }
}

impl FromStr for TestSuite {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flake8" => Ok(TestSuite::Flake8),
            "bootstrap" => Ok(TestSuite::Bootstrap),
            "unit" => Ok(TestSuite::Unit),
            "doc" => Ok(TestSuite::Doc),
            "build" => Ok(TestSuite::Build),
            "docker" => Ok(TestSuite::Docker),
            other => Err(ConfigError::UnknownSuite(other.to_string())),
        }
    }
}

impl fmt::Display for TestSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_roundtrip() {
        for suite in TestSuite::ALL {
            assert_eq!(suite.wire_name().parse::<TestSuite>().unwrap(), *suite);
        }
    }

    #[test]
    fn test_unknown_suite_rejected() {
        assert!("integration".parse::<TestSuite>().is_err());
    }

    #[test]
    fn test_entrypoint_paths() {
        assert_eq!(TestSuite::Unit.entrypoint(), "share/spack/qa/run-unit-tests");
        assert_eq!(
            TestSuite::Flake8.entrypoint(),
            "share/spack/qa/run-flake8-tests"
        );
    }

    #[test]
    fn test_dispatch_table() {
        assert!(TestSuite::Build.accepts_spec());
        assert!(!TestSuite::Unit.accepts_spec());
        assert!(TestSuite::Unit.coverage_capable());
        assert!(!TestSuite::Build.coverage_capable());
        assert!(TestSuite::Docker.may_fail());
        assert!(!TestSuite::Doc.may_fail());
    }
}
