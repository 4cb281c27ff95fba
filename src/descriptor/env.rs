//! Typed view of Travis-style env strings.
//!
//! A job's environment is written on the wire as a single string of
//! `KEY=VALUE` bindings, e.g. `TEST_SUITE=build SPEC=mpich`. The recognized
//! keys get typed fields; anything else is kept as a passthrough extra.
//! `allow_failures` matching works by env identity, so [`JobEnv::canonical`]
//! renders a normalized form that is stable under key order and spacing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::suite::TestSuite;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobEnv {
    /// Raw `TEST_SUITE` value. Unknown suite names are kept here so the
    /// validator can report them instead of failing the whole parse.
    pub test_suite: Option<String>,
    pub spec: Option<String>,
    /// `None` when the binding is absent; an explicit `COVERAGE=false` is
    /// kept distinct so env identity and round-trips preserve it.
    pub coverage: Option<bool>,
    pub python_version: Option<String>,
    pub extras: BTreeMap<String, String>,
}

impl JobEnv {
    /// Parse a whitespace-separated `KEY=VALUE` binding string.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut env = JobEnv::default();
        for token in raw.split_whitespace() {
            let (key, value) = token
                .split_once('=')
                .ok_or_else(|| ConfigError::MalformedEnv(token.to_string()))?;
            if key.is_empty() {
                return Err(ConfigError::MalformedEnv(token.to_string()));
            }
            match key {
                "TEST_SUITE" => env.test_suite = Some(value.to_string()),
                "SPEC" => env.spec = Some(value.to_string()),
                "COVERAGE" => env.coverage = Some(value == "true"),
                "PYTHON_VERSION" => env.python_version = Some(value.to_string()),
                _ => {
                    env.extras.insert(key.to_string(), value.to_string());
                }
            }
        }
        Ok(env)
    }

    /// The suite this env selects, if the `TEST_SUITE` value is a known one.
    pub fn suite(&self) -> Option<TestSuite> {
        self.test_suite.as_deref().and_then(|s| s.parse().ok())
    }

    /// Whether the job opted in to coverage measurement.
    pub fn coverage_enabled(&self) -> bool {
        self.coverage == Some(true)
    }

    /// Normalized rendering: recognized keys in fixed order, extras sorted.
    pub fn canonical(&self) -> String {
        let mut parts = Vec::new();
        if let Some(suite) = &self.test_suite {
            parts.push(format!("TEST_SUITE={suite}"));
        }
        if let Some(spec) = &self.spec {
            parts.push(format!("SPEC={spec}"));
        }
        if let Some(coverage) = self.coverage {
            parts.push(format!("COVERAGE={coverage}"));
        }
        if let Some(version) = &self.python_version {
            parts.push(format!("PYTHON_VERSION={version}"));
        }
        for (key, value) in &self.extras {
            parts.push(format!("{key}={value}"));
        }
        parts.join(" ")
    }

    /// Env identity used for allow_failures matching.
    pub fn matches(&self, other: &JobEnv) -> bool {
        self.canonical() == other.canonical()
    }
}

impl TryFrom<String> for JobEnv {
    type Error = ConfigError;

    fn try_from(raw: String) -> Result<Self> {
        JobEnv::parse(&raw)
    }
}

impl From<JobEnv> for String {
    fn from(env: JobEnv) -> Self {
        env.canonical()
    }
}
