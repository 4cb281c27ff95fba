//! serde model of the pipeline descriptor.
//!
//! Mirrors the Travis-style YAML shape: top-level axes (`python`, `os`),
//! branch filter, stage declarations, explicit `jobs.include` rows,
//! allow_failures, caches, addon package lists, lifecycle hook command
//! lists, and the email notification block. Fields that accept either a
//! scalar or a list on the wire use [`OneOrMany`].

use serde::{Deserialize, Serialize};

use crate::descriptor::branch::BranchFilter;
use crate::descriptor::env::JobEnv;
use crate::error::Result;

/// YAML fields that take either one value or a list of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value),
            OneOrMany::Many(values) => values,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, OneOrMany::Many(values) if values.is_empty())
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineDescriptor {
    #[serde(default)]
    pub language: Option<String>,

    /// Interpreter version axis.
    #[serde(default)]
    pub python: OneOrMany<String>,

    /// Operating system axis; defaults to linux when absent.
    #[serde(default)]
    pub os: OneOrMany<String>,

    #[serde(default)]
    pub branches: BranchConfig,

    /// Global env axis: one job per entry when the axes are cross-produced.
    #[serde(default)]
    pub env: OneOrMany<JobEnv>,

    /// Declared stage names, in execution order.
    #[serde(default)]
    pub stages: Vec<String>,

    #[serde(default)]
    pub jobs: JobsConfig,

    #[serde(default)]
    pub cache: Option<CacheConfig>,

    #[serde(default)]
    pub addons: Option<Addons>,

    #[serde(default)]
    pub before_install: OneOrMany<String>,

    #[serde(default)]
    pub install: OneOrMany<String>,

    #[serde(default)]
    pub before_script: OneOrMany<String>,

    #[serde(default)]
    pub script: OneOrMany<String>,

    #[serde(default)]
    pub after_success: OneOrMany<String>,

    #[serde(default)]
    pub notifications: Option<NotificationConfig>,
}

impl PipelineDescriptor {
    /// Compiled branch filter for this descriptor.
    pub fn branch_filter(&self) -> Result<BranchFilter> {
        BranchFilter::compile(self.branches.only.as_slice(), self.branches.except.as_slice())
    }

    /// Default stage for jobs that do not declare one: the first declared
    /// stage, or the provider's implicit "test" stage.
    pub fn default_stage(&self) -> &str {
        self.stages.first().map(String::as_str).unwrap_or("test")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchConfig {
    #[serde(default)]
    pub only: OneOrMany<String>,
    #[serde(default)]
    pub except: OneOrMany<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Report the pipeline verdict without waiting on allowed-failure jobs.
    #[serde(default)]
    pub fast_finish: bool,

    #[serde(default)]
    pub include: Vec<MatrixEntry>,

    #[serde(default)]
    pub allow_failures: Vec<AllowFailure>,
}

/// One explicit job row under `jobs.include`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatrixEntry {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub python: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub env: Option<JobEnv>,
    #[serde(default)]
    pub stage: Option<String>,
}

/// allow_failures entries select jobs by env identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowFailure {
    pub env: JobEnv,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Package-manager (pip) cache.
    #[serde(default)]
    pub pip: bool,
    /// Compiler cache.
    #[serde(default)]
    pub ccache: bool,
    /// Extra cached directories, e.g. the source mirror.
    #[serde(default)]
    pub directories: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Addons {
    #[serde(default)]
    pub apt: Option<AptAddon>,
    #[serde(default)]
    pub homebrew: Option<HomebrewAddon>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AptAddon {
    #[serde(default)]
    pub packages: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HomebrewAddon {
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub update: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub email: Option<EmailNotification>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailNotification {
    pub recipients: OneOrMany<String>,
    /// Notify when the build status flips between passing and failing.
    #[serde(default = "default_true")]
    pub on_change: bool,
    /// Notify on every failure.
    #[serde(default = "default_true")]
    pub on_failure: bool,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_or_many_scalar() {
        let many: OneOrMany<String> = serde_yaml::from_str("[a, b]").unwrap();
        assert_eq!(many.as_slice().len(), 2);
        let one: OneOrMany<String> = serde_yaml::from_str("a").unwrap();
        assert_eq!(one.as_slice(), ["a".to_string()]);
        assert!(OneOrMany::<String>::default().is_empty());
    }

    #[test]
    fn test_default_stage() {
        let mut desc = PipelineDescriptor::default();
        assert_eq!(desc.default_stage(), "test");
        desc.stages = vec!["style checks".to_string(), "build tests".to_string()];
        assert_eq!(desc.default_stage(), "style checks");
    }
}
