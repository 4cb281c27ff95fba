//! YAML ingestion for the descriptor.

use std::path::Path;

use tracing::debug;

use crate::descriptor::model::PipelineDescriptor;
use crate::error::Result;

impl PipelineDescriptor {
    /// Parse a descriptor from YAML source.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let descriptor: PipelineDescriptor = serde_yaml::from_str(yaml)?;
        debug!(
            stages = descriptor.stages.len(),
            include_rows = descriptor.jobs.include.len(),
            allow_failures = descriptor.jobs.allow_failures.len(),
            "parsed pipeline descriptor"
        );
        Ok(descriptor)
    }

    /// Parse a descriptor from a file on disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Re-emit the descriptor as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
