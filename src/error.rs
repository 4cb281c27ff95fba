use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unknown test suite: {0}")]
    UnknownSuite(String),

    #[error("Malformed env binding '{0}': expected KEY=VALUE")]
    MalformedEnv(String),

    #[error("Invalid branch pattern '{pattern}': {source}")]
    BranchPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
