//! Branch filter.
//!
//! `branches.only` / `branches.except` entries are either literal branch
//! names or `/regex/` patterns. Regex patterns are anchored to the full
//! branch name, so `releases/.*` matches `releases/v1.0` but never
//! `feature/x`.

use regex::Regex;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone)]
pub enum BranchPattern {
    Literal(String),
    Regex(Regex),
}

impl BranchPattern {
    pub fn compile(pattern: &str) -> Result<Self> {
        let inner = pattern
            .strip_prefix('/')
            .and_then(|p| p.strip_suffix('/'));
        match inner {
            Some(regex) => {
                let anchored = format!("^(?:{regex})$");
                let compiled = Regex::new(&anchored).map_err(|source| {
                    ConfigError::BranchPattern {
                        pattern: pattern.to_string(),
                        source,
                    }
                })?;
                Ok(BranchPattern::Regex(compiled))
            }
            None => Ok(BranchPattern::Literal(pattern.to_string())),
        }
    }

    pub fn matches(&self, branch: &str) -> bool {
        match self {
            BranchPattern::Literal(name) => name == branch,
            BranchPattern::Regex(regex) => regex.is_match(branch),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BranchFilter {
    only: Vec<BranchPattern>,
    except: Vec<BranchPattern>,
}

impl BranchFilter {
    pub fn compile(only: &[String], except: &[String]) -> Result<Self> {
        let compile_all = |patterns: &[String]| -> Result<Vec<BranchPattern>> {
            patterns.iter().map(|p| BranchPattern::compile(p)).collect()
        };
        Ok(BranchFilter {
            only: compile_all(only)?,
            except: compile_all(except)?,
        })
    }

    /// Whether a push to `branch` triggers a build. An empty `only` list
    /// admits every branch not excluded.
    pub fn matches(&self, branch: &str) -> bool {
        if self.except.iter().any(|p| p.matches(branch)) {
            return false;
        }
        self.only.is_empty() || self.only.iter().any(|p| p.matches(branch))
    }
}
