//! Sample metadata encoded in coverage file names.
//!
//! Upstream producers name per-chromosome files
//! `<context>_<sample>_<replicate>[...]_<chromosome>.cov.gz`, e.g.
//! `CpG_SampleA_1_chr_5.cov.gz`.

use crate::error::{PipelineError, Result};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Sequence context (`CpG`, `CHG`, `CHH`, ...)
    pub context: String,
    /// Sample name joined with its replicate token
    pub sample: String,
    pub chromosome: String,
}

impl FileMetadata {
    /// Parse a bare file name.
    ///
    /// Tokens are split on `_`: the first is the context, the second and
    /// third (cut at the first `.`) form the sample, and the last (cut at
    /// the first `.`) is the chromosome.
    pub fn from_file_name(name: &str) -> Result<Self> {
        let parts: Vec<&str> = name.split('_').collect();
        if parts.len() < 3 {
            return Err(PipelineError::FileName(name.to_string()));
        }

        let last = parts[parts.len() - 1];
        Ok(Self {
            context: parts[0].to_string(),
            sample: format!("{}_{}", parts[1], before_dot(parts[2])),
            chromosome: before_dot(last).to_string(),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .ok_or_else(|| PipelineError::FileName(path.display().to_string()))?;
        Self::from_file_name(&name.to_string_lossy())
    }
}

fn before_dot(token: &str) -> &str {
    token.split_once('.').map_or(token, |(head, _)| head)
}
