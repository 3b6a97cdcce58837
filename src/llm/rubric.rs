//! The grading rubric sent with every evaluation.
//!
//! The rubric is a fixed text asset: the examiner persona, the nine IELTS
//! band levels with their four criteria, and the output-format contract. A
//! copy is compiled in from `assets/ielts_rubric.txt`; deployments can point
//! [`RubricConfig::path`] at a newer revision without rebuilding.
//!
//! The text is loaded once at startup and shared as `Arc<str>`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::config::{AppPaths, RubricConfig};

const BUILTIN_RUBRIC: &str = include_str!("../../assets/ielts_rubric.txt");

/// Errors raised while loading an external rubric file.
#[derive(Debug, Error)]
pub enum RubricError {
    #[error("failed to read rubric {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rubric file {0} is empty")]
    Empty(PathBuf),
}

/// Where the loaded rubric text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RubricSource {
    Builtin,
    File(PathBuf),
}

/// Immutable rubric text plus its provenance.
#[derive(Debug, Clone)]
pub struct Rubric {
    text: Arc<str>,
    source: RubricSource,
}

impl Rubric {
    /// The rubric compiled into the binary.
    pub fn builtin() -> Self {
        Self {
            text: Arc::from(BUILTIN_RUBRIC),
            source: RubricSource::Builtin,
        }
    }

    /// Load a rubric file. Whitespace-only files are rejected.
    pub fn load_from(path: &Path) -> Result<Self, RubricError> {
        let text = std::fs::read_to_string(path).map_err(|source| RubricError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if text.trim().is_empty() {
            return Err(RubricError::Empty(path.to_path_buf()));
        }
        Ok(Self {
            text: Arc::from(text),
            source: RubricSource::File(path.to_path_buf()),
        })
    }

    /// Resolve the rubric for this configuration.
    ///
    /// An explicitly configured path must load. Otherwise a `rubric.txt` in
    /// the config directory is used when present, and the built-in copy when
    /// not.
    pub fn from_config(config: &RubricConfig) -> Result<Self, RubricError> {
        Self::resolve(config, &AppPaths::new().rubric_file)
    }

    fn resolve(config: &RubricConfig, conventional: &Path) -> Result<Self, RubricError> {
        let rubric = match &config.path {
            Some(path) => Self::load_from(path)?,
            None if conventional.exists() => Self::load_from(conventional)?,
            None => Self::builtin(),
        };
        match &rubric.source {
            RubricSource::Builtin => log::debug!("Using built-in rubric"),
            RubricSource::File(path) => log::info!("Rubric loaded from {}", path.display()),
        }
        Ok(rubric)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> &RubricSource {
        &self.source
    }
}

impl Default for Rubric {
    fn default() -> Self {
        Self::builtin()
    }
}
