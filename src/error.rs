use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error("fill-up and no-replace are mutually exclusive options")]
    #[diagnostic(help("pass at most one of --fill-up and --no-replace"))]
    PolicyConflict,

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("missing config template at {0}")]
    MissingConfig(PathBuf),

    #[error("failed to read config template at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse config: {0}")]
    ConfigParse(String),

    #[error("failed to write config: {0}")]
    ConfigWrite(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read profile {path}: {message}")]
    ProfileRead { path: PathBuf, message: String },

    #[error("reference request failed: {0}")]
    ReferenceHttp(String),

    #[error("reference source returned status {status}: {message}")]
    ReferenceStatus { status: u16, message: String },

    #[error("genome resolution failed: {0}")]
    Resolution(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("failed to launch simulator: {0}")]
    SimulatorLaunch(String),
}

impl PipelineError {
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::Resolution(_)
                | PipelineError::ReferenceHttp(_)
                | PipelineError::ReferenceStatus { .. }
                | PipelineError::ProfileRead { .. }
        )
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::PolicyConflict
            | PipelineError::InvalidOption(_)
            | PipelineError::MissingConfig(_)
            | PipelineError::ConfigParse(_) => 2,
            error if error.is_resolution_failure() => 3,
            PipelineError::MissingTool(_) | PipelineError::SimulatorLaunch(_) => 3,
            _ => 1,
        }
    }
}
