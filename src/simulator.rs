use std::process::Command;

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::error::PipelineError;
use crate::tools;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationRequest {
    pub config_path: Utf8PathBuf,
    pub debug: bool,
}

impl SimulationRequest {
    pub fn arguments(&self) -> Vec<String> {
        let mut args = vec![self.config_path.to_string()];
        if self.debug {
            args.push("--debug".to_string());
        }
        args
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SimulationOutcome {
    pub exit_code: Option<i32>,
    pub success: bool,
}

pub trait Simulator: Send + Sync {
    fn launch(&self, request: &SimulationRequest) -> Result<SimulationOutcome, PipelineError>;
}

#[derive(Debug, Clone)]
pub struct ProcessSimulator {
    program: String,
}

impl ProcessSimulator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Simulator for ProcessSimulator {
    fn launch(&self, request: &SimulationRequest) -> Result<SimulationOutcome, PipelineError> {
        let program = tools::locate_program(&self.program)?;
        let args = request.arguments();
        tracing::debug!(program = %program.display(), ?args, "launching simulator");
        let status = Command::new(&program)
            .args(&args)
            .status()
            .map_err(|err| PipelineError::SimulatorLaunch(format!("{}: {err}", program.display())))?;
        Ok(SimulationOutcome {
            exit_code: status.code(),
            success: status.success(),
        })
    }
}
