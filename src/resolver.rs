use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::{BaseConfig, ConfigLoader};
use crate::domain::{GenomeReusePolicy, SampleCount};
use crate::error::PipelineError;
use crate::profile::ProfileFormat;
use crate::tools;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    pub profile: Utf8PathBuf,
    pub profile_format: ProfileFormat,
    pub reference_genomes: Utf8PathBuf,
    pub additional_references: Option<Utf8PathBuf>,
    pub taxonomy: Utf8PathBuf,
    pub samples: SampleCount,
    pub policy: GenomeReusePolicy,
    pub seed: Option<i64>,
    pub output_dir: Utf8PathBuf,
    pub staging_dir: Utf8PathBuf,
}

impl ResolutionRequest {
    pub fn sample_count(&self) -> Option<u32> {
        self.samples.requested()
    }

    pub fn fill_up(&self) -> bool {
        self.policy.fill_up()
    }

    pub fn replace(&self) -> bool {
        self.policy.replace()
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedRun {
    pub genome_count: u64,
    pub config: BaseConfig,
}

pub trait GenomeResolver: Send + Sync {
    fn resolve(
        &self,
        request: &ResolutionRequest,
        config: BaseConfig,
    ) -> Result<ResolvedRun, PipelineError>;
}

// Contract: reads `--config`, writes `--config-out`, prints the genome count last.
#[derive(Debug, Clone)]
pub struct CommandResolver {
    program: String,
}

impl CommandResolver {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn arguments(
        request: &ResolutionRequest,
        config_in: &Utf8Path,
        config_out: &Utf8Path,
    ) -> Vec<String> {
        let mut args = vec![
            "--profile".to_string(),
            request.profile.to_string(),
            "--reference-genomes".to_string(),
            request.reference_genomes.to_string(),
            "--ncbi".to_string(),
            request.taxonomy.to_string(),
        ];
        if let Some(path) = &request.additional_references {
            args.push("--additional-references".to_string());
            args.push(path.to_string());
        }
        if let Some(count) = request.sample_count() {
            args.push("--samples".to_string());
            args.push(count.to_string());
        }
        if request.fill_up() {
            args.push("--fill-up".to_string());
        }
        if !request.replace() {
            args.push("--no-replace".to_string());
        }
        if let Some(seed) = request.seed {
            args.push("--seed".to_string());
            args.push(seed.to_string());
        }
        args.extend([
            "--output-directory".to_string(),
            request.output_dir.to_string(),
            "--tmp".to_string(),
            request.staging_dir.to_string(),
            "--config".to_string(),
            config_in.to_string(),
            "--config-out".to_string(),
            config_out.to_string(),
        ]);
        args
    }
}

impl GenomeResolver for CommandResolver {
    fn resolve(
        &self,
        request: &ResolutionRequest,
        config: BaseConfig,
    ) -> Result<ResolvedRun, PipelineError> {
        let program = tools::locate_program(&self.program)?;
        let config_in = request.staging_dir.join("base_config.ini");
        let config_out = request.staging_dir.join("resolved_config.ini");
        fs::write(config_in.as_std_path(), config.render())
            .map_err(|err| PipelineError::Filesystem(format!("write {config_in}: {err}")))?;

        let args = Self::arguments(request, &config_in, &config_out);
        tracing::debug!(program = %program.display(), ?args, "invoking genome resolver");
        let output = tools::run_captured(&program, &args).map_err(|err| {
            PipelineError::Resolution(format!("failed to run {}: {err}", program.display()))
        })?;
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            tracing::debug!(target: "resolver", "{line}");
        }
        if !output.status.success() {
            return Err(PipelineError::Resolution(tools::failure_message(
                &program, &output,
            )));
        }

        let genome_count = parse_genome_count(&String::from_utf8_lossy(&output.stdout))?;
        let config = ConfigLoader::load(&config_out).map_err(|err| match err {
            PipelineError::MissingConfig(_) => PipelineError::Resolution(format!(
                "resolver did not write the updated config to {config_out}"
            )),
            other => other,
        })?;
        Ok(ResolvedRun {
            genome_count,
            config,
        })
    }
}

pub fn parse_genome_count(stdout: &str) -> Result<u64, PipelineError> {
    let last = stdout
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .ok_or_else(|| PipelineError::Resolution("resolver printed no genome count".to_string()))?;
    last.parse::<u64>().map_err(|_| {
        PipelineError::Resolution(format!("resolver printed an invalid genome count: {last}"))
    })
}
