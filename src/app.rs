use std::fmt;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::config::{ConfigLoader, ConfigSynthesizer};
use crate::domain::{GenomeReusePolicy, ReferenceSource, SampleCount};
use crate::error::PipelineError;
use crate::fs_util;
use crate::options::RunOptions;
use crate::profile::{self, ProfileFormat};
use crate::references::ReferenceFetcher;
use crate::resolver::{GenomeResolver, ResolutionRequest};
use crate::simulator::{SimulationOutcome, SimulationRequest, Simulator};

const STAGED_REFERENCES_FALLBACK: &str = "additional_references.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineStage {
    Parsed,
    Validated,
    Resolved,
    ConfigWritten,
    DryStop,
    Dispatched,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Parsed => "Parsed",
            PipelineStage::Validated => "Validated",
            PipelineStage::Resolved => "Resolved",
            PipelineStage::ConfigWritten => "ConfigWritten",
            PipelineStage::DryStop => "DryStop",
            PipelineStage::Dispatched => "Dispatched",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub stage: PipelineStage,
    pub level: EventLevel,
    pub message: String,
    pub elapsed: Option<Duration>,
}

impl ProgressEvent {
    fn info(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            level: EventLevel::Info,
            message: message.into(),
            elapsed: None,
        }
    }

    fn debug(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self {
            level: EventLevel::Debug,
            ..Self::info(stage, message)
        }
    }

    fn warn(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self {
            level: EventLevel::Warn,
            ..Self::info(stage, message)
        }
    }

    fn timed(mut self, started: Instant) -> Self {
        self.elapsed = Some(started.elapsed());
        self
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum RunOutcome {
    DryRun,
    Dispatched {
        exit_code: Option<i32>,
        success: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub config_path: String,
    pub output_directory: String,
    pub genome_count: u64,
    pub profile_format: ProfileFormat,
    pub samples: SampleCount,
    pub policy: GenomeReusePolicy,
    pub seed: Option<String>,
    pub outcome: RunOutcome,
}

#[derive(Clone)]
pub struct App<R: GenomeResolver, S: Simulator, F: ReferenceFetcher> {
    resolver: R,
    simulator: S,
    fetcher: F,
}

impl<R: GenomeResolver, S: Simulator, F: ReferenceFetcher> App<R, S, F> {
    pub fn new(resolver: R, simulator: S, fetcher: F) -> Self {
        Self {
            resolver,
            simulator,
            fetcher,
        }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn simulator(&self) -> &S {
        &self.simulator
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    // Nothing is rolled back on failure; a created output directory stays.
    pub fn run(
        &self,
        options: &RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunSummary, PipelineError> {
        sink.event(ProgressEvent::debug(
            PipelineStage::Validated,
            format!("policy={}", options.policy),
        ));

        let base = ConfigLoader::load(&options.config_template)?;
        let profile = profile::inspect(&options.profile)?;
        let samples = profile.sample_count(options.samples);
        sink.event(ProgressEvent::info(
            PipelineStage::Validated,
            format!(
                "profile {} is {} ({})",
                options.profile,
                profile.format,
                describe_samples(samples)
            ),
        ));

        let output_dir = options.output_path();
        fs_util::ensure_dir(&output_dir)?;
        let (_staging_guard, staging_dir) = fs_util::staging_dir(options.tmp_dir.as_deref())?;
        sink.event(ProgressEvent::debug(
            PipelineStage::Validated,
            format!("staging files in {staging_dir}"),
        ));

        let additional_references = match &options.additional_references {
            Some(source) => Some(self.stage_references(source, &staging_dir, sink)?),
            None => None,
        };

        let request = ResolutionRequest {
            profile: options.profile.clone(),
            profile_format: profile.format,
            reference_genomes: options.reference_genomes.clone(),
            additional_references,
            taxonomy: options.taxonomy.clone(),
            samples,
            policy: options.policy,
            seed: options.seed,
            output_dir: output_dir.clone(),
            staging_dir,
        };
        let started = Instant::now();
        let resolved = self.resolver.resolve(&request, base)?;
        sink.event(
            ProgressEvent::info(
                PipelineStage::Resolved,
                format!("resolved {} genomes", resolved.genome_count),
            )
            .timed(started),
        );

        let final_config = ConfigSynthesizer::synthesize(resolved.config, options);
        let config_path = final_config.write()?;
        sink.event(ProgressEvent::info(
            PipelineStage::ConfigWritten,
            format!("wrote {config_path}"),
        ));

        let outcome = if options.dry_run {
            sink.event(ProgressEvent::info(
                PipelineStage::DryStop,
                "dry run, simulator not started",
            ));
            RunOutcome::DryRun
        } else {
            let started = Instant::now();
            let SimulationOutcome { exit_code, success } =
                self.simulator.launch(&SimulationRequest {
                    config_path: config_path.clone(),
                    debug: options.debug,
                })?;
            let event = if success {
                ProgressEvent::info(PipelineStage::Dispatched, "simulator finished")
            } else {
                ProgressEvent::warn(
                    PipelineStage::Dispatched,
                    match exit_code {
                        Some(code) => format!("simulator exited with status {code}"),
                        None => "simulator was terminated by a signal".to_string(),
                    },
                )
            };
            sink.event(event.timed(started));
            RunOutcome::Dispatched { exit_code, success }
        };

        Ok(RunSummary {
            config_path: config_path.to_string(),
            output_directory: final_config.output_directory().to_string(),
            genome_count: resolved.genome_count,
            profile_format: profile.format,
            samples,
            policy: options.policy,
            seed: final_config.main().seed.clone(),
            outcome,
        })
    }

    fn stage_references(
        &self,
        source: &ReferenceSource,
        staging_dir: &Utf8Path,
        sink: &dyn ProgressSink,
    ) -> Result<Utf8PathBuf, PipelineError> {
        match source {
            ReferenceSource::Local(path) => Ok(path.clone()),
            ReferenceSource::Remote(url) => {
                let name = source.file_name().unwrap_or(STAGED_REFERENCES_FALLBACK);
                let destination = staging_dir.join(name);
                let started = Instant::now();
                self.fetcher.fetch(url, destination.as_std_path())?;
                sink.event(
                    ProgressEvent::info(
                        PipelineStage::Validated,
                        format!("downloaded additional references from {url}"),
                    )
                    .timed(started),
                );
                Ok(destination)
            }
        }
    }
}

fn describe_samples(samples: SampleCount) -> String {
    match samples {
        SampleCount::Explicit(count) => format!("{count} samples requested"),
        SampleCount::FromProfile(count) => format!("{count} samples in profile, resolver default"),
        SampleCount::ResolverDefault => "sample count left to resolver".to_string(),
    }
}
