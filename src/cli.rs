use std::ffi::OsString;

use camino::Utf8PathBuf;
use clap::{CommandFactory, Parser};

use crate::domain::{GenomeReusePolicy, ReferenceSource, normalize_output_dir};
use crate::error::PipelineError;
use crate::options::{
    DEFAULT_CONFIG, DEFAULT_OUTPUT_DIR, DEFAULT_REFERENCE_GENOMES, DEFAULT_RESOLVER,
    DEFAULT_SIMULATOR, DEFAULT_TAXONOMY, RunOptions,
};

#[derive(Debug, Parser)]
#[command(name = "metagenome-from-profile")]
#[command(about = "Map an abundance profile to reference genomes and prepare a metagenome simulation")]
#[command(version)]
pub struct Cli {
    #[arg(short = 'p', long, help = "Profile to create the metagenome from, in CAMI or biom format")]
    pub profile: Option<Utf8PathBuf>,

    #[arg(
        short = 's',
        long,
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Number of samples to generate. Without it, CAMI profiles give 1 sample and biom files give one per sample column. A given number simulates every sample from the first sample of the biom file"
    )]
    pub samples: Option<u32>,

    #[arg(
        short = 'o',
        long = "output",
        value_name = "OUT PATH",
        default_value = DEFAULT_OUTPUT_DIR,
        help = "Output directory"
    )]
    pub output: String,

    #[arg(long, help = "Directory for temporary files, removed once the run is finished")]
    pub tmp: Option<Utf8PathBuf>,

    #[arg(short = 'r', long, default_value = DEFAULT_REFERENCE_GENOMES, help = "Reference genome list: NCBI id, scientific name and ftp address of the genome")]
    pub reference_genomes: Utf8PathBuf,

    #[arg(short = 'a', long, help = "Additional reference genomes in the same format, a local file, an http(s) URL or an NCBI ftp URL")]
    pub additional_references: Option<String>,

    #[arg(short = 'f', long, help = "Fill up profile OTUs with genomes not used in the mapping. Excludes --no-replace")]
    pub fill_up: bool,

    #[arg(
        short = 'c',
        long,
        value_name = "CONFIG FILE",
        default_value = DEFAULT_CONFIG,
        help = "Config template. output_directory and seed are overwritten by the run"
    )]
    pub config: Utf8PathBuf,

    #[arg(long, default_value = DEFAULT_TAXONOMY, help = "NCBI taxdump used to find reference genomes")]
    pub ncbi: Utf8PathBuf,

    #[arg(short = 'n', long, help = "Sample without replacement, so each genome is used for exactly one OTU")]
    pub no_replace: bool,

    #[arg(short = 'd', long, help = "Only map genomes to OTUs, do not simulate anything")]
    pub dry_run: bool,

    #[arg(long, allow_negative_numbers = true, help = "Seed for the random generator")]
    pub seed: Option<i64>,

    #[arg(long, help = "More log output, also passed on to the simulator")]
    pub debug: bool,

    #[arg(long, default_value = DEFAULT_RESOLVER, help = "Program mapping profile entries to reference genomes")]
    pub resolver: String,

    #[arg(long, default_value = DEFAULT_SIMULATOR, help = "Simulator program receiving the final config.ini")]
    pub simulator: String,

    #[arg(long, help = "Print the run summary as JSON on stdout")]
    pub json: bool,
}

impl Cli {
    pub fn into_options(self) -> Result<RunOptions, PipelineError> {
        let policy = GenomeReusePolicy::from_flags(self.fill_up, self.no_replace)?;
        let profile = self
            .profile
            .ok_or_else(|| PipelineError::InvalidOption("--profile is required".to_string()))?;
        let additional_references = self
            .additional_references
            .as_deref()
            .map(str::parse::<ReferenceSource>)
            .transpose()?;
        let output_dir = normalize_output_dir(&self.output)?;

        Ok(RunOptions {
            profile,
            samples: self.samples,
            output_dir,
            tmp_dir: self.tmp,
            reference_genomes: self.reference_genomes,
            additional_references,
            policy,
            config_template: self.config,
            taxonomy: self.ncbi,
            seed: self.seed,
            dry_run: self.dry_run,
            debug: self.debug,
        })
    }
}

// `Ok(None)` means no arguments were given and usage should be shown instead.
pub fn parse_args<I, T>(args: I) -> Result<Option<Cli>, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    if args.len() <= 1 {
        return Ok(None);
    }
    Cli::try_parse_from(args).map(Some)
}

pub fn render_help() -> String {
    Cli::command().render_help().to_string()
}
