use camino::Utf8PathBuf;

use crate::domain::{GenomeReusePolicy, ReferenceSource, normalize_output_dir};
use crate::error::PipelineError;

pub const DEFAULT_OUTPUT_DIR: &str = "out/";
pub const DEFAULT_REFERENCE_GENOMES: &str = "tools/assembly_summary_complete_genomes.txt";
pub const DEFAULT_TAXONOMY: &str = "tools/ncbi-taxonomy_20170222.tar.gz";
pub const DEFAULT_CONFIG: &str = "defaults/default_config.ini";
pub const DEFAULT_RESOLVER: &str = "scripts/get_genomes.py";
pub const DEFAULT_SIMULATOR: &str = "./metagenomesimulation.py";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub profile: Utf8PathBuf,
    pub samples: Option<u32>,
    // exactly one trailing separator
    pub output_dir: String,
    pub tmp_dir: Option<Utf8PathBuf>,
    pub reference_genomes: Utf8PathBuf,
    pub additional_references: Option<ReferenceSource>,
    pub policy: GenomeReusePolicy,
    pub config_template: Utf8PathBuf,
    pub taxonomy: Utf8PathBuf,
    pub seed: Option<i64>,
    pub dry_run: bool,
    pub debug: bool,
}

impl RunOptions {
    pub fn new(profile: impl Into<Utf8PathBuf>) -> Self {
        Self {
            profile: profile.into(),
            samples: None,
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            tmp_dir: None,
            reference_genomes: Utf8PathBuf::from(DEFAULT_REFERENCE_GENOMES),
            additional_references: None,
            policy: GenomeReusePolicy::default(),
            config_template: Utf8PathBuf::from(DEFAULT_CONFIG),
            taxonomy: Utf8PathBuf::from(DEFAULT_TAXONOMY),
            seed: None,
            dry_run: false,
            debug: false,
        }
    }

    pub fn with_output_dir(mut self, output_dir: &str) -> Result<Self, PipelineError> {
        self.output_dir = normalize_output_dir(output_dir)?;
        Ok(self)
    }

    pub fn output_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(&self.output_dir)
    }

    pub fn describe(&self) -> Vec<(&'static str, String)> {
        fn opt<T: ToString>(value: &Option<T>) -> String {
            value
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "None".to_string())
        }

        vec![
            ("profile", self.profile.to_string()),
            ("samples", opt(&self.samples)),
            ("output", self.output_dir.clone()),
            ("tmp", opt(&self.tmp_dir)),
            ("reference-genomes", self.reference_genomes.to_string()),
            ("additional-references", opt(&self.additional_references)),
            ("policy", self.policy.to_string()),
            ("config", self.config_template.to_string()),
            ("ncbi", self.taxonomy.to_string()),
            ("seed", opt(&self.seed)),
            ("dry-run", self.dry_run.to_string()),
            ("debug", self.debug.to_string()),
        ]
    }
}
