use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::domain::normalize_output_dir;
use crate::error::PipelineError;
use crate::fs_util;
use crate::ini::IniDocument;
use crate::options::RunOptions;

pub const MAIN_SECTION: &str = "Main";
pub const OUTPUT_DIRECTORY_KEY: &str = "output_directory";
pub const SEED_KEY: &str = "seed";
pub const CONFIG_FILE_NAME: &str = "config.ini";

// The template seed is whatever the simulator accepts, so it is kept as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MainSettings {
    pub output_directory: Option<String>,
    pub seed: Option<String>,
}

impl MainSettings {
    fn from_document(document: &IniDocument) -> Self {
        let value = |key: &str| {
            document
                .get(MAIN_SECTION, key)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        Self {
            output_directory: value(OUTPUT_DIRECTORY_KEY),
            seed: value(SEED_KEY),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BaseConfig {
    main: MainSettings,
    document: IniDocument,
}

impl BaseConfig {
    pub fn parse(content: &str) -> Result<Self, PipelineError> {
        let document = IniDocument::parse(content)?;
        let main = MainSettings::from_document(&document);
        Ok(Self { main, document })
    }

    pub fn main(&self) -> &MainSettings {
        &self.main
    }

    pub fn document(&self) -> &IniDocument {
        &self.document
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.document.get(section, key)
    }

    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.document.set(section, key, value);
        if section == MAIN_SECTION {
            self.main = MainSettings::from_document(&self.document);
        }
    }

    pub fn render(&self) -> String {
        self.document.render()
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: &Utf8Path) -> Result<BaseConfig, PipelineError> {
        if !path.as_std_path().exists() {
            return Err(PipelineError::MissingConfig(path.as_std_path().to_path_buf()));
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|_| PipelineError::ConfigRead(path.as_std_path().to_path_buf()))?;
        BaseConfig::parse(&content)
    }
}

#[derive(Debug, Clone)]
pub struct FinalConfig {
    main: MainSettings,
    document: IniDocument,
}

impl FinalConfig {
    pub fn main(&self) -> &MainSettings {
        &self.main
    }

    pub fn output_directory(&self) -> &str {
        self.main.output_directory.as_deref().unwrap_or_default()
    }

    pub fn render(&self) -> String {
        self.document.render()
    }

    pub fn path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(self.output_directory()).join(CONFIG_FILE_NAME)
    }

    pub fn write(&self) -> Result<Utf8PathBuf, PipelineError> {
        let path = self.path();
        fs_util::write_atomic(&path, self.render().as_bytes())?;
        Ok(path)
    }
}

pub struct ConfigSynthesizer;

impl ConfigSynthesizer {
    pub fn synthesize(config: BaseConfig, options: &RunOptions) -> FinalConfig {
        let BaseConfig { main, mut document } = config;
        let output_directory = normalize_output_dir(&options.output_dir)
            .unwrap_or_else(|_| options.output_dir.clone());
        document.set(MAIN_SECTION, OUTPUT_DIRECTORY_KEY, &output_directory);

        let seed = match options.seed {
            Some(seed) => {
                let seed = seed.to_string();
                document.set(MAIN_SECTION, SEED_KEY, &seed);
                Some(seed)
            }
            None => main.seed,
        };

        FinalConfig {
            main: MainSettings {
                output_directory: Some(output_directory),
                seed,
            },
            document,
        }
    }
}
