use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};

use camino::Utf8Path;
use flate2::read::MultiGzDecoder;
use serde::{Deserialize, Serialize};

use crate::domain::SampleCount;
use crate::error::PipelineError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const HDF5_MAGIC: [u8; 8] = [0x89, b'H', b'D', b'F', b'\r', b'\n', 0x1a, b'\n'];
const CAMI_HEADERS: [&str; 4] = ["@SampleID", "@Version", "@Ranks", "@@TAXID"];
const BIOM_FORMAT_PREFIX: &str = "Biological Observation Matrix";
const BIOM_TSV_HEADER: &str = "#OTU ID";
const CAMI_EXTENSIONS: [&str; 2] = ["profile", "cami"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileFormat {
    Cami,
    BiomJson,
    BiomHdf5,
    BiomTsv,
    Unknown,
}

impl fmt::Display for ProfileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileFormat::Cami => write!(f, "cami"),
            ProfileFormat::BiomJson => write!(f, "biom-json"),
            ProfileFormat::BiomHdf5 => write!(f, "biom-hdf5"),
            ProfileFormat::BiomTsv => write!(f, "biom-tsv"),
            ProfileFormat::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSummary {
    pub format: ProfileFormat,
    pub compressed: bool,
    pub samples: Option<u32>,
}

impl ProfileSummary {
    pub fn sample_count(&self, requested: Option<u32>) -> SampleCount {
        if let Some(count) = requested {
            return SampleCount::Explicit(count);
        }
        match (self.format, self.samples) {
            (ProfileFormat::Cami, _) => SampleCount::FromProfile(1),
            (_, Some(count)) => SampleCount::FromProfile(count),
            (_, None) => SampleCount::ResolverDefault,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BiomHeader {
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    shape: Option<Vec<u64>>,
}

pub fn inspect(path: &Utf8Path) -> Result<ProfileSummary, PipelineError> {
    let read_err = |err: std::io::Error| PipelineError::ProfileRead {
        path: path.as_std_path().to_path_buf(),
        message: err.to_string(),
    };
    let file = File::open(path.as_std_path()).map_err(read_err)?;
    let mut reader = BufReader::new(file);
    let compressed = reader.fill_buf().map_err(read_err)?.starts_with(&GZIP_MAGIC);

    let mut content = Vec::new();
    if compressed {
        MultiGzDecoder::new(reader)
            .read_to_end(&mut content)
            .map_err(read_err)?;
    } else {
        reader.read_to_end(&mut content).map_err(read_err)?;
    }

    let (format, samples) = detect(&content)
        .or_else(|| has_cami_extension(path).then_some((ProfileFormat::Cami, Some(1))))
        .unwrap_or((ProfileFormat::Unknown, None));
    Ok(ProfileSummary {
        format,
        compressed,
        samples,
    })
}

fn detect(content: &[u8]) -> Option<(ProfileFormat, Option<u32>)> {
    if content.starts_with(&HDF5_MAGIC) {
        return Some((ProfileFormat::BiomHdf5, None));
    }

    let text = String::from_utf8_lossy(content);
    let body = text.trim_start();
    if body.starts_with('{') {
        let header: BiomHeader = serde_json::from_str(body).ok()?;
        let is_biom = header
            .format
            .as_deref()
            .map(|value| value.starts_with(BIOM_FORMAT_PREFIX))
            .unwrap_or(false);
        if !is_biom && header.shape.is_none() {
            return None;
        }
        let samples = header
            .shape
            .as_ref()
            .and_then(|shape| shape.get(1))
            .and_then(|count| u32::try_from(*count).ok());
        return Some((ProfileFormat::BiomJson, samples));
    }

    let is_cami = body.lines().map(str::trim_start).any(|line| {
        CAMI_HEADERS
            .iter()
            .any(|header| line.to_ascii_uppercase().starts_with(&header.to_ascii_uppercase()))
    });
    if is_cami {
        let samples = body
            .lines()
            .filter(|line| line.trim_start().to_ascii_uppercase().starts_with("@SAMPLEID"))
            .count();
        return Some((ProfileFormat::Cami, u32::try_from(samples.max(1)).ok()));
    }

    let header = body
        .lines()
        .take_while(|line| line.starts_with('#'))
        .find(|line| {
            line.get(..BIOM_TSV_HEADER.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(BIOM_TSV_HEADER))
        })?;
    let mut columns: Vec<&str> = header.split('\t').skip(1).map(str::trim).collect();
    if columns
        .last()
        .is_some_and(|column| column.eq_ignore_ascii_case("taxonomy"))
    {
        columns.pop();
    }
    Some((ProfileFormat::BiomTsv, u32::try_from(columns.len()).ok()))
}

fn has_cami_extension(path: &Utf8Path) -> bool {
    let name = path.file_name().unwrap_or_default().to_ascii_lowercase();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    name.rsplit_once('.')
        .is_some_and(|(_, extension)| CAMI_EXTENSIONS.contains(&extension))
}
