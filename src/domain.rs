use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use camino::Utf8PathBuf;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

static REMOTE_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(https?|ftp)://\S+$").expect("valid scheme regex"));

pub const NCBI_FTP_PREFIX: &str = "ftp://ftp.ncbi.nlm.nih.gov/";

// Path below the NCBI ftp root, matched case-insensitively on the prefix.
pub fn ncbi_ftp_path(url: &str) -> Option<&str> {
    let prefix = url.get(..NCBI_FTP_PREFIX.len())?;
    if prefix.eq_ignore_ascii_case(NCBI_FTP_PREFIX) {
        url.get(NCBI_FTP_PREFIX.len()..)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenomeReusePolicy {
    #[default]
    Replace,
    NoReplace,
    FillUp,
}

impl GenomeReusePolicy {
    pub fn from_flags(fill_up: bool, no_replace: bool) -> Result<Self, PipelineError> {
        match (fill_up, no_replace) {
            (true, true) => Err(PipelineError::PolicyConflict),
            (true, false) => Ok(GenomeReusePolicy::FillUp),
            (false, true) => Ok(GenomeReusePolicy::NoReplace),
            (false, false) => Ok(GenomeReusePolicy::Replace),
        }
    }

    pub fn fill_up(self) -> bool {
        matches!(self, GenomeReusePolicy::FillUp)
    }

    pub fn replace(self) -> bool {
        !matches!(self, GenomeReusePolicy::NoReplace)
    }
}

impl fmt::Display for GenomeReusePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenomeReusePolicy::Replace => write!(f, "replace"),
            GenomeReusePolicy::NoReplace => write!(f, "no-replace"),
            GenomeReusePolicy::FillUp => write!(f, "fill-up"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSource {
    Local(Utf8PathBuf),
    Remote(String),
}

impl ReferenceSource {
    pub fn is_remote(&self) -> bool {
        matches!(self, ReferenceSource::Remote(_))
    }

    pub fn file_name(&self) -> Option<&str> {
        match self {
            ReferenceSource::Local(path) => path.file_name(),
            ReferenceSource::Remote(url) => url
                .split(['?', '#'])
                .next()
                .and_then(|value| value.rsplit('/').next())
                .filter(|value| !value.is_empty() && !value.contains(':')),
        }
    }
}

impl fmt::Display for ReferenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceSource::Local(path) => write!(f, "{path}"),
            ReferenceSource::Remote(url) => write!(f, "{url}"),
        }
    }
}

impl FromStr for ReferenceSource {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::InvalidOption(
                "additional references path is empty".to_string(),
            ));
        }
        if REMOTE_SCHEME.is_match(trimmed) {
            let is_ftp = trimmed
                .get(..6)
                .is_some_and(|scheme| scheme.eq_ignore_ascii_case("ftp://"));
            if is_ftp && ncbi_ftp_path(trimmed).is_none() {
                return Err(PipelineError::InvalidOption(format!(
                    "ftp references are only supported from ftp.ncbi.nlm.nih.gov: {trimmed}"
                )));
            }
            return Ok(ReferenceSource::Remote(trimmed.to_string()));
        }
        if trimmed.contains("://") {
            return Err(PipelineError::InvalidOption(format!(
                "unsupported reference scheme: {trimmed}"
            )));
        }
        Ok(ReferenceSource::Local(Utf8PathBuf::from(trimmed)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum SampleCount {
    // Only `Explicit` reaches the resolver. The others record what its default will produce.
    Explicit(u32),
    FromProfile(u32),
    ResolverDefault,
}

impl SampleCount {
    pub fn value(self) -> Option<u32> {
        match self {
            SampleCount::Explicit(count) | SampleCount::FromProfile(count) => Some(count),
            SampleCount::ResolverDefault => None,
        }
    }

    pub fn requested(self) -> Option<u32> {
        match self {
            SampleCount::Explicit(count) => Some(count),
            SampleCount::FromProfile(_) | SampleCount::ResolverDefault => None,
        }
    }
}

pub fn normalize_output_dir(value: &str) -> Result<String, PipelineError> {
    if value.trim().is_empty() {
        return Err(PipelineError::InvalidOption(
            "output directory is empty".to_string(),
        ));
    }
    let trimmed = value.trim_end_matches(|ch: char| ch == '/' || ch == std::path::MAIN_SEPARATOR);
    Ok(format!("{trimmed}{}", std::path::MAIN_SEPARATOR))
}
