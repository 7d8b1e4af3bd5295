use std::fs::File;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::ncbi_ftp_path;
use crate::error::PipelineError;

pub trait ReferenceFetcher: Send + Sync {
    fn fetch(&self, url: &str, destination: &Path) -> Result<(), PipelineError>;
}

#[derive(Clone)]
pub struct ReferenceHttpClient {
    client: Client,
}

impl ReferenceHttpClient {
    pub fn new() -> Result<Self, PipelineError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("metagenome-from-profile/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| PipelineError::ReferenceHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|err| PipelineError::ReferenceHttp(err.to_string()))?;
        Ok(Self { client })
    }
}

impl ReferenceFetcher for ReferenceHttpClient {
    // A single attempt; a failed download ends the run.
    fn fetch(&self, url: &str, destination: &Path) -> Result<(), PipelineError> {
        let url = normalize_url(url);
        tracing::debug!(url = %url, "downloading additional references");
        let mut response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| PipelineError::ReferenceHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "reference request failed".to_string());
            return Err(PipelineError::ReferenceStatus { status, message });
        }
        let mut file = File::create(destination)
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| PipelineError::ReferenceHttp(err.to_string()))?;
        Ok(())
    }
}

// reqwest has no ftp support; NCBI serves the same tree over https.
pub fn normalize_url(url: &str) -> String {
    match ncbi_ftp_path(url) {
        Some(rest) => format!("https://ftp.ncbi.nlm.nih.gov/{rest}"),
        None => url.to_string(),
    }
}
