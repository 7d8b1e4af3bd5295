use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::{Builder, TempDir};

use crate::error::PipelineError;

pub fn ensure_dir(path: &Utf8Path) -> Result<(), PipelineError> {
    fs::create_dir_all(path.as_std_path())
        .map_err(|err| PipelineError::Filesystem(format!("create {path}: {err}")))
}

pub fn write_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), PipelineError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."));
    let mut temp = Builder::new()
        .prefix(".config")
        .suffix(".tmp")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| PipelineError::ConfigWrite(format!("{path}: {err}")))?;
    temp.write_all(content)
        .map_err(|err| PipelineError::ConfigWrite(format!("{path}: {err}")))?;
    temp.persist(path.as_std_path())
        .map_err(|err| PipelineError::ConfigWrite(format!("{path}: {err}")))?;
    Ok(())
}

pub fn staging_dir(root: Option<&Utf8Path>) -> Result<(TempDir, Utf8PathBuf), PipelineError> {
    let mut builder = Builder::new();
    builder.prefix("mgfp-");
    let dir = match root {
        Some(root) => {
            ensure_dir(root)?;
            builder.tempdir_in(root.as_std_path())
        }
        None => builder.tempdir(),
    }
    .map_err(|err| PipelineError::Filesystem(format!("create staging directory: {err}")))?;
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .map_err(|_| PipelineError::Filesystem("staging directory is not UTF-8".to_string()))?;
    Ok((dir, path))
}
