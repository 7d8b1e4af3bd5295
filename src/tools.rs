use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::PipelineError;

pub fn locate_program(program: &str) -> Result<PathBuf, PipelineError> {
    let has_separator = program.contains('/') || program.contains(std::path::MAIN_SEPARATOR);
    if has_separator {
        let path = PathBuf::from(program);
        return if path.is_file() {
            Ok(path)
        } else {
            Err(PipelineError::MissingTool(program.to_string()))
        };
    }
    find_in_path(program).ok_or_else(|| PipelineError::MissingTool(program.to_string()))
}

pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.is_file() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.is_file() {
            return Some(plain);
        }
    }
    None
}

pub fn run_captured(program: &Path, args: &[String]) -> Result<Output, std::io::Error> {
    Command::new(program).args(args).output()
}

pub fn failure_message(program: &Path, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        match output.status.code() {
            Some(code) => format!("{} exited with status {code}", program.display()),
            None => format!("{} was terminated by a signal", program.display()),
        }
    } else {
        stderr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_program() {
        let err = locate_program("./definitely/not/here.py").unwrap_err();
        assert!(matches!(err, PipelineError::MissingTool(_)));
    }

    #[test]
    fn missing_bare_program() {
        assert!(find_in_path("mgfp-no-such-program-on-path").is_none());
    }
}
