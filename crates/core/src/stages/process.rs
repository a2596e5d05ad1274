use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::stages::{Producer, ProducerError};

/// Local model invoked as `<program> <script> <input>`; the answer is
/// whatever the script prints on stdout.
pub struct LocalScript {
    name: String,
    program: PathBuf,
    script: PathBuf,
}

impl LocalScript {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            script: script.into(),
        }
    }

    /// Scripts write their scratch files relative to their own directory.
    fn working_dir(&self) -> Option<&Path> {
        self.script
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
    }
}

#[async_trait]
impl Producer for LocalScript {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, input: &str) -> Result<String, ProducerError> {
        let mut command = Command::new(&self.program);
        match (self.working_dir(), self.script.file_name()) {
            (Some(dir), Some(file)) => command.current_dir(dir).arg(file),
            _ => command.arg(&self.script),
        };
        command.arg(input).kill_on_drop(true);

        let output = command.output().await.map_err(|source| ProducerError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(ProducerError::Exit {
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        if !stderr.trim().is_empty() {
            debug!(producer = %self.name, stderr = %stderr.trim(), "Producer stderr");
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(ProducerError::EmptyOutput);
        }
        Ok(stdout)
    }
}
