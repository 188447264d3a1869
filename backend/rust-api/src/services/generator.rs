use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use tokio::process::Command;

use crate::error::PuzzleError;

/// Seam to the external crossword generator. The production implementation
/// spawns a child process; tests substitute a fixture script through
/// configuration.
#[async_trait]
pub trait GridGenerator: Send + Sync {
    /// Produce one raw grid layout (solution block, display block, legend).
    async fn generate(&self) -> Result<String>;
}

/// Runs the configured generator script as a child process with no
/// arguments and buffers its stdout until exit. Non-zero exit, a spawn
/// error, or non-UTF-8 output all surface as [`PuzzleError::GeneratorFailure`];
/// none of them are retried. No timeout is applied, so a hung generator
/// hangs the requesting call.
pub struct ProcessGenerator {
    script: PathBuf,
}

impl ProcessGenerator {
    pub fn new(script: impl AsRef<Path>) -> Self {
        Self {
            script: script.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl GridGenerator for ProcessGenerator {
    async fn generate(&self) -> Result<String> {
        tracing::debug!("Spawning grid generator: {}", self.script.display());

        let output = Command::new(&self.script).output().await.map_err(|e| {
            PuzzleError::GeneratorFailure(format!(
                "failed to spawn {}: {}",
                self.script.display(),
                e
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PuzzleError::GeneratorFailure(format!(
                "generator exited with {}: {}",
                output.status,
                stderr.trim()
            ))
            .into());
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| {
            PuzzleError::GeneratorFailure("generator emitted non-UTF-8 output".to_string())
        })?;

        tracing::debug!("Generator produced {} bytes", stdout.len());
        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_script_is_a_generator_failure() {
        let gen = ProcessGenerator::new("/nonexistent/generator-script");
        let err = gen.generate().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PuzzleError>(),
            Some(PuzzleError::GeneratorFailure(_))
        ));
    }
}
