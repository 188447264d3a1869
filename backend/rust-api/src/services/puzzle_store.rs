use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;

use crate::models::PuzzleRecord;

/// Blob store for immutable puzzle records: one JSON file per puzzleId
/// under the configured directory. Writes happen once per generation;
/// records are never rewritten.
#[derive(Clone)]
pub struct PuzzleStore {
    dir: PathBuf,
}

impl PuzzleStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, puzzle_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", puzzle_id))
    }

    pub async fn save(&self, record: &PuzzleRecord) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create puzzle dir {}", self.dir.display()))?;

        let json = serde_json::to_vec_pretty(record).context("failed to serialize puzzle")?;
        let path = self.path_for(&record.puzzle_id);
        fs::write(&path, json)
            .await
            .with_context(|| format!("failed to write puzzle blob {}", path.display()))?;

        tracing::debug!("Puzzle {} persisted to {}", record.puzzle_id, path.display());
        Ok(())
    }

    pub async fn load(&self, puzzle_id: &str) -> Result<Option<PuzzleRecord>> {
        let path = self.path_for(puzzle_id);
        match fs::read(&path).await {
            Ok(bytes) => {
                let record = serde_json::from_slice(&bytes)
                    .with_context(|| format!("corrupt puzzle blob {}", path.display()))?;
                Ok(Some(record))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(anyhow::Error::new(e)
                    .context(format!("failed to read puzzle blob {}", path.display())))
            }
        }
    }
}
