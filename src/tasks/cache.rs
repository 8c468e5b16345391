//! On-disk copy of the question list, so questions can be answered offline.

use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::Question;
use crate::error::{Result, SvarError};

#[derive(Debug, Clone)]
pub struct QuestionCache {
    path: PathBuf,
}

impl QuestionCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the cached questions. `Ok(None)` when there is no cache yet.
    pub fn load(&self) -> Result<Option<Vec<Question>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let questions: Vec<Question> = serde_json::from_str(&content)?;
        debug!("Loaded {} cached questions from {}", questions.len(), self.path.display());
        Ok(Some(questions))
    }

    pub fn save(&self, questions: &[Question]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(questions)?;
        std::fs::write(&self.path, content)?;
        debug!("Cached {} questions at {}", questions.len(), self.path.display());
        Ok(())
    }

    /// Look up one cached question by task id.
    pub fn find(&self, task_id: &str) -> Result<Question> {
        self.load()?
            .unwrap_or_default()
            .into_iter()
            .find(|q| q.task_id == task_id)
            .ok_or_else(|| SvarError::InvalidInput(format!("No cached question with task_id {}", task_id)))
    }

    /// Pick a cached question at random. `Ok(None)` when nothing is cached.
    pub fn random(&self) -> Result<Option<Question>> {
        let mut questions = match self.load()? {
            Some(questions) if !questions.is_empty() => questions,
            _ => return Ok(None),
        };
        let index = rand::thread_rng().gen_range(0..questions.len());
        Ok(Some(questions.swap_remove(index)))
    }
}
