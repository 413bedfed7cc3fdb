use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{AutomationError, AutomationResult};
use crate::workflow::result::WorkflowResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub run_id: String,
    pub ts: i64,
    pub result: WorkflowResult,
}

/// Append-only JSONL record of finished workflow runs.
pub struct RunJournal {
    file_path: PathBuf,
}

impl RunJournal {
    pub fn new(dir: &Path) -> AutomationResult<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            file_path: dir.join("runs.jsonl"),
        })
    }

    /// Journal under `dir`, or the platform data dir when `None`.
    pub fn open(dir: Option<&Path>) -> AutomationResult<Self> {
        match dir {
            Some(d) => Self::new(d),
            None => Self::new(&default_dir()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn append(&self, run_id: &str, result: &WorkflowResult) -> AutomationResult<()> {
        let entry = JournalEntry {
            run_id: run_id.to_string(),
            ts: chrono::Utc::now().timestamp_millis(),
            result: result.clone(),
        };
        let line = serde_json::to_string(&entry)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        writeln!(file, "{}", line)?;
        tracing::debug!(path = %self.file_path.display(), run_id, "run journaled");
        Ok(())
    }

    pub fn read_all(&self) -> AutomationResult<Vec<JournalEntry>> {
        if !self.file_path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.file_path)?;
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str::<JournalEntry>(l).map_err(AutomationError::from))
            .collect()
    }
}

/// `<data_local_dir>/tapflow/runs`, falling back to the working directory.
fn default_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tapflow").join("runs"))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_line_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let journal = RunJournal::new(dir.path()).unwrap();
        assert!(journal.read_all().unwrap().is_empty());

        journal.append("run-a", &WorkflowResult::empty()).unwrap();
        let mut failed = WorkflowResult::empty();
        failed.success = false;
        failed.error = Some("boom".into());
        journal.append("run-b", &failed).unwrap();

        let entries = journal.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].run_id, "run-a");
        assert!(entries[0].result.success);
        assert_eq!(entries[1].result.error.as_deref(), Some("boom"));
        assert_eq!(journal.path(), dir.path().join("runs.jsonl"));
    }
}
