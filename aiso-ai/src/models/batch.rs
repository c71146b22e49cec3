//! Batch processing results and progress reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Sample;

/// A file that could not be processed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedFile {
    pub path: String,
    pub name: String,
    pub error: String,
    pub processed_at: DateTime<Utc>,
}

impl FailedFile {
    pub fn new(path: impl Into<String>, error: impl Into<String>) -> Self {
        let path = path.into();
        let name = file_name_of(&path);
        Self {
            path,
            name,
            error: error.into(),
            processed_at: Utc::now(),
        }
    }
}

/// Per-file outcome of an import or batch
///
/// Serialized untagged: a processed entry is the sample record itself, a failed
/// entry is `{path, name, error, processed_at}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchItem {
    Processed(Box<Sample>),
    Failed(FailedFile),
}

impl BatchItem {
    pub fn path(&self) -> &str {
        match self {
            BatchItem::Processed(sample) => &sample.path,
            BatchItem::Failed(failed) => &failed.path,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            BatchItem::Processed(_) => None,
            BatchItem::Failed(failed) => Some(&failed.error),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, BatchItem::Failed(_))
    }
}

/// Progress report sent after every file of a batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchProgress {
    /// 1-based index of the file just handled
    pub current: usize,
    pub total: usize,
    /// Rounded percentage (0-100)
    pub percentage: u8,
    pub current_file: String,
    pub result: BatchItem,
}

impl BatchProgress {
    pub fn new(current: usize, total: usize, current_file: String, result: BatchItem) -> Self {
        let percentage = if total == 0 {
            100
        } else {
            ((current as f64 / total as f64) * 100.0).round() as u8
        };
        Self {
            current,
            total,
            percentage,
            current_file,
            result,
        }
    }
}

/// Batch request options
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Fail up front when no provider is configured
    #[serde(default)]
    pub require_ai: bool,
}

/// Outcome of a whole batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub total: usize,
    pub results: Vec<BatchItem>,
    /// True when the batch stopped early on a cancellation request
    pub cancelled: bool,
}

impl BatchReport {
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|item| item.is_failed()).count()
    }
}

/// Base name of a path string, or the string itself when it has none
pub fn file_name_of(path: &str) -> String {
    std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
