//! Append-only result files

use crate::error::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Result category, one file each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Live,
    Dead,
}

impl Category {
    pub fn file_name(&self) -> &'static str {
        match self {
            Category::Live => "live.txt",
            Category::Dead => "dead.txt",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Live => write!(f, "live"),
            Category::Dead => write!(f, "dead"),
        }
    }
}

/// Durable destination for terminal classifications.
///
/// Each append opens the file in append mode and writes the whole line at
/// once, so nothing is lost if the process dies between items. Files are
/// never truncated; successive runs accumulate.
#[derive(Debug)]
pub struct ResultSink {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl ResultSink {
    /// The directory is only created on the first append
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, category: Category) -> PathBuf {
        self.dir.join(category.file_name())
    }

    /// Append `line` plus a newline to the category's file
    pub async fn append(&self, category: Category, line: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        fs::create_dir_all(&self.dir).await?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(category))
            .await?;

        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        file.write_all(buf.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}
