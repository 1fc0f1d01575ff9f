//! Optional plain-text event log, one file per category and day.
//!
//! Lines land in `<dir>/<category>-<YYYY-MM-DD>.log`. Write failures are
//! reported through `tracing` and otherwise ignored.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Messages,
    Deletions,
    Rejections,
    Errors,
}

impl Category {
    fn file_stem(self) -> &'static str {
        match self {
            Category::Messages => "messages",
            Category::Deletions => "deletions",
            Category::Rejections => "rejections",
            Category::Errors => "errors",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

#[derive(Clone, Default)]
pub struct Journal {
    dir: Option<PathBuf>,
    // serializes appends so lines never interleave
    write_lock: Arc<Mutex<()>>,
}

impl Journal {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            write_lock: Arc::default(),
        }
    }

    pub async fn record(&self, category: Category, line: impl fmt::Display) {
        let Some(dir) = self.dir.as_ref() else {
            return;
        };

        let now = OffsetDateTime::now_utc();
        let path = dir.join(format!("{}-{}.log", category.file_stem(), now.date()));
        let stamp = now.format(&Rfc3339).unwrap_or_else(|_| now.unix_timestamp().to_string());
        let entry = format!("[{stamp}] {}\n", single_line(&line.to_string()));

        let _guard = self.write_lock.lock().await;
        if let Err(e) = append(dir, &path, entry.as_bytes()).await {
            warn!("Failed to write {category} journal entry to {}: {e}", path.display());
        }
    }
}

// User text may carry line breaks; one event must stay one line.
fn single_line(line: &str) -> String {
    line.replace('\r', "\\r").replace('\n', "\\n")
}

async fn append(dir: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    fs::create_dir_all(dir).await?;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await
}
