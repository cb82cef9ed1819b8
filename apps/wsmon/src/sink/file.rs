use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::ResultSink;
use crate::error::SinkError;
use crate::monitoring::ResultRecord;

/// Appends each terminal outcome as one JSON object per line.
///
/// Writes go through a single lock, so lines from concurrent monitors
/// never interleave. A failed write is truncated away so the next record
/// still starts on its own line.
pub struct FileSink {
    state: Mutex<OpenFile>,
    path: PathBuf,
    target_name: String,
}

struct OpenFile {
    file: File,
    /// Set when a partial line could not be removed
    torn: bool,
}

/// Append-only byte target that can undo a partial write.
trait AppendTarget: AsyncWrite + Unpin {
    async fn end_offset(&mut self) -> io::Result<u64>;

    async fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl AppendTarget for File {
    async fn end_offset(&mut self) -> io::Result<u64> {
        Ok(self.metadata().await?.len())
    }

    async fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len).await
    }
}

/// Write `line` as a whole or not at all.
///
/// On failure the target is cut back to where the line began. If that also
/// fails, `torn` is set and the next line is preceded by a newline.
async fn append_line<T: AppendTarget>(
    target: &mut T,
    torn: &mut bool,
    line: &[u8],
) -> io::Result<()> {
    if *torn {
        target.write_all(b"\n").await?;
        target.flush().await?;
        *torn = false;
    }

    let start = target.end_offset().await?;
    let written: io::Result<()> = async {
        target.write_all(line).await?;
        target.flush().await
    }
    .await;

    if let Err(e) = written {
        if let Err(rollback) = target.truncate_to(start).await {
            warn!(error = %rollback, "cannot remove partial result line");
            *torn = true;
        }
        return Err(e);
    }
    Ok(())
}

impl FileSink {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| SinkError::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| SinkError::io(&path, e))?;

        info!(path = %path.display(), "appending results to file");
        Ok(Self {
            state: Mutex::new(OpenFile { file, torn: false }),
            target_name: path.display().to_string(),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResultSink for FileSink {
    fn target_name(&self) -> &str {
        &self.target_name
    }

    async fn record(&self, record: &ResultRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut state = self.state.lock().await;
        let OpenFile { file, torn } = &mut *state;
        append_line(file, torn, line.as_bytes()).await.map_err(|e| SinkError::io(&self.path, e))
    }

    async fn close(&self) -> Result<(), SinkError> {
        let mut state = self.state.lock().await;
        state.file.flush().await.map_err(|e| SinkError::io(&self.path, e))?;
        state.file.sync_all().await.map_err(|e| SinkError::io(&self.path, e))
    }
}

/// Parse every record in a results file. Blank lines are skipped.
pub async fn read_records(path: impl AsRef<Path>) -> Result<Vec<ResultRecord>, SinkError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).await.map_err(|e| SinkError::io(path, e))?;

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .map_err(|source| SinkError::MalformedRecord { line: idx + 1, source })
        })
        .collect()
}
