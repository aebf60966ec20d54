//! JSONL readers and writers for dialogue exports and pair corpora.
//!
//! One JSON object per line. Blank lines are ignored; lines that fail to
//! parse are skipped with a warning and counted, so one bad record does not
//! abort a corpus build.

use crate::preprocess::DialogueMessage;
use crate::types::QaPair;
use helpdesk_core::{AppError, AppResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

/// Records read from a JSONL file.
#[derive(Debug, Clone)]
pub struct JsonlRead<T> {
    pub records: Vec<T>,
    /// Lines that did not parse as a record
    pub skipped: usize,
}

/// Read every record of a JSONL file.
pub async fn read_jsonl<T: DeserializeOwned>(path: &Path) -> AppResult<JsonlRead<T>> {
    let file = File::open(path).await.map_err(|e| {
        AppError::Knowledge(format!("Failed to open {:?}: {}", path, e))
    })?;
    let mut lines = BufReader::new(file).lines();

    let mut records = Vec::new();
    let mut skipped = 0;
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<T>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                tracing::warn!("Skipping line {} of {:?}: {}", line_no, path, e);
            }
        }
    }

    tracing::debug!(
        "Read {} records from {:?} ({} skipped)",
        records.len(),
        path,
        skipped
    );

    Ok(JsonlRead { records, skipped })
}

/// Write records as JSONL, replacing `path`.
pub async fn write_jsonl<T: Serialize>(path: &Path, records: &[T]) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let file = File::create(path).await?;
    let mut writer = BufWriter::new(file);

    for record in records {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
    }

    writer.flush().await?;
    Ok(())
}

/// Read a `{query, answer}` corpus file.
pub async fn read_pairs(path: &Path) -> AppResult<JsonlRead<QaPair>> {
    read_jsonl(path).await
}

/// Read a raw dialogue export.
pub async fn read_dialogues(path: &Path) -> AppResult<JsonlRead<DialogueMessage>> {
    read_jsonl(path).await
}

/// Write a `{query, answer}` corpus file.
pub async fn write_pairs(path: &Path, pairs: &[QaPair]) -> AppResult<()> {
    write_jsonl(path, pairs).await
}
