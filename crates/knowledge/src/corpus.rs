//! Corpus store: the ordered Q/A pairs behind an index.
//!
//! Persisted as `meta.sqlite` with one row per pair; row ids are the index
//! identifiers and must be exactly `0..n`.

use crate::types::QaPair;
use helpdesk_core::{AppError, AppResult};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;

/// Read-only ordered collection of corpus pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorpusStore {
    pairs: Vec<QaPair>,
}

impl CorpusStore {
    /// Build a store from pairs, dropping their embeddings.
    ///
    /// Fails with `CorruptData` if any query or answer is empty after trimming.
    pub fn new(pairs: Vec<QaPair>) -> AppResult<Self> {
        let pairs = pairs
            .into_iter()
            .enumerate()
            .map(|(id, pair)| check_pair(id, pair.query, pair.answer))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self { pairs })
    }

    /// Write the store to a fresh SQLite file.
    pub fn save(&self, db_path: &Path) -> AppResult<()> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create metadata directory: {}", e))
            })?;
        }
        if db_path.exists() {
            std::fs::remove_file(db_path)?;
        }

        let mut conn = Connection::open(db_path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open metadata store: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE pairs (
                id INTEGER PRIMARY KEY,
                query TEXT NOT NULL,
                answer TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

        let tx = conn
            .transaction()
            .map_err(|e| AppError::Knowledge(format!("Failed to begin transaction: {}", e)))?;
        {
            let mut stmt = tx
                .prepare("INSERT INTO pairs (id, query, answer) VALUES (?1, ?2, ?3)")
                .map_err(|e| AppError::Knowledge(format!("Failed to prepare insert: {}", e)))?;

            for (id, pair) in self.pairs.iter().enumerate() {
                stmt.execute(params![id as i64, pair.query, pair.answer])
                    .map_err(|e| AppError::Knowledge(format!("Failed to insert pair: {}", e)))?;
            }
        }
        tx.commit()
            .map_err(|e| AppError::Knowledge(format!("Failed to commit pairs: {}", e)))?;

        tracing::debug!("Saved {} pairs to {:?}", self.pairs.len(), db_path);
        Ok(())
    }

    /// Load a store written by [`CorpusStore::save`].
    ///
    /// `expected_count` is the number of embeddings persisted alongside; any
    /// disagreement, gap in ids, or empty field is `CorruptData`.
    pub fn load(db_path: &Path, expected_count: usize) -> AppResult<Self> {
        if !db_path.exists() {
            return Err(AppError::CorruptData(format!(
                "Metadata store {:?} is missing",
                db_path
            )));
        }

        let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| AppError::CorruptData(format!("Failed to open metadata store: {}", e)))?;

        let mut stmt = conn
            .prepare("SELECT id, query, answer FROM pairs ORDER BY id")
            .map_err(|e| AppError::CorruptData(format!("Failed to read pairs: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| AppError::CorruptData(format!("Failed to read pairs: {}", e)))?;

        let mut pairs = Vec::with_capacity(expected_count);
        for row in rows {
            let (id, query, answer) =
                row.map_err(|e| AppError::CorruptData(format!("Unreadable pair row: {}", e)))?;

            if id != pairs.len() as i64 {
                return Err(AppError::CorruptData(format!(
                    "Pair ids are not contiguous: expected {}, found {}",
                    pairs.len(),
                    id
                )));
            }

            pairs.push(check_pair(pairs.len(), query, answer)?);
        }

        if pairs.len() != expected_count {
            return Err(AppError::CorruptData(format!(
                "Metadata holds {} pairs but {} embeddings were persisted",
                pairs.len(),
                expected_count
            )));
        }

        tracing::debug!("Loaded {} pairs from {:?}", pairs.len(), db_path);
        Ok(Self { pairs })
    }

    /// Pair stored under `id`.
    pub fn get(&self, id: usize) -> AppResult<&QaPair> {
        self.pairs.get(id).ok_or(AppError::OutOfRange {
            id,
            len: self.pairs.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QaPair> {
        self.pairs.iter()
    }
}

fn check_pair(id: usize, query: String, answer: String) -> AppResult<QaPair> {
    let query = query.trim();
    let answer = answer.trim();

    if query.is_empty() || answer.is_empty() {
        return Err(AppError::CorruptData(format!(
            "Pair {} has an empty query or answer",
            id
        )));
    }

    Ok(QaPair::new(query, answer))
}
