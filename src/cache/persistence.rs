//! Persistence layer for the answer cache

use crate::cache::{AnswerCache, WriteMode};
use crate::error::CacheError;
use crate::types::{AnswerRecord, Phase, WorkKey};
use std::path::{Path, PathBuf};

/// Sled-based implementation of AnswerCache
pub struct SledAnswerCache {
    db: sled::Db,
    path: PathBuf,
}

impl SledAnswerCache {
    /// Open (or create) a cache store at the given path.
    ///
    /// A new process opening the same path sees every previously committed record.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        let db = sled::open(&path).map_err(|e| CacheError::Open {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok(Self { db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode every stored record, failing on the first corrupted entry.
    pub fn verify(&self) -> Result<usize, CacheError> {
        let mut count = 0;
        for item in self.db.iter() {
            let (key, value) = item?;
            decode_record(&key, &value)?;
            count += 1;
        }
        Ok(count)
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), CacheError> {
        self.db.flush()?;
        Ok(())
    }
}

impl AnswerCache for SledAnswerCache {
    fn lookup(&self, key: &WorkKey) -> Result<Option<AnswerRecord>, CacheError> {
        let storage_key = key.storage_key();
        match self.db.get(&storage_key)? {
            Some(value) => Ok(Some(decode_record(&storage_key, &value)?)),
            None => Ok(None),
        }
    }

    fn put(&self, record: &AnswerRecord, mode: WriteMode) -> Result<(), CacheError> {
        let storage_key = record.key.storage_key();
        let value = bincode::serialize(record).map_err(|e| {
            CacheError::Io(format!("Failed to serialize answer record: {}", e))
        })?;

        match mode {
            WriteMode::CreateOnly => {
                let swapped =
                    self.db
                        .compare_and_swap(&storage_key, None as Option<&[u8]>, Some(value))?;
                if swapped.is_err() {
                    return Err(CacheError::Conflict(record.key.clone()));
                }
            }
            WriteMode::Overwrite => {
                self.db.insert(&storage_key, value)?;
            }
        }

        self.db.flush()?;
        Ok(())
    }

    fn count(&self, phase: Phase) -> Result<usize, CacheError> {
        let mut count = 0;
        for item in self.db.scan_prefix(phase_prefix(phase)) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    fn records(&self, phase: Phase) -> Result<Vec<AnswerRecord>, CacheError> {
        let mut records = Vec::new();
        for item in self.db.scan_prefix(phase_prefix(phase)) {
            let (key, value) = item?;
            records.push(decode_record(&key, &value)?);
        }
        Ok(records)
    }
}

fn phase_prefix(phase: Phase) -> Vec<u8> {
    format!("{}/", phase).into_bytes()
}

fn decode_record(key: &[u8], value: &[u8]) -> Result<AnswerRecord, CacheError> {
    bincode::deserialize(value).map_err(|e| CacheError::Corrupted {
        key: String::from_utf8_lossy(key).into_owned(),
        message: e.to_string(),
    })
}
