//! # RocksDB Document Store
//!
//! Durable [`DocumentRepository`] behind the `rocksdb` feature.
//!
//! ## Key Layout
//!
//! - `doc:<documentId>` -> JSON `{seq, document}`
//! - `seq:<20-digit seq>` -> `documentId` (insertion order index)
//! - `meta:next_seq` -> big-endian u64
//!
//! Every mutation is a single `WriteBatch` applied under the write lock, so
//! uniqueness checks and writes are atomic with respect to each other.

use crate::ports::outbound::{DocumentRepository, RepositoryError};
use async_trait::async_trait;
use parking_lot::RwLock;
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, WriteOptions, DB};
use serde::{Deserialize, Serialize};
use shared_types::{Document, Validation};

const DOC_PREFIX: &str = "doc:";
const SEQ_PREFIX: &str = "seq:";
const NEXT_SEQ_KEY: &[u8] = b"meta:next_seq";

/// RocksDB configuration.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: String,
    /// Write buffer size in bytes (default: 16MB)
    pub write_buffer_size: usize,
    /// fsync after each write (default: true)
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/documents".to_string(),
            write_buffer_size: 16 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Config for tests (small buffers, no sync).
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            write_buffer_size: 1024 * 1024,
            sync_writes: false,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct StoredDocument {
    seq: u64,
    document: Document,
}

struct DbState {
    db: DB,
    next_seq: u64,
}

/// RocksDB-backed document store.
pub struct RocksDbDocumentRepository {
    state: RwLock<DbState>,
    config: RocksDbConfig,
}

fn backend(context: &str, err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Backend(format!("{context}: {err}"))
}

fn doc_key(document_id: &str) -> Vec<u8> {
    format!("{DOC_PREFIX}{document_id}").into_bytes()
}

fn seq_key(seq: u64) -> Vec<u8> {
    format!("{SEQ_PREFIX}{seq:020}").into_bytes()
}

impl RocksDbDocumentRepository {
    /// Open or create the database at `config.path`.
    pub fn open(config: RocksDbConfig) -> Result<Self, RepositoryError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let db = DB::open(&opts, &config.path).map_err(|e| backend("failed to open RocksDB", e))?;
        let next_seq = match db
            .get(NEXT_SEQ_KEY)
            .map_err(|e| backend("failed to read sequence", e))?
        {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| RepositoryError::Backend("corrupt sequence counter".into()))?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };

        Ok(Self {
            state: RwLock::new(DbState { db, next_seq }),
            config,
        })
    }

    fn write_opts(&self) -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(self.config.sync_writes);
        opts
    }

    fn load(db: &DB, document_id: &str) -> Result<Option<StoredDocument>, RepositoryError> {
        let Some(bytes) = db
            .get(doc_key(document_id))
            .map_err(|e| backend("RocksDB get failed", e))?
        else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| backend("corrupt document record", e))
    }

    fn encode(record: &StoredDocument) -> Result<Vec<u8>, RepositoryError> {
        serde_json::to_vec(record).map_err(|e| backend("document encoding failed", e))
    }
}

#[async_trait]
impl DocumentRepository for RocksDbDocumentRepository {
    async fn insert(&self, document: Document) -> Result<Document, RepositoryError> {
        let mut state = self.state.write();
        if Self::load(&state.db, &document.document_id)?.is_some() {
            return Err(RepositoryError::Duplicate(document.document_id));
        }

        let seq = state.next_seq;
        let record = StoredDocument { seq, document };
        let mut batch = WriteBatch::default();
        batch.put(doc_key(&record.document.document_id), Self::encode(&record)?);
        batch.put(seq_key(seq), record.document.document_id.as_bytes());
        batch.put(NEXT_SEQ_KEY, (seq + 1).to_be_bytes());

        state
            .db
            .write_opt(batch, &self.write_opts())
            .map_err(|e| backend("RocksDB write failed", e))?;
        state.next_seq = seq + 1;
        Ok(record.document)
    }

    async fn find_all(&self) -> Result<Vec<Document>, RepositoryError> {
        let state = self.state.read();
        let mut documents = Vec::new();
        let iter = state.db.iterator(IteratorMode::From(
            SEQ_PREFIX.as_bytes(),
            Direction::Forward,
        ));
        for entry in iter {
            let (key, value) = entry.map_err(|e| backend("RocksDB scan failed", e))?;
            if !key.starts_with(SEQ_PREFIX.as_bytes()) {
                break;
            }
            let document_id = String::from_utf8_lossy(&value);
            if let Some(record) = Self::load(&state.db, &document_id)? {
                documents.push(record.document);
            }
        }
        Ok(documents)
    }

    async fn find_by_id(&self, document_id: &str) -> Result<Option<Document>, RepositoryError> {
        let state = self.state.read();
        Ok(Self::load(&state.db, document_id)?.map(|r| r.document))
    }

    async fn replace(
        &self,
        document_id: &str,
        document: Document,
    ) -> Result<Document, RepositoryError> {
        let state = self.state.write();
        let Some(existing) = Self::load(&state.db, document_id)? else {
            return Err(RepositoryError::NotFound(document_id.to_string()));
        };
        let renamed = document.document_id != document_id;
        if renamed && Self::load(&state.db, &document.document_id)?.is_some() {
            return Err(RepositoryError::Duplicate(document.document_id));
        }

        let record = StoredDocument {
            seq: existing.seq,
            document,
        };
        let mut batch = WriteBatch::default();
        if renamed {
            batch.delete(doc_key(document_id));
            batch.put(seq_key(record.seq), record.document.document_id.as_bytes());
        }
        batch.put(doc_key(&record.document.document_id), Self::encode(&record)?);

        state
            .db
            .write_opt(batch, &self.write_opts())
            .map_err(|e| backend("RocksDB write failed", e))?;
        Ok(record.document)
    }

    async fn record_validation(
        &self,
        document_id: &str,
        validation: Validation,
    ) -> Result<(), RepositoryError> {
        let state = self.state.write();
        let Some(mut record) = Self::load(&state.db, document_id)? else {
            return Err(RepositoryError::NotFound(document_id.to_string()));
        };
        record.document.validation = Some(validation);
        state
            .db
            .put_opt(doc_key(document_id), Self::encode(&record)?, &self.write_opts())
            .map_err(|e| backend("RocksDB put failed", e))
    }

    async fn remove(&self, document_id: &str) -> Result<(), RepositoryError> {
        let state = self.state.write();
        let Some(record) = Self::load(&state.db, document_id)? else {
            return Err(RepositoryError::NotFound(document_id.to_string()));
        };
        let mut batch = WriteBatch::default();
        batch.delete(doc_key(document_id));
        batch.delete(seq_key(record.seq));
        state
            .db
            .write_opt(batch, &self.write_opts())
            .map_err(|e| backend("RocksDB write failed", e))
    }
}
