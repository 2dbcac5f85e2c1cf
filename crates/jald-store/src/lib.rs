//! C2 — the record store gateway.
//!
//! Journal payloads are streamed to files under `db_root/journal/<uuid>`
//! ahead of the commit transaction (spec §3's "on-disk" invariant); audit
//! and log payloads ride inside the committed index entry itself. The index
//! is a single `redb` table keyed by a monotonically assigned nonce, which
//! this store derives from the table's own entry count rather than keeping
//! a second counter table, since nonces are never reused or deleted.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use jald_error::{Error, Result};
use jald_record::{Record, RecordKind, Segment, SegmentData};
use redb::{Database, Durability, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const RECORDS: TableDefinition<u64, &[u8]> = TableDefinition::new("records");

/// What ended up on disk for a committed record's payload.
#[derive(Debug, Serialize, Deserialize)]
enum StoredPayload {
    OnDisk { path: String },
    InMemory { bytes: Vec<u8> },
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexEntry {
    kind: u8,
    source: String,
    uuid: String,
    payload: StoredPayload,
    app_meta: Option<Vec<u8>>,
    sys_meta: Vec<u8>,
}

pub struct Store {
    db: Database,
    db_root: PathBuf,
    max_record_bytes: u64,
}

impl Store {
    /// Opens (creating if absent) the redb database at `db_root/jald.redb`.
    pub fn open(db_root: &Path, max_record_bytes: u64) -> Result<Self> {
        fs::create_dir_all(db_root).map_err(Error::FileIo)?;
        let db_path = db_root.join("jald.redb");
        let db = Database::create(&db_path)
            .map_err(|e| Error::internal(format!("opening store database: {e}")))?;
        // Ensure the table exists even before the first insert.
        let txn = db
            .begin_write()
            .map_err(|e| Error::internal(format!("opening init transaction: {e}")))?;
        {
            txn.open_table(RECORDS)
                .map_err(|e| Error::internal(format!("creating records table: {e}")))?;
        }
        txn.commit()
            .map_err(|e| Error::internal(format!("committing init transaction: {e}")))?;

        Ok(Store {
            db,
            db_root: db_root.to_path_buf(),
            max_record_bytes,
        })
    }

    /// Opens a fresh payload file for a record, creating parent directories
    /// as needed. Only meaningful for `RecordKind::Journal`: the path is
    /// deterministic from `uuid`, matching spec §4.2.
    pub fn create_file(&self, uuid: Uuid, kind: RecordKind) -> Result<(PathBuf, File)> {
        let subdir = match kind {
            RecordKind::Journal => "journal",
            RecordKind::Audit => "audit",
            RecordKind::Log => "log",
        };
        let dir = self.db_root.join(subdir);
        fs::create_dir_all(&dir).map_err(Error::FileIo)?;
        let path = dir.join(uuid.to_string());
        let file = File::options()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(Error::FileIo)?;
        Ok((path, file))
    }

    /// An empty in-memory segment, for handlers that need a scratch buffer
    /// before they know whether app-meta is present.
    pub fn create_segment() -> Segment {
        Segment::in_memory(Vec::new())
    }

    /// Commits a fully-assembled record, returning its store-assigned nonce.
    /// Journal payload files are referenced by path (already durable on
    /// disk by the time this runs); audit/log payload bytes are embedded
    /// directly in the index entry. Rejects oversized records before
    /// touching the transaction so a `Reject` never leaves partial state.
    pub fn insert_record(&self, record: Record, sync: bool) -> Result<u64> {
        let total_len = record.payload.length
            + record.app_meta.as_ref().map(|s| s.length).unwrap_or(0)
            + record.sys_meta.as_ref().map(|s| s.length).unwrap_or(0);
        if total_len > self.max_record_bytes {
            return Err(Error::reject(format!(
                "record size {total_len} exceeds configured limit {}",
                self.max_record_bytes
            )));
        }

        let sys_meta = record
            .sys_meta
            .as_ref()
            .and_then(|s| s.as_bytes())
            .ok_or_else(|| Error::internal("record committed without system metadata"))?
            .to_vec();

        let payload = match &record.payload.data {
            SegmentData::OnDisk { path, .. } => StoredPayload::OnDisk {
                path: path.to_string_lossy().into_owned(),
            },
            SegmentData::InMemory(bytes) => StoredPayload::InMemory {
                bytes: bytes.clone(),
            },
        };
        let app_meta = record
            .app_meta
            .as_ref()
            .map(|s| s.as_bytes().map(|b| b.to_vec()))
            .flatten();

        let entry = IndexEntry {
            kind: record.kind.wire_selector(),
            source: record.source.clone(),
            uuid: record.uuid.to_string(),
            payload,
            app_meta,
            sys_meta,
        };
        let value = serde_json::to_vec(&entry)
            .map_err(|e| Error::internal(format!("serializing index entry: {e}")))?;

        let mut txn = self
            .db
            .begin_write()
            .map_err(|e| Error::internal(format!("opening write transaction: {e}")))?;
        txn.set_durability(if sync {
            Durability::Immediate
        } else {
            Durability::Eventual
        });

        let nonce = {
            let mut table = txn
                .open_table(RECORDS)
                .map_err(|e| Error::internal(format!("opening records table: {e}")))?;
            let nonce = table
                .len()
                .map_err(|e| Error::internal(format!("reading table length: {e}")))?;
            table
                .insert(nonce, value.as_slice())
                .map_err(|e| Error::internal(format!("inserting record: {e}")))?;
            nonce
        };

        txn.commit()
            .map_err(|e| Error::internal(format!("committing record: {e}")))?;

        Ok(nonce)
    }

    /// Number of committed records, exposed for tests.
    pub fn len(&self) -> Result<u64> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| Error::internal(format!("opening read transaction: {e}")))?;
        let table = txn
            .open_table(RECORDS)
            .map_err(|e| Error::internal(format!("opening records table: {e}")))?;
        table
            .len()
            .map_err(|e| Error::internal(format!("reading table length: {e}")))
    }
}
