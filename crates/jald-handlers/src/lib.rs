//! C5 — record handler orchestration.
//!
//! Journal, audit, and log submissions share the same skeleton
//! (C4 → C1 → C2 → C3); only where the payload lands differs (spec §4.5).
//! A connection may carry several records back to back — `handle_connection`
//! loops until the peer closes or a record fails, at which point the
//! connection is torn down and any partial payload file is removed. The
//! worker (and the daemon) are unaffected by one connection's failure.

use std::fs;
use std::io::{Read, Write};

use jald_digest::{digest_buffer, digest_fd, Digest};
use jald_error::{Error, Result};
use jald_proto::{FrameReader, Header};
use jald_record::{Record, RecordKind, Segment};
use jald_store::Store;
use jald_sysmeta::{SigningCert, SigningKey, SysMetaInput};
use uuid::Uuid;

const JOURNAL_CHUNK: usize = 8192;

/// Read-mostly state shared by every worker (spec §3, "Worker context").
pub struct HandlerContext<'a> {
    pub store: &'a Store,
    pub signing_key: Option<&'a SigningKey>,
    pub signing_cert: Option<&'a SigningCert>,
    pub manifest_sys_meta: bool,
    pub sign_sys_meta: bool,
}

/// Drives one connection to completion, committing each record it carries
/// in arrival order. Returns the number of records committed before the
/// connection ended (cleanly or otherwise); an `Err` means the connection
/// was aborted mid-record rather than closed between records.
pub fn handle_connection<R: Read>(stream: R, ctx: &HandlerContext) -> Result<u64> {
    let mut reader = FrameReader::new(stream);
    let mut committed = 0u64;

    loop {
        let header = match reader.try_recv_header()? {
            Some(header) => header,
            None => return Ok(committed),
        };

        match header.kind {
            RecordKind::Journal => handle_journal(ctx, &mut reader, header)?,
            RecordKind::Audit | RecordKind::Log => handle_in_memory(ctx, &mut reader, header)?,
        }
        committed += 1;
    }
}

fn read_exact_len<R: Read>(
    reader: &mut FrameReader<R>,
    mut remaining: u64,
    mut on_chunk: impl FnMut(&[u8]) -> Result<()>,
) -> Result<()> {
    let mut buf = [0u8; JOURNAL_CHUNK];
    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = reader.recv_bytes(&mut buf[..want])?;
        if n == 0 {
            return Err(Error::Parse(
                "peer closed connection before payload complete".to_string(),
            ));
        }
        on_chunk(&buf[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}

fn handle_journal<R: Read>(
    ctx: &HandlerContext,
    reader: &mut FrameReader<R>,
    header: Header,
) -> Result<()> {
    let uuid = Uuid::new_v4();
    let (path, mut file) = ctx.store.create_file(uuid, RecordKind::Journal)?;

    let write_result = read_exact_len(reader, header.data_len, |chunk| {
        file.write_all(chunk).map_err(Error::FileIo)
    });

    if let Err(e) = write_result {
        let _ = fs::remove_file(&path);
        return Err(e);
    }

    if let Err(e) = reader.recv_break() {
        let _ = fs::remove_file(&path);
        return Err(e);
    }

    let app_meta_bytes = if header.meta_len > 0 {
        match reader.recv_app_meta(header.meta_len) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                let _ = fs::remove_file(&path);
                return Err(e);
            }
        }
    } else {
        None
    };
    if let Err(e) = reader.recv_break() {
        let _ = fs::remove_file(&path);
        return Err(e);
    }

    let mut record = Record::new(
        RecordKind::Journal,
        uuid,
        Segment::on_disk(path.clone(), file, header.data_len),
    );
    record.app_meta = app_meta_bytes.map(Segment::in_memory);

    if let Err(e) = finish_record(ctx, &mut record, uuid) {
        let _ = fs::remove_file(&path);
        return Err(e);
    }

    ctx.store.insert_record(record, true).map_err(|e| {
        let _ = fs::remove_file(&path);
        e
    })?;

    Ok(())
}

fn handle_in_memory<R: Read>(
    ctx: &HandlerContext,
    reader: &mut FrameReader<R>,
    header: Header,
) -> Result<()> {
    let mut payload = Vec::with_capacity(header.data_len as usize);
    read_exact_len(reader, header.data_len, |chunk| {
        payload.extend_from_slice(chunk);
        Ok(())
    })?;

    reader.recv_break()?;
    let app_meta_bytes = if header.meta_len > 0 {
        Some(reader.recv_app_meta(header.meta_len)?)
    } else {
        None
    };
    reader.recv_break()?;

    let uuid = Uuid::new_v4();
    let mut record = Record::new(header.kind, uuid, Segment::in_memory(payload));
    record.app_meta = app_meta_bytes.map(Segment::in_memory);

    finish_record(ctx, &mut record, uuid)?;
    ctx.store.insert_record(record, false)?;
    Ok(())
}

/// Computes digests (if `manifest_sys_meta`) and builds the sys-meta
/// segment; shared by all three handlers (spec §4.5 steps 7-8).
fn finish_record(ctx: &HandlerContext, record: &mut Record, uuid: Uuid) -> Result<()> {
    let payload_digest: Option<Digest> = if ctx.manifest_sys_meta {
        Some(match &mut record.payload.data {
            jald_record::SegmentData::OnDisk { file, .. } => digest_fd(file)?,
            jald_record::SegmentData::InMemory(bytes) => digest_buffer(bytes),
        })
    } else {
        None
    };

    let app_meta_digest: Option<Digest> = if ctx.manifest_sys_meta {
        record
            .app_meta
            .as_ref()
            .and_then(|seg| seg.as_bytes())
            .map(digest_buffer)
    } else {
        None
    };

    let signing_key = if ctx.sign_sys_meta { ctx.signing_key } else { None };
    let signing_cert = if ctx.sign_sys_meta { ctx.signing_cert } else { None };

    let sys_meta_bytes = jald_sysmeta::build(
        SysMetaInput {
            kind: record.kind,
            source: &record.source,
            uuid,
            payload_digest: payload_digest.as_ref(),
            app_meta_digest: app_meta_digest.as_ref(),
        },
        signing_key,
        signing_cert,
    )?;

    record.sys_meta = Some(Segment::in_memory(sys_meta_bytes));
    Ok(())
}
