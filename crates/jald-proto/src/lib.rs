//! C4 — the protocol framing reader.
//!
//! Wire layout for a single record (spec §4.4), all integers big-endian:
//!
//! ```text
//! <header: kind:u8, data_len:u64, meta_len:u64>
//! <payload: data_len bytes>
//! <BREAK>
//! <application-metadata: meta_len bytes>   (only if meta_len > 0)
//! <BREAK>
//! ```
//!
//! `BREAK` is the fixed 5-byte ASCII literal `"BREAK"`, kept bit-for-bit
//! since it must match the producer peer's framing exactly.

use std::io::Read;

use jald_error::{Error, Result};
use jald_record::RecordKind;

pub const BREAK: &[u8] = b"BREAK";

const HEADER_LEN: usize = 1 + 8 + 8;

/// The per-record header: kind selector plus the two segment lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub kind: RecordKind,
    pub data_len: u64,
    pub meta_len: u64,
}

/// Reads wire-format frames off any byte stream (a `UnixStream` in
/// production, a `Cursor`/pipe in tests).
pub struct FrameReader<R> {
    inner: R,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        FrameReader { inner }
    }

    /// Reads and parses the fixed-size header. `Parse` on a short read or a
    /// header naming an unrecognized record kind.
    pub fn recv_header(&mut self) -> Result<Header> {
        let mut buf = [0u8; HEADER_LEN];
        self.inner
            .read_exact(&mut buf)
            .map_err(|e| Error::Parse(format!("reading header: {e}")))?;
        Self::parse_header(&buf)
    }

    /// Like `recv_header`, but distinguishes a clean peer-initiated close
    /// between records (returns `Ok(None)`) from a short/malformed read
    /// mid-header (`Err(Parse)`). A connection may carry several records in
    /// sequence; the peer simply closes the socket once it has none left.
    pub fn try_recv_header(&mut self) -> Result<Option<Header>> {
        let mut buf = [0u8; HEADER_LEN];
        let mut filled = 0;
        while filled < HEADER_LEN {
            let n = self
                .inner
                .read(&mut buf[filled..])
                .map_err(|e| Error::Parse(format!("reading header: {e}")))?;
            if n == 0 {
                return if filled == 0 {
                    Ok(None)
                } else {
                    Err(Error::Parse("connection closed mid-header".to_string()))
                };
            }
            filled += n;
        }
        Self::parse_header(&buf).map(Some)
    }

    fn parse_header(buf: &[u8; HEADER_LEN]) -> Result<Header> {
        let kind = RecordKind::from_wire_selector(buf[0])
            .ok_or_else(|| Error::Parse(format!("unknown record kind selector {}", buf[0])))?;
        let data_len = u64::from_be_bytes(buf[1..9].try_into().unwrap());
        let meta_len = u64::from_be_bytes(buf[9..17].try_into().unwrap());

        Ok(Header {
            kind,
            data_len,
            meta_len,
        })
    }

    /// A single, possibly-short read into `buf` (spec: "a vectored-read that
    /// may return fewer bytes than requested"); callers loop until their
    /// declared segment length is consumed. Returns `0` on peer EOF.
    pub fn recv_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.inner
            .read(buf)
            .map_err(|e| Error::Parse(format!("reading payload bytes: {e}")))
    }

    /// Reads exactly `BREAK.len()` bytes and fails with `Parse` if they
    /// don't match the delimiter.
    pub fn recv_break(&mut self) -> Result<()> {
        let mut buf = [0u8; 5];
        self.inner
            .read_exact(&mut buf)
            .map_err(|e| Error::Parse(format!("reading BREAK: {e}")))?;
        if buf != *BREAK {
            return Err(Error::Parse(format!(
                "expected BREAK delimiter, got {buf:?}"
            )));
        }
        Ok(())
    }

    /// Allocates a `length`-byte buffer and fills it completely.
    pub fn recv_app_meta(&mut self, length: u64) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; length as usize];
        self.inner
            .read_exact(&mut buf)
            .map_err(|e| Error::Parse(format!("reading app-meta: {e}")))?;
        Ok(buf)
    }
}
