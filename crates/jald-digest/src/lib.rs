//! C1 — the streaming digest engine.
//!
//! The algorithm is fixed to SHA-256 for the ingestion pipeline (spec §4.1);
//! the abstraction still carries a named-algorithm URI so callers (C3) can
//! embed it in system metadata without hardcoding the string everywhere.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use jald_error::{Error, Result};
use sha2::{Digest as _, Sha256};

/// URI identifying the digest algorithm, embedded in system metadata. Kept
/// as the XML-Encryption URI convention the original producer library used
/// (`JAL_DIGEST_ALGORITHM_SHA256`'s `algorithm_uri`), since it's a wire
/// constant peers may already expect rather than a free design choice.
pub const SHA256_ALGORITHM_URI: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

const CHUNK_SIZE: usize = 8192;

/// A completed SHA-256 digest plus the URI identifying how it was computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub bytes: [u8; 32],
    pub algorithm_uri: &'static str,
}

impl Digest {
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// A streaming digest context. `update` may be called any number of times;
/// `finalize` consumes the context and produces the digest (the spec's
/// `create`/`init`/`update`/`final`/`destroy` lifecycle collapses here into
/// `new`/`update`/`finalize`, with `destroy` becoming an ordinary `Drop`).
pub struct DigestCtx {
    inner: Sha256,
}

impl Default for DigestCtx {
    fn default() -> Self {
        Self::new()
    }
}

impl DigestCtx {
    pub fn new() -> Self {
        DigestCtx {
            inner: Sha256::new(),
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    pub fn finalize(self) -> Digest {
        let result = self.inner.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&result);
        Digest {
            bytes: out,
            algorithm_uri: SHA256_ALGORITHM_URI,
        }
    }
}

/// Digest an in-memory buffer in one shot.
pub fn digest_buffer(bytes: &[u8]) -> Digest {
    let mut ctx = DigestCtx::new();
    ctx.update(bytes);
    ctx.finalize()
}

/// Digest the contents of an open file, seeking to offset 0 first and
/// streaming in 8 KiB chunks (spec §4.1). Fails with `Error::FileIo` on any
/// read/seek error, matching the original `jalp_digest_fd`'s behavior.
pub fn digest_fd(file: &mut File) -> Result<Digest> {
    file.seek(SeekFrom::Start(0)).map_err(Error::FileIo)?;
    let mut ctx = DigestCtx::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).map_err(Error::FileIo)?;
        if n == 0 {
            break;
        }
        ctx.update(&buf[..n]);
    }
    Ok(ctx.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn digest_buffer_matches_known_sha256() {
        // SHA-256("") = e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855
        let digest = digest_buffer(b"");
        assert_eq!(
            digest.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn digest_buffer_equals_digest_fd_for_same_bytes() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(500);

        let buf_digest = digest_buffer(&data);

        let mut tmp = tempfile::tempfile().unwrap();
        tmp.write_all(&data).unwrap();
        let fd_digest = digest_fd(&mut tmp).unwrap();

        assert_eq!(buf_digest, fd_digest);
    }

    #[test]
    fn digest_fd_seeks_to_start_even_after_reads() {
        let data = b"hello world";
        let mut tmp = tempfile::tempfile().unwrap();
        tmp.write_all(data).unwrap();
        // Leave the cursor in the middle; digest_fd must still read from 0.
        tmp.seek(SeekFrom::Start(3)).unwrap();

        let digest = digest_fd(&mut tmp).unwrap();
        assert_eq!(digest, digest_buffer(data));
    }

    #[test]
    fn streaming_update_matches_one_shot() {
        let data = b"streamed in pieces".to_vec();
        let mut ctx = DigestCtx::new();
        for chunk in data.chunks(3) {
            ctx.update(chunk);
        }
        assert_eq!(ctx.finalize(), digest_buffer(&data));
    }
}
