use std::fs::File;
use std::path::PathBuf;

use uuid::Uuid;

/// Which of the three record kinds a submission carries.
///
/// `wire_selector`/`from_wire_selector` implement the one-byte header field
/// read by `jald-proto` before dispatch; the original local-store protocol's
/// exact selector byte values aren't part of the retained source fragment,
/// so this core fixes its own (documented in DESIGN.md as an open-question
/// resolution, not a guess at interop with a specific existing deployment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Journal,
    Audit,
    Log,
}

impl RecordKind {
    pub const fn wire_selector(self) -> u8 {
        match self {
            RecordKind::Journal => 0,
            RecordKind::Audit => 1,
            RecordKind::Log => 2,
        }
    }

    pub fn from_wire_selector(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(RecordKind::Journal),
            1 => Some(RecordKind::Audit),
            2 => Some(RecordKind::Log),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            RecordKind::Journal => "journal",
            RecordKind::Audit => "audit",
            RecordKind::Log => "log",
        }
    }
}

/// Where a segment's bytes physically live.
pub enum SegmentData {
    InMemory(Vec<u8>),
    OnDisk { path: PathBuf, file: File },
}

/// One payload/app-meta/sys-meta segment of a record.
pub struct Segment {
    pub length: u64,
    pub data: SegmentData,
}

impl Segment {
    pub fn in_memory(bytes: Vec<u8>) -> Self {
        Segment {
            length: bytes.len() as u64,
            data: SegmentData::InMemory(bytes),
        }
    }

    pub fn on_disk(path: PathBuf, file: File, length: u64) -> Self {
        Segment {
            length,
            data: SegmentData::OnDisk { path, file },
        }
    }

    pub fn is_on_disk(&self) -> bool {
        matches!(self.data, SegmentData::OnDisk { .. })
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.data {
            SegmentData::InMemory(bytes) => Some(bytes),
            SegmentData::OnDisk { .. } => None,
        }
    }
}

/// A single journal, audit, or log submission working its way through the
/// pipeline: payload segment, optional application metadata, and the
/// daemon-generated system metadata filled in just before commit.
pub struct Record {
    pub kind: RecordKind,
    pub source: String,
    pub uuid: Uuid,
    pub payload: Segment,
    pub app_meta: Option<Segment>,
    pub sys_meta: Option<Segment>,
}

impl Record {
    pub fn new(kind: RecordKind, uuid: Uuid, payload: Segment) -> Self {
        Record {
            kind,
            source: "localhost".to_string(),
            uuid,
            payload,
            app_meta: None,
            sys_meta: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_selector_round_trips() {
        for kind in [RecordKind::Journal, RecordKind::Audit, RecordKind::Log] {
            let byte = kind.wire_selector();
            assert_eq!(RecordKind::from_wire_selector(byte), Some(kind));
        }
    }

    #[test]
    fn unknown_selector_byte_is_none() {
        assert_eq!(RecordKind::from_wire_selector(99), None);
    }

    #[test]
    fn new_record_source_is_localhost() {
        let seg = Segment::in_memory(b"hi".to_vec());
        let rec = Record::new(RecordKind::Audit, Uuid::nil(), seg);
        assert_eq!(rec.source, "localhost");
        assert!(rec.app_meta.is_none());
        assert!(rec.sys_meta.is_none());
    }
}
