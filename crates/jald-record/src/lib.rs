//! The central data model: records, their segments, and the immutable
//! configuration snapshot every worker borrows for the life of the process.

mod config;
mod record;

pub use config::{Config, SeccompConfig};
pub use record::{Record, RecordKind, Segment, SegmentData};
