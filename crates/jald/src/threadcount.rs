//! Live-thread-count sampling for admission control (spec §4.6, §9).
//!
//! Parses the `Threads:` field out of `/proc/self/status`. Per spec §9's
//! open-question resolution: a parse failure (missing file, unexpected
//! format, anything) is *not* propagated as an error — it is reported as
//! zero, which the caller's threshold check treats as "don't throttle this
//! iteration", never as a reason to stop accepting.

use std::fs;

/// Returns the current process's live thread count, or `0` if `/proc` is
/// unavailable or unparseable on this platform.
pub fn get_thread_count() -> u64 {
    parse_thread_count(&fs::read_to_string("/proc/self/status").unwrap_or_default())
}

fn parse_thread_count(status: &str) -> u64 {
    status
        .lines()
        .find_map(|line| line.strip_prefix("Threads:"))
        .and_then(|rest| rest.trim().parse().ok())
        .unwrap_or(0)
}
