//! Process-wide shutdown flag (spec §4.6, §5, §9).
//!
//! `SIGTERM`/`SIGINT`/`SIGABRT` set a single `AtomicBool` from signal
//! context; the acceptor polls it with a relaxed load before and after every
//! `accept()` and every admission-control sleep. Relaxed ordering is
//! sufficient here — the flag is the only thing communicated, and signal
//! handlers on the same thread's signal stack can't race a lock anyway, so
//! there is nothing else to synchronize against it.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

static SHOULD_EXIT: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_shutdown_signal(_sig: libc::c_int) {
    SHOULD_EXIT.store(true, Ordering::Relaxed);
}

pub fn should_exit() -> bool {
    SHOULD_EXIT.load(Ordering::Relaxed)
}

/// Installs the shared handler for `SIGTERM`, `SIGINT`, and `SIGABRT`.
pub fn install_handlers() -> io::Result<()> {
    for signal in [libc::SIGTERM, libc::SIGINT, libc::SIGABRT] {
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = handle_shutdown_signal as usize;
            libc::sigemptyset(&mut action.sa_mask);
            if libc::sigaction(signal, &action, std::ptr::null_mut()) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both assertions share the process-wide static, so they must run as one
    // test: splitting them risks cargo's parallel test threads observing
    // each other's writes to `SHOULD_EXIT`.
    #[test]
    fn handler_sets_the_shared_flag() {
        assert!(!should_exit());
        handle_shutdown_signal(libc::SIGTERM);
        assert!(should_exit());
    }
}
