//! C6 — the accept loop and its admission-control throttle (spec §4.6).
//!
//! One OS thread per accepted connection, spawned detached (no join, no
//! shared work queue): failure isolation lives at the connection boundary,
//! not in a pool. Admission control is a sleep keyed off a coarse live
//! thread count, not a semaphore or a fine-grained in-process counter —
//! the acceptor samples `/proc/self/status` before every `accept()` rather
//! than tracking its own spawn count, so it throttles against *all* process
//! threads, including ones this daemon didn't spawn itself.

use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use jald_handlers::HandlerContext;
use jald_store::Store;
use jald_sysmeta::{SigningCert, SigningKey};

use crate::shutdown;
use crate::threadcount::get_thread_count;

/// Admission-control parameters, lifted straight from the config snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ThrottleConfig {
    pub thread_count_threshold: i64,
    pub delay_increment_us: u64,
    pub delay_max_us: u64,
}

/// Computes the exponential-backoff delay for the current live thread count
/// `t` (spec §4.6's algorithm, verified against S6/property 6): `None` means
/// "don't throttle this iteration" (threshold disabled, or `t` not above
/// it); `Some(delay)` is the number of microseconds to sleep before the next
/// `accept()`.
pub fn compute_delay_us(t: u64, cfg: &ThrottleConfig) -> Option<u64> {
    if cfg.thread_count_threshold <= 0 {
        return None;
    }
    let threshold = cfg.thread_count_threshold as u64;
    if t <= threshold {
        return None;
    }
    let k = t - threshold;
    let mut delay = cfg.delay_increment_us;
    for _ in 1..k {
        delay = delay.saturating_mul(2).min(cfg.delay_max_us);
    }
    Some(delay.min(cfg.delay_max_us))
}

/// Binds the listening socket at `path` (spec §6: backlog 20, parent
/// directories created if missing). Refuses to start — and refuses to
/// unlink the existing file — if `path` already exists, so this daemon
/// never hijacks another process's socket.
pub fn bind_listener(path: &Path) -> io::Result<UnixListener> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("socket path {} already exists", path.display()),
        ));
    }
    let listener = UnixListener::bind(path)?;
    // `listen(2)`'s backlog can't be tuned through `std::os::unix::net`
    // directly; the socket2-free path here is to reach for raw libc, the
    // same way the teacher touches anything the standard library doesn't
    // expose a knob for.
    set_backlog(&listener, 20)?;
    Ok(listener)
}

fn set_backlog(listener: &UnixListener, backlog: i32) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    if unsafe { libc::listen(listener.as_raw_fd(), backlog) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Read-mostly state shared by every spawned worker; owns the store and the
/// optional signing key for the life of the process.
pub struct SharedState {
    pub store: Store,
    pub signing_key: Option<SigningKey>,
    pub signing_cert: Option<SigningCert>,
    pub manifest_sys_meta: bool,
    pub sign_sys_meta: bool,
}

/// Runs the accept loop until shutdown. `socket_path` is unlinked on the way
/// out, but only because `bind_listener` already established that this
/// process created it (spec §4.6, "Socket cleanup").
pub fn run(
    listener: UnixListener,
    socket_path: PathBuf,
    shared: Arc<SharedState>,
    throttle: ThrottleConfig,
    debug: bool,
) -> io::Result<()> {
    listener.set_nonblocking(false)?;

    loop {
        if shutdown::should_exit() {
            break;
        }

        let live = get_thread_count();
        if let Some(delay_us) = compute_delay_us(live, &throttle) {
            if debug {
                eprintln!("jald: throttling accept, {live} live threads, sleeping {delay_us}us");
            }
            thread::sleep(Duration::from_micros(delay_us));
            if shutdown::should_exit() {
                break;
            }
        }

        match listener.accept() {
            Ok((stream, _addr)) => spawn_worker(stream, Arc::clone(&shared), debug),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                if debug {
                    eprintln!("jald: accept() failed: {e}");
                }
                continue;
            }
        }
    }

    let _ = std::fs::remove_file(&socket_path);
    Ok(())
}

fn spawn_worker(stream: UnixStream, shared: Arc<SharedState>, debug: bool) {
    thread::spawn(move || {
        let ctx = HandlerContext {
            store: &shared.store,
            signing_key: shared.signing_key.as_ref(),
            signing_cert: shared.signing_cert.as_ref(),
            manifest_sys_meta: shared.manifest_sys_meta,
            sign_sys_meta: shared.sign_sys_meta,
        };
        if let Err(e) = jald_handlers::handle_connection(stream, &ctx) {
            if debug {
                eprintln!("jald: connection aborted: {e}");
            } else if matches!(
                e,
                jald_error::Error::Reject(_) | jald_error::Error::InternalError(_)
            ) {
                eprintln!("jald: {e}");
            }
        }
    });
}
