//! Daemonization helper (spec §1 names this an external collaborator;
//! SPEC_FULL §6b asks for a minimal real implementation since the binary
//! must actually run as a daemon).
//!
//! Double-fork + `setsid`, stdio redirected into `log_dir`, pid written to
//! `pid_file`. Built directly on `libc`, matching the teacher's style for
//! anything touching raw process/kernel primitives.

use std::ffi::CString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::path::Path;

fn cstring_path(path: &Path) -> io::Result<CString> {
    CString::new(path.as_os_str().as_encoded_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

/// Forks twice (so the daemon is reparented to init and can never reacquire
/// a controlling terminal), detaches from the session, redirects stdio into
/// `log_dir/jald.{out,err}`, and writes the calling process's final pid to
/// `pid_file`.
///
/// The first fork's parent exits immediately with status 0 so the invoking
/// shell sees a normal, prompt return; the intermediate process calls
/// `setsid` and forks again, and only the second child returns from this
/// function.
pub fn daemonize(log_dir: &Path, pid_file: &Path) -> io::Result<()> {
    fs::create_dir_all(log_dir)?;
    if let Some(parent) = pid_file.parent() {
        fs::create_dir_all(parent)?;
    }

    // First fork: detach from the invoking shell's process group.
    match unsafe { libc::fork() } {
        -1 => return Err(io::Error::last_os_error()),
        0 => {}
        _ => std::process::exit(0),
    }

    if unsafe { libc::setsid() } == -1 {
        return Err(io::Error::last_os_error());
    }

    // Second fork: ensure the daemon can never reacquire a controlling tty.
    match unsafe { libc::fork() } {
        -1 => return Err(io::Error::last_os_error()),
        0 => {}
        _ => std::process::exit(0),
    }

    if unsafe { libc::chdir(cstring_path(Path::new("/"))?.as_ptr()) } == -1 {
        return Err(io::Error::last_os_error());
    }

    redirect_stdio(log_dir)?;
    write_pid_file(pid_file)?;
    Ok(())
}

fn redirect_stdio(log_dir: &Path) -> io::Result<()> {
    let devnull = File::options().read(true).write(true).open("/dev/null")?;
    let stdout_log = File::options()
        .create(true)
        .append(true)
        .open(log_dir.join("jald.out"))?;
    let stderr_log = File::options()
        .create(true)
        .append(true)
        .open(log_dir.join("jald.err"))?;

    unsafe {
        if libc::dup2(devnull.as_raw_fd(), libc::STDIN_FILENO) == -1 {
            return Err(io::Error::last_os_error());
        }
        if libc::dup2(stdout_log.as_raw_fd(), libc::STDOUT_FILENO) == -1 {
            return Err(io::Error::last_os_error());
        }
        if libc::dup2(stderr_log.as_raw_fd(), libc::STDERR_FILENO) == -1 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

fn write_pid_file(pid_file: &Path) -> io::Result<()> {
    let pid = unsafe { libc::getpid() };
    let mut file = File::create(pid_file)?;
    writeln!(file, "{pid}")?;
    Ok(())
}

/// Removes the pid file on clean shutdown; best-effort, matching the
/// original's fire-and-forget `unlink(pid_file)` at exit.
pub fn remove_pid_file(pid_file: &Path) {
    let _ = std::fs::remove_file(pid_file);
}
