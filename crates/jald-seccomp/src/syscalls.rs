//! Syscall name <-> number resolution for filter-stage configuration.
//!
//! Config files name syscalls the way the original's
//! `seccomp_syscall_resolve_name` did (human-readable Linux syscall names);
//! this core resolves them against a fixed table of the calls this daemon's
//! startup and steady-state code paths actually make, rather than pulling in
//! a full libseccomp-style name database the pack doesn't carry anywhere.

macro_rules! syscall_table {
    ($($name:literal => $konst:ident),+ $(,)?) => {
        const TABLE: &[(&str, i64)] = &[
            $(($name, libc::$konst as i64)),+
        ];
    };
}

syscall_table! {
    "read" => SYS_read,
    "write" => SYS_write,
    "open" => SYS_open,
    "openat" => SYS_openat,
    "close" => SYS_close,
    "socket" => SYS_socket,
    "bind" => SYS_bind,
    "listen" => SYS_listen,
    "accept" => SYS_accept,
    "accept4" => SYS_accept4,
    "connect" => SYS_connect,
    "recvfrom" => SYS_recvfrom,
    "recvmsg" => SYS_recvmsg,
    "sendto" => SYS_sendto,
    "sendmsg" => SYS_sendmsg,
    "fstat" => SYS_fstat,
    "stat" => SYS_stat,
    "lstat" => SYS_lstat,
    "lseek" => SYS_lseek,
    "mmap" => SYS_mmap,
    "munmap" => SYS_munmap,
    "mprotect" => SYS_mprotect,
    "brk" => SYS_brk,
    "rt_sigaction" => SYS_rt_sigaction,
    "rt_sigprocmask" => SYS_rt_sigprocmask,
    "rt_sigreturn" => SYS_rt_sigreturn,
    "sigaltstack" => SYS_sigaltstack,
    "ioctl" => SYS_ioctl,
    "pread64" => SYS_pread64,
    "pwrite64" => SYS_pwrite64,
    "access" => SYS_access,
    "pipe" => SYS_pipe,
    "pipe2" => SYS_pipe2,
    "select" => SYS_select,
    "poll" => SYS_poll,
    "epoll_wait" => SYS_epoll_wait,
    "epoll_ctl" => SYS_epoll_ctl,
    "epoll_create1" => SYS_epoll_create1,
    "dup" => SYS_dup,
    "dup2" => SYS_dup2,
    "dup3" => SYS_dup3,
    "nanosleep" => SYS_nanosleep,
    "clone" => SYS_clone,
    "execve" => SYS_execve,
    "exit" => SYS_exit,
    "exit_group" => SYS_exit_group,
    "wait4" => SYS_wait4,
    "kill" => SYS_kill,
    "tgkill" => SYS_tgkill,
    "uname" => SYS_uname,
    "fcntl" => SYS_fcntl,
    "flock" => SYS_flock,
    "fsync" => SYS_fsync,
    "fdatasync" => SYS_fdatasync,
    "ftruncate" => SYS_ftruncate,
    "getdents64" => SYS_getdents64,
    "getcwd" => SYS_getcwd,
    "chdir" => SYS_chdir,
    "rename" => SYS_rename,
    "mkdir" => SYS_mkdir,
    "rmdir" => SYS_rmdir,
    "unlink" => SYS_unlink,
    "unlinkat" => SYS_unlinkat,
    "readlink" => SYS_readlink,
    "chmod" => SYS_chmod,
    "fchmod" => SYS_fchmod,
    "getrandom" => SYS_getrandom,
    "getpid" => SYS_getpid,
    "gettid" => SYS_gettid,
    "getppid" => SYS_getppid,
    "getuid" => SYS_getuid,
    "geteuid" => SYS_geteuid,
    "getgid" => SYS_getgid,
    "getegid" => SYS_getegid,
    "setsid" => SYS_setsid,
    "setuid" => SYS_setuid,
    "setgid" => SYS_setgid,
    "clock_gettime" => SYS_clock_gettime,
    "clock_nanosleep" => SYS_clock_nanosleep,
    "futex" => SYS_futex,
    "set_robust_list" => SYS_set_robust_list,
    "sched_getaffinity" => SYS_sched_getaffinity,
    "madvise" => SYS_madvise,
    "prlimit64" => SYS_prlimit64,
    "arch_prctl" => SYS_arch_prctl,
    "set_tid_address" => SYS_set_tid_address,
    "restart_syscall" => SYS_restart_syscall,
    "newfstatat" => SYS_newfstatat,
    "statx" => SYS_statx,
    "seccomp" => SYS_seccomp,
}

pub fn resolve_syscall_nr(name: &str) -> Option<i64> {
    TABLE
        .iter()
        .find(|(table_name, _)| *table_name == name)
        .map(|(_, nr)| *nr)
}

pub fn resolve_syscall_name(nr: i64) -> Option<&'static str> {
    TABLE
        .iter()
        .find(|(_, table_nr)| *table_nr == nr)
        .map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_syscall() {
        let nr = resolve_syscall_nr("read").unwrap();
        assert_eq!(resolve_syscall_name(nr), Some("read"));
    }

    #[test]
    fn unknown_name_resolves_to_none() {
        assert_eq!(resolve_syscall_nr("definitely_not_a_syscall"), None);
    }
}
