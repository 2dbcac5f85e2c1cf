//! C7 — the three-stage syscall filter controller.
//!
//! Stage order (spec §4.7):
//! 1. `install_disallow_stage` — default ALLOW, explicit TRAP on syscalls
//!    that must never fire before the startup filter is in place.
//! 2. `install_startup_stage` — default TRAP, allow-list is the union of
//!    `startup_syscalls` and `steady_state_syscalls`.
//! 3. `install_steady_state_stage` — default TRAP, allow-list is only
//!    `steady_state_syscalls`; installed immediately before the accept loop.
//!
//! Each rule is installed exactly once: the source's apparent duplicate
//! `seccomp_rule_add` call in the startup stage is treated as a bug and not
//! reproduced (spec §9's open question).

use std::collections::BTreeMap;
use std::convert::TryInto;

use jald_error::{Error, Result};
use seccompiler::{
    BpfProgram, SeccompAction, SeccompCmpArgLen, SeccompCmpOp, SeccompCondition, SeccompFilter,
    SeccompRule, TargetArch,
};

mod syscalls;
pub use syscalls::resolve_syscall_name;
use syscalls::resolve_syscall_nr;

/// Resolves syscall names from the configuration file to kernel syscall
/// numbers for the running target architecture. Unknown names are a fatal
/// `StartupFailure`, matching spec §4.7 ("any rule that fails to
/// resolve/add is fatal").
pub fn resolve_names(names: &[String]) -> Result<Vec<i64>> {
    names
        .iter()
        .map(|name| {
            resolve_syscall_nr(name)
                .ok_or_else(|| Error::startup(format!("unknown syscall name in config: {name}")))
        })
        .collect()
}

fn target_arch() -> Result<TargetArch> {
    std::env::consts::ARCH
        .try_into()
        .map_err(|_| Error::startup(format!("unsupported target architecture: {}", std::env::consts::ARCH)))
}

// An empty rule vector for a syscall means it unconditionally matches (and
// gets the filter's `match_action`) — seccompiler rejects a `SeccompRule`
// built from an empty condition list (`EmptyRule`), so unconditional allows
// are expressed by leaving the syscall's rule vector empty, not by
// constructing a rule.
fn allow_unconditionally(rules: &mut BTreeMap<i64, Vec<SeccompRule>>, syscalls: &[i64]) {
    for nr in syscalls {
        rules.entry(*nr).or_default();
    }
}

/// `mismatch_action` is the filter's default, applied to syscalls absent
/// from `rules` (or present with a rule set whose conditions don't match);
/// `match_action` applies when a syscall's rule set matches (an empty rule
/// vector always matches).
fn build_and_load(
    rules: BTreeMap<i64, Vec<SeccompRule>>,
    mismatch_action: SeccompAction,
    match_action: SeccompAction,
) -> Result<()> {
    let filter = SeccompFilter::new(rules, mismatch_action, match_action, target_arch()?)
        .map_err(|e| Error::startup(format!("building seccomp filter: {e}")))?;
    let program: BpfProgram = filter
        .try_into()
        .map_err(|e| Error::startup(format!("compiling seccomp filter to BPF: {e}")))?;
    seccompiler::apply_filter(&program)
        .map_err(|e| Error::startup(format!("loading seccomp filter: {e}")))?;
    Ok(())
}

/// Pre-init stage: default ALLOW, with an explicit TRAP on `fcntl(F_SETFL)`
/// — the one call the spec names as dangerous enough to forbid even before
/// any other filtering is in place.
pub fn install_disallow_stage() -> Result<()> {
    let mut rules: BTreeMap<i64, Vec<SeccompRule>> = BTreeMap::new();
    if let Some(fcntl_nr) = resolve_syscall_nr("fcntl") {
        let condition = SeccompCondition::new(
            1,
            SeccompCmpArgLen::Dword,
            SeccompCmpOp::Eq,
            libc::F_SETFL as u64,
        )
        .map_err(|e| Error::startup(format!("building fcntl(F_SETFL) condition: {e}")))?;
        rules.insert(
            fcntl_nr,
            vec![SeccompRule::new(vec![condition])
                .map_err(|e| Error::startup(format!("building fcntl TRAP rule: {e}")))?],
        );
    }
    build_and_load(rules, SeccompAction::Allow, SeccompAction::Trap)
}

/// Startup stage: default TRAP, allow-list is the union of both configured
/// syscall lists so initialization (key loading, directory creation, socket
/// bind) can proceed.
pub fn install_startup_stage(startup: &[i64], steady_state: &[i64]) -> Result<()> {
    let mut rules: BTreeMap<i64, Vec<SeccompRule>> = BTreeMap::new();
    allow_unconditionally(&mut rules, startup);
    allow_unconditionally(&mut rules, steady_state);
    build_and_load(rules, SeccompAction::Trap, SeccompAction::Allow)
}

/// Steady-state stage: default TRAP, allow-list is only `steady_state`.
/// Installed immediately before the accept loop.
pub fn install_steady_state_stage(steady_state: &[i64]) -> Result<()> {
    let mut rules: BTreeMap<i64, Vec<SeccompRule>> = BTreeMap::new();
    allow_unconditionally(&mut rules, steady_state);
    build_and_load(rules, SeccompAction::Trap, SeccompAction::Allow)
}

/// The glibc `siginfo_t` byte offset of `_sifields._sigsys.{_syscall,_arch}`
/// on 64-bit Linux: 12 bytes of `si_signo`/`si_errno`/`si_code`, 4 bytes of
/// padding to align the union's leading `void *_call_addr`, then the 8-byte
/// pointer, then the two 4-byte fields. `libc::siginfo_t` only exposes
/// `si_code` directly, so the rest is read by hand — the same raw
/// kernel-ABI access the original's `info->si_syscall`/`si_arch` macros do.
const SIGSYS_SYSCALL_OFFSET: usize = 24;
const SIGSYS_ARCH_OFFSET: usize = 28;
const SI_CODE_SECCOMP: i32 = 1;

extern "C" fn handle_sigsys(
    _sig: libc::c_int,
    info: *mut libc::siginfo_t,
    _ucontext: *mut libc::c_void,
) {
    unsafe {
        if info.is_null() || (*info).si_code != SI_CODE_SECCOMP {
            return;
        }
        let base = info as *const u8;
        let syscall_nr = std::ptr::read_unaligned(base.add(SIGSYS_SYSCALL_OFFSET) as *const i32);
        let _arch = std::ptr::read_unaligned(base.add(SIGSYS_ARCH_OFFSET) as *const u32);
        let name = resolve_syscall_name(syscall_nr as i64).unwrap_or("unknown");
        eprintln!("seccomp violation: disallowed syscall {syscall_nr} ({name})");
    }
    std::process::exit(2);
}

/// Installs the `SIGSYS` violation handler. Must be called before any
/// filter stage that can TRAP, i.e. before `install_startup_stage`.
pub fn install_violation_handler() -> Result<()> {
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handle_sigsys as usize;
        action.sa_flags = libc::SA_SIGINFO;
        libc::sigemptyset(&mut action.sa_mask);
        if libc::sigaction(libc::SIGSYS, &action, std::ptr::null_mut()) != 0 {
            return Err(Error::startup(format!(
                "installing SIGSYS handler: {}",
                std::io::Error::last_os_error()
            )));
        }
    }
    Ok(())
}
