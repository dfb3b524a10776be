//! Process hardening for a server that holds the cipher key and, briefly,
//! decrypted cluster credentials.
//!
//! - [`disable_core_dumps`] sets `RLIMIT_CORE` to 0 so a crash cannot write
//!   key material to disk.
//! - [`lock_memory`] pins current and future pages with `mlockall` so they
//!   are never swapped out.
//!
//! Both are no-ops on non-Unix platforms.

use std::io;

/// Set `RLIMIT_CORE` to 0 for this process.
///
/// # Errors
///
/// Returns the OS error if `setrlimit` fails.
#[cfg(unix)]
pub fn disable_core_dumps() -> io::Result<()> {
    let limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `setrlimit` only reads the `rlimit` struct we pass by
    // reference, which outlives the call.
    #[allow(unsafe_code)]
    let rc = unsafe { libc::setrlimit(libc::RLIMIT_CORE, &limit) };
    check(rc)
}

#[cfg(not(unix))]
pub fn disable_core_dumps() -> io::Result<()> {
    Ok(())
}

/// Lock all current and future pages into RAM.
///
/// Needs `CAP_IPC_LOCK` or root on Linux. Skip it in development with
/// `CONSOLE_DISABLE_MLOCK=true`.
///
/// # Errors
///
/// Returns the OS error if `mlockall` fails.
#[cfg(unix)]
pub fn lock_memory() -> io::Result<()> {
    // SAFETY: `mlockall` takes only flags and touches no caller memory.
    #[allow(unsafe_code)]
    let rc = unsafe { libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) };
    check(rc)
}

#[cfg(not(unix))]
pub fn lock_memory() -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn check(rc: libc::c_int) -> io::Result<()> {
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn core_dumps_can_be_disabled() {
        // Lowering a soft and hard limit to zero never needs privileges.
        assert!(disable_core_dumps().is_ok());
    }
}
