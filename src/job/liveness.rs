//! Process liveness checks for recorded lock owners.
//!
//! A pid in a lock file is only meaningful while that process runs. The
//! check is inherently racy (pids get recycled), which is accepted: the
//! worst case is a lock that looks busy until the recycled process exits.

/// Decides whether a recorded owner pid is a running process.
pub trait LivenessProbe: Send + Sync {
    /// Returns `true` if a process with `pid` is running. Pid 0 is never alive.
    fn is_alive(&self, pid: u32) -> bool;
}

/// Probes with the null signal (`kill(pid, 0)`).
///
/// Only "no such process" counts as dead. Permission errors mean the process
/// exists under another user, so it is reported alive rather than risking a
/// reclaim of someone else's active lock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalProbe;

impl LivenessProbe for SignalProbe {
    fn is_alive(&self, pid: u32) -> bool {
        is_process_alive(pid)
    }
}

/// Check whether `pid` is a running process on this host.
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    // Values above pid_t's range would wrap into process-group targets.
    let Ok(raw_pid) = libc::pid_t::try_from(pid) else {
        return false;
    };

    // SAFETY: signal 0 performs the existence and permission checks of
    // kill(2) without delivering anything; `raw_pid` is positive.
    let result = unsafe { libc::kill(raw_pid, 0) };
    if result == 0 {
        return true;
    }

    let errno = std::io::Error::last_os_error().raw_os_error();
    errno != Some(libc::ESRCH)
}

#[cfg(not(unix))]
pub fn is_process_alive(pid: u32) -> bool {
    // Without a null signal, assume any recorded owner is still running.
    pid != 0
}
