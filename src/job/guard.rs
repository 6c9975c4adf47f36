//! Single-instance job guard.

use super::liveness::{LivenessProbe, SignalProbe};
use super::store::{LockFile, MIN_AGE};
use crate::error::{BatchError, Result};
use crate::paths::AppPaths;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{Dispatch, Span, debug, error, info, info_span, warn};

/// Mnemonic used when the caller does not pick one.
pub const DEFAULT_MNEMONIC: &str = "main";

/// Delay between attempts while blocking in `acquire`.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A mnemonic must be usable as a plain file name.
static MNEMONIC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("Invalid mnemonic regex")
});

/// Check that a mnemonic is a plain file name component.
pub fn validate_mnemonic(mnemonic: &str) -> Result<()> {
    if MNEMONIC_REGEX.is_match(mnemonic) {
        Ok(())
    } else {
        Err(BatchError::InvalidMnemonic(mnemonic.to_string()))
    }
}

/// Builder for [`JobGuard`].
pub struct JobGuardBuilder {
    app_name: String,
    mnemonic: String,
    config_dir: Option<PathBuf>,
    poll_interval: Duration,
    probe: Box<dyn LivenessProbe>,
    log: Option<Dispatch>,
}

impl JobGuardBuilder {
    fn new(app_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            mnemonic: DEFAULT_MNEMONIC.to_string(),
            config_dir: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            probe: Box::new(SignalProbe),
            log: None,
        }
    }

    /// Lock namespace within the application (default `main`).
    pub fn mnemonic(mut self, mnemonic: &str) -> Self {
        self.mnemonic = mnemonic.to_string();
        self
    }

    /// Use `<config_dir>/jobs` instead of the user config directory.
    pub fn config_dir<P: Into<PathBuf>>(mut self, config_dir: P) -> Self {
        self.config_dir = Some(config_dir.into());
        self
    }

    /// Delay between attempts while blocking in `acquire`.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Replace the null-signal liveness probe.
    pub fn probe<P: LivenessProbe + 'static>(mut self, probe: P) -> Self {
        self.probe = Box::new(probe);
        self
    }

    /// Sink for the guard's diagnostics. Defaults to the caller's current dispatcher.
    pub fn log_sink(mut self, dispatch: Dispatch) -> Self {
        self.log = Some(dispatch);
        self
    }

    /// Resolve the lock path and make one non-blocking acquisition attempt.
    ///
    /// # Errors
    ///
    /// * `InvalidMnemonic` - mnemonic is not a plain file name
    /// * `DirectoryCreateFailed` - the jobs directory cannot be created
    /// * `CorruptLockFile` - an existing lock file holds no pid
    /// * `LockIo` - any other filesystem failure
    pub fn build(self) -> Result<JobGuard> {
        validate_mnemonic(&self.mnemonic)?;
        let paths = AppPaths::resolve(&self.app_name, self.config_dir.as_deref())?;

        let log = self
            .log
            .unwrap_or_else(|| tracing::dispatcher::get_default(Dispatch::clone));
        let span = tracing::dispatcher::with_default(&log, || {
            info_span!("job", app = %self.app_name, mnemonic = %self.mnemonic)
        });

        let mut guard = JobGuard {
            lock: LockFile::new(paths.job_lock_path(&self.mnemonic)),
            mnemonic: self.mnemonic,
            new_pid: std::process::id(),
            old_pid: 0,
            old_age: Duration::ZERO,
            held: false,
            released: false,
            poll_interval: self.poll_interval,
            probe: self.probe,
            log,
            span,
        };

        let lock = guard.lock.clone();
        guard.scoped(|| {
            debug!(path = %lock.path().display(), "job check starting");
            lock.ensure_dir().inspect_err(|e| error!("{}", e))
        })?;

        guard.attempt()?;
        Ok(guard)
    }
}

/// Ensures only one process per (application, mnemonic) does the work.
///
/// Construction makes one attempt; `old_job_age()` then tells the caller
/// whether to proceed. `acquire` can wait for a running instance to finish.
/// A held lock is released by `release()` or, best-effort, on drop.
///
/// ```no_run
/// use batchkit::job::JobGuard;
/// use std::time::Duration;
///
/// let mut guard = JobGuard::new("archiver", "nightly")?;
/// if !guard.acquire(Duration::from_secs(30))? {
///     eprintln!("already running for {}s", guard.old_job_age().as_secs());
///     return Ok(());
/// }
/// // ... do the work ...
/// guard.release()?;
/// # Ok::<(), batchkit::error::BatchError>(())
/// ```
pub struct JobGuard {
    mnemonic: String,
    lock: LockFile,
    new_pid: u32,
    old_pid: u32,
    old_age: Duration,
    held: bool,
    released: bool,
    poll_interval: Duration,
    probe: Box<dyn LivenessProbe>,
    log: Dispatch,
    span: Span,
}

impl JobGuard {
    /// Guard `mnemonic` of `app_name` under the user config directory.
    pub fn new(app_name: &str, mnemonic: &str) -> Result<Self> {
        Self::builder(app_name).mnemonic(mnemonic).build()
    }

    /// Start configuring a guard for `app_name`.
    pub fn builder(app_name: &str) -> JobGuardBuilder {
        JobGuardBuilder::new(app_name)
    }

    /// Seconds another live instance has held the lock; zero means go ahead.
    pub fn old_job_age(&self) -> Duration {
        self.old_age
    }

    /// Pid of the live instance holding the lock, zero if none was seen.
    pub fn old_pid(&self) -> u32 {
        self.old_pid
    }

    /// This process's pid, as written to the lock file.
    pub fn new_pid(&self) -> u32 {
        self.new_pid
    }

    /// Whether this guard currently owns the lock file.
    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    pub fn lock_path(&self) -> &Path {
        self.lock.path()
    }

    /// Take the lock, retrying for up to `max_wait`.
    ///
    /// Returns `Ok(true)` once this guard holds the lock (immediately if it
    /// already does) and `Ok(false)` if another live instance still holds it
    /// when `max_wait` runs out. A zero `max_wait` makes exactly one attempt.
    pub fn acquire(&mut self, max_wait: Duration) -> Result<bool> {
        if self.held {
            return Ok(true);
        }

        let deadline = Instant::now().checked_add(max_wait);
        loop {
            if self.attempt()? {
                return Ok(true);
            }

            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => self.poll_interval,
            };
            if remaining.is_zero() {
                let (pid, age) = (self.old_pid, self.old_age.as_secs());
                self.scoped(|| {
                    warn!(
                        owner_pid = pid,
                        age_secs = age,
                        waited_secs = max_wait.as_secs(),
                        "job still running; giving up"
                    )
                });
                return Ok(false);
            }
            thread::sleep(self.poll_interval.min(remaining));
        }
    }

    /// Delete the lock file if this guard holds it.
    ///
    /// A guard that never acquired the lock only logs a warning, so a losing
    /// contender cannot remove the winner's lock. Safe to call repeatedly.
    pub fn release(&mut self) -> Result<()> {
        if !self.held {
            let released = self.released;
            self.scoped(|| {
                if released {
                    debug!("job lock already released");
                } else {
                    warn!("release() called by an instance that does not hold the lock; ignoring");
                }
            });
            return Ok(());
        }

        let lock = self.lock.clone();
        let new_pid = self.new_pid;
        self.scoped(|| match lock.read() {
            Ok(Some(pid)) if pid != new_pid => {
                warn!(
                    owner_pid = pid,
                    "lock file was taken over by another process; leaving it in place"
                );
                Ok(())
            }
            Ok(_) => lock.delete().map(|()| debug!("job lock released")),
            Err(e) => {
                error!("{}", e);
                Err(e)
            }
        })?;

        self.held = false;
        self.released = true;
        Ok(())
    }

    /// One acquisition attempt, repeated once if the lock changes hands mid-attempt.
    fn attempt(&mut self) -> Result<bool> {
        if self.held {
            return Ok(true);
        }

        let lock = self.lock.clone();
        let new_pid = self.new_pid;
        let probe = &*self.probe;

        let outcome = scoped(&self.log, &self.span, || -> Result<Attempt> {
            for _ in 0..START_PASSES {
                if let Some(outcome) = start_pass(&lock, new_pid, probe)? {
                    return Ok(outcome);
                }
                debug!("winning instance released the lock before it could be read; retrying");
            }
            warn!("lock changed hands during every attempt; treating job as busy");
            Ok(Attempt::Busy { pid: 0, age: MIN_AGE })
        })?;

        match outcome {
            Attempt::Acquired => {
                self.held = true;
                self.released = false;
                self.old_pid = 0;
                self.old_age = Duration::ZERO;
                Ok(true)
            }
            Attempt::Busy { pid, age } => {
                self.old_pid = pid;
                self.old_age = age;
                Ok(false)
            }
        }
    }

    fn scoped<T>(&self, f: impl FnOnce() -> T) -> T {
        scoped(&self.log, &self.span, f)
    }
}

impl std::fmt::Debug for JobGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobGuard")
            .field("mnemonic", &self.mnemonic)
            .field("lock_path", &self.lock.path())
            .field("new_pid", &self.new_pid)
            .field("old_pid", &self.old_pid)
            .field("old_age", &self.old_age)
            .field("held", &self.held)
            .finish_non_exhaustive()
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        if self.held
            && let Err(e) = self.release()
        {
            let path = self.lock.path().display().to_string();
            self.scoped(|| warn!(path = %path, "failed to release job lock on drop: {}", e));
        }
    }
}

/// Passes through the start step before giving up on a lock that keeps changing hands.
const START_PASSES: usize = 2;

#[derive(Debug, PartialEq, Eq)]
pub(super) enum Attempt {
    Acquired,
    Busy { pid: u32, age: Duration },
}

/// Inspect the lock, reclaim it if orphaned, and try to create it.
///
/// `Ok(None)` means another instance created the file first and removed it
/// again before its owner could be read.
fn start_pass(
    lock: &LockFile,
    new_pid: u32,
    probe: &dyn LivenessProbe,
) -> Result<Option<Attempt>> {
    let owner = lock.read().inspect_err(|e| {
        if matches!(e, BatchError::CorruptLockFile { .. }) {
            error!(path = %lock.path().display(), "empty or corrupt lock file found; prior process probably ran out of disk");
        } else {
            error!("{}", e);
        }
    })?;

    if let Some(pid) = owner {
        let age = lock.age()?;
        if age.is_zero() {
            debug!(owner_pid = pid, "lock file removed while inspecting it");
        } else if probe.is_alive(pid) {
            warn!(owner_pid = pid, age_secs = age.as_secs(), "job already running");
            return Ok(Some(Attempt::Busy { pid, age }));
        } else {
            warn!(
                stale_pid = pid,
                "lock file found but its owner is not running; reclaiming stale lock"
            );
            lock.delete()?;
        }
    } else {
        debug!("no active job found");
    }

    if lock.create_exclusive(new_pid)? {
        info!(pid = new_pid, "job lock acquired");
        return Ok(Some(Attempt::Acquired));
    }

    winner_after_lost_create(lock)
}

/// Report the instance that created the lock file between our read and create.
pub(super) fn winner_after_lost_create(lock: &LockFile) -> Result<Option<Attempt>> {
    let Some(pid) = lock.read().inspect_err(|e| error!("{}", e))? else {
        return Ok(None);
    };
    let age = lock.age()?.max(MIN_AGE);
    warn!(owner_pid = pid, "another instance took the lock first");
    Ok(Some(Attempt::Busy { pid, age }))
}

/// Run `f` with the guard's log sink as default dispatcher, inside its span.
fn scoped<T>(log: &Dispatch, span: &Span, f: impl FnOnce() -> T) -> T {
    tracing::dispatcher::with_default(log, || {
        let _entered = span.enter();
        f()
    })
}
