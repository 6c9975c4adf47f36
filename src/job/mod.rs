//! Single-instance job locking ("job check").
//!
//! A batch program that must not overlap with itself constructs a
//! [`JobGuard`] at startup and releases it at the end. The guard answers two
//! questions: may this run proceed, and if not, how long has the other run
//! been going.
//!
//! # Lock Files
//!
//! Lock files live at `<config_root>/jobs/<mnemonic>.pid` and contain only
//! the owning process id as ASCII decimal. The file's modification time is
//! used as the age of the lock.
//!
//! # Recovery
//!
//! - A lock file whose pid is not running (crash, `kill -9`) is reclaimed
//!   with a warning.
//! - An empty or non-numeric lock file is an error, not "no lock": it is what
//!   a full disk leaves behind, and the previous run's state is unknown.
//! - New lock files are created with `create_new` semantics so two
//!   processes that both see "no lock" cannot both win.

mod guard;
mod liveness;
mod operations;
mod store;
mod types;


// Re-export public API
pub use guard::{
    DEFAULT_MNEMONIC, DEFAULT_POLL_INTERVAL, JobGuard, JobGuardBuilder, validate_mnemonic,
};
pub use liveness::{LivenessProbe, SignalProbe, is_process_alive};
pub use operations::{clear_lock, inspect, list_jobs};
pub use store::{LockFile, MIN_AGE};
pub use types::{JobStatus, format_age};
