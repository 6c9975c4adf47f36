//! Batchkit: helpers for standalone batch programs.
//!
//! A scheduled program typically needs the same four things before it does
//! any real work:
//!
//! - [`job`]: make sure only one instance runs per job, reclaiming locks
//!   left behind by crashed runs
//! - [`config`]: layered YAML config (file, environment, flags) with schema
//!   validation
//! - [`logging`]: console and rotating file logs
//! - [`suppress`]: operator-controlled flags that switch a job off
//!
//! The `batchkit` binary composes them so any shell command can be wrapped
//! as a single-instance job.

pub mod config;
pub mod error;
pub mod exit_codes;
pub mod job;
pub mod logging;
pub mod paths;
pub mod suppress;

#[cfg(test)]
mod test_support;
