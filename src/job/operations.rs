//! Read-only inspection and manual clearing of job locks.

use super::guard::validate_mnemonic;
use super::liveness::LivenessProbe;
use super::store::LockFile;
use super::types::JobStatus;
use crate::error::{BatchError, Result};
use crate::paths::{AppPaths, LOCK_EXTENSION};
use chrono::Local;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Inspect the lock for one mnemonic without taking it.
pub fn inspect(paths: &AppPaths, mnemonic: &str, probe: &dyn LivenessProbe) -> Result<JobStatus> {
    validate_mnemonic(mnemonic)?;
    status_at(&paths.job_lock_path(mnemonic), mnemonic, probe)
}

/// List every lock file in the jobs directory, sorted by mnemonic.
///
/// Corrupt lock files are listed with `corrupt: true` instead of failing
/// the whole listing.
pub fn list_jobs(paths: &AppPaths, probe: &dyn LivenessProbe) -> Result<Vec<JobStatus>> {
    let jobs_dir = paths.jobs_dir();
    let mut jobs = Vec::new();

    if !jobs_dir.exists() {
        return Ok(jobs);
    }

    let entries = fs::read_dir(&jobs_dir).map_err(|e| BatchError::LockIo {
        path: jobs_dir.clone(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| BatchError::LockIo {
            path: jobs_dir.clone(),
            source: e,
        })?;
        let path = entry.path();

        if path.extension().and_then(|e| e.to_str()) != Some(LOCK_EXTENSION) {
            continue;
        }
        let Some(mnemonic) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        jobs.push(status_at(&path, mnemonic, probe)?);
    }

    jobs.sort_by(|a, b| a.mnemonic.cmp(&b.mnemonic));
    Ok(jobs)
}

/// Remove the lock file for `mnemonic`.
///
/// Refuses to remove a lock whose owner is still running unless `force` is
/// set. Corrupt lock files are removable without `force`, since no owner can
/// be identified. Returns the status as it was before removal.
pub fn clear_lock(
    paths: &AppPaths,
    mnemonic: &str,
    force: bool,
    probe: &dyn LivenessProbe,
) -> Result<JobStatus> {
    let status = inspect(paths, mnemonic, probe)?;

    if !status.is_locked() {
        return Err(BatchError::UserError(format!(
            "no lock exists for '{}' at: {}",
            mnemonic,
            status.path.display()
        )));
    }

    if status.alive && !force {
        return Err(BatchError::UserError(format!(
            "lock '{}' is held by running process {}; use --force to remove it anyway",
            mnemonic,
            status.owner_pid.unwrap_or_default()
        )));
    }

    if status.alive {
        warn!(
            mnemonic = %mnemonic,
            owner_pid = status.owner_pid.unwrap_or_default(),
            "force-clearing a lock held by a running process"
        );
    }

    LockFile::new(&status.path).delete()?;
    Ok(status)
}

fn status_at(path: &Path, mnemonic: &str, probe: &dyn LivenessProbe) -> Result<JobStatus> {
    let lock = LockFile::new(path);

    let (owner_pid, corrupt) = match lock.read() {
        Ok(pid) => (pid, false),
        Err(BatchError::CorruptLockFile { .. }) => (None, true),
        Err(e) => return Err(e),
    };
    let age = lock.age()?;
    let held_since = (!age.is_zero())
        .then(|| chrono::Duration::from_std(age).ok())
        .flatten()
        .map(|age| Local::now() - age);

    Ok(JobStatus {
        mnemonic: mnemonic.to_string(),
        path: path.to_path_buf(),
        owner_pid,
        age_secs: age.as_secs(),
        held_since,
        alive: owner_pid.is_some_and(|pid| probe.is_alive(pid)),
        corrupt,
    })
}
