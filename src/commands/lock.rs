//! Implementation of the `batchkit lock` commands.

use super::Context;
use crate::cli::{LockClearArgs, LockListArgs, LockStatusArgs};
use batchkit::error::{BatchError, Result};
use batchkit::exit_codes;
use batchkit::job::{self, JobStatus, SignalProbe, format_age};

pub fn cmd_lock_list(ctx: &Context, args: LockListArgs) -> Result<i32> {
    let jobs = job::list_jobs(&ctx.paths, &SignalProbe)?;

    if args.json {
        println!("{}", to_json(&jobs)?);
        return Ok(exit_codes::SUCCESS);
    }

    if jobs.is_empty() {
        println!("No job locks.");
        return Ok(exit_codes::SUCCESS);
    }

    println!("Job locks ({}):", jobs.len());
    println!();
    for status in &jobs {
        print_status(status);
    }

    let stale_count = jobs.iter().filter(|j| j.is_stale()).count();
    if stale_count > 0 {
        println!(
            "Note: {} lock(s) are stale and will be reclaimed by the next run.",
            stale_count
        );
    }

    Ok(exit_codes::SUCCESS)
}

pub fn cmd_lock_status(ctx: &Context, args: LockStatusArgs) -> Result<i32> {
    let mnemonic = args.mnemonic.as_deref().unwrap_or(&ctx.config.mnemonic);
    job::validate_mnemonic(mnemonic)?;
    let status = job::inspect(&ctx.paths, mnemonic, &SignalProbe)?;

    if args.json {
        println!("{}", to_json(&status)?);
    } else {
        print_status(&status);
    }
    Ok(exit_codes::SUCCESS)
}

pub fn cmd_lock_clear(ctx: &Context, args: LockClearArgs) -> Result<i32> {
    let mnemonic = args.mnemonic.as_deref().unwrap_or(&ctx.config.mnemonic);
    job::validate_mnemonic(mnemonic)?;
    let status = job::clear_lock(&ctx.paths, mnemonic, args.force, &SignalProbe)?;

    println!("Cleared lock: {}", status);
    println!("  Path: {}", status.path.display());
    Ok(exit_codes::SUCCESS)
}

fn print_status(status: &JobStatus) {
    println!("  {}:", status.mnemonic);
    if status.corrupt {
        println!("    Status:     CORRUPT (no pid recorded)");
    } else if let Some(pid) = status.owner_pid {
        println!("    PID:        {}", pid);
        if let Some(since) = status.held_since {
            println!("    Since:      {}", since.format("%Y-%m-%d %H:%M:%S"));
        }
        println!(
            "    Age:        {}",
            format_age(std::time::Duration::from_secs(status.age_secs))
        );
        let state = if status.alive { "running" } else { "STALE (owner not running)" };
        println!("    Status:     {}", state);
    } else {
        println!("    Status:     free");
    }
    println!("    Path:       {}", status.path.display());
    println!();
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| BatchError::UserError(format!("failed to serialize JSON: {}", e)))
}
