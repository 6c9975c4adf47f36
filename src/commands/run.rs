//! Implementation of the `batchkit run` command.
//!
//! 1. Take the job lock, waiting up to `lock_wait_secs` for a running instance
//! 2. Exit if a suppression flag matches
//! 3. Run the command (or hold the lock for `--hold` seconds)
//! 4. Release the lock and exit with the command's exit code

use super::Context;
use crate::cli::RunArgs;
use batchkit::error::{BatchError, Result};
use batchkit::exit_codes;
use batchkit::job::{JobGuard, format_age};
use batchkit::suppress::SuppressCheck;
use std::process::{Command, ExitStatus};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// What `run` should do once it holds the lock.
#[derive(Debug, PartialEq, Eq)]
enum Work {
    Exec(Vec<String>),
    Hold(Duration),
}

pub fn cmd_run(ctx: &Context, args: RunArgs) -> Result<i32> {
    let work = work_from_args(&args)?;
    let config = &ctx.config;

    let mut guard = JobGuard::builder(&ctx.paths.app_name)
        .mnemonic(&config.mnemonic)
        .config_dir(&ctx.paths.config_root)
        .log_sink(ctx.logs.dispatch())
        .build()?;

    if !guard.acquire(Duration::from_secs(config.lock_wait_secs))? {
        eprintln!(
            "Job '{}' is already running (pid {}, for {}).",
            config.mnemonic,
            guard.old_pid(),
            format_age(guard.old_job_age())
        );
        return Ok(if config.busy_ok {
            exit_codes::SUCCESS
        } else {
            exit_codes::BUSY
        });
    }

    let suppress = SuppressCheck::new(&ctx.paths)?;
    if suppress.suppressed(args.suppress_name.as_deref()) {
        eprintln!("Job '{}' is suppressed; nothing to do.", config.mnemonic);
        guard.release()?;
        return Ok(exit_codes::SUCCESS);
    }

    let outcome = match work {
        Work::Hold(duration) => {
            info!(secs = duration.as_secs(), "holding job lock");
            thread::sleep(duration);
            Ok(exit_codes::SUCCESS)
        }
        Work::Exec(argv) => run_command(&argv),
    };

    guard.release()?;
    outcome
}

fn work_from_args(args: &RunArgs) -> Result<Work> {
    if let Some(line) = &args.exec {
        let argv = shell_words::split(line).map_err(|e| {
            BatchError::UserError(format!(
                "failed to parse command: {}\nCommand: {}\nFix: check for unmatched quotes or invalid escape sequences.",
                e, line
            ))
        })?;
        if argv.is_empty() {
            return Err(BatchError::UserError(format!(
                "command is empty after parsing.\nCommand: {}",
                line
            )));
        }
        return Ok(Work::Exec(argv));
    }

    if !args.command.is_empty() {
        return Ok(Work::Exec(args.command.clone()));
    }

    Ok(Work::Hold(Duration::from_secs(args.hold.unwrap_or(0))))
}

fn run_command(argv: &[String]) -> Result<i32> {
    let program = &argv[0];
    info!(command = %shell_words::join(argv), "running command");

    let status = Command::new(program)
        .args(&argv[1..])
        .status()
        .map_err(|e| {
            BatchError::UserError(format!("failed to run '{}': {}", program, e))
        })?;

    let code = exit_code_of(status);
    if code == exit_codes::SUCCESS {
        info!("command finished");
    } else {
        warn!(exit_code = code, "command failed");
    }
    Ok(code)
}

/// Exit code of a finished child; `128 + signal` when it was killed.
fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    exit_codes::USER_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_is_split_with_shell_quoting() {
        let args = RunArgs {
            exec: Some("cp 'my file' /tmp".to_string()),
            ..RunArgs::default()
        };
        assert_eq!(
            work_from_args(&args).unwrap(),
            Work::Exec(vec!["cp".into(), "my file".into(), "/tmp".into()])
        );
    }

    #[test]
    fn bad_exec_is_user_error() {
        for line in ["echo 'unclosed", "   "] {
            let args = RunArgs {
                exec: Some(line.to_string()),
                ..RunArgs::default()
            };
            assert!(matches!(
                work_from_args(&args),
                Err(BatchError::UserError(_))
            ));
        }
    }

    #[test]
    fn trailing_command_is_used_verbatim() {
        let args = RunArgs {
            command: vec!["echo".into(), "a b".into()],
            ..RunArgs::default()
        };
        assert_eq!(
            work_from_args(&args).unwrap(),
            Work::Exec(vec!["echo".into(), "a b".into()])
        );
    }

    #[test]
    fn no_command_holds() {
        let args = RunArgs {
            hold: Some(3),
            ..RunArgs::default()
        };
        assert_eq!(
            work_from_args(&args).unwrap(),
            Work::Hold(Duration::from_secs(3))
        );
        assert_eq!(
            work_from_args(&RunArgs::default()).unwrap(),
            Work::Hold(Duration::ZERO)
        );
    }

    #[cfg(unix)]
    #[test]
    fn child_exit_codes_pass_through() {
        assert_eq!(run_command(&["true".into()]).unwrap(), 0);
        assert_eq!(run_command(&["false".into()]).unwrap(), 1);
        assert_eq!(
            run_command(&["sh".into(), "-c".into(), "exit 7".into()]).unwrap(),
            7
        );
        assert_eq!(
            run_command(&["sh".into(), "-c".into(), "kill -9 $$".into()]).unwrap(),
            137
        );
    }

    #[test]
    fn missing_program_is_user_error() {
        let err = run_command(&["batchkit-no-such-program".into()]).unwrap_err();
        assert!(matches!(err, BatchError::UserError(_)));
    }
}
