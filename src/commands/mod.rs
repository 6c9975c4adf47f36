//! Command implementations for batchkit.
//!
//! Every command runs against a [`Context`]: the resolved application
//! directories, the merged runner config and a live log pipeline. The
//! dispatcher builds it once and routes to the handlers, which return the
//! process exit code.

mod config_cmd;
mod lock;
mod run;
mod suppress;

use crate::cli::{Cli, Command, ConfigAction, GlobalArgs, LockAction, RunArgs, SuppressAction};
use batchkit::config::{ConfigBuilder, ConfigMap, RunnerConfig};
use batchkit::error::Result;
use batchkit::logging::{LogManager, LogSettings};
use batchkit::paths::AppPaths;
use serde_yaml::Value;
use tracing::{debug, error};

/// Everything a command needs.
pub struct Context {
    pub paths: AppPaths,
    pub config: RunnerConfig,
    pub builder: ConfigBuilder,
    pub logs: LogManager,
}

impl Context {
    /// Resolve paths, merge config layers and start logging.
    ///
    /// `run` flags, when given, are the highest-precedence config layer.
    pub fn load(global: &GlobalArgs, run: Option<&RunArgs>) -> Result<Self> {
        let paths = AppPaths::resolve(&global.app, global.config_dir.as_deref())?;

        let mut builder = ConfigBuilder::new().with_schema(RunnerConfig::schema());
        match &global.config_file {
            Some(path) => builder.add_file(path)?,
            None => builder.add_optional_file(paths.config_file(RunnerConfig::FILE_NAME))?,
        };
        builder
            .add_env(RunnerConfig::ENV_PREFIX)?
            .add_overrides(flag_overrides(global, run));

        let config: RunnerConfig = builder.build()?;
        config.validate()?;

        let settings = LogSettings {
            level: config.log_level,
            to_console: config.log_to_console,
            to_file: config.log_to_file,
            log_dir: config.log_dir.clone(),
            max_files: config.log_max_files,
            ..LogSettings::new(&paths.app_name)
        };
        let logs = LogManager::new(&settings)?;

        Ok(Self {
            paths,
            config,
            builder,
            logs,
        })
    }
}

/// Command-line flags as a config layer. Unset flags are null and skipped.
fn flag_overrides(global: &GlobalArgs, run: Option<&RunArgs>) -> ConfigMap {
    let mut map = ConfigMap::new();
    let mut put = |key: &str, value: Option<Value>| {
        map.insert(key.to_string(), value.unwrap_or(Value::Null));
    };

    put("log_level", global.log_level.map(|l| Value::from(l.as_str())));
    put("log_to_console", global.no_console_log.then_some(Value::Bool(false)));
    put("log_to_file", global.no_file_log.then_some(Value::Bool(false)));
    put(
        "log_dir",
        global
            .log_dir
            .as_ref()
            .map(|d| Value::from(d.to_string_lossy().into_owned())),
    );

    if let Some(run) = run {
        put("mnemonic", run.mnemonic.clone().map(Value::from));
        put("lock_wait_secs", run.wait.map(Value::from));
        put("busy_ok", run.busy_ok.then_some(Value::Bool(true)));
    }
    map
}

/// Dispatch a command to its implementation and return the exit code.
pub fn dispatch(cli: Cli) -> Result<i32> {
    let run_args = match &cli.command {
        Command::Run(args) => Some(args),
        _ => None,
    };
    let ctx = Context::load(&cli.global, run_args)?;
    ctx.logs.install_global()?;
    ctx.logs.install_panic_hook();
    debug!(config_root = %ctx.paths.config_root.display(), "batchkit starting");

    let result = match cli.command {
        Command::Run(args) => run::cmd_run(&ctx, args),
        Command::Lock(lock_cmd) => match lock_cmd.action {
            LockAction::List(args) => lock::cmd_lock_list(&ctx, args),
            LockAction::Status(args) => lock::cmd_lock_status(&ctx, args),
            LockAction::Clear(args) => lock::cmd_lock_clear(&ctx, args),
        },
        Command::Suppress(cmd) => match cmd.action {
            SuppressAction::List => suppress::cmd_suppress_list(&ctx),
            SuppressAction::Check { name } => suppress::cmd_suppress_check(&ctx, name),
            SuppressAction::Add { name } => suppress::cmd_suppress_add(&ctx, name),
            SuppressAction::Remove { name } => suppress::cmd_suppress_remove(&ctx, name),
        },
        Command::Config(cmd) => match cmd.action {
            ConfigAction::Show => config_cmd::cmd_config_show(&ctx),
        },
    };

    result.inspect_err(|e| error!("{}", e))
}
