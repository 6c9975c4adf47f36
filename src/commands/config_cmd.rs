//! Implementation of the `batchkit config show` command.

use super::Context;
use batchkit::error::Result;
use batchkit::exit_codes;

pub fn cmd_config_show(ctx: &Context) -> Result<i32> {
    println!("# config root: {}", ctx.paths.config_root.display());
    if let Some(dir) = ctx.logs.log_dir() {
        println!("# log dir:     {}", dir.display());
    }
    print!("{}", ctx.config.to_yaml()?);

    let overridden: Vec<_> = ctx
        .builder
        .values()
        .keys()
        .filter_map(|key| ctx.builder.source_of(key).map(|source| (key, source)))
        .collect();
    if !overridden.is_empty() {
        println!();
        println!("# sources (unlisted keys use defaults):");
        for (key, source) in overridden {
            println!("#   {}: {}", key, source);
        }
    }

    Ok(exit_codes::SUCCESS)
}
