//! Implementation of the `batchkit suppress` commands.

use super::Context;
use batchkit::error::Result;
use batchkit::exit_codes;
use batchkit::suppress::{self, ALL, SuppressCheck};

pub fn cmd_suppress_list(ctx: &Context) -> Result<i32> {
    let check = SuppressCheck::new(&ctx.paths)?;
    let names: Vec<&str> = check.names().collect();

    if names.is_empty() {
        println!("No suppressions in {}", check.dir().display());
        return Ok(exit_codes::SUCCESS);
    }

    println!("Suppressed ({}):", names.len());
    for name in names {
        println!("  {}", name);
    }
    Ok(exit_codes::SUCCESS)
}

pub fn cmd_suppress_check(ctx: &Context, name: Option<String>) -> Result<i32> {
    let check = SuppressCheck::new(&ctx.paths)?;
    let label = name.as_deref().unwrap_or(ALL);

    if check.suppressed(name.as_deref()) {
        println!("{}: suppressed", label);
    } else {
        println!("{}: not suppressed", label);
    }
    Ok(exit_codes::SUCCESS)
}

pub fn cmd_suppress_add(ctx: &Context, name: Option<String>) -> Result<i32> {
    let path = suppress::add(&ctx.paths, name.as_deref())?;
    println!("Suppressed {} ({})", name.as_deref().unwrap_or(ALL), path.display());
    Ok(exit_codes::SUCCESS)
}

pub fn cmd_suppress_remove(ctx: &Context, name: Option<String>) -> Result<i32> {
    let label = name.as_deref().unwrap_or(ALL);
    if suppress::remove(&ctx.paths, name.as_deref())? {
        println!("Removed suppression for {}", label);
    } else {
        println!("{} was not suppressed", label);
    }
    Ok(exit_codes::SUCCESS)
}
