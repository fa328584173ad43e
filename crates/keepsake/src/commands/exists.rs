//! Exists command - checks whether a session record is stored.

use anyhow::Result;
use clap::Args;
use console::style;
use serde::Serialize;

use super::Context;

/// Arguments for the exists command.
#[derive(Args, Debug)]
pub struct ExistsArgs {
    /// Session identifier
    pub id: String,
}

#[derive(Debug, Serialize)]
struct ExistsOutput<'a> {
    id: &'a str,
    exists: bool,
}

/// Run the exists command.
///
/// Reports `true` when the backend cannot be reached.
pub fn run(args: ExistsArgs, ctx: &Context) -> Result<()> {
    let exists = ctx.store.exists(&ctx.request(), Some(&args.id))?;

    if ctx.json_output {
        let output = ExistsOutput {
            id: &args.id,
            exists,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if exists {
        println!("{} {}", style("✓").green(), args.id);
    } else {
        println!("{} {}", style("✗").red(), args.id);
    }

    Ok(())
}
