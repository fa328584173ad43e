//! Destroy command - deletes a session record.

use anyhow::Result;
use clap::Args;
use console::style;
use serde::Serialize;

use super::Context;

/// Arguments for the destroy command.
#[derive(Args, Debug)]
pub struct DestroyArgs {
    /// Session identifier
    pub id: String,

    /// Do not issue a replacement identifier
    #[arg(long)]
    pub no_replace: bool,
}

#[derive(Debug, Serialize)]
struct DestroyOutput<'a> {
    destroyed: &'a str,
    replacement: Option<&'a str>,
}

/// Run the destroy command.
pub fn run(args: DestroyArgs, ctx: &Context) -> Result<()> {
    let replacement = ctx
        .store
        .destroy(&ctx.request(), &args.id, !args.no_replace)?;

    if ctx.json_output {
        let output = DestroyOutput {
            destroyed: &args.id,
            replacement: replacement.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{} Destroyed {}", style("✓").green(), args.id);
    if let Some(id) = replacement {
        println!("  {} {}", style("Replacement:").dim(), style(id).bold());
    }

    Ok(())
}
