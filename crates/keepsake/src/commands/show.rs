//! Show command - prints a stored session record.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde::Serialize;
use serde_json::{Map, Value};

use super::Context;

/// Arguments for the show command.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Session identifier
    pub id: String,
}

#[derive(Debug, Serialize)]
struct ShowOutput<'a> {
    id: &'a str,
    found: bool,
    key: String,
    data: &'a Map<String, Value>,
}

/// Run the show command.
pub fn run(args: ShowArgs, ctx: &Context) -> Result<()> {
    let session = ctx.store.load(&ctx.request(), Some(&args.id))?;
    // A miss, an outage or a corrupt record all come back under a new id.
    let found = session.id() == args.id;
    let key = ctx.store.key_for(&args.id);

    if ctx.json_output {
        let output = ShowOutput {
            id: &args.id,
            found,
            key,
            data: session.data(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();

    println!();
    println!("{}", style(format!("Session {}", args.id)).bold());
    println!("{}", dim.apply_to("─".repeat(40)));

    if !found {
        println!();
        println!("  {}", style("No readable record.").yellow());
        println!(
            "  {} {}",
            dim.apply_to("A request would be issued:"),
            session.id()
        );
        if ctx.verbose {
            println!("  {} {}", dim.apply_to("Key:"), key);
        }
        println!();
        return Ok(());
    }

    if ctx.verbose {
        println!("  {} {}", dim.apply_to("Key:"), key);
        println!("  {} {}", dim.apply_to("Codec:"), ctx.store.codec().name());
    }
    println!();
    if session.is_empty() {
        println!("  {}", dim.apply_to("(empty)"));
    }
    for (name, value) in session.data() {
        println!("  {} {}", style(format!("{name}:")).cyan(), value);
    }
    println!();

    Ok(())
}
