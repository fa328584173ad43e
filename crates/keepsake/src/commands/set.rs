//! Set and unset commands - edit a single key of a session record.

use anyhow::{Context as _, Result, bail};
use clap::Args;
use console::style;
use keepsake_session::SaveOutcome;
use serde::Serialize;
use serde_json::Value;

use super::Context;

/// Arguments for the set command.
#[derive(Args, Debug)]
pub struct SetArgs {
    /// Session identifier
    pub id: String,

    /// Key to set
    pub key: String,

    /// Value as JSON (e.g. `42`, `"text"`, `{"a":1}`)
    pub value: String,
}

/// Arguments for the unset command.
#[derive(Args, Debug)]
pub struct UnsetArgs {
    /// Session identifier
    pub id: String,

    /// Key to remove
    pub key: String,
}

#[derive(Debug, Serialize)]
struct SaveOutput<'a> {
    requested: &'a str,
    saved: bool,
    id: Option<&'a str>,
}

/// Run the set command.
///
/// A missing record is created under a freshly issued identifier.
pub fn run(args: SetArgs, ctx: &Context) -> Result<()> {
    let value: Value = serde_json::from_str(&args.value)
        .with_context(|| format!("value for '{}' is not valid JSON", args.key))?;

    let request = ctx.request();
    let mut session = ctx.store.load(&request, Some(&args.id))?;
    session.insert(args.key, value);

    let outcome = ctx.store.save(&request, &session)?;
    report(&args.id, &outcome, ctx)
}

/// Run the unset command.
///
/// Removing a key from a shared record only takes effect when no concurrent
/// writer still holds it, since merges cannot express removals.
pub fn run_unset(args: UnsetArgs, ctx: &Context) -> Result<()> {
    let request = ctx.request();
    let mut session = ctx.store.load(&request, Some(&args.id))?;

    if session.id() != args.id {
        bail!("no readable session record for '{}'", args.id);
    }
    if session.remove(&args.key).is_none() {
        bail!("session '{}' has no key '{}'", args.id, args.key);
    }

    let outcome = ctx.store.save(&request, &session)?;
    report(&args.id, &outcome, ctx)
}

fn report(requested: &str, outcome: &SaveOutcome, ctx: &Context) -> Result<()> {
    if ctx.json_output {
        let output = SaveOutput {
            requested,
            saved: outcome.is_success(),
            id: outcome.identifier(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        match outcome {
            SaveOutcome::Written(id) if id != requested => {
                println!(
                    "{} No record for {requested}; saved as new session {}",
                    style("✓").green(),
                    style(id).bold()
                );
            }
            SaveOutcome::Written(id) => println!("{} Saved {id}", style("✓").green()),
            SaveOutcome::Unchanged(id) => println!("{} {id} unchanged", style("✓").green()),
            SaveOutcome::Failed => {}
        }
    }

    if !outcome.is_success() {
        bail!("backend unreachable; session '{requested}' was not saved");
    }
    Ok(())
}
