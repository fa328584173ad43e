//! CLI command handlers.

use keepsake_session::{RequestContext, SessionStore};

pub mod destroy;
pub mod exists;
pub mod set;
pub mod show;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Store built from the merged config and command-line overrides.
    pub store: SessionStore,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Request context for a single CLI invocation.
    pub fn request(&self) -> RequestContext {
        RequestContext::new().with_metadata("origin", "keepsake-cli")
    }
}
