//! CLI domain: parse, route and output only.
//! No orchestration here; the route table dispatches to the batch engine.

mod output;
mod parse;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, RunOptions};
pub use route::{CommandOutput, RunContext};
