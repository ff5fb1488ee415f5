//! CLI domain: parse, route and output only.
//! No dispatch logic; the route table wires configured services into a dispatcher.

mod output;
mod parse;
mod route;

pub use output::{format_cursor, format_outcome, map_error};
pub use parse::{Cli, Commands, OutputFormat};
pub use route::{current_timestamp, RunContext};
