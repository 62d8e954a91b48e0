//! mimepick - choose default applications per file type
//!
//! Indexes installed applications and the types they handle, then edits
//! ~/.config/mimeapps.list without touching unrelated entries.

mod cli;
mod functions;

use clap::Parser;
use cli::Cli;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "mimepick=debug,mime_assoc=debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    cli.execute()
}
