mod api;
mod app;
mod auth;
mod cli;
mod config;
mod http;
mod logging;
mod paths;
#[cfg(test)]
mod test_server;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    if let Err(err) = logging::init() {
        eprintln!("warning: logging disabled: {err:#}");
    }
    app::run(cli)
}
