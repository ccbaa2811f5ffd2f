//! Command line entry points

pub mod check;
pub mod serve;

use clap::{Args, Parser, Subcommand};

/// Inkwell CMS - cache-coherent content backend
#[derive(Parser)]
#[command(name = "inkwell-cms")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeArgs),

    /// Connect to the configured cache and store, report their health and exit
    Check,
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Overrides `server.host`
    #[arg(long)]
    pub host: Option<String>,

    /// Overrides `server.port`
    #[arg(long)]
    pub port: Option<u16>,
}
