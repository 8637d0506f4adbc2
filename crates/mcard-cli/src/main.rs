//! # mcard CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mcard_cli::link::{run_link, LinkArgs};
use mcard_cli::render::{run_render, RenderArgs};
use mcard_cli::template::{run_template, TemplateArgs};

/// Membership card tooling.
///
/// Renders certificates, builds notification links, and checks
/// certificate templates without a running service.
#[derive(Parser, Debug)]
#[command(name = "mcard", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a certificate PDF from a credential record JSON file.
    Render(RenderArgs),

    /// Build the notification link for a member.
    Link(LinkArgs),

    /// Show or validate certificate templates.
    Template(TemplateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Render(args) => run_render(args),
        Commands::Link(args) => run_link(args),
        Commands::Template(args) => run_template(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
