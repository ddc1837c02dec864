mod commands;

use clap::{Parser, ValueEnum};
use colored::Colorize;

/// Exit status for a malformed invocation.
const USAGE_EXIT_STATUS: i32 = 22;

#[derive(Parser)]
#[command(name = "encamp")]
#[command(version)]
#[command(about = "Provision or tear down a tag-identified cloud assembly")]
#[command(long_about = "encamp takes a single identifier and provisions a complete \
cloud assembly under it: a virtual network with subnets, security perimeters, a \
bastion/NAT host and cluster workers, every resource tagged 'eg-id' with the \
identifier. Re-running with the same identifier re-discovers what already exists. \
Pass the word 'delete' after the identifier to remove all of it again.")]
struct Cli {
    /// Identifier for every resource of the assembly (the 'eg-id' tag value)
    id: String,

    /// Pass 'delete' to remove the assembly instead of provisioning it
    #[arg(value_enum)]
    mode: Option<Mode>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Remove every resource identified by the id
    Delete,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            // help and version requests are not malformed invocations
            let _ = error.print();
            match error.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    std::process::exit(0)
                }
                _ => std::process::exit(USAGE_EXIT_STATUS),
            }
        }
    };

    let result = match cli.mode {
        Some(Mode::Delete) => commands::down::handle(&cli.id).await,
        None => commands::up::handle(&cli.id).await,
    };

    if let Err(error) = result {
        eprintln!("{} {error:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
