//! fleetlink CLI - device synchronization runner
//!
//! Drives reconciliation runs against the configured inventory store,
//! device-authentication service, and hub provider integrations.

use clap::{Parser, Subcommand};

mod commands;
mod config;
mod error;
mod logging;

use error::CliResult;

/// fleetlink - IoT device state synchronization
#[derive(Parser)]
#[command(name = "fleetlink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile device state across the inventory, the
    /// device-authentication service, and the hub providers
    Sync(commands::sync::SyncArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            e.print();
            e.exit_code()
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> CliResult<i32> {
    match cli.command {
        Commands::Sync(args) => commands::sync::execute(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_flags() {
        let cli = Cli::try_parse_from([
            "fleetlink",
            "sync",
            "--batch-size",
            "10",
            "--fail-early",
            "--tenant",
            "TestSync01",
            "--tenant",
            "TestSync02",
        ])
        .unwrap();
        let Commands::Sync(args) = cli.command;
        assert_eq!(args.batch_size, Some(10));
        assert!(args.fail_early);
        assert_eq!(args.tenants, vec!["TestSync01", "TestSync02"]);
    }

    #[test]
    fn test_sync_defaults() {
        let cli = Cli::try_parse_from(["fleetlink", "sync"]).unwrap();
        let Commands::Sync(args) = cli.command;
        assert_eq!(args.batch_size, None);
        assert!(!args.fail_early);
        assert!(args.tenants.is_empty());
        assert_eq!(args.tenant_parallelism, 1);
    }

    #[test]
    fn test_rejects_invalid_batch_size() {
        assert!(Cli::try_parse_from(["fleetlink", "sync", "--batch-size", "x"]).is_err());
    }
}
