// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tusk - the asynchronous side-effect pipeline of a federated social server.
//!
//! This is the binary entry point.

mod serve;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

/// Tusk - federated side-effect pipeline.
#[derive(Parser, Debug)]
#[command(name = "tusk", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the pipeline until SIGINT or SIGTERM.
    Serve,
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
    /// Print the most recent dead-lettered messages as JSON lines.
    DeadLetters {
        /// Maximum number of entries to print.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Validate the configuration and print the effective values.
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match tusk_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            tusk_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Config {
            action: ConfigCommands::Check,
        }) => {
            println!(
                "tusk: config ok (server.host={}, workers.count={}, email.enabled={})",
                config.server.host, config.workers.count, config.email.enabled
            );
            Ok(())
        }
        Some(Commands::DeadLetters { limit }) => serve::print_dead_letters(config, limit).await,
        None => {
            println!("tusk: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the stats epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = tusk_config::load_and_validate().expect("default config should be valid");
        assert_eq!(config.server.instance_name, "tusk");
        assert!(config.workers.count >= 1);
    }

    #[test]
    fn cli_parses_nested_subcommands() {
        let cli = Cli::try_parse_from(["tusk", "config", "check"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigCommands::Check
            })
        ));

        let cli = Cli::try_parse_from(["tusk", "dead-letters", "--limit", "5"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::DeadLetters { limit: 5 })));
    }
}
