//! DeviceChain CLI.
//!
//! Installs the DeviceChain control plane (CRDs, RBAC, operator and
//! infrastructure charts) into a Kubernetes cluster and manages instances,
//! tenants and microservices within it.

// Allow product names without backticks in doc comments
#![allow(clippy::doc_markdown)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dcctl::commands::bootstrap::BootstrapCommand;
use dcctl::commands::create::CreateCommand;
use dcctl::commands::install::InstallCommand;
use dcctl::commands::resgen::ResgenCommand;
use dcctl::commands::uninstall::UninstallCommand;
use dcctl::commands::GlobalOptions;

/// DeviceChain - IoT control plane installer.
#[derive(Parser)]
#[command(
    name = "dcctl",
    version,
    about = "DeviceChain command line tool",
    long_about = "Install and manage DeviceChain on Kubernetes.\n\n\
                  Core components and infrastructure are applied in a fixed\n\
                  order; the first failure stops the run and leaves everything\n\
                  applied before it in place."
)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install DeviceChain components.
    #[command(subcommand)]
    Install(InstallCommand),

    /// Uninstall DeviceChain components.
    #[command(subcommand)]
    Uninstall(UninstallCommand),

    /// Create DeviceChain resources.
    #[command(subcommand)]
    Create(CreateCommand),

    /// Generate default configuration resources.
    Resgen(ResgenCommand),

    /// Bootstrap system data.
    Bootstrap(BootstrapCommand),
}

fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "info,dcctl=debug,dc_k8s=debug"
    } else {
        "warn,dcctl=info,dc_k8s=info"
    }
}

/// `RUST_LOG` wins over the `--verbose` defaults when set.
fn log_directives(verbose: bool, rust_log: Option<String>) -> String {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .unwrap_or_else(|| default_directives(verbose).to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let directives = log_directives(cli.verbose, std::env::var(EnvFilter::DEFAULT_ENV).ok());
    let filter = EnvFilter::try_new(directives)
        .unwrap_or_else(|_| EnvFilter::new(default_directives(cli.verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Install(cmd) => cmd.run(&cli.global).await,
        Commands::Uninstall(cmd) => cmd.run(&cli.global).await,
        Commands::Create(cmd) => cmd.run(&cli.global).await,
        Commands::Resgen(cmd) => cmd.run(&cli.global),
        Commands::Bootstrap(cmd) => cmd.run().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_overrides_defaults() {
        assert_eq!(
            log_directives(true, Some("dcctl=trace".into())),
            "dcctl=trace"
        );
        assert_eq!(
            log_directives(false, Some("error".into())),
            "error"
        );
    }

    #[test]
    fn test_defaults_without_rust_log() {
        assert_eq!(log_directives(false, None), "warn,dcctl=info,dc_k8s=info");
        assert_eq!(log_directives(true, Some("  ".into())), "info,dcctl=debug,dc_k8s=debug");
    }

    #[test]
    fn test_cli_parses_verbose_flag() {
        let cli = Cli::try_parse_from(["dcctl", "-v", "uninstall", "infra"]).unwrap();
        assert!(cli.verbose);
    }
}
