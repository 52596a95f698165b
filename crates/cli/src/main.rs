//! Cluster monitoring CLI
//!
//! A command-line tool for querying metrics, meters and fees from the
//! monitoring server.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{
    meter::{self, PriceArgs},
    query::{self, parse_level, QueryArgs},
    status,
};
use monitor_lib::Level;

/// Cluster monitoring CLI
#[derive(Parser)]
#[command(name = "monctl")]
#[command(author, version, about = "CLI for cluster monitoring and metering", long_about = None)]
pub struct Cli {
    /// Monitoring server URL (can also be set via MONCTL_API_URL env var)
    #[arg(long, env = "MONCTL_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Query metrics for a level (cluster, nodes, workspaces, namespaces,
    /// workloads, pods, containers, persistentvolumeclaims, components)
    Query {
        #[arg(value_parser = parse_level)]
        level: Level,

        #[command(flatten)]
        args: QueryArgs,
    },

    /// Query metered usage and fees for a level (cluster, nodes, workspaces,
    /// namespaces, workloads, pods, persistentvolumeclaims, applications,
    /// services)
    Meter {
        #[arg(value_parser = parse_level)]
        level: Level,

        #[command(flatten)]
        args: QueryArgs,

        #[command(flatten)]
        prices: PriceArgs,
    },

    /// Show server and component health
    Status,

    /// Manage CLI configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the current configuration
    Show,

    /// Update configuration values
    Set {
        #[arg(long)]
        api_url: Option<String>,

        #[arg(long)]
        default_namespace: Option<String>,

        #[arg(long)]
        default_format: Option<output::OutputFormat>,
    },
}

fn update_config(settings: config::Config, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => output::print_json(&settings),
        ConfigCommands::Set {
            api_url,
            default_namespace,
            default_format,
        } => {
            let mut updated = settings;
            if api_url.is_some() {
                updated.api_url = api_url;
            }
            if default_namespace.is_some() {
                updated.default_namespace = default_namespace;
            }
            if let Some(default_format) = default_format {
                updated.default_format = Some(format!("{:?}", default_format).to_lowercase());
            }
            let path = updated.save()?;
            output::print_success(&format!("Configuration saved to {}", path.display()));
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config::Config::load()?;

    let format = cli
        .format
        .or_else(|| settings.default_format.as_deref().and_then(output::OutputFormat::from_name))
        .unwrap_or_default();
    let connect = || client::ApiClient::new(&settings.resolve_api_url(cli.api_url.as_deref()));
    let namespace = settings.default_namespace.as_deref();

    match cli.command {
        Commands::Query { level, args } => {
            let client = connect()?;
            query::run_query(&client, level, args.with_default_namespace(namespace), format).await?;
        }
        Commands::Meter {
            level,
            args,
            prices,
        } => {
            let client = connect()?;
            meter::run_meter(
                &client,
                level,
                args.with_default_namespace(namespace),
                prices,
                format,
            )
            .await?;
        }
        Commands::Status => {
            let client = connect()?;
            status::show_status(&client, format).await?;
        }
        Commands::Config(command) => {
            update_config(settings.clone(), command)?;
        }
    }

    Ok(())
}
