use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use transito::cli;

#[derive(Debug, Parser)]
#[command(name = "transito")]
#[command(about = "Normalized Waze traffic feeds from the MG infrastructure observatory GIS")]
#[command(version)]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch a layer end to end and emit its records
    Fetch {
        /// Layer to fetch: alerts, congestion
        #[arg(long, default_value = "alerts")]
        layer: String,
        /// Output format: json (default), csv
        #[arg(long, default_value = "json")]
        format: String,
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Skip normalization and the display projection; emit raw service fields
        #[arg(long)]
        raw: bool,
    },
    /// Fetch a layer and print value counts for a field
    Stats {
        /// Layer to fetch: alerts, congestion
        #[arg(long, default_value = "alerts")]
        layer: String,
        /// Keep only records with this translated alert type (alerts layer)
        #[arg(long)]
        tipo: Option<String>,
        /// Keep only records with this translated alert subtype (alerts layer)
        #[arg(long)]
        subtipo: Option<String>,
        /// Keep only records from this administrative region
        #[arg(long)]
        regional: Option<String>,
        /// Field to group by (default: the layer's headline field)
        #[arg(long)]
        by: Option<String>,
        /// Show only the top N values
        #[arg(long)]
        top: Option<usize>,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Check config, credentials, portal and layer reachability
    Health,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective (merged) configuration
    Show,
    /// Write the annotated default config to ~/.transito/config.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Set a config value by dotted key, e.g. `query.page_size 500`
    Set { key: String, value: String },
    /// Reset the global config file to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        Commands::Fetch {
            layer,
            format,
            output,
            raw,
        } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_fetch(&layer, fmt, output.as_deref(), raw)
        }
        Commands::Stats {
            layer,
            tipo,
            subtipo,
            regional,
            by,
            top,
            format,
        } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            let filter = cli::StatsFilter {
                tipo,
                subtipo,
                regional,
            };
            cli::run_stats(&layer, &filter, by.as_deref(), top, fmt)
        }
        Commands::Health => cli::run_health(),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
