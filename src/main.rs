use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use printhistory::plugin::PrintHistoryPlugin;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Plugin data directory holding config.json and the key material
    #[clap(short, long, default_value = ".printhistory")]
    data_dir: PathBuf,
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory, key material, and a default configuration
    Init,
    /// Print the stored configuration (password masked)
    ShowConfig,
    /// Probe the configured database connection
    TestConnection,
    /// Look up the printer row by identifier
    SelectPrinter {
        /// Identifier; defaults to the one stored in the configuration
        #[clap(short, long)]
        id: Option<i32>,
    },
    /// Insert or update the printer row from the given fields
    UpsertPrinter {
        #[clap(long)]
        name: Option<String>,
        #[clap(long)]
        brand: Option<String>,
        #[clap(long)]
        model: Option<String>,
        #[clap(long)]
        power_consumption: Option<f64>,
        #[clap(long)]
        purchase_price: Option<f64>,
        #[clap(long)]
        estimated_lifespan: Option<f64>,
        #[clap(long)]
        maintenance_costs: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    let mut plugin = PrintHistoryPlugin::new(&args.data_dir);

    match args.command {
        Commands::Init => {
            let config = plugin.startup().await;
            info!(
                "initialized data directory {} (printer_id {})",
                args.data_dir.display(),
                config.printer_id
            );
        }
        Commands::ShowConfig => {
            let mut config = plugin.startup().await;
            if !config.db_password.is_empty() {
                config.db_password = "********".to_string();
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::TestConnection => {
            let config = plugin.startup().await;
            let mut data = Map::new();
            data.insert("db_host".into(), Value::String(config.db_host));
            data.insert("db_user".into(), Value::String(config.db_user));
            data.insert("db_password".into(), Value::String(config.db_password));
            data.insert("db_database".into(), Value::String(config.db_database));
            data.insert("db_port".into(), Value::from(config.db_port));
            let result = plugin.test_connection(&data).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::SelectPrinter { id } => {
            let config = plugin.startup().await;
            let printer_id = id.unwrap_or(config.printer_id);
            let result = plugin.select_printer(printer_id).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::UpsertPrinter {
            name,
            brand,
            model,
            power_consumption,
            purchase_price,
            estimated_lifespan,
            maintenance_costs,
        } => {
            plugin.startup().await;
            let mut data = Map::new();
            let strings = [("name", name), ("brand", brand), ("model", model)];
            for (key, value) in strings {
                if let Some(v) = value {
                    data.insert(format!("printer_{key}"), Value::String(v));
                }
            }
            let numbers = [
                ("power_consumption", power_consumption),
                ("purchase_price", purchase_price),
                ("estimated_lifespan", estimated_lifespan),
                ("maintenance_costs", maintenance_costs),
            ];
            for (key, value) in numbers {
                if let Some(v) = value {
                    data.insert(format!("printer_{key}"), Value::from(v));
                }
            }
            let result = plugin.update_printer(&data).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("sqlx=warn,{}", log_level)))
        .without_time()
        .init();
}
