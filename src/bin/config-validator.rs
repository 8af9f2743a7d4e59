//! # Callback Configuration Validator
//!
//! Command-line tool for validating callback configuration files across
//! environments before an application starts dispatching.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use callback_core::config::ConfigManager;
use callback_core::constants::callbacks;
use callback_core::logging::log_error;
use callback_core::CallbackConfig;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "callback-config-validator")]
#[command(about = "Validate callback configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment whose overlay file is applied (development, test, production, ...)
    #[arg(short, long, default_value = "development")]
    environment: String,

    /// Configuration directory path (default: $CALLBACK_CONFIG_DIR or ./config)
    #[arg(short, long, conflicts_with = "file")]
    config_dir: Option<PathBuf>,

    /// Validate a single configuration file instead of a directory
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format (table, json)
    #[arg(long, default_value = "table")]
    format: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load and validate the configuration
    Validate,

    /// Print the effective configuration after all layers are applied
    Show,

    /// List the standard callback channel names
    Channels,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = match &cli.command {
        Some(Commands::Validate) | None => validate(&cli),
        Some(Commands::Show) => show(&cli),
        Some(Commands::Channels) => {
            list_channels();
            Ok(())
        }
    };

    match result {
        Ok(()) => info!("Configuration check completed successfully"),
        Err(e) => {
            log_error("config-validator", "check", &format!("{e:#}"), None);
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
    }
}

fn load(cli: &Cli) -> Result<Arc<ConfigManager>> {
    match &cli.file {
        Some(path) => ConfigManager::load_from_file(path)
            .with_context(|| format!("loading {}", path.display())),
        None => ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), &cli.environment)
            .with_context(|| format!("loading environment '{}'", cli.environment)),
    }
}

fn validate(cli: &Cli) -> Result<()> {
    println!("🔧 Validating Callback Configuration");
    println!("Environment: {}", cli.environment);

    let manager = load(cli)?;
    println!("Config Directory: {}", manager.config_directory().display());
    println!("✅ Configuration loaded and validated");
    println!();

    print_config(manager.config(), &cli.format)
}

fn show(cli: &Cli) -> Result<()> {
    let manager = load(cli)?;
    print_config(manager.config(), &cli.format)
}

fn print_config(config: &CallbackConfig, format: &str) -> Result<()> {
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        "table" => {
            let timeout = config
                .async_bridge
                .response_timeout_ms
                .map_or_else(|| "none (wait forever)".to_string(), |ms| format!("{ms} ms"));
            println!("  async_bridge.response_timeout   {timeout}");
            println!("  stacks.strict_pop               {}", config.stacks.strict_pop);
            println!("  jobs.thread_name_prefix         {}", config.jobs.thread_name_prefix);
            println!(
                "  logging.level                   {}",
                config.logging.level.as_deref().unwrap_or("(environment default)")
            );
            println!("  logging.file_output             {}", config.logging.file_output);
            println!("  logging.log_dir                 {}", config.logging.log_dir.display());
        }
        other => bail!("unknown output format '{other}' (expected table or json)"),
    }
    Ok(())
}

fn list_channels() {
    println!("📋 Standard callback channels:");
    for name in callbacks::ALL {
        println!("  • {name}");
    }
}
