use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cfddns::{
    agent::{self, RunOptions, RunOutcome},
    changelog::{ChangeLog, PriorState},
    config::Settings,
    dns::{create_provider, Credentials},
    ip, secrets,
};

#[derive(Parser)]
#[command(name = "cfddns")]
#[command(about = "Dynamic DNS agent - keeps CloudFlare address records in sync")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the current IP and update DNS records if it changed
    Run {
        /// Update the records even if the change log shows no change
        #[arg(long)]
        force: bool,
    },

    /// Show the current IP, the change log and the DNS records without changing anything
    Check,

    /// Show configuration file location and contents
    Config,

    /// Store API credentials for a zone
    SetKey {
        /// Zone name (e.g., example.com)
        zone: String,
    },

    /// Delete stored API credentials for a zone
    DeleteKey {
        /// Zone name (e.g., example.com)
        zone: String,
    },
}

fn init_logging(log_level: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;

            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Settings::config_path);
    let settings = Settings::load_from(&config_path);

    // Initialize logging with config level or default
    let (log_level, log_file) = match &settings {
        Ok(s) => (s.agent.log_level.clone(), s.agent.log_file.clone()),
        Err(_) => ("info".to_string(), None),
    };
    init_logging(&log_level, log_file.as_deref())?;

    match cli.command {
        Commands::Run { force } => {
            let result = match settings {
                Ok(settings) => run(&settings, RunOptions { force }).await,
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                error!("Run failed: {:#}", e);
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Check => {
            let settings = settings?;
            check_status(&settings).await?;
        }

        Commands::Config => {
            show_config(&config_path, &settings)?;
        }

        Commands::SetKey { zone } => {
            use std::io::{self, Write};

            print!("Email: ");
            io::stdout().flush()?;
            let mut email = String::new();
            io::stdin().read_line(&mut email)?;

            let api_key = rpassword::prompt_password("API Key: ")?;

            let credentials = Credentials {
                email: email.trim().to_string(),
                api_key: api_key.trim().to_string(),
            };
            secrets::store_credentials(&zone, &credentials)?;
            println!("Credentials stored for zone: {}", zone);
        }

        Commands::DeleteKey { zone } => {
            secrets::delete_credentials(&zone)?;
            println!("Credentials deleted for zone: {}", zone);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn credentials_for(settings: &Settings) -> Result<Credentials> {
    match &settings.credentials {
        Some(creds) => Ok(creds.clone()),
        None => secrets::get_credentials(&settings.zone.name),
    }
}

async fn run(settings: &Settings, options: RunOptions) -> Result<()> {
    let provider = create_provider(&settings.zone, credentials_for(settings)?, settings.timeout())?;

    match agent::run_once(settings, provider.as_ref(), options).await? {
        RunOutcome::Unchanged(resolved) => {
            info!("Completed, {} is already current", resolved.address);
        }
        RunOutcome::Updated { address, hostnames } => {
            info!(
                "Completed, {} hostnames now point at {}",
                hostnames.len(),
                address.address
            );
        }
    }

    Ok(())
}

async fn check_status(settings: &Settings) -> Result<()> {
    println!("Checking IP address...\n");

    match ip::resolve(&settings.ip, settings.timeout()).await {
        Ok(resolved) => println!("Current IP: {} (from {})", resolved.address, resolved.origin),
        Err(e) => println!("Current IP: Error - {}", e),
    }

    let change_log = ChangeLog::new(&settings.agent.change_log);
    match change_log.read().await {
        Ok(PriorState::Recorded(ip)) => println!("Change log: {}", ip),
        Ok(PriorState::Absent) => println!("Change log: not present"),
        Ok(PriorState::Corrupt) => println!("Change log: corrupt, will be recreated"),
        Err(e) => println!("Change log: Error - {}", e),
    }

    println!("\nChecking DNS records...\n");

    let provider = create_provider(&settings.zone, credentials_for(settings)?, settings.timeout())?;
    let records = match provider.list_records().await {
        Ok(records) => records,
        Err(e) => {
            println!("{}: Error - {}", settings.zone.name, e);
            return Ok(());
        }
    };

    for hostname in &settings.zone.hostnames {
        match records.iter().find(|r| &r.name == hostname) {
            Some(record) => println!(
                "{} ({}): {} -> {}",
                hostname,
                record.record_type.as_deref().unwrap_or("?"),
                record.id,
                record.content.as_deref().unwrap_or("-")
            ),
            None => println!("{}: Error - no record in zone {}", hostname, settings.zone.name),
        }
    }

    Ok(())
}

fn show_config(config_path: &Path, settings: &Result<Settings>) -> Result<()> {
    println!("Configuration file location: {}\n", config_path.display());

    match settings {
        Ok(s) => {
            let mut shown = s.clone();
            if let Some(creds) = shown.credentials.as_mut() {
                creds.api_key = "********".to_string();
            }
            println!("Current configuration:\n");
            println!("{}", toml::to_string_pretty(&shown)?);
        }
        Err(e) => {
            println!("Configuration not usable: {:#}", e);
            println!("\nCreate a configuration file at the location above.");
            println!("Example configuration:\n");
            println!(
                r#"[agent]
log_level = "info"
change_log = "/var/lib/cfddns/last_ip"

[credentials]
email = "you@example.com"
api_key = "your-api-key"

[zone]
name = "example.com"
hostnames = ["example.com", "www"]

[ip]
source = "remote"
resolver_url = "http://icanhazip.com"
"#
            );
        }
    }

    Ok(())
}
