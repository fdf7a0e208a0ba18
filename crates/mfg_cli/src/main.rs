//! Operator CLI for the ingestion/traceability core. The only command
//! is tenant + API-key bootstrap; everything else is driven over the
//! HTTP surface an external transport layer exposes.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use mfg_auth::{bootstrap_tenant_api_key, BootstrapError};
use mfg_db::{create_pool, DbConfig, MfgDb};
use mfg_logging::LogConfig;
use mfg_protocol::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "mfg_cli", about = "Operator CLI for the ingestion/traceability core")]
struct Cli {
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a tenant (failing if the code is taken) and print its
    /// first API key. The raw key is shown exactly once.
    BootstrapTenantApiKey {
        #[arg(long)]
        tenant_code: String,
        #[arg(long)]
        label: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // clap's own usage-error exit code (2) would collide with this
    // CLI's "database unreachable" (2), so parse errors are mapped to
    // misuse (1) here instead of letting `Cli::parse()` call `exit()`.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(1);
        }
    };

    if let Err(err) = mfg_logging::init_logging(LogConfig {
        app_name: "mfg_cli",
        verbose: cli.verbose,
        tui_mode: false,
    }) {
        eprintln!("warning: failed to initialize logging: {err}");
    }

    match cli.command {
        Command::BootstrapTenantApiKey { tenant_code, label } => {
            run_bootstrap(&tenant_code, &label).await
        }
    }
}

async fn run_bootstrap(tenant_code: &str, label: &str) -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::from(1);
        }
    };

    let pool = match create_pool(DbConfig::from_app_config(&config)).await {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("database unreachable: {err}");
            return ExitCode::from(2);
        }
    };
    let db = MfgDb::new(pool);

    match bootstrap_tenant_api_key(&db, config.auth_hmac_secret.as_bytes(), tenant_code, label).await {
        Ok(key) => {
            println!("tenant_id: {}", key.tenant_id);
            println!("api_key_id: {}", key.api_key_id);
            println!("raw_key: {}", key.raw_key);
            ExitCode::SUCCESS
        }
        Err(BootstrapError::TenantExists(code)) => {
            eprintln!("tenant {code:?} already exists");
            ExitCode::from(3)
        }
        Err(BootstrapError::Db(err)) => {
            eprintln!("database error: {err}");
            ExitCode::from(2)
        }
    }
}
