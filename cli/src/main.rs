//! vaultferry CLI — bulk import and migrate records in a tokenization vault.
//!
//! Usage:
//! ```bash
//! # Insert every record of a dataset file into `persons`
//! vaultferry import --file vault_data.json --table persons
//!
//! # Copy column `ssn` into `ssn_v2` for every record of `customers`
//! vaultferry copy-column --table customers --from ssn --to ssn_v2
//!
//! # Copy columns `ssn` and `name` of `legacy` into new records of `modern`
//! vaultferry copy-table --from-table legacy --columns ssn,name --to-table modern
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use vaultferry_core::dataset::{load_records, DEFAULT_DATASET_KEY};
use vaultferry_core::policy::{RateLimiterConfig, RetryConfig};
use vaultferry_core::{
    copy_column, copy_table, import_records, AuthHeaderProvider, MigrationReport, TokenPolicy,
    VaultClient, VaultConfig,
};
use vaultferry_http::{HttpClientConfig, HttpVaultClient, ServiceAccountTokenSource};

mod logging;

use logging::{init_tracing, LogConfig};

#[derive(Parser)]
#[command(
    name = "vaultferry",
    about = "Bulk import and migrate records in a tokenization vault",
    long_about = "
Batch-transfer records into, across columns of, and across tables of a vault
through its HTTP API, 25 records per request.

ENVIRONMENT VARIABLES:
  VAULT_URL            Vault host, e.g. https://abc123.vault.skyflowapis.com
  VAULT_ID             Vault identifier
  SERVICE_ACCOUNT_KEY  Service account credential JSON, or a path to it
",
    version
)]
struct Cli {
    #[command(flatten)]
    opts: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalOpts {
    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit JSON logs
    #[arg(long, global = true)]
    json_logs: bool,

    /// Mint a new bearer token for every request instead of caching it
    #[arg(long, global = true)]
    mint_per_call: bool,

    /// Requests allowed per rate-limit window
    #[arg(long, global = true, default_value_t = 80)]
    max_requests: usize,

    /// Rate-limit window in seconds
    #[arg(long, global = true, default_value_t = 60)]
    window_secs: u64,

    /// Retries for transient failures
    #[arg(long, global = true, default_value_t = 10)]
    max_retries: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert the records of a JSON dataset into a table
    Import {
        /// Path to the dataset file
        #[arg(short, long)]
        file: PathBuf,
        /// Destination table
        #[arg(short, long)]
        table: String,
        /// Key of the record array when the dataset is an object
        #[arg(long, default_value = DEFAULT_DATASET_KEY)]
        key: String,
    },
    /// Copy one column's values into another column of the same table
    CopyColumn {
        #[arg(short, long)]
        table: String,
        /// Source column
        #[arg(long)]
        from: String,
        /// Destination column
        #[arg(long)]
        to: String,
    },
    /// Copy columns of every record into new records of another table
    CopyTable {
        #[arg(long)]
        from_table: String,
        /// Comma-separated source columns
        #[arg(long, value_delimiter = ',', required = true)]
        columns: Vec<String>,
        #[arg(long)]
        to_table: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&LogConfig {
        level: cli.opts.log_level.clone(),
        json: cli.opts.json_logs,
    });

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::CopyColumn { from, to, .. } = &cli.command {
        anyhow::ensure!(from != to, "--from and --to must name different columns");
    }

    let config = VaultConfig::from_env().context("reading vault configuration")?;
    let client = build_client(&config, &cli.opts)?;

    let report = match cli.command {
        Commands::Import { file, table, key } => {
            let records = load_records(&file, &key)
                .with_context(|| format!("loading dataset {}", file.display()))?;
            import_records(&client, &table, &records).await?
        }
        Commands::CopyColumn { table, from, to } => copy_column(&client, &table, &from, &to).await?,
        Commands::CopyTable {
            from_table,
            columns,
            to_table,
        } => copy_table(&client, &from_table, &columns, &to_table).await?,
    };

    print_report(&report);
    Ok(())
}

fn build_client(config: &VaultConfig, opts: &GlobalOpts) -> Result<VaultClient> {
    let http_config = HttpClientConfig {
        retry: RetryConfig {
            max_retries: opts.max_retries,
            ..RetryConfig::default()
        },
        rate_limiter: RateLimiterConfig {
            max_requests: opts.max_requests.max(1),
            window: Duration::from_secs(opts.window_secs),
        },
        ..HttpClientConfig::default()
    };
    let transport = HttpVaultClient::new(config.vault_url.clone(), http_config)?;

    let source = ServiceAccountTokenSource::from_json(&config.credentials)
        .context("loading service account credentials")?;
    let policy = if opts.mint_per_call {
        TokenPolicy::MintPerCall
    } else {
        TokenPolicy::default()
    };
    let auth = AuthHeaderProvider::new(Arc::new(source), policy);

    Ok(VaultClient::new(
        Arc::new(transport),
        Arc::new(auth),
        config.api_base(),
    ))
}

fn print_report(report: &MigrationReport) {
    println!("  Requests:        {}", report.requests);
    println!("  Records read:    {}", report.records_read);
    println!("  Records written: {}", report.records_written);
    if report.records_skipped > 0 {
        println!("  Records skipped: {}", report.records_skipped);
    }
    if !report.is_clean() {
        println!("  Failures:        {}", report.failures.len());
        for failure in &report.failures {
            println!("    {:?}: {}", failure.scope, failure.error);
        }
    }
}
