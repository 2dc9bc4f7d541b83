//! Plugstore CLI
//!
//! Operator tool for inspecting and editing plugin storage with the same
//! backend resolution a host process would use.
//!
//! # Usage
//!
//! ```bash
//! # Which backend does this environment resolve to?
//! plugstore backend
//!
//! # Read and write records
//! plugstore set attendance --table records user:1 '{"streak":3}'
//! plugstore get attendance --table records user:1
//! plugstore patch attendance --table records user:1 '{"best":7}'
//! plugstore list attendance --table records
//! plugstore delete attendance --table records user:1
//! ```

use anyhow::{bail, Context};
use clap::builder::NonEmptyStringValueParser;
use clap::{Args, Parser, Subcommand};
use plugstore::{StorageConfig, StorageService, Store, Value};

/// Application name
const APP_NAME: &str = "plugstore";

/// Application version
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// CLI
// =============================================================================

/// Namespaced key-value storage for plugins
#[derive(Parser, Debug)]
#[command(name = APP_NAME)]
#[command(about = "Inspect and edit plugin storage")]
#[command(version)]
struct Cli {
    /// Enable verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Override the file backend data directory
    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Which store a command addresses
#[derive(Args, Debug)]
struct Target {
    /// Plugin namespace
    namespace: String,

    /// Sub-table inside the namespace
    #[arg(short, long)]
    table: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the resolved backend
    Backend,
    /// Print one value
    Get {
        #[command(flatten)]
        target: Target,
        /// Record key
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        key: String,
    },
    /// Store a JSON value
    Set {
        #[command(flatten)]
        target: Target,
        /// Record key
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        key: String,
        /// JSON value; bare words are stored as strings
        value: String,
    },
    /// Remove a key
    Delete {
        #[command(flatten)]
        target: Target,
        /// Record key
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        key: String,
    },
    /// Print every record in a table
    List {
        #[command(flatten)]
        target: Target,
    },
    /// Shallow-merge a JSON object into a record
    Patch {
        #[command(flatten)]
        target: Target,
        /// Record key
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        key: String,
        /// JSON object to merge
        partial: String,
    },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn,plugstore=info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("{} v{}", APP_NAME, APP_VERSION);

    let mut config = StorageConfig::from_env();
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(shellexpand::tilde(dir).into_owned());
    }
    let service = StorageService::new(config);

    let result = run(&service, cli.command).await;
    service.close().await;
    result
}

async fn run(service: &StorageService, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Backend => {
            let kind = service
                .backend_kind()
                .await
                .context("no storage backend available")?;
            println!("{kind}");
        }
        Commands::Get { target, key } => {
            let store = open(service, &target)?;
            match store.get(&key).await {
                Some(value) => print_json(&value)?,
                None => bail!("{} has no key {key:?}", store.physical_name()),
            }
        }
        Commands::Set { target, key, value } => {
            let store = open(service, &target)?;
            write(&store, &key, parse_value(&value)).await?;
        }
        Commands::Delete { target, key } => {
            let store = open(service, &target)?;
            remove(&store, &key).await?;
        }
        Commands::List { target } => {
            let store = open(service, &target)?;
            let all: serde_json::Map<String, Value> = store.get_all().await.into_iter().collect();
            print_json(&Value::Object(all))?;
        }
        Commands::Patch {
            target,
            key,
            partial,
        } => {
            let store = open(service, &target)?;
            let partial: Value =
                serde_json::from_str(&partial).context("patch must be a JSON object")?;
            match store.patch(&key, partial).await {
                Some(merged) => print_json(&merged)?,
                None => bail!("patch of {}/{key} failed", store.physical_name()),
            }
        }
    }

    Ok(())
}

fn open(service: &StorageService, target: &Target) -> anyhow::Result<Store> {
    let store = service.create_store(&target.namespace)?;
    match &target.table {
        Some(name) => Ok(store.table(name)?),
        None => Ok(store),
    }
}

/// Set and read back. The façade logs failures instead of returning them.
async fn write(store: &Store, key: &str, value: Value) -> anyhow::Result<()> {
    store.set(key, value.clone()).await;
    match store.get(key).await {
        Some(stored) if stored == value => Ok(()),
        _ => bail!("set of {}/{key} failed", store.physical_name()),
    }
}

/// Delete and check the key is gone.
async fn remove(store: &Store, key: &str) -> anyhow::Result<()> {
    store.delete(key).await;
    if store.has(key).await {
        bail!("delete of {}/{key} failed", store.physical_name());
    }
    Ok(())
}

/// Parse as JSON, falling back to a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
