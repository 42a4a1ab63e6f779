//! appconf CLI
//!
//! Drives single reconciler operations against an App Configuration store.
//!
//! # Commands
//!
//! - `create` - Create an entry that must not exist yet
//! - `read` - Read a managed entry by identifier
//! - `update` - Overwrite the value of a managed entry
//! - `delete` - Delete a managed entry
//! - `import` - Adopt an existing entry by identifier
//! - `lookup` - Read any entry by endpoint, label and key

mod commands;

use appconf_client::{
    AnonymousAuthorizer, Authorizer, BearerTokenAuthorizer, ClientConfig, ClientRegistry,
};
use appconf_core::{Label, LABEL_NONE};
use appconf_reconciler::Reconciler;
use clap::{Parser, Subcommand};
use commands::{Format, Kind};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Reconcile App Configuration entries from the command line.
#[derive(Parser)]
#[command(name = "appconf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Store endpoint, e.g. https://my-store.azconfig.io
    #[arg(global = true, short, long, env = "AKC_ENDPOINT")]
    endpoint: Option<String>,

    /// Bearer token sent with every request
    #[arg(global = true, long, env = "AKC_BEARER_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Request timeout in seconds
    #[arg(global = true, long, default_value = "30")]
    timeout: u64,

    /// Output format
    #[arg(global = true, short, long, value_enum, default_value = "text")]
    format: Format,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an entry that must not exist yet
    Create {
        /// Entry kind
        #[arg(short, long, value_enum, default_value = "key-value")]
        kind: Kind,

        /// Key (feature name for flags)
        #[arg(long)]
        key: String,

        /// Label; %00 means no label
        #[arg(short, long, default_value = LABEL_NONE)]
        label: String,

        /// Value, secret locator, or feature description
        #[arg(long)]
        value: Option<String>,

        /// Enable the feature flag
        #[arg(long)]
        enabled: bool,

        /// Drop the secret version so the reference tracks the latest one
        #[arg(long)]
        latest_version: bool,
    },

    /// Read a managed entry by identifier
    Read {
        /// Entry identifier (host/label/key or host/feature/label/name)
        id: String,

        /// Entry kind; defaults to feature for feature identifiers, key-value otherwise
        #[arg(short, long, value_enum)]
        kind: Option<Kind>,
    },

    /// Overwrite the value of a managed entry
    Update {
        /// Entry identifier
        id: String,

        /// Entry kind
        #[arg(short, long, value_enum, default_value = "key-value")]
        kind: Kind,

        /// Value, secret locator, or feature description
        #[arg(long)]
        value: Option<String>,

        /// Enable the feature flag
        #[arg(long)]
        enabled: bool,

        /// Drop the secret version so the reference tracks the latest one
        #[arg(long)]
        latest_version: bool,
    },

    /// Delete a managed entry
    Delete {
        /// Entry identifier
        id: String,
    },

    /// Adopt an existing entry by identifier
    Import {
        /// Entry identifier
        id: String,

        /// Entry kind; defaults to feature for feature identifiers, key-value otherwise
        #[arg(short, long, value_enum)]
        kind: Option<Kind>,
    },

    /// Read any entry by endpoint, label and key
    Lookup {
        /// Entry kind
        #[arg(short, long, value_enum, default_value = "key-value")]
        kind: Kind,

        /// Key (feature name for flags)
        #[arg(long)]
        key: String,

        /// Label; %00 means no label
        #[arg(short, long, default_value = LABEL_NONE)]
        label: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let authorizer: Arc<dyn Authorizer> = match cli.token {
        Some(token) => Arc::new(BearerTokenAuthorizer::new(token)),
        None => Arc::new(AnonymousAuthorizer),
    };
    let config = ClientConfig::new().with_timeout(Duration::from_secs(cli.timeout));
    let reconciler = Reconciler::new(Arc::new(ClientRegistry::with_authorizer(authorizer, config)));
    let format = cli.format;

    match cli.command {
        Commands::Create {
            kind,
            key,
            label,
            value,
            enabled,
            latest_version,
        } => {
            let endpoint = cli.endpoint.ok_or("Endpoint required for create")?;
            let payload = commands::write::payload(kind, value, enabled, latest_version)?;
            commands::write::create(&reconciler, &endpoint, Label::new(label), &key, payload, format)?;
        }
        Commands::Read { id, kind } => {
            commands::read::read(&reconciler, &id, kind, format)?;
        }
        Commands::Update {
            id,
            kind,
            value,
            enabled,
            latest_version,
        } => {
            let payload = commands::write::payload(kind, value, enabled, latest_version)?;
            commands::write::update(&reconciler, &id, payload, format)?;
        }
        Commands::Delete { id } => {
            commands::delete::run(&reconciler, &id)?;
        }
        Commands::Import { id, kind } => {
            commands::read::import(&reconciler, &id, kind, format)?;
        }
        Commands::Lookup { kind, key, label } => {
            let endpoint = cli.endpoint.ok_or("Endpoint required for lookup")?;
            commands::lookup::run(&reconciler, &endpoint, &Label::new(label), &key, kind, format)?;
        }
        Commands::Version => {
            println!("appconf CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
