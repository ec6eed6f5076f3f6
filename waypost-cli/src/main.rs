//! Waypost CLI
//!
//! Demo binary for the Waypost discovery toolkit.
//!
//! # Usage
//!
//! ```bash
//! # First-time interactive sign-in (loopback redirect listener)
//! waypost sign-in --scopes "Files.Read Files.Write"
//!
//! # List the capability endpoints available for a resource
//! waypost services Example.Discovery
//!
//! # Print the endpoint behind one well-known capability
//! waypost endpoint Example.Discovery --capability MyFiles
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use waypost_core::{
    find_capability, scopes, AccountType, DiscoveryClient, InteractiveAuthBroker,
    LoopbackSurface, SignInStrategy, TokenProvider, WaypostError,
};

mod config;
mod credentials;

use config::{load_config, CliConfig};
use credentials::StaticCredentials;

#[derive(Parser)]
#[command(name = "waypost")]
#[command(about = "Authenticated service discovery client")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to the platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the first-time interactive sign-in
    SignIn {
        /// Scopes to request (space-separated)
        #[arg(short, long)]
        scopes: String,

        /// Redirect URI to listen on (defaults to the configured one)
        #[arg(long)]
        redirect_uri: Option<String>,
    },

    /// List the capability endpoints available for a resource
    Services {
        /// Resource id to acquire the discovery token for
        resource: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the endpoint behind one well-known capability
    Endpoint {
        /// Resource id to acquire the discovery token for
        resource: String,

        /// Capability name to select
        #[arg(long, default_value = scopes::MY_FILES_CAPABILITY)]
        capability: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let client = build_client(&config)?;

    match cli.command {
        Commands::SignIn { scopes, redirect_uri } => {
            sign_in(&client, &scopes, redirect_uri.as_deref()).await
        }
        Commands::Services { resource, format } => services(&client, &resource, &format).await,
        Commands::Endpoint { resource, capability } => {
            endpoint(&client, &resource, &capability).await
        }
    }
}

fn build_client(config: &CliConfig) -> Result<DiscoveryClient> {
    let credentials = Arc::new(StaticCredentials::new(
        config.client_id.as_str(),
        config.authority.as_str(),
        config.tokens.clone(),
    ));

    let provider = TokenProvider::new(
        config.client_id.as_str(),
        config.authority.as_str(),
        config.redirect_uri.as_str(),
        credentials.clone(),
        credentials,
    );

    let surface = LoopbackSurface::new(&config.redirect_uri)
        .with_context(|| format!("invalid redirect_uri {:?} in config", config.redirect_uri))?
        .with_announcer(|uri| {
            println!("Visit this URL in your browser to continue sign-in:\n\n  {uri}\n");
        });
    let broker = InteractiveAuthBroker::new(SignInStrategy::Popup(Arc::new(surface)));

    Ok(
        DiscoveryClient::new(config.discovery_uri.clone(), provider, broker)
            .with_redirect_uri(config.redirect_uri.clone()),
    )
}

async fn sign_in(
    client: &DiscoveryClient,
    scopes: &str,
    redirect_uri: Option<&str>,
) -> Result<()> {
    let payload = client.first_sign_in(scopes, redirect_uri).await?;

    println!("Signed in as: {}", payload.user_email);
    match AccountType::from_code(payload.account_type) {
        Some(AccountType::Personal) => println!("Account type:  personal"),
        Some(AccountType::Organizational) => println!("Account type:  organizational"),
        None => println!("Account type:  unknown ({})", payload.account_type),
    }
    println!("Granted scope: {}", payload.scope);
    if !payload.unsupported_scope.is_empty() {
        println!("Unsupported:   {}", payload.unsupported_scope);
    }
    println!("Authorization: {}", payload.authorization_service_uri);
    println!("Token service: {}", payload.token_service_uri);
    println!("Discovery:     {}", payload.discovery_service_uri);
    println!("Discovery id:  {}", payload.discovery_resource_id);

    Ok(())
}

async fn services(client: &DiscoveryClient, resource: &str, format: &str) -> Result<()> {
    let capabilities = client.services(resource).await?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&capabilities)?),
        _ => {
            if capabilities.is_empty() {
                println!("No capabilities advertised for {resource}");
            }
            for capability in capabilities {
                println!(
                    "{:<12} {} ({})",
                    capability.capability, capability.endpoint_uri, capability.name
                );
            }
        }
    }

    Ok(())
}

async fn endpoint(client: &DiscoveryClient, resource: &str, capability: &str) -> Result<()> {
    let capabilities = client.services(resource).await?;

    let found = find_capability(&capabilities, capability).ok_or_else(|| {
        WaypostError::CapabilityNotFound {
            name: capability.to_string(),
        }
    })?;

    println!("Endpoint:    {}", found.endpoint_uri);
    println!("Resource id: {}", found.resource_id);

    Ok(())
}
