//! Main entry point for the GFS command-line client.

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use shared::config::{LoadPolicy, client::ClientConfig};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod context;

use commands::{
    fetch::FetchArgs,
    session::{CreateAdminArgs, CredentialArgs, PasswordArgs},
};
use context::Context;

/// GFS CLI
#[derive(Parser)]
#[command(name = "gfs")]
#[command(about = "Command-line client for the GFS API", long_about = None)]
struct Cli {
    /// Path to a YAML or JSON configuration file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Keep the session in memory only; nothing is read from or written to disk
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Subcommands for the GFS CLI
#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login(CredentialArgs),
    /// Create a regular account
    Signup(CredentialArgs),
    /// Show the stored session without contacting the server
    Whoami,
    /// Sign out and remove the stored session
    Logout,
    /// Send an authenticated request and print the response
    Fetch(FetchArgs),
    /// Change the signed-in user's password
    ChangePassword(PasswordArgs),
    /// Create an admin account (requires an admin session)
    CreateAdmin(CreateAdminArgs),
    /// Generate a configuration file
    Config {
        /// Format of the configuration file to generate (yaml or json). Defaults to yaml.
        #[arg(long, short)]
        format: Option<String>,
    },
    /// Generate shell completion scripts for the CLI
    Completion {
        /// The shell type (bash, zsh, fish, powershell, elvish)
        #[arg(long, short)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Config { format } => {
            let format = format.unwrap_or_else(|| "yaml".to_string());
            return commands::config::generate_config(&format);
        }
        Commands::Completion { shell } => {
            commands::completion::generate_completion(shell);
            return Ok(());
        }
        _ => {}
    }

    let mut config = ClientConfig::load_config(cli.config)?;
    if matches!(cli.command, Commands::Logout) {
        // Logout must be able to discard a session that no longer parses.
        config.load_policy = LoadPolicy::Lenient;
    }
    config
        .validate()
        .map_err(|errors| anyhow!("invalid configuration: {}", errors.join("; ")))?;
    init_tracing(&config.log_level);

    let ctx = Context::build(config, cli.ephemeral)?;
    match cli.command {
        Commands::Login(args) => commands::session::login(&ctx, args).await,
        Commands::Signup(args) => commands::session::signup(&ctx, args).await,
        Commands::Whoami => {
            commands::session::whoami(&ctx);
            Ok(())
        }
        Commands::Logout => commands::session::logout(&ctx).await,
        Commands::Fetch(args) => commands::fetch::fetch(&ctx, args).await,
        Commands::ChangePassword(args) => commands::session::change_password(&ctx, args).await,
        Commands::CreateAdmin(args) => commands::session::create_admin(&ctx, args).await,
        Commands::Config { .. } | Commands::Completion { .. } => Ok(()),
    }
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();
}
