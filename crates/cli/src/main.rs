//! NEXX CLI - data directory setup and staff account management.
//!
//! # Usage
//!
//! ```bash
//! # Create the data directory with every collection file
//! nexx-cli init --data-dir ./data
//!
//! # Same, and load the demo JCB catalog
//! nexx-cli init --data-dir ./data --seed
//!
//! # Create a staff account
//! nexx-cli admin create -u admin -e admin@nexx.ru -n "Администратор" -p 'S3cret!pass' -r admin
//! ```
//!
//! `--data-dir` falls back to `DATA_DIR` (also read from `.env`), then `./data`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use nexx_core::UserRole;

mod commands;

#[derive(Parser)]
#[command(name = "nexx-cli")]
#[command(author, version, about = "NEXX store operator tools")]
struct Cli {
    /// Data directory holding the JSON collections
    #[arg(long, global = true, env = "DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and its collection files
    Init {
        /// Load the demo catalog
        #[arg(long)]
        seed: bool,
    },
    /// Manage staff accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a staff account with a password
    Create {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        password: String,

        #[arg(short, long, value_enum, default_value_t = StaffRole::Admin)]
        role: StaffRole,
    },
}

/// Roles that can be granted from the command line.
#[derive(Clone, Copy, ValueEnum)]
enum StaffRole {
    Manager,
    Admin,
}

impl From<StaffRole> for UserRole {
    fn from(role: StaffRole) -> Self {
        match role {
            StaffRole::Manager => Self::Manager,
            StaffRole::Admin => Self::Admin,
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Init { seed } => {
            let db = commands::seed::init(&cli.data_dir).await?;
            if seed {
                commands::seed::demo_catalog(&db).await?;
            }
        }
        Commands::Admin { action } => match action {
            AdminAction::Create {
                username,
                email,
                name,
                password,
                role,
            } => {
                commands::admin::create_user(
                    &cli.data_dir,
                    commands::admin::NewStaff {
                        username,
                        email,
                        name,
                        password,
                        role: role.into(),
                    },
                )
                .await?;
            }
        },
    }
    Ok(())
}
