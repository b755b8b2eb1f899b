//! TeamSpirit CLI - database migrations and association management.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! ts-cli migrate
//!
//! # Create a member account (starts with the member role)
//! ts-cli member create -e jean.dupont@example.org -f Jean -l Dupont -p 'motdepasse'
//!
//! # Give a member an office in the association
//! ts-cli role assign -e jean.dupont@example.org -r treasurer
//!
//! # Load a demo catalog, venue, event and weekly training
//! ts-cli seed --trainer jean.dupont@example.org
//! ```
//!
//! # Environment Variables
//!
//! - `TEAMSPIRIT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ts-cli")]
#[command(author, version, about = "TeamSpirit CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage member accounts
    Member {
        #[command(subcommand)]
        action: MemberAction,
    },
    /// Manage association roles
    Role {
        #[command(subcommand)]
        action: RoleAction,
    },
    /// Seed the database with demo data
    Seed {
        /// Email of the member leading the demo training
        #[arg(short, long)]
        trainer: Option<String>,
    },
}

#[derive(Subcommand)]
enum MemberAction {
    /// Create a new member account
    Create {
        /// Login email address
        #[arg(short, long)]
        email: String,

        /// First name
        #[arg(short, long)]
        first_name: String,

        /// Last name
        #[arg(short, long)]
        last_name: String,

        /// Initial password
        #[arg(short, long)]
        password: String,

        /// Grant access to the back office
        #[arg(long)]
        staff: bool,
    },
}

#[derive(Subcommand)]
enum RoleAction {
    /// Replace a member's role
    Assign {
        /// Member email address
        #[arg(short, long)]
        email: String,

        /// Role (`member`, `secretary`, `treasurer`, `president`, `inactive`)
        #[arg(short, long)]
        role: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Member { action } => match action {
            MemberAction::Create {
                email,
                first_name,
                last_name,
                password,
                staff,
            } => {
                commands::member::create(&email, &first_name, &last_name, &password, staff).await?;
            }
        },
        Commands::Role { action } => match action {
            RoleAction::Assign { email, role } => commands::member::assign_role(&email, &role).await?,
        },
        Commands::Seed { trainer } => commands::seed::demo(trainer.as_deref()).await?,
    }
    Ok(())
}
