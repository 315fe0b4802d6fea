pub mod commands;
pub mod context;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use context::Context;

#[derive(Parser)]
#[command(name = "rapido")]
#[command(about = "Rapido CLI - Corporate ride booking from the terminal")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, short = 'y', global = true, help = "Answer yes to confirmation prompts")]
    pub yes: bool,

    #[arg(long, global = true, help = "Backend base URL (overrides RAPIDO_API_URL)")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Sign in, sign out and manage your account")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Book, list and cancel your rides")]
    Rides {
        #[command(subcommand)]
        cmd: commands::rides::RideCommands,
    },

    #[command(about = "Ride approvals, analytics and user management")]
    Admin {
        #[command(subcommand)]
        cmd: commands::admin::AdminCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Failure that has already been shown to the user
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct Reported(pub String);

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let ctx = Context::open(&cli, output_format).await?;

    let result = match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, &ctx).await,
        Commands::Rides { cmd } => commands::rides::handle(cmd, &ctx).await,
        Commands::Admin { cmd } => commands::admin::handle(cmd, &ctx).await,
    };

    result.map_err(|e| report(e, &ctx))
}

/// Print an API failure unless the notifier already did
fn report(err: anyhow::Error, ctx: &Context) -> anyhow::Error {
    let Some(api_error) = err.downcast_ref::<ApiError>() else {
        return err;
    };

    let message = api_error.message().to_string();
    if ctx.output == OutputFormat::Text && ctx.notifier.reported_errors() > 0 {
        return Reported(message).into();
    }
    if let Err(e) = utils::output_error(&ctx.output, &message, Some(api_error.error_code())) {
        return e;
    }
    Reported(message).into()
}
