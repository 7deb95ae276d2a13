//! Cardgate CLI - Main entry point

use cardgate_cli::{commands, AppContext};
use cardgate_core::HoldStatus;
use cardgate_engine::AuthorizationConfig;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cardgate")]
#[command(about = "Cardgate - card transaction authorization center", long_about = None)]
struct Cli {
    /// Data directory path
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    /// Optional JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process an authorization request from a JSON file
    Authorize {
        /// Path to the AuthorizationRequest JSON
        file: PathBuf,
        /// Idempotency key: repeated submissions return the same decision
        #[arg(long)]
        idempotency_key: Option<String>,
    },

    /// Show a decision by its id
    Decision {
        decision_id: i64,
    },

    /// Show the decision for a request
    DecisionForRequest {
        request_id: i64,
    },

    /// Reverse an approved authorization
    Reverse {
        request_id: i64,
        /// Reason recorded on the reversal
        #[arg(long, default_value = "reversed by operator")]
        reason: String,
    },

    /// Complete a pending 3-DS challenge
    ChallengeComplete {
        request_id: i64,
        /// Challenge result; "SUCCESS" approves, anything else declines
        #[arg(long, default_value = "SUCCESS")]
        result: String,
    },

    /// Show a hold by its id
    Hold {
        hold_id: i64,
    },

    /// List holds for an account
    Holds {
        account_id: i64,
        /// Filter by status (ACTIVE, CAPTURED, RELEASED, EXPIRED)
        #[arg(long)]
        status: Option<String>,
    },

    /// Capture a hold (fully or partially)
    Capture {
        hold_id: i64,
        amount: Decimal,
        /// Operation key for idempotent retries
        #[arg(long)]
        operation_key: Option<String>,
    },

    /// Release a hold back to available balance
    Release {
        hold_id: i64,
        /// Operation key for idempotent retries
        #[arg(long)]
        operation_key: Option<String>,
    },

    /// Release expired holds
    Sweep {
        /// Keep sweeping on the configured cadence
        #[arg(long)]
        watch: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AuthorizationConfig::from_file(path)?,
        None => AuthorizationConfig::default(),
    };

    let ctx = AppContext::new(&cli.data, config).await?;

    match cli.command {
        Commands::Authorize {
            file,
            idempotency_key,
        } => {
            commands::authorize(&ctx, &file, idempotency_key.as_deref()).await?;
        }

        Commands::Decision { decision_id } => {
            commands::decision(&ctx, decision_id).await?;
        }

        Commands::DecisionForRequest { request_id } => {
            commands::decision_for_request(&ctx, request_id).await?;
        }

        Commands::Reverse { request_id, reason } => {
            commands::reverse(&ctx, request_id, &reason).await?;
        }

        Commands::ChallengeComplete { request_id, result } => {
            commands::challenge_complete(&ctx, request_id, &result).await?;
        }

        Commands::Hold { hold_id } => {
            commands::hold(&ctx, hold_id).await?;
        }

        Commands::Holds { account_id, status } => {
            let status = status
                .as_deref()
                .map(str::parse::<HoldStatus>)
                .transpose()
                .map_err(|e| anyhow::anyhow!(e))?;
            commands::holds(&ctx, account_id, status).await?;
        }

        Commands::Capture {
            hold_id,
            amount,
            operation_key,
        } => {
            commands::capture(&ctx, hold_id, amount, operation_key.as_deref()).await?;
        }

        Commands::Release {
            hold_id,
            operation_key,
        } => {
            commands::release(&ctx, hold_id, operation_key.as_deref()).await?;
        }

        Commands::Sweep { watch } => {
            commands::sweep(&ctx, watch).await?;
        }
    }

    Ok(())
}
