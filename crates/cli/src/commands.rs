//! CLI commands

use cardgate_core::{Amount, AuthorizationRequest, HoldStatus};
use cardgate_engine::ExpirySweeper;
use rust_decimal::Decimal;
use std::path::Path;

use crate::context::AppContext;

/// Authorize a request read from a JSON file.
pub async fn authorize(
    ctx: &AppContext,
    request_file: &Path,
    idempotency_key: Option<&str>,
) -> Result<(), anyhow::Error> {
    let content = std::fs::read_to_string(request_file)?;
    let request: AuthorizationRequest = serde_json::from_str(&content)?;

    let decision = ctx.authorizer.authorize(request, idempotency_key).await?;

    println!("{}", serde_json::to_string_pretty(&decision)?);
    println!(
        "=> {} [{}] {}",
        decision.decision,
        decision.reason_code.code(),
        decision.reason_message
    );
    Ok(())
}

/// Print a decision by its id.
pub async fn decision(ctx: &AppContext, decision_id: i64) -> Result<(), anyhow::Error> {
    let decision = ctx.authorizer.decision_by_id(decision_id).await?;
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

/// Print the decision for a request.
pub async fn decision_for_request(ctx: &AppContext, request_id: i64) -> Result<(), anyhow::Error> {
    let decision = ctx.authorizer.decision_by_request_id(request_id).await?;
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

/// Reverse an approved authorization.
pub async fn reverse(
    ctx: &AppContext,
    request_id: i64,
    reason: &str,
) -> Result<(), anyhow::Error> {
    let decision = ctx.authorizer.reverse(request_id, reason).await?;
    println!(
        "Reversed request {}: decision {} is now {} [{}]",
        request_id,
        decision.decision_id,
        decision.decision,
        decision.reason_code.code()
    );
    Ok(())
}

/// Complete a pending 3-DS challenge.
pub async fn challenge_complete(
    ctx: &AppContext,
    request_id: i64,
    result: &str,
) -> Result<(), anyhow::Error> {
    let decision = ctx.authorizer.complete_challenge(request_id, result).await?;
    println!(
        "Challenge completed for request {}: {} [{}] {}",
        request_id,
        decision.decision,
        decision.reason_code.code(),
        decision.reason_message
    );
    Ok(())
}

/// Print a hold by its id.
pub async fn hold(ctx: &AppContext, hold_id: i64) -> Result<(), anyhow::Error> {
    let hold = ctx.holds.get(hold_id).await?;
    println!("{}", serde_json::to_string_pretty(&hold)?);
    Ok(())
}

/// List holds for an account, optionally filtered by status.
pub async fn holds(
    ctx: &AppContext,
    account_id: i64,
    status: Option<HoldStatus>,
) -> Result<(), anyhow::Error> {
    let holds = ctx.holds.list_by_account(account_id, status).await?;
    if holds.is_empty() {
        println!("No holds for account {account_id}");
        return Ok(());
    }
    for hold in holds {
        println!(
            "{}  {}  {} {}  captured {}  expires {}",
            hold.hold_id, hold.status, hold.amount, hold.currency, hold.captured_amount,
            hold.expires_at
        );
    }
    Ok(())
}

/// Capture a hold, fully or partially.
pub async fn capture(
    ctx: &AppContext,
    hold_id: i64,
    amount: Decimal,
    operation_key: Option<&str>,
) -> Result<(), anyhow::Error> {
    let amount = Amount::new(amount)?;
    let hold = ctx.holds.capture(hold_id, amount, operation_key).await?;
    println!(
        "Captured {} {} on hold {} (status {})",
        hold.captured_amount, hold.currency, hold.hold_id, hold.status
    );
    Ok(())
}

/// Release a hold.
pub async fn release(
    ctx: &AppContext,
    hold_id: i64,
    operation_key: Option<&str>,
) -> Result<(), anyhow::Error> {
    let hold = ctx.holds.release(hold_id, operation_key).await?;
    println!(
        "Hold {} is now {} ({} {} returned)",
        hold.hold_id, hold.status, hold.amount, hold.currency
    );
    Ok(())
}

/// Run the expiry sweep: once, or forever on the configured cadence.
pub async fn sweep(ctx: &AppContext, watch: bool) -> Result<(), anyhow::Error> {
    let sweeper = ExpirySweeper::new(ctx.holds.clone(), ctx.config.sweep_interval());

    if watch {
        println!(
            "Sweeping expired holds every {}s (ctrl-c to stop)",
            ctx.config.sweep.interval_seconds
        );
        sweeper.run().await;
        return Ok(());
    }

    let outcome = sweeper.run_once().await?;
    println!(
        "Sweep complete: {} expired, {} failed",
        outcome.expired.len(),
        outcome.failed.len()
    );
    for (hold_id, error) in outcome.failed {
        println!("  hold {hold_id}: {error}");
    }
    Ok(())
}
