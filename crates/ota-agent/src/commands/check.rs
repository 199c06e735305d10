//! Check command - ask the server for a scheduled update

use anyhow::{Context, Result};
use ota_client::{UpdateCheck, Updater};

use crate::output::{OutputContext, UpdateRow};

/// Perform one update check and print the outcome
pub async fn check<U: Updater + ?Sized>(
    updater: &U,
    server: &str,
    device_id: &str,
    ctx: &OutputContext,
) -> Result<UpdateCheck> {
    let check = updater
        .get_scheduled_update(server, device_id)
        .await
        .context("Update check failed")?;

    match &check {
        UpdateCheck::NoUpdate => ctx.info("No update available"),
        UpdateCheck::Available(update) => ctx.print_one(&UpdateRow::from(update)),
    }

    Ok(check)
}
