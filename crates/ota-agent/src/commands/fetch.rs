//! Fetch command - check for an update and download its image

use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use ota_client::{ImageDownload, UpdateCheck, Updater};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::output::{OutputContext, UpdateRow};

/// Check for a scheduled update and write its image to `dest`
///
/// Returns the number of bytes written, or `None` when nothing is scheduled.
pub async fn fetch<U: Updater + ?Sized>(
    updater: &U,
    server: &str,
    device_id: &str,
    dest: &Path,
    ctx: &OutputContext,
) -> Result<Option<u64>> {
    let update = match updater
        .get_scheduled_update(server, device_id)
        .await
        .context("Update check failed")?
    {
        UpdateCheck::NoUpdate => {
            ctx.info("No update available");
            return Ok(None);
        }
        UpdateCheck::Available(update) => update,
    };
    ctx.print_one(&UpdateRow::from(&update));

    let mut download = updater
        .fetch_update(&update.image.uri)
        .await
        .context("Failed to fetch update image")?;
    let total = download.content_length();

    let pb = if ctx.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(total)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );
    pb.set_message("Downloading...");

    let written = match write_image(&mut download, dest, &pb).await {
        Ok(written) => written,
        Err(e) => {
            pb.abandon_with_message("Incomplete!");
            if let Err(remove) = tokio::fs::remove_file(dest).await {
                debug!("Could not remove {}: {}", dest.display(), remove);
            }
            return Err(e);
        }
    };

    pb.finish_with_message("Complete!");
    ctx.success(&format!(
        "Image {} written to {} ({} bytes)",
        update.image.id,
        dest.display(),
        written
    ));

    Ok(Some(written))
}

/// Stream the image into `dest`, failing when fewer or more bytes arrive
/// than were announced
async fn write_image(download: &mut ImageDownload, dest: &Path, pb: &ProgressBar) -> Result<u64> {
    let total = download.content_length();
    let mut file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("Failed to create {}", dest.display()))?;

    let mut written: u64 = 0;
    while let Some(chunk) = download
        .chunk()
        .await
        .context("Image download interrupted")?
    {
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write {}", dest.display()))?;
        written += chunk.len() as u64;
        pb.set_position(written);
    }
    file.flush().await?;

    if written != total {
        anyhow::bail!(
            "Image download incomplete: expected {} bytes, received {}",
            total,
            written
        );
    }
    Ok(written)
}
