use anyhow::{anyhow, Result};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};

/// Addon packages are tens of megabytes; anything far beyond that is refused.
pub const MAX_ARCHIVE_BYTES: u64 = 256 * 1024 * 1024;

/// Downloads `url` fully into memory.
pub async fn download_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let filename = url
        .rsplit('/')
        .next()
        .and_then(|name| name.split('?').next())
        .filter(|name| !name.is_empty())
        .unwrap_or(url)
        .to_string();
    tracing::info!("Downloading {}...", filename);

    let response = client.get(url).send().await?.error_for_status()?;
    let total_size = response.content_length().unwrap_or(0);
    if total_size > MAX_ARCHIVE_BYTES {
        return Err(anyhow!(
            "{} is {} bytes, larger than the {} byte limit",
            filename,
            total_size,
            MAX_ARCHIVE_BYTES
        ));
    }

    let pb = ProgressBar::new(total_size);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{msg} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(format!("Downloading {}", filename));

    let mut buffer = Vec::with_capacity(total_size as usize);
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        buffer.extend_from_slice(&chunk);
        if buffer.len() as u64 > MAX_ARCHIVE_BYTES {
            pb.abandon();
            return Err(anyhow!(
                "{} exceeded the {} byte limit",
                filename,
                MAX_ARCHIVE_BYTES
            ));
        }
        pb.set_position(buffer.len() as u64);
    }

    pb.finish_and_clear();
    tracing::debug!("Downloaded {} ({} bytes)", filename, buffer.len());
    Ok(buffer)
}
