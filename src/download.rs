use anyhow::{Context, Result};
use futures_util::StreamExt;
use reqwest::Client;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Write buffer size for the archive download.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Percentage of `downloaded` over `total`, clamped to 100.
pub fn percent(downloaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    (downloaded.saturating_mul(100) / total).min(100) as u8
}

/// Stream `url` into `local_path`.
///
/// `on_progress` receives a percentage each time it changes, and only when the
/// server declared a content length. Returns the number of bytes written.
pub async fn download_file<F>(
    client: &Client,
    url: &str,
    local_path: &Path,
    mut on_progress: F,
) -> Result<u64>
where
    F: FnMut(u8),
{
    tracing::info!("Downloading {} to {}", url, local_path.display());

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to request {}", url))?
        .error_for_status()?;
    let total_size = response.content_length().filter(|len| *len > 0);

    let file = fs::File::create(local_path)
        .with_context(|| format!("Could not create {}", local_path.display()))?;
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut downloaded = 0u64;
    let mut last_percent = None;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        writer.write_all(&chunk)?;
        downloaded += chunk.len() as u64;

        if let Some(total) = total_size {
            let pct = percent(downloaded, total);
            if last_percent != Some(pct) {
                last_percent = Some(pct);
                on_progress(pct);
            }
        }
    }

    writer.flush()?;
    tracing::debug!("Downloaded {} bytes", downloaded);
    Ok(downloaded)
}

/// Extract every entry of the zip at `archive_path` into `extract_dir`.
/// Entries whose path would escape `extract_dir` are skipped.
pub fn extract_zip(archive_path: &Path, extract_dir: &Path) -> Result<usize> {
    tracing::info!(
        "Extracting {} into {}",
        archive_path.display(),
        extract_dir.display()
    );

    let file = fs::File::open(archive_path)
        .with_context(|| format!("Could not open {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("{} is not a valid zip archive", archive_path.display()))?;

    let mut extracted = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let relative = match entry.enclosed_name() {
            Some(path) => path.to_owned(),
            None => {
                tracing::warn!("Skipping malicious path in zip: {}", entry.name());
                continue;
            }
        };
        let outpath = extract_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath)?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = fs::File::create(&outpath)?;
        io::copy(&mut entry, &mut outfile)?;
        extracted += 1;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))?;
            }
        }
    }

    tracing::debug!("Extracted {} files", extracted);
    Ok(extracted)
}
