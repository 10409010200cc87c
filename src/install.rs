//! Addon update and removal
//!
//! [`reconcile`] runs one addon through a full update check:
//! fetch metadata, pick a release, and if it differs from what is installed,
//! remove the addon's directories and extract the new archive in their place.
//!
//! Removal happens before extraction and the two are not transactional. If
//! extraction fails (or the process dies) in between, the record still lists
//! directories that no longer exist. That case is reported as
//! [`UpdateOutcome::InstallFailed`] and is recovered by a forced update.

use crate::addon_id::AddonIdentifier;
use crate::archive::install_archive;
use crate::game::{GameInstall, RemoveError};
use crate::provider::{AddonSource, ProviderError};
use crate::select::{select_release, SelectionPolicy};
use crate::types::*;
use anyhow::{anyhow, Result};
use chrono::Utc;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug)]
pub enum UpdateOutcome {
    /// A release was installed.
    Updated { version: String },
    UpToDate,
    NoReleaseFound,
    ProviderError(ProviderError),
    /// An owned directory could not be removed; nothing else was touched.
    RemovalFailed(RemoveError),
    /// Old directories are gone but the new release is not in place.
    InstallFailed {
        stale_directories: Vec<String>,
        source: anyhow::Error,
    },
}

impl UpdateOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self, UpdateOutcome::Updated { .. } | UpdateOutcome::UpToDate)
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateOutcome::Updated { version } => write!(f, "updated to version {}", version),
            UpdateOutcome::UpToDate => write!(f, "up to date"),
            UpdateOutcome::NoReleaseFound => write!(f, "no matching release found"),
            UpdateOutcome::ProviderError(e) => write!(f, "{}", e),
            UpdateOutcome::RemovalFailed(e) => write!(f, "{}", e),
            UpdateOutcome::InstallFailed {
                stale_directories,
                source,
            } => write!(
                f,
                "install failed after removing {}: {:#}",
                if stale_directories.is_empty() {
                    "nothing".to_string()
                } else {
                    stale_directories.join(", ")
                },
                source
            ),
        }
    }
}

/// Checks one addon for updates and installs the selected release if needed.
///
/// `record.display_name` is refreshed whenever the provider answers. The
/// install bookkeeping (owned directories, release id, version label,
/// timestamp) only changes on [`UpdateOutcome::Updated`].
pub async fn reconcile<S: AddonSource>(
    record: &mut AddonRecord,
    source: &S,
    install: &GameInstall,
    policy: &SelectionPolicy,
    force: bool,
) -> UpdateOutcome {
    tracing::debug!(
        "Checking for updates to addon {} ({})",
        record.short_name(),
        record.display_name
    );

    let metadata = match source.fetch_metadata(record.provider, &record.remote_id).await {
        Ok(metadata) => metadata,
        Err(e) => return UpdateOutcome::ProviderError(e),
    };

    if !metadata.name.is_empty() {
        record.display_name = metadata.name;
    }

    let Some(latest) = select_release(&metadata.candidates, policy) else {
        return UpdateOutcome::NoReleaseFound;
    };

    if force {
        tracing::info!(
            "'{}': force updating to version {}",
            record.display_name,
            latest.version_label
        );
    } else if !record.is_installed() {
        tracing::info!(
            "'{}': installing version {}",
            record.display_name,
            latest.version_label
        );
    } else if latest.release_id != record.installed_release_id {
        tracing::info!(
            "'{}': updating to version {}",
            record.display_name,
            latest.version_label
        );
    } else {
        tracing::debug!(
            "No update found for '{}'. Installed release: {}, latest release: {} (version: {})",
            record.display_name,
            record.installed_release_id,
            latest.release_id,
            latest.version_label
        );
        return UpdateOutcome::UpToDate;
    }

    if let Err(e) = install.remove_addons(&record.owned_directories) {
        return UpdateOutcome::RemovalFailed(e);
    }

    let directories = match deploy(source, &latest.download_url, install).await {
        Ok(directories) => directories,
        Err(err) => {
            tracing::error!(
                "'{}': install failed after removing {:?}: {:#}",
                record.display_name,
                record.owned_directories,
                err
            );
            return UpdateOutcome::InstallFailed {
                stale_directories: record.owned_directories.clone(),
                source: err,
            };
        }
    };

    record.owned_directories = directories.into_iter().collect();
    record.installed_release_id = latest.release_id.clone();
    record.installed_version_label = latest.version_label.clone();
    record.last_updated = Some(Utc::now());

    UpdateOutcome::Updated {
        version: latest.version_label.clone(),
    }
}

async fn deploy<S: AddonSource>(
    source: &S,
    url: &str,
    install: &GameInstall,
) -> Result<BTreeSet<String>> {
    let archive = source.fetch_archive(url).await?;
    let directories = install_archive(&archive, install.addons_dir())?;
    if directories.is_empty() {
        return Err(anyhow!("archive from {} contained no files", url));
    }
    Ok(directories)
}

/// Removes an addon's directories and then drops it from the config.
///
/// The record stays in the config when removal fails so it can be retried.
pub fn remove_addon(
    config: &mut WadmanConfig,
    install: &GameInstall,
    id: &AddonIdentifier,
) -> Result<AddonRecord> {
    let index = config
        .addons
        .iter()
        .position(|a| id.matches(a))
        .ok_or_else(|| anyhow!("Addon '{}' not found", id))?;

    install.remove_addons(&config.addons[index].owned_directories)?;

    let record = config.addons.remove(index);
    tracing::info!("Removed addon {}", record.label());
    Ok(record)
}
