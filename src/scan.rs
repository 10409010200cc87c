//! Discovery of addon directories that are not tracked yet.

use crate::addon_id::AddonIdentifier;
use crate::game::GameInstall;
use crate::types::ProviderKind;
use std::collections::{HashMap, HashSet};
use std::io;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResult {
    /// Provider ids advertised by the TOC, in preference order.
    Known(Vec<AddonIdentifier>),
    Unknown,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub directory: String,
    pub result: ScanResult,
}

const TOC_PROVIDER_KEYS: [(&str, ProviderKind); 2] = [
    ("x-curse-project-id", ProviderKind::CurseForge),
    ("x-wowi-id", ProviderKind::WowInterface),
];

pub fn scan_untracked(
    install: &GameInstall,
    tracked: &HashSet<String>,
    include_load_on_demand: bool,
) -> io::Result<Vec<ScanEntry>> {
    let mut entries = Vec::new();

    for directory in install.list_addons()? {
        if tracked.contains(&directory) {
            continue;
        }

        let metadata = match install.read_toc(&directory) {
            Ok(metadata) => metadata,
            Err(e) => {
                entries.push(ScanEntry {
                    directory,
                    result: ScanResult::Error(e.to_string()),
                });
                continue;
            }
        };

        if !include_load_on_demand && is_load_on_demand(&metadata) {
            tracing::debug!("Skipping load-on-demand addon {}", directory);
            continue;
        }
        if metadata.get("x-part-of").is_some_and(|v| !v.is_empty()) {
            tracing::debug!("Skipping {}: part of another addon", directory);
            continue;
        }

        entries.push(ScanEntry {
            directory,
            result: classify(&metadata),
        });
    }

    Ok(entries)
}

fn is_load_on_demand(metadata: &HashMap<String, String>) -> bool {
    metadata.get("loadondemand").map(String::as_str) == Some("1")
}

fn classify(metadata: &HashMap<String, String>) -> ScanResult {
    let ids: Vec<AddonIdentifier> = TOC_PROVIDER_KEYS
        .iter()
        .filter_map(|(key, provider)| {
            let raw = metadata.get(*key)?;
            AddonIdentifier::parse(&format!("{}:{}", provider, raw)).ok()
        })
        .collect();

    if ids.is_empty() {
        ScanResult::Unknown
    } else {
        ScanResult::Known(ids)
    }
}

/// Builds `wadman add ...` for every known entry, using its preferred id.
/// Several directories advertising the same id produce one argument.
pub fn suggested_add_command(entries: &[ScanEntry]) -> Option<String> {
    let mut seen = HashSet::new();
    let mut args = Vec::new();

    for entry in entries {
        if let ScanResult::Known(ids) = &entry.result {
            if let Some(id) = ids.first() {
                if seen.insert(id.clone()) {
                    args.push(id.to_string());
                }
            }
        }
    }

    if args.is_empty() {
        None
    } else {
        Some(format!("wadman add {}", args.join(" ")))
    }
}
