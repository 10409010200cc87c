//! WowInterface-style file details API.

use super::{get_json, ProviderError};
use crate::types::{AddonMetadata, Channel, ReleaseCandidate};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct FileDetails {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    pub checksum: String,
    #[serde(rename = "downloadUri")]
    pub download_uri: String,
}

/// The checksum identifies the release; the service publishes a single
/// untagged build per addon.
pub fn into_metadata(mut details: Vec<FileDetails>) -> Result<AddonMetadata, ProviderError> {
    if details.len() != 1 {
        return Err(ProviderError::UnexpectedResults {
            count: details.len(),
        });
    }

    let file = details.remove(0);
    Ok(AddonMetadata {
        name: file.title,
        candidates: vec![ReleaseCandidate {
            release_id: file.checksum,
            version_label: file.version,
            download_url: file.download_uri,
            published_at: DateTime::<Utc>::default(),
            channel: Channel::Release,
            target_flavor: None,
            is_alternate: false,
            supported_game_versions: Vec::new(),
        }],
    })
}

pub fn details_url(base: &str, id: &str) -> String {
    format!("{}/filedetails/{}.json", base, id)
}

pub async fn fetch(
    client: &reqwest::Client,
    base: &str,
    id: &str,
) -> Result<AddonMetadata, ProviderError> {
    let details: Vec<FileDetails> = get_json(client, &details_url(base, id), &[], id).await?;
    into_metadata(details)
}
