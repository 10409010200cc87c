//! CurseForge-style addon API.

use super::{get_json, ProviderError};
use crate::types::{AddonMetadata, Channel, ReleaseCandidate, SearchHit};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AddonFile {
    pub id: u64,
    #[serde(rename = "displayName", default)]
    pub display_name: String,
    #[serde(rename = "gameVersionFlavor", default)]
    pub flavor: Option<String>,
    #[serde(rename = "releaseType")]
    pub release_type: i64,
    #[serde(rename = "downloadUrl")]
    pub download_url: String,
    #[serde(rename = "fileDate")]
    pub file_date: DateTime<Utc>,
    #[serde(rename = "isAlternate", default)]
    pub is_alternate: bool,
    #[serde(rename = "gameVersion", default)]
    pub game_versions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddonResponse {
    pub id: u64,
    pub name: String,
    #[serde(rename = "latestFiles", default)]
    pub files: Vec<AddonFile>,
}

impl From<AddonFile> for ReleaseCandidate {
    fn from(file: AddonFile) -> Self {
        ReleaseCandidate {
            release_id: file.id.to_string(),
            version_label: file.display_name,
            download_url: file.download_url,
            published_at: file.file_date,
            channel: Channel::from_ordinal(file.release_type),
            target_flavor: file.flavor,
            is_alternate: file.is_alternate,
            supported_game_versions: file.game_versions,
        }
    }
}

impl From<AddonResponse> for AddonMetadata {
    fn from(response: AddonResponse) -> Self {
        AddonMetadata {
            name: response.name,
            candidates: response.files.into_iter().map(Into::into).collect(),
        }
    }
}

pub fn addon_url(base: &str, id: &str) -> String {
    format!("{}/addon/{}", base, id)
}

pub async fn fetch(
    client: &reqwest::Client,
    base: &str,
    id: &str,
) -> Result<AddonMetadata, ProviderError> {
    let response: AddonResponse = get_json(client, &addon_url(base, id), &[], id).await?;
    Ok(response.into())
}

pub async fn search(
    client: &reqwest::Client,
    base: &str,
    query: &str,
) -> Result<Vec<SearchHit>, ProviderError> {
    let url = format!("{}/addon/search", base);
    let params = [("gameId", "1"), ("searchFilter", query)];
    let results: Vec<AddonResponse> = get_json(client, &url, &params, query).await?;
    Ok(results
        .into_iter()
        .map(|r| SearchHit {
            remote_id: r.id.to_string(),
            name: r.name,
        })
        .collect())
}
