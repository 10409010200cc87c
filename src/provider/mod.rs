//! Remote addon providers
//!
//! Each provider translates its own wire format into [`AddonMetadata`]. The
//! update logic only talks to providers through [`AddonSource`], which lets
//! tests substitute an in-memory source.

pub mod curseforge;
pub mod wowinterface;

use crate::download::download_bytes;
use crate::types::{AddonMetadata, ProviderKind, SearchHit};
use anyhow::Result;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} failed: {status}")]
    Status { url: String, status: StatusCode },
    #[error("addon {id} not found")]
    NotFound { id: String },
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("expected 1 result, got {count}")]
    UnexpectedResults { count: usize },
}

/// Where the update process gets addon metadata and archives from.
#[allow(async_fn_in_trait)]
pub trait AddonSource {
    async fn fetch_metadata(
        &self,
        provider: ProviderKind,
        remote_id: &str,
    ) -> Result<AddonMetadata, ProviderError>;

    async fn fetch_archive(&self, url: &str) -> Result<Vec<u8>>;
}

pub const CURSEFORGE_URL: &str = "https://addons-ecs.forgesvc.net/api/v2";
pub const WOWINTERFACE_URL: &str = "https://api.mmoui.com/v4/game/WOW";

/// Provider access over HTTP.
pub struct HttpSource {
    client: reqwest::Client,
    curseforge_url: String,
    wowinterface_url: String,
}

impl HttpSource {
    /// Base URLs can be redirected with `WADMAN_CURSEFORGE_URL` and
    /// `WADMAN_WOWINTERFACE_URL`.
    pub fn from_env() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("wadman/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let base_url = |var: &str, default: &str| {
            std::env::var(var)
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
                .trim_end_matches('/')
                .to_string()
        };

        Ok(Self {
            client,
            curseforge_url: base_url("WADMAN_CURSEFORGE_URL", CURSEFORGE_URL),
            wowinterface_url: base_url("WADMAN_WOWINTERFACE_URL", WOWINTERFACE_URL),
        })
    }

    /// Free-text search. Only CurseForge offers a search endpoint.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ProviderError> {
        curseforge::search(&self.client, &self.curseforge_url, query).await
    }
}

impl AddonSource for HttpSource {
    async fn fetch_metadata(
        &self,
        provider: ProviderKind,
        remote_id: &str,
    ) -> Result<AddonMetadata, ProviderError> {
        match provider {
            ProviderKind::CurseForge => {
                curseforge::fetch(&self.client, &self.curseforge_url, remote_id).await
            }
            ProviderKind::WowInterface => {
                wowinterface::fetch(&self.client, &self.wowinterface_url, remote_id).await
            }
        }
    }

    async fn fetch_archive(&self, url: &str) -> Result<Vec<u8>> {
        download_bytes(&self.client, url).await
    }
}

/// GETs `url` and decodes the JSON body. A 404 is reported against `id`.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, &str)],
    id: &str,
) -> Result<T, ProviderError> {
    tracing::debug!("Fetching {}", url);

    let response = client
        .get(url)
        .query(query)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|source| ProviderError::Request {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ProviderError::NotFound { id: id.to_string() });
    }
    if !status.is_success() {
        return Err(ProviderError::Status {
            url: url.to_string(),
            status,
        });
    }

    response.json().await.map_err(|source| ProviderError::Decode {
        url: url.to_string(),
        source,
    })
}
