use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::migrate::CURRENT_SCHEMA_VERSION;
use crate::select::SelectionPolicy;

/// Remote service that owns an addon.
///
/// Tags that are empty or unknown fall back to CurseForge, the only provider
/// older config files knew about.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(from = "String")]
pub enum ProviderKind {
    #[serde(rename = "curse")]
    #[default]
    CurseForge,
    #[serde(rename = "wowi")]
    WowInterface,
}

impl ProviderKind {
    pub fn prefix(self) -> &'static str {
        match self {
            ProviderKind::CurseForge => "curse",
            ProviderKind::WowInterface => "wowi",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_lowercase().as_str() {
            "curse" | "curseforge" => Some(ProviderKind::CurseForge),
            "wowi" | "wowinterface" => Some(ProviderKind::WowInterface),
            _ => None,
        }
    }
}

impl From<String> for ProviderKind {
    fn from(tag: String) -> Self {
        ProviderKind::from_prefix(tag.trim()).unwrap_or_default()
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Stability tier of a release. Ordered from least to most strict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Release,
    Beta,
    Alpha,
}

impl Channel {
    /// Maps a provider release-type ordinal (1 release, 2 beta, 3 alpha).
    /// Anything unrecognised is treated as alpha so it is never picked by default.
    pub fn from_ordinal(ordinal: i64) -> Self {
        match ordinal {
            1 => Channel::Release,
            2 => Channel::Beta,
            _ => Channel::Alpha,
        }
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "release" | "stable" => Ok(Channel::Release),
            "beta" => Ok(Channel::Beta),
            "alpha" => Ok(Channel::Alpha),
            other => Err(format!(
                "unknown channel '{}' (expected release, beta or alpha)",
                other
            )),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Release => "release",
            Channel::Beta => "beta",
            Channel::Alpha => "alpha",
        };
        f.write_str(name)
    }
}

/// Persisted state of one installed addon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddonRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub provider: ProviderKind,
    #[serde(deserialize_with = "string_or_number")]
    pub remote_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub installed_release_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub installed_version_label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub owned_directories: Vec<String>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl AddonRecord {
    pub fn new(provider: ProviderKind, remote_id: impl Into<String>) -> Self {
        Self {
            provider,
            remote_id: remote_id.into(),
            display_name: String::new(),
            installed_release_id: String::new(),
            installed_version_label: String::new(),
            owned_directories: Vec::new(),
            last_updated: None,
        }
    }

    /// Provider-qualified identifier, e.g. `curse:1234`.
    pub fn short_name(&self) -> String {
        format!("{}:{}", self.provider, self.remote_id)
    }

    pub fn label(&self) -> String {
        if self.display_name.is_empty() {
            format!("[{}]", self.short_name())
        } else {
            format!("[{}] {}", self.short_name(), self.display_name)
        }
    }

    pub fn is_installed(&self) -> bool {
        !self.installed_release_id.is_empty()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

/// Like `#[serde(default)]`, but an explicit `null` also yields the default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One release advertised by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseCandidate {
    pub release_id: String,
    pub version_label: String,
    pub download_url: String,
    pub published_at: DateTime<Utc>,
    pub channel: Channel,
    /// `None` when the provider does not tag builds by flavor.
    pub target_flavor: Option<String>,
    pub is_alternate: bool,
    pub supported_game_versions: Vec<String>,
}

/// Provider response translated into the generic model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonMetadata {
    pub name: String,
    pub candidates: Vec<ReleaseCandidate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub remote_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WadmanSettings {
    #[serde(default = "default_flavor")]
    pub flavor: String,
    #[serde(default = "default_channel")]
    pub channel: Channel,
    #[serde(default = "default_game_versions")]
    pub game_versions: Vec<String>,
}

fn default_flavor() -> String {
    "wow_retail".to_string()
}
fn default_channel() -> Channel {
    Channel::Beta
}
fn default_game_versions() -> Vec<String> {
    vec!["8.".to_string(), "7.".to_string()]
}

impl Default for WadmanSettings {
    fn default() -> Self {
        Self {
            flavor: default_flavor(),
            channel: default_channel(),
            game_versions: default_game_versions(),
        }
    }
}

impl WadmanSettings {
    pub fn policy(&self) -> SelectionPolicy {
        SelectionPolicy {
            flavor: self.flavor.clone(),
            max_channel: self.channel,
            game_versions: self.game_versions.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WadmanConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub install_path: PathBuf,
    #[serde(rename = "version", default = "current_schema_version")]
    pub schema_version: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub settings: WadmanSettings,
    #[serde(default, deserialize_with = "null_as_default")]
    pub addons: Vec<AddonRecord>,
}

fn current_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

impl Default for WadmanConfig {
    fn default() -> Self {
        Self {
            install_path: PathBuf::new(),
            schema_version: CURRENT_SCHEMA_VERSION,
            settings: WadmanSettings::default(),
            addons: Vec::new(),
        }
    }
}

impl WadmanConfig {
    pub fn has_install_path(&self) -> bool {
        !self.install_path.as_os_str().is_empty()
    }

    pub fn find_addon(&self, provider: ProviderKind, remote_id: &str) -> Option<usize> {
        self.addons
            .iter()
            .position(|a| a.provider == provider && a.remote_id == remote_id)
    }
}
