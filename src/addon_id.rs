use crate::types::{AddonRecord, ProviderKind};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddonIdentifier {
    pub provider: ProviderKind,
    pub remote_id: String,
}

impl AddonIdentifier {
    /// Parse an addon identifier from various formats:
    /// - "curse:1234" (CurseForge project)
    /// - "wowi:5678" (WowInterface file)
    /// - "1234" (bare number, CurseForge)
    pub fn parse(addon_id: &str) -> Result<Self, String> {
        let addon_id = addon_id.trim();
        if addon_id.is_empty() {
            return Err("Addon identifier cannot be empty".to_string());
        }

        if addon_id.starts_with('-') {
            return Err(format!(
                "Invalid addon identifier '{}'. It looks like a CLI flag.",
                addon_id
            ));
        }

        let (provider, remote_id) = match addon_id.split_once(':') {
            Some((prefix, id)) => {
                let provider = ProviderKind::from_prefix(prefix)
                    .ok_or_else(|| format!("Unknown addon provider '{}'", prefix))?;
                (provider, id)
            }
            None => (ProviderKind::CurseForge, addon_id),
        };

        if remote_id.is_empty() || !remote_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!(
                "Invalid addon id '{}': expected a numeric project id",
                remote_id
            ));
        }

        // "0042" and "42" refer to the same project
        let trimmed = remote_id.trim_start_matches('0');
        let remote_id = if trimmed.is_empty() { "0" } else { trimmed };

        Ok(AddonIdentifier {
            provider,
            remote_id: remote_id.to_string(),
        })
    }

    pub fn matches(&self, record: &AddonRecord) -> bool {
        record.provider == self.provider && record.remote_id == self.remote_id
    }
}

impl fmt::Display for AddonIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.remote_id)
    }
}
