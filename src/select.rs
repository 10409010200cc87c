//! Release selection
//!
//! Picks the one release of an addon that should be installed for the
//! configured client flavor and channel.

use crate::types::{Channel, ReleaseCandidate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPolicy {
    /// Client build tag, e.g. `wow_retail`.
    pub flavor: String,
    /// Strictest channel that may be installed.
    pub max_channel: Channel,
    /// Client version prefixes considered compatible, e.g. `8.`.
    pub game_versions: Vec<String>,
}

/// Returns the release to install, or `None` when nothing passes filtering.
///
/// Candidates for another flavor, on a stricter channel than allowed, or
/// flagged as alternate builds are discarded. Survivors are ranked by
/// `(compatible, published_at)`, so a compatible release always beats a newer
/// incompatible one.
pub fn select_release<'a>(
    candidates: &'a [ReleaseCandidate],
    policy: &SelectionPolicy,
) -> Option<&'a ReleaseCandidate> {
    let mut best: Option<(&ReleaseCandidate, bool)> = None;

    for candidate in candidates {
        let flavor_ok = flavor_matches(candidate, policy);
        let channel_ok = candidate.channel <= policy.max_channel;
        let primary = !candidate.is_alternate;

        tracing::debug!(
            "Found release {} ({})\n\tFlavor: {} (valid: {})\n\tChannel: {} (valid: {})\n\tAlternate: {} (valid: {})",
            candidate.release_id,
            candidate.version_label,
            candidate.target_flavor.as_deref().unwrap_or("any"),
            flavor_ok,
            candidate.channel,
            channel_ok,
            candidate.is_alternate,
            primary,
        );

        if !(flavor_ok && channel_ok && primary) {
            continue;
        }

        let compatible = is_compatible(candidate, policy);
        let better = match best {
            None => true,
            Some((current, current_compatible)) => {
                (compatible, candidate.published_at) > (current_compatible, current.published_at)
            }
        };

        if better {
            tracing::debug!(
                "\t[{}] Time: {}; Versions: {} << Best so far",
                candidate.release_id,
                candidate.published_at,
                candidate.supported_game_versions.join(",")
            );
            best = Some((candidate, compatible));
        } else {
            tracing::debug!(
                "\t[{}] Time: {}; Versions: {} << SKIPPED",
                candidate.release_id,
                candidate.published_at,
                candidate.supported_game_versions.join(",")
            );
        }
    }

    best.map(|(candidate, _)| candidate)
}

fn flavor_matches(candidate: &ReleaseCandidate, policy: &SelectionPolicy) -> bool {
    match &candidate.target_flavor {
        Some(flavor) => flavor.eq_ignore_ascii_case(&policy.flavor),
        None => true,
    }
}

/// Releases that predate game-version metadata list none and count as compatible.
pub fn is_compatible(candidate: &ReleaseCandidate, policy: &SelectionPolicy) -> bool {
    if candidate.supported_game_versions.is_empty() {
        return true;
    }

    candidate.supported_game_versions.iter().any(|version| {
        policy
            .game_versions
            .iter()
            .any(|prefix| version.starts_with(prefix.as_str()))
    })
}
