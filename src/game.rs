//! The game installation an addon list is managed against.

use crate::disabled::scan_disabled;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed to remove {directory}: {source}")]
pub struct RemoveError {
    pub directory: String,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, Clone)]
pub struct GameInstall {
    root: PathBuf,
    addons_dir: PathBuf,
}

impl GameInstall {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let addons_dir = root.join("Interface").join("AddOns");
        Self { root, addons_dir }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn addons_dir(&self) -> &Path {
        &self.addons_dir
    }

    /// Names of every entry in the addon directory, sorted.
    pub fn list_addons(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.addons_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort_by_key(|n| n.to_lowercase());
        Ok(names)
    }

    /// Removes the given top-level entries. Entries that are already gone are
    /// skipped; the first failure stops the removal.
    ///
    /// Names that are not a single plain path component (`.`, `..`, empty,
    /// nested or absolute) are never deleted.
    pub fn remove_addons(&self, names: &[String]) -> Result<(), RemoveError> {
        for name in names {
            if !is_top_level_name(name) {
                tracing::warn!(
                    "Not removing '{}': not a directory name inside {}",
                    name,
                    self.addons_dir.display()
                );
                continue;
            }
            let target = self.addons_dir.join(name);
            let result = match fs::symlink_metadata(&target) {
                Ok(meta) if meta.is_dir() => fs::remove_dir_all(&target),
                Ok(_) => fs::remove_file(&target),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => Err(e),
            };

            result.map_err(|source| RemoveError {
                directory: name.clone(),
                source,
            })?;
            tracing::debug!("Removed {}", target.display());
        }
        Ok(())
    }

    /// True when every named directory exists in the addon directory.
    pub fn has_addons(&self, names: &[String]) -> bool {
        names.iter().all(|name| self.addons_dir.join(name).is_dir())
    }

    pub fn disabled_addons(&self) -> io::Result<HashMap<String, bool>> {
        scan_disabled(&self.root)
    }

    /// Reads the `## Key: Value` header of an addon's TOC file.
    ///
    /// Prefers `<dir>/<dir>.toc`, falling back to the first `.toc` file found.
    pub fn read_toc(&self, directory: &str) -> io::Result<HashMap<String, String>> {
        let dir = self.addons_dir.join(directory);
        let preferred = dir.join(format!("{}.toc", directory));

        let toc_path = if preferred.is_file() {
            preferred
        } else {
            let mut tocs: Vec<PathBuf> = fs::read_dir(&dir)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("toc"))
                })
                .collect();
            tocs.sort();
            tocs.into_iter().next().ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "no .toc file found")
            })?
        };

        Ok(parse_toc(&fs::read_to_string(toc_path)?))
    }
}

/// True for exactly one normal path component, e.g. `Details`.
fn is_top_level_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Parses TOC metadata lines into a map keyed by lowercase field name.
pub fn parse_toc(content: &str) -> HashMap<String, String> {
    let Ok(re) = Regex::new(r"^##\s*([^:]+?)\s*:\s*(.*?)\s*$") else {
        return HashMap::new();
    };

    content
        .lines()
        .filter_map(|line| re.captures(line.trim_start_matches('\u{feff}')))
        .map(|cap| (cap[1].to_lowercase(), cap[2].to_string()))
        .collect()
}

/// Looks for a game install in the usual locations.
pub fn guess_install_path() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    for var in ["PROGRAMW6432", "PROGRAMFILES(X86)"] {
        if let Ok(base) = std::env::var(var) {
            candidates.push(PathBuf::from(base).join("World of Warcraft").join("_retail_"));
        }
    }

    if let Some(home) = dirs::home_dir() {
        candidates.push(
            home.join("Games")
                .join("world-of-warcraft")
                .join("drive_c")
                .join("Program Files (x86)")
                .join("World of Warcraft")
                .join("_retail_"),
        );
    }

    candidates.into_iter().find(|p| p.is_dir())
}
