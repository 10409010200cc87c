//! ZIP extraction into the addon directory.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Cursor};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive is corrupt: {0}")]
    CorruptArchive(#[from] zip::result::ZipError),
    #[error("archive entry '{name}' escapes the addon directory")]
    UnsafeArchiveEntry { name: String },
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

struct PlannedEntry {
    index: usize,
    relative: PathBuf,
    is_dir: bool,
}

/// Extracts a fully buffered ZIP archive into `destination`.
///
/// Returns the distinct first path segments of every entry, which is the set
/// of top-level directories the addon owns from now on. Every entry name is
/// validated before anything is written, so an archive with a single unsafe
/// entry leaves the destination untouched.
pub fn install_archive(bytes: &[u8], destination: &Path) -> Result<BTreeSet<String>, ArchiveError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    let mut planned = Vec::with_capacity(archive.len());
    let mut top_level = BTreeSet::new();

    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        let Some(relative) = entry_path(&entry)? else {
            continue;
        };

        if let Some(Component::Normal(first)) = relative.components().next() {
            top_level.insert(first.to_string_lossy().to_string());
        }

        planned.push(PlannedEntry {
            index,
            relative,
            is_dir: entry.is_dir(),
        });
    }

    tracing::debug!(
        "Extracting {} entries into {}",
        planned.len(),
        destination.display()
    );

    for item in planned {
        let target = destination.join(&item.relative);

        if item.is_dir {
            fs::create_dir_all(&target).map_err(|source| ArchiveError::Io {
                path: target.clone(),
                source,
            })?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| ArchiveError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut entry = archive.by_index(item.index)?;
        let mut out = fs::File::create(&target).map_err(|source| ArchiveError::Io {
            path: target.clone(),
            source,
        })?;
        io::copy(&mut entry, &mut out).map_err(|source| ArchiveError::Io {
            path: target.clone(),
            source,
        })?;
    }

    Ok(top_level)
}

/// Resolves an entry name to a path relative to the destination.
///
/// `None` means the entry names the archive root itself (e.g. `./`).
fn entry_path(entry: &zip::read::ZipFile<'_>) -> Result<Option<PathBuf>, ArchiveError> {
    let unsafe_entry = || ArchiveError::UnsafeArchiveEntry {
        name: entry.name().to_string(),
    };

    let enclosed = entry.enclosed_name().ok_or_else(unsafe_entry)?;

    let mut resolved = PathBuf::new();
    for component in enclosed.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() {
                    return Err(unsafe_entry());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(unsafe_entry()),
        }
    }

    if resolved.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(resolved))
    }
}
