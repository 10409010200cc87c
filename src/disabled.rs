//! Disabled-addon detection from the client's per-character state files.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

pub const STATE_FILE_NAME: &str = "AddOns.txt";

/// Scans `WTF/Account/<account>/<realm>/<character>/AddOns.txt` under the game
/// root and returns every directory name mentioned, mapped to whether it is
/// disabled. A directory disabled by any one character is reported disabled.
pub fn scan_disabled(install_root: &Path) -> io::Result<HashMap<String, bool>> {
    let accounts = install_root.join("WTF").join("Account");
    let mut index = HashMap::new();

    if !accounts.is_dir() {
        tracing::debug!("No client state found at {}", accounts.display());
        return Ok(index);
    }

    for entry in WalkDir::new(&accounts)
        .min_depth(4)
        .max_depth(4)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() || entry.file_name() != STATE_FILE_NAME {
            continue;
        }

        tracing::trace!("Reading addon state from {}", entry.path().display());
        let bytes = match fs::read(entry.path()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", entry.path().display(), e);
                continue;
            }
        };
        // Names with stray bytes cannot match an addon directory anyway
        merge_state(&mut index, &String::from_utf8_lossy(&bytes));
    }

    Ok(index)
}

fn merge_state(index: &mut HashMap<String, bool>, content: &str) {
    for line in content.lines() {
        let Some((name, state)) = line.trim().split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }

        match state.trim() {
            "disabled" => {
                index.insert(name.to_string(), true);
            }
            "enabled" => {
                index.entry(name.to_string()).or_insert(false);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_state(
        root: &Path,
        account: &str,
        realm: &str,
        character: &str,
        content: impl AsRef<[u8]>,
    ) {
        let dir = root
            .join("WTF")
            .join("Account")
            .join(account)
            .join(realm)
            .join(character);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(STATE_FILE_NAME), content).unwrap();
    }

    #[test]
    fn test_missing_state_tree_is_empty() {
        let root = TempDir::new().unwrap();
        assert!(scan_disabled(root.path()).unwrap().is_empty());
    }

    #[test]
    fn test_disabled_in_any_profile_wins() {
        let root = TempDir::new().unwrap();
        write_state(root.path(), "ACC", "Realm", "Alice", "Details: enabled\nBagnon: enabled\n");
        write_state(root.path(), "ACC", "Realm", "Bob", "Details: disabled\n");
        write_state(root.path(), "OTHER", "Elsewhere", "Carol", "Details: enabled\n");

        let index = scan_disabled(root.path()).unwrap();

        assert_eq!(index.get("Details"), Some(&true));
        assert_eq!(index.get("Bagnon"), Some(&false));
        assert_eq!(index.get("WeakAuras"), None);
    }

    #[test]
    fn test_whitespace_and_malformed_lines() {
        let root = TempDir::new().unwrap();
        write_state(
            root.path(),
            "ACC",
            "Realm",
            "Alice",
            "   Bagnon: disabled   \r\ngarbage line\n: disabled\nPlater: maybe\n",
        );

        let index = scan_disabled(root.path()).unwrap();

        assert_eq!(index.get("Bagnon"), Some(&true));
        assert_eq!(index.get("Plater"), None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_files_at_other_depths_are_ignored() {
        let root = TempDir::new().unwrap();
        let shallow = root.path().join("WTF").join("Account").join("ACC");
        fs::create_dir_all(&shallow).unwrap();
        fs::write(shallow.join(STATE_FILE_NAME), "Details: disabled\n").unwrap();

        assert!(scan_disabled(root.path()).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_utf8_file_does_not_hide_other_files() {
        let root = TempDir::new().unwrap();
        write_state(root.path(), "ACC", "Realm", "Alice", "Details: disabled\n");
        write_state(
            root.path(),
            "ACC",
            "Realm",
            "Bob",
            b"Bagnon: disabled\n\xffCaf\xe9: enabled\n".as_slice(),
        );

        let index = scan_disabled(root.path()).unwrap();

        assert_eq!(index.get("Details"), Some(&true));
        assert_eq!(index.get("Bagnon"), Some(&true));
        assert_eq!(index.len(), 3);
    }
}
