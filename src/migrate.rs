//! Config schema migrations.
//!
//! Each step upgrades a raw JSON document from one schema version to the next.
//! Steps are applied in ascending order and are safe to run twice.
//!
//! Version history:
//! 1. `install_path` pointed at `<game>/Interface/AddOns`
//! 2. `install_path` is the game directory itself
//! 3. every addon carries a `type` tag
//! 4. addons use the provider-neutral record shape

use serde_json::{Map, Value};

pub const CURRENT_SCHEMA_VERSION: u32 = 4;

type Migration = fn(&mut Map<String, Value>);

/// `(source version, step)` pairs; a step upgrades `source` to `source + 1`.
const MIGRATIONS: [(u32, Migration); 3] = [
    (1, relocate_install_path),
    (2, tag_legacy_addons),
    (3, neutral_record_shape),
];

/// Upgrades `doc` from `from` to [`CURRENT_SCHEMA_VERSION`].
///
/// Files written before versioning existed have no version and count as 1.
pub fn migrate(doc: &mut Map<String, Value>, from: u32) {
    let from = from.max(1);
    for (source, step) in MIGRATIONS {
        if source >= from {
            tracing::info!("Migrating config from version {} to {}", source, source + 1);
            step(doc);
        }
    }
    doc.insert("version".to_string(), Value::from(CURRENT_SCHEMA_VERSION));
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Strips a trailing `Interface/AddOns` (either separator style, any case).
fn strip_addons_suffix(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches(is_separator);
    let (rest, last) = trimmed.rsplit_once(is_separator)?;
    if !last.eq_ignore_ascii_case("AddOns") {
        return None;
    }
    let (root, parent) = rest.rsplit_once(is_separator)?;
    if !parent.eq_ignore_ascii_case("Interface") {
        return None;
    }
    Some(root)
}

fn relocate_install_path(doc: &mut Map<String, Value>) {
    let Some(Value::String(path)) = doc.get("install_path") else {
        return;
    };

    if let Some(root) = strip_addons_suffix(path) {
        let root = root.to_string();
        tracing::debug!("Relocating install path {} -> {}", path, root);
        doc.insert("install_path".to_string(), Value::String(root));
    }
}

fn addons_mut(doc: &mut Map<String, Value>) -> impl Iterator<Item = &mut Map<String, Value>> {
    doc.get_mut("addons")
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object_mut)
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn tag_legacy_addons(doc: &mut Map<String, Value>) {
    for addon in addons_mut(doc) {
        if is_blank(addon.get("type")) {
            addon.insert("type".to_string(), Value::from("curse"));
        }
    }
}

fn first_present<'a>(addon: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| addon.get(*k))
        .find(|v| !v.is_null())
}

fn as_id_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        // file id 0 was the "never installed" marker
        Some(Value::Number(n)) if n.as_u64() == Some(0) => String::new(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn neutral_record_shape(doc: &mut Map<String, Value>) {
    for addon in addons_mut(doc) {
        let provider = match first_present(addon, &["provider", "type"]) {
            Some(Value::String(tag)) if !tag.trim().is_empty() => tag.clone(),
            _ => "curse".to_string(),
        };

        let remote_id = match first_present(addon, &["remote_id", "id"]) {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        };

        let display_name = first_present(addon, &["display_name", "name", "title"])
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let installed_release_id = as_id_string(first_present(
            addon,
            &["installed_release_id", "file_id", "last_checksum"],
        ));

        let installed_version_label = first_present(addon, &["installed_version_label", "version"])
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let owned_directories = first_present(addon, &["owned_directories", "directories"])
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));

        // Zero timestamps from older writers mean "never"
        let last_updated = match addon.get("last_updated") {
            Some(Value::String(ts)) if !ts.starts_with("0001-") => Value::String(ts.clone()),
            _ => Value::Null,
        };

        let mut record = Map::new();
        record.insert("provider".to_string(), Value::String(provider));
        record.insert("remote_id".to_string(), Value::String(remote_id));
        record.insert("display_name".to_string(), Value::String(display_name));
        record.insert(
            "installed_release_id".to_string(),
            Value::String(installed_release_id),
        );
        record.insert(
            "installed_version_label".to_string(),
            Value::String(installed_version_label),
        );
        record.insert("owned_directories".to_string(), owned_directories);
        record.insert("last_updated".to_string(), last_updated);

        *addon = record;
    }
}
