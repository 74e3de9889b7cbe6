//! Single-document content with a built-in default
//!
//! Before editions were kept in folders, the page showed one hard-coded
//! briefing and let an optional override file replace parts of it. This
//! module keeps that behavior for installations that have not moved their
//! content into a content root yet.

use super::model::Edition;
use super::repository::ContentError;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Built-in briefing shown when no edition folders exist
const DEFAULT_EDITION_JSON: &str = include_str!("default_edition.json");

/// Identifier given to the built-in edition
pub const DEFAULT_EDITION_NAME: &str = "default";

/// Parse the built-in default document
pub fn default_document() -> Result<Value, ContentError> {
    serde_json::from_str(DEFAULT_EDITION_JSON).map_err(|source| ContentError::Unparsable {
        path: PathBuf::from("<built-in>"),
        source,
    })
}

/// Recursively merge `overlay` into `base`
///
/// Objects merge key-wise; any other overlay value replaces the base value.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match value {
                    Value::Object(_) => {
                        let slot = base_map
                            .entry(key)
                            .or_insert_with(|| Value::Object(Default::default()));
                        if !slot.is_object() {
                            *slot = Value::Object(Default::default());
                        }
                        deep_merge(slot, value);
                    }
                    other => {
                        base_map.insert(key, other);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Load the default briefing with `override_path` merged over it
///
/// A missing override is normal. An unreadable or invalid one is logged and
/// ignored, so the default briefing is still shown.
pub fn load_with_override(override_path: &Path) -> Result<Edition, ContentError> {
    let mut document = default_document()?;

    if override_path.is_file() {
        match read_override(override_path) {
            Ok(overlay) => {
                deep_merge(&mut document, overlay);
                info!("Applied content override {}", override_path.display());
            }
            Err(e) => warn!("{}. Using default content.", e),
        }
    }

    let mut edition: Edition =
        serde_json::from_value(document).map_err(|source| ContentError::Unparsable {
            path: override_path.to_path_buf(),
            source,
        })?;
    edition.name = DEFAULT_EDITION_NAME.to_string();
    Ok(edition)
}

fn read_override(path: &Path) -> Result<Value, ContentError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ContentError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ContentError::Unparsable {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_default_document_parses() {
        let edition: Edition = serde_json::from_value(default_document().unwrap()).unwrap();
        assert_eq!(edition.title, "Bram's AI Newsletter");
        assert_eq!(edition.top_developments.len(), 7);
        assert_eq!(edition.regional_overviews.len(), 5);
        assert_eq!(edition.audio_files.len(), 3);
    }

    #[test]
    fn test_deep_merge_leaf_replaces() {
        let mut base = json!({"title": "Old", "period": "P"});
        deep_merge(&mut base, json!({"title": "New"}));
        assert_eq!(base, json!({"title": "New", "period": "P"}));
    }

    #[test]
    fn test_deep_merge_nested_objects_merge() {
        let mut base = json!({"audio_files": {"Short": "a.m4a", "Long": "b.m4a"}});
        deep_merge(&mut base, json!({"audio_files": {"Long": "c.m4a", "Extra": "d.m4a"}}));
        assert_eq!(
            base,
            json!({"audio_files": {"Short": "a.m4a", "Long": "c.m4a", "Extra": "d.m4a"}})
        );
    }

    #[test]
    fn test_deep_merge_arrays_replace_wholesale() {
        let mut base = json!({"top_developments": [{"title": "A", "description": "a"}]});
        deep_merge(&mut base, json!({"top_developments": []}));
        assert_eq!(base, json!({"top_developments": []}));
    }

    #[test]
    fn test_deep_merge_object_over_scalar() {
        let mut base = json!({"audio_files": "none"});
        deep_merge(&mut base, json!({"audio_files": {"Short": "a.m4a"}}));
        assert_eq!(base, json!({"audio_files": {"Short": "a.m4a"}}));
    }

    #[test]
    fn test_load_without_override_file() {
        let tmp = TempDir::new().unwrap();
        let edition = load_with_override(&tmp.path().join("content.json")).unwrap();
        assert_eq!(edition.name, DEFAULT_EDITION_NAME);
        assert_eq!(edition.subtitle, "Weekly Executive Aviation Briefing");
    }

    #[test]
    fn test_load_with_override_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("content.json");
        std::fs::write(
            &path,
            r#"{"period": "4 November 2025 to 10 November 2025", "audio_files": {"2‑Minute Summary": "short.mp3"}}"#,
        )
        .unwrap();

        let edition = load_with_override(&path).unwrap();

        assert_eq!(edition.period, "4 November 2025 to 10 November 2025");
        assert_eq!(edition.title, "Bram's AI Newsletter");
        assert_eq!(edition.audio_files.len(), 3);
        assert_eq!(edition.audio_files[0].file, "short.mp3");
    }

    #[test]
    fn test_invalid_override_falls_back_to_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("content.json");
        std::fs::write(&path, "not json").unwrap();

        let edition = load_with_override(&path).unwrap();
        assert_eq!(edition.top_developments.len(), 7);
    }
}
