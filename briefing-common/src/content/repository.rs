//! Edition discovery and loading
//!
//! The content root holds one directory per edition, each with a single JSON
//! document and its audio assets. A document placed directly in the root is
//! also accepted and named after its file stem.

use super::model::{audio_mime_type, AudioTrack, Edition};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Audio extensions picked up when a document does not list its audio files
const CONVENTIONAL_AUDIO_EXTENSIONS: [&str; 2] = ["m4a", "mp3"];

/// Reasons an edition could not be resolved
///
/// Every variant means "content missing" to the caller: the page renders a
/// placeholder instead of failing.
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("No editions found under {}", root.display())]
    NoEditions { root: PathBuf },

    #[error("Unknown edition: {name}")]
    UnknownEdition { name: String },

    #[error("Content file missing: {}", path.display())]
    Missing { path: PathBuf },

    #[error("Could not read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse {}: {source}", path.display())]
    Unparsable {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Content work could not run to completion (e.g. a failed worker task)
    #[error("Content lookup failed: {0}")]
    Internal(String),
}

/// Reference to an edition document on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditionRef {
    /// Edition identifier, e.g. "Week 44"
    pub name: String,
    #[serde(skip)]
    pub path: PathBuf,
    /// Last modification time of the document
    pub modified: DateTime<Utc>,
}

impl EditionRef {
    /// Directory holding the document and its audio assets
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Read-only access to the edition documents under a content root
#[derive(Debug, Clone)]
pub struct ContentRepository {
    root: PathBuf,
}

impl ContentRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All edition documents, most recently modified first
    ///
    /// Creates the content root when absent. Never fails: unreadable entries
    /// are logged and skipped.
    pub fn list_editions(&self) -> Vec<EditionRef> {
        if let Err(e) = std::fs::create_dir_all(&self.root) {
            warn!("Could not create content root {}: {}", self.root.display(), e);
            return Vec::new();
        }

        let mut editions: Vec<EditionRef> = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(2)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name().to_str()))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable content entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && is_json(entry.path()))
            .filter_map(|entry| self.edition_ref(entry.depth(), entry.path()))
            .collect();

        editions.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| a.name.cmp(&b.name))
        });

        // One document per edition: a second JSON file in the same folder loses
        // to the more recent one.
        let mut seen = std::collections::HashSet::new();
        editions.retain(|edition| {
            let first = seen.insert(edition.name.clone());
            if !first {
                debug!("Ignoring extra document {} for edition {}", edition.path.display(), edition.name);
            }
            first
        });

        editions
    }

    /// Find an edition by identifier
    pub fn find(&self, name: &str) -> Option<EditionRef> {
        self.list_editions().into_iter().find(|e| e.name == name)
    }

    /// Load the given edition, or the most recent one when `None`
    pub fn load(&self, edition: Option<&EditionRef>) -> Result<Edition, ContentError> {
        let result = match edition {
            Some(edition) => read_edition(edition),
            None => match self.list_editions().first() {
                Some(latest) => read_edition(latest),
                None => Err(ContentError::NoEditions {
                    root: self.root.clone(),
                }),
            },
        };

        if let Err(e) = &result {
            warn!("{}", e);
        }
        result
    }

    /// Load an edition selected by name (the sidebar selector)
    pub fn load_named(&self, name: &str) -> Result<Edition, ContentError> {
        match self.find(name) {
            Some(edition) => self.load(Some(&edition)),
            None => {
                let err = ContentError::UnknownEdition {
                    name: name.to_string(),
                };
                warn!("{}", err);
                Err(err)
            }
        }
    }

    /// Resolve the audio links of an edition against its directory
    ///
    /// Without an `audio_files` mapping, every audio file in the edition
    /// directory is offered, labelled by its file stem.
    pub fn audio_tracks(&self, edition: &Edition, edition_ref: &EditionRef) -> Vec<AudioTrack> {
        let dir = edition_ref.directory();

        if !edition.audio_files.is_empty() {
            return edition
                .audio_files
                .iter()
                .map(|link| {
                    let available = self.audio_path(edition_ref, &link.file).is_some();
                    if !available {
                        warn!(
                            "Audio file '{}' not found for edition {}",
                            link.file, edition_ref.name
                        );
                    }
                    AudioTrack {
                        label: link.label.clone(),
                        file: link.file.clone(),
                        mime_type: audio_mime_type(&link.file),
                        available,
                    }
                })
                .collect();
        }

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Could not list audio in {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let mut tracks: Vec<AudioTrack> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_conventional_audio(path))
            .filter_map(|path| {
                let file = path.file_name()?.to_str()?.to_string();
                let label = path.file_stem()?.to_str()?.to_string();
                Some(AudioTrack {
                    label,
                    mime_type: audio_mime_type(&file),
                    file,
                    available: true,
                })
            })
            .collect();

        tracks.sort_by(|a, b| a.file.cmp(&b.file));
        tracks
    }

    /// Path of one audio asset of an edition, if it exists
    ///
    /// Only bare file names are accepted.
    pub fn audio_path(&self, edition_ref: &EditionRef, file: &str) -> Option<PathBuf> {
        if !is_bare_file_name(file) {
            warn!("Rejected audio file name: {:?}", file);
            return None;
        }

        let path = edition_ref.directory().join(file);
        path.is_file().then_some(path)
    }

    fn edition_ref(&self, depth: usize, path: &Path) -> Option<EditionRef> {
        let name = if depth == 1 {
            path.file_stem()?.to_str()?.to_string()
        } else {
            path.parent()?.file_name()?.to_str()?.to_string()
        };

        let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => DateTime::<Utc>::from(modified),
            Err(e) => {
                warn!("Could not stat {}: {}", path.display(), e);
                return None;
            }
        };

        Some(EditionRef {
            name,
            path: path.to_path_buf(),
            modified,
        })
    }
}

/// Parse one edition document
pub fn read_edition(edition: &EditionRef) -> Result<Edition, ContentError> {
    let raw = std::fs::read_to_string(&edition.path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ContentError::Missing {
                path: edition.path.clone(),
            }
        } else {
            ContentError::Unreadable {
                path: edition.path.clone(),
                source,
            }
        }
    })?;

    let mut parsed: Edition =
        serde_json::from_str(&raw).map_err(|source| ContentError::Unparsable {
            path: edition.path.clone(),
            source,
        })?;
    parsed.name = edition.name.clone();

    debug!("Loaded edition {} from {}", edition.name, edition.path.display());
    Ok(parsed)
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

fn is_conventional_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            CONVENTIONAL_AUDIO_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Audio references must name a file directly inside the edition directory
fn is_bare_file_name(file: &str) -> bool {
    !file.is_empty() && !file.contains(['/', '\\']) && !file.starts_with('.')
}

fn is_hidden(name: Option<&str>) -> bool {
    name.map(|n| n.starts_with('.')).unwrap_or(false)
}
