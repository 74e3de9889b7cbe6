//! Edition document model

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

static CITATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Citation:\s*\((?P<marker>[^)]*)\)").expect("valid citation regex"));

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s)\]"'<>]+"#).expect("valid url regex"));

/// One headline item or regional overview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Unique within its list; joins feedback rows to the item
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl NewsItem {
    /// The `Citation: (...)` marker embedded in the description, if any
    pub fn citation(&self) -> Option<&str> {
        CITATION_RE
            .captures(&self.description)
            .and_then(|caps| caps.name("marker"))
            .map(|m| m.as_str().trim())
            .filter(|marker| !marker.is_empty())
    }

    /// URLs embedded in the description text, in order of appearance
    pub fn embedded_urls(&self) -> Vec<&str> {
        URL_RE
            .find_iter(&self.description)
            .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':']))
            .collect()
    }

    /// Link to render for the item: explicit source first, then the first embedded URL
    pub fn link(&self) -> Option<&str> {
        self.url_source
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.embedded_urls().into_iter().next())
    }
}

/// Audio label and the file it refers to, relative to the edition directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioLink {
    pub label: String,
    pub file: String,
}

/// Audio link resolved against the edition directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioTrack {
    pub label: String,
    pub file: String,
    pub mime_type: &'static str,
    /// False when the referenced file is not on disk
    pub available: bool,
}

/// Which list of an edition an item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    TopDevelopments,
    RegionalOverviews,
}

/// One publication unit, parsed from its JSON document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edition {
    /// Edition identifier (folder name); not part of the document
    #[serde(default, skip_deserializing)]
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub period: String,
    #[serde(
        default,
        deserialize_with = "deserialize_audio_links",
        serialize_with = "serialize_audio_links"
    )]
    pub audio_files: Vec<AudioLink>,
    #[serde(default)]
    pub top_developments: Vec<NewsItem>,
    #[serde(default)]
    pub regional_overviews: Vec<NewsItem>,
}

impl Edition {
    /// Every item with its section, top developments first
    pub fn items(&self) -> impl Iterator<Item = (Section, &NewsItem)> {
        self.top_developments
            .iter()
            .map(|item| (Section::TopDevelopments, item))
            .chain(
                self.regional_overviews
                    .iter()
                    .map(|item| (Section::RegionalOverviews, item)),
            )
    }

    /// Look up an item by its title in either section
    pub fn find_item(&self, title: &str) -> Option<(Section, &NewsItem)> {
        self.items().find(|(_, item)| item.title == title)
    }
}

/// MIME type used when serving an audio asset
pub fn audio_mime_type(file: &str) -> &'static str {
    let is_mp3 = Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("mp3"))
        .unwrap_or(false);

    if is_mp3 {
        "audio/mpeg"
    } else {
        "audio/mp4"
    }
}

/// `audio_files` is a JSON object whose key order is the display order
struct OrderedAudioLinks(Vec<AudioLink>);

impl<'de> Deserialize<'de> for OrderedAudioLinks {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LinksVisitor;

        impl<'de> Visitor<'de> for LinksVisitor {
            type Value = OrderedAudioLinks;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of audio label to file name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut links = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((label, file)) = map.next_entry::<String, String>()? {
                    links.push(AudioLink { label, file });
                }
                Ok(OrderedAudioLinks(links))
            }
        }

        deserializer.deserialize_map(LinksVisitor)
    }
}

fn deserialize_audio_links<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<AudioLink>, D::Error> {
    Option::<OrderedAudioLinks>::deserialize(deserializer)
        .map(|links| links.map(|l| l.0).unwrap_or_default())
}

fn serialize_audio_links<S: Serializer>(links: &[AudioLink], serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(links.len()))?;
    for link in links {
        map.serialize_entry(&link.label, &link.file)?;
    }
    map.end()
}
