//! In-memory representation of a work manifest.
//!
//! Manifests are JSON of the shape
//! `{ title, chapters: { key: { title, last_updated, groups: { name: [url] } } } }`.
//! Maps keep insertion order so the first declared image group of a chapter is
//! well defined.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// A series and its chapters. Immutable once a session has been opened on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Work {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    /// Attached from the catalog entry, not part of the manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default)]
    pub chapters: IndexMap<String, Chapter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub last_updated: Option<u64>,
    #[serde(default)]
    pub groups: IndexMap<String, Vec<String>>,
}

impl Work {
    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("manifest is not a valid work description")
    }

    pub fn chapter(&self, key: &str) -> Option<&Chapter> {
        self.chapters.get(key)
    }

    /// Page URLs of `key`'s active image group; empty for unknown chapters.
    pub fn page_urls(&self, key: &str) -> &[String] {
        self.chapter(key).map(Chapter::pages).unwrap_or(&[])
    }
}

impl Chapter {
    /// The active image group: always the first one declared.
    pub fn pages(&self) -> &[String] {
        self.groups
            .first()
            .map(|(_, urls)| urls.as_slice())
            .unwrap_or(&[])
    }

    pub fn active_group(&self) -> Option<&str> {
        self.groups.keys().next().map(String::as_str)
    }
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Float(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Int(value)) => Some(value),
        Some(Raw::Float(value)) if value.is_finite() && value >= 0.0 => Some(value as u64),
        Some(Raw::Text(text)) => text.trim().parse::<f64>().ok().and_then(|value| {
            (value.is_finite() && value >= 0.0).then_some(value as u64)
        }),
        _ => None,
    })
}

#[cfg(test)]
pub(crate) fn build_test_work(title: &str, chapters: &[(&str, usize)]) -> Work {
    let chapters = chapters
        .iter()
        .map(|(key, pages)| {
            let urls = (1..=*pages)
                .map(|page| format!("https://img.test/{key}/{page:03}.png"))
                .collect();
            let mut groups = IndexMap::new();
            groups.insert("Scans".to_string(), urls);
            (
                key.to_string(),
                Chapter {
                    title: format!("Chapter {key}"),
                    last_updated: Some(1_700_000_000),
                    groups,
                },
            )
        })
        .collect();
    Work {
        title: title.to_string(),
        description: None,
        author: None,
        artist: None,
        cover: None,
        genre: None,
        chapters,
    }
}
