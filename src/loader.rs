//! Resolving a work slug to its manifest and loading it.
//!
//! This is the collaborator that sits in front of the session: it fetches
//! and validates the work once, and reports failures as a [`LoadFailure`]
//! carrying a link back to a known-good location. Nothing here retries.

use crate::config::{AppConfig, WorkSourceConfig};
use crate::location::{Location, NavigationIntent};
use crate::text_utils::slugify;
use crate::work::Work;
use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailureKind {
    MissingLocation,
    UnknownWork,
    Fetch,
    TitleMismatch,
    ChapterNotFound,
}

/// A failure to open a reader session, ready to be displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub kind: LoadFailureKind,
    pub message: String,
    /// Where the "back" link of the error screen should lead.
    pub fallback: NavigationIntent,
}

impl LoadFailure {
    pub fn new(
        kind: LoadFailureKind,
        message: impl Into<String>,
        fallback: NavigationIntent,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            fallback,
        }
    }

    pub fn missing_location(raw: &str) -> Self {
        Self::new(
            LoadFailureKind::MissingLocation,
            format!("Work slug or chapter key missing from \"{raw}\"."),
            NavigationIntent::Home,
        )
    }

    pub fn chapter_not_found(work_slug: &str, chapter_key: &str) -> Self {
        Self::new(
            LoadFailureKind::ChapterNotFound,
            format!("Chapter {chapter_key} not found or data missing."),
            NavigationIntent::Overview {
                work_slug: work_slug.to_string(),
            },
        )
    }
}

impl std::fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for LoadFailure {}

/// Where a work's manifest lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkSource {
    pub title: String,
    pub slug: String,
    pub manifest: String,
    pub genre: Option<String>,
}

impl From<&WorkSourceConfig> for WorkSource {
    fn from(config: &WorkSourceConfig) -> Self {
        Self {
            slug: slugify(&config.title),
            title: config.title.clone(),
            manifest: config.manifest.clone(),
            genre: config.genre.clone(),
        }
    }
}

/// Known works, looked up by slug.
#[derive(Debug, Clone, Default)]
pub struct WorkCatalog {
    sources: Vec<WorkSource>,
}

impl WorkCatalog {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            sources: config.works.iter().map(WorkSource::from).collect(),
        }
    }

    pub fn sources(&self) -> &[WorkSource] {
        &self.sources
    }

    pub fn resolve(&self, slug: &str) -> Option<&WorkSource> {
        self.sources.iter().find(|source| source.slug == slug)
    }
}

/// Parse a location string, reporting the failure the reader should show.
pub fn parse_location(raw: &str) -> Result<Location, LoadFailure> {
    Location::parse(raw).ok_or_else(|| LoadFailure::missing_location(raw))
}

/// Fetch, decode and validate the work behind `slug`.
pub fn load_work(
    catalog: &WorkCatalog,
    slug: &str,
    timeout: Duration,
) -> Result<Work, LoadFailure> {
    let Some(source) = catalog.resolve(slug) else {
        warn!(%slug, "No manifest registered for slug");
        return Err(LoadFailure::new(
            LoadFailureKind::UnknownWork,
            format!("Work data for slug \"{slug}\" not found."),
            NavigationIntent::Home,
        ));
    };

    let mut work = fetch_manifest(&source.manifest, timeout).map_err(|err| {
        warn!(%slug, manifest = %source.manifest, "Failed to load work: {err:#}");
        LoadFailure::new(
            LoadFailureKind::Fetch,
            format!("Failed to load work or chapter data for \"{slug}\"."),
            NavigationIntent::Home,
        )
    })?;

    validate_slug(&work, slug)?;
    work.genre = source.genre.clone();
    info!(
        %slug,
        title = %work.title,
        chapters = work.chapters.len(),
        "Loaded work manifest"
    );
    Ok(work)
}

/// The manifest's title must slugify to the slug it was requested under.
pub fn validate_slug(work: &Work, slug: &str) -> Result<(), LoadFailure> {
    if slugify(&work.title) == slug {
        return Ok(());
    }
    warn!(%slug, title = %work.title, "Work title does not match slug");
    Err(LoadFailure::new(
        LoadFailureKind::TitleMismatch,
        format!("Work title mismatch for slug \"{slug}\"."),
        NavigationIntent::Home,
    ))
}

/// Read a manifest from an HTTP(S) URL or a local path.
pub fn fetch_manifest(location: &str, timeout: Duration) -> Result<Work> {
    let contents = if location.starts_with("http://") || location.starts_with("https://") {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("aphrodite-reader/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        let response = client
            .get(location)
            .send()
            .with_context(|| format!("request to {location} failed"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("HTTP error! status: {status} from {location}"));
        }
        response
            .text()
            .with_context(|| format!("failed to read body from {location}"))?
    } else {
        let path = location.strip_prefix("file://").unwrap_or(location);
        fs::read_to_string(Path::new(path)).with_context(|| format!("Failed to read {path}"))?
    };
    Work::from_json(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn write_manifest(tag: &str, contents: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let name = format!("aphrodite-loader-{tag}-{}-{nanos}", std::process::id());
        let dir = std::env::temp_dir().join(name);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("work.json");
        fs::write(&path, contents).unwrap();
        path
    }

    fn catalog_for(title: &str, manifest: &str) -> WorkCatalog {
        let mut config = AppConfig::default();
        config.works = vec![WorkSourceConfig {
            title: title.to_string(),
            manifest: manifest.to_string(),
            genre: Some("Drama".to_string()),
        }];
        WorkCatalog::from_config(&config)
    }

    #[test]
    fn default_catalog_resolves_builtin_works() {
        let catalog = WorkCatalog::from_config(&AppConfig::default());
        assert!(catalog.resolve("tsumi-to-batsu-no-spica").is_some());
        assert!(catalog.resolve("olympia-of-infidelity").is_some());
        assert!(catalog.resolve("something-else").is_none());
    }

    #[test]
    fn loads_local_manifest_and_attaches_genre() {
        let path = write_manifest(
            "ok",
            r#"{"title": "Local Work", "chapters": {"1": {"title": "One", "groups": {"g": ["u1"]}}}}"#,
        );
        let catalog = catalog_for("Local Work", path.to_str().unwrap());

        let work = load_work(&catalog, "local-work", Duration::from_secs(1)).expect("work");
        assert_eq!(work.genre.as_deref(), Some("Drama"));
        assert_eq!(work.page_urls("1"), ["u1".to_string()]);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn title_mismatch_is_a_load_failure() {
        let path = write_manifest("mismatch", r#"{"title": "Another Work", "chapters": {}}"#);
        let catalog = catalog_for("Local Work", path.to_str().unwrap());

        let err = load_work(&catalog, "local-work", Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.kind, LoadFailureKind::TitleMismatch);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn unreadable_manifest_links_home() {
        let catalog = catalog_for("Local Work", "/nonexistent/aphrodite/work.json");
        let err = load_work(&catalog, "local-work", Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.kind, LoadFailureKind::Fetch);
        assert_eq!(err.fallback, NavigationIntent::Home);
    }

    #[test]
    fn unknown_slug_links_home() {
        let catalog = WorkCatalog::default();
        let err = load_work(&catalog, "nobody", Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.kind, LoadFailureKind::UnknownWork);
        assert_eq!(err.fallback, NavigationIntent::Home);
    }

    #[test]
    fn incomplete_location_is_reported() {
        let err = parse_location("/only-work").unwrap_err();
        assert_eq!(err.kind, LoadFailureKind::MissingLocation);
        assert_eq!(err.fallback, NavigationIntent::Home);
    }
}
