//! Reader locations and the navigation requests the session emits.
//!
//! The session never builds URLs; it emits [`NavigationIntent`]s and the
//! routing layer maps them to paths with [`route_for`].

use serde::Serialize;
use ts_rs::TS;

/// The two path identifiers a reader page is opened with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub work_slug: String,
    pub chapter_key: String,
}

impl Location {
    pub fn new(work_slug: impl Into<String>, chapter_key: impl Into<String>) -> Self {
        Self {
            work_slug: work_slug.into(),
            chapter_key: chapter_key.into(),
        }
    }

    /// Extract `(work, chapter)` from a path such as `/some-work/21`.
    /// Returns `None` unless two non-empty segments are present; anything
    /// after the second segment is ignored.
    pub fn parse(path: &str) -> Option<Self> {
        let mut segments = path.split('/').filter(|segment| !segment.is_empty());
        let work = segments.next()?;
        let chapter = segments.next()?;
        Some(Self::new(work, chapter))
    }
}

/// A request for the routing layer to show something else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum NavigationIntent {
    /// Open another chapter of the current work.
    Chapter { work_slug: String, chapter_key: String },
    /// The work's overview page.
    Overview { work_slug: String },
    /// Landing page; used when no work is known.
    Home,
}

pub fn route_for(intent: &NavigationIntent) -> String {
    match intent {
        NavigationIntent::Chapter {
            work_slug,
            chapter_key,
        } => format!("/{work_slug}/{chapter_key}"),
        NavigationIntent::Overview { work_slug } => format!("/{work_slug}"),
        NavigationIntent::Home => "/".to_string(),
    }
}
