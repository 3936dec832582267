use crate::config::ReadingMode;
use serde::Serialize;
use ts_rs::TS;

/// One page slot as the renderer should draw it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct PageView {
    pub index: usize,
    pub url: String,
    pub load_error: bool,
    /// Neither failed nor known to be loaded yet.
    pub show_spinner: bool,
}

/// Everything the rendering layer reads after each event.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ReaderSnapshot {
    pub work_slug: String,
    pub work_title: String,
    pub work_genre: Option<String>,
    pub chapter_key: String,
    pub chapter_title: String,
    pub chapter_keys: Vec<String>,
    pub chapter_position: usize,
    pub mode: ReadingMode,
    pub header_hidden: bool,
    pub current_page: usize,
    pub total_pages: usize,
    pub display_indices: Vec<usize>,
    pub pages: Vec<PageView>,
    pub can_go_previous_chapter: bool,
    pub can_go_next_chapter: bool,
    pub can_go_previous_page: bool,
    pub can_go_next_page: bool,
}

impl ReaderSnapshot {
    /// Pages currently on screen in a paged mode, or all pages in Vertical.
    pub fn visible_pages(&self) -> impl Iterator<Item = &PageView> {
        self.display_indices
            .iter()
            .filter_map(|idx| self.pages.get(*idx))
    }
}

/// Page indices (0-based) shown for `current_page` (1-based).
///
/// Single shows the focused page, Double the focused page and its right-hand
/// neighbour when it exists, Vertical every page.
pub fn display_indices(mode: ReadingMode, current_page: usize, total_pages: usize) -> Vec<usize> {
    match mode {
        ReadingMode::Vertical => (0..total_pages).collect(),
        ReadingMode::Single => {
            if (1..=total_pages).contains(&current_page) {
                vec![current_page - 1]
            } else {
                Vec::new()
            }
        }
        ReadingMode::Double => {
            if (1..=total_pages).contains(&current_page) {
                let mut indices = vec![current_page - 1];
                if current_page < total_pages {
                    indices.push(current_page);
                }
                indices
            } else {
                Vec::new()
            }
        }
    }
}
