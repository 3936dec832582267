use super::snapshot::ReaderSnapshot;
use crate::config::ReadingMode;
use crate::location::NavigationIntent;
use crate::viewport::VisibilityEntry;

/// Direction of a one-position page step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStep {
    Backward,
    Forward,
}

/// Work the session asks its host to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Navigate(NavigationIntent),
    /// Bring the focused page of a paged mode into view.
    ScrollToPage { page: usize },
    /// A Vertical chapter was (re)opened.
    ScrollToTop,
}

#[derive(Debug, Clone)]
pub enum SessionCommand {
    GetSnapshot,
    SetMode { mode: ReadingMode },
    ToggleHeader,
    GoToChapter { key: String },
    PreviousChapter,
    NextChapter,
    SetPage { page: i64 },
    StepPage { step: PageStep },
    ViewportPageObserved { index: usize },
    VisibilityChanged { entries: Vec<VisibilityEntry> },
    PageLoadFailed { index: usize },
    PageLoaded { index: usize },
    PollPreloads,
}

impl SessionCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::GetSnapshot => "reader_get_snapshot",
            Self::SetMode { .. } => "reader_set_mode",
            Self::ToggleHeader => "reader_toggle_header",
            Self::GoToChapter { .. } => "reader_go_to_chapter",
            Self::PreviousChapter => "reader_previous_chapter",
            Self::NextChapter => "reader_next_chapter",
            Self::SetPage { .. } => "reader_set_page",
            Self::StepPage {
                step: PageStep::Backward,
            } => "reader_step_backward",
            Self::StepPage {
                step: PageStep::Forward,
            } => "reader_step_forward",
            Self::ViewportPageObserved { .. } => "reader_viewport_page_observed",
            Self::VisibilityChanged { .. } => "reader_visibility_changed",
            Self::PageLoadFailed { .. } => "reader_page_load_failed",
            Self::PageLoaded { .. } => "reader_page_loaded",
            Self::PollPreloads => "reader_poll_preloads",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub action: &'static str,
    pub effects: Vec<Effect>,
    pub snapshot: ReaderSnapshot,
}

impl SessionEvent {
    /// The navigation request among the effects, if any.
    pub fn navigation(&self) -> Option<&NavigationIntent> {
        self.effects.iter().find_map(|effect| match effect {
            Effect::Navigate(intent) => Some(intent),
            _ => None,
        })
    }
}
