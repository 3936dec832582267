//! The reader state machine.
//!
//! A session is opened on a loaded work at one chapter. It owns the reading
//! mode, the header flag, the chapter/page position and per-page load errors,
//! and it drives the preload cache and the viewport tracker as side effects
//! of navigation. Chapter changes are never performed here: the session emits
//! a [`NavigationIntent`] and the host re-enters it with
//! [`ReaderSession::enter_chapter`] or [`ReaderSession::replace_work`].

mod commands;
mod snapshot;

pub use commands::{Effect, PageStep, SessionCommand, SessionEvent};
pub use snapshot::{PageView, ReaderSnapshot, display_indices};

use crate::chapter_index::ChapterIndex;
use crate::config::{AppConfig, ReadingMode};
use crate::loader::{LoadFailure, validate_slug};
use crate::location::{Location, NavigationIntent};
use crate::preferences::{
    PreferenceStore, load_header_hidden, load_reading_mode, save_header_hidden, save_reading_mode,
};
use crate::preload::{ImageLoader, PreloadCache};
use crate::viewport::{ViewportTracker, VisibilityEntry, VisibilityObserver};
use crate::work::Work;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Tunables taken from the app config.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Mode used when no preference is stored.
    pub fallback_mode: ReadingMode,
    pub preload_next_chapter: bool,
    pub visibility_threshold: f32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            fallback_mode: ReadingMode::Vertical,
            preload_next_chapter: true,
            visibility_threshold: 0.5,
        }
    }
}

impl From<&AppConfig> for SessionOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            fallback_mode: config.default_mode,
            preload_next_chapter: config.preload_next_chapter,
            visibility_threshold: config.visibility_threshold,
        }
    }
}

/// Capabilities injected by the host.
pub struct SessionPorts {
    pub preferences: Box<dyn PreferenceStore>,
    pub image_loader: Box<dyn ImageLoader>,
    pub observer: Box<dyn VisibilityObserver>,
}

pub struct ReaderSession {
    work: Work,
    work_slug: String,
    index: ChapterIndex,
    mode: ReadingMode,
    header_hidden: bool,
    current_chapter_key: String,
    current_page: usize,
    load_errors: BTreeMap<usize, bool>,
    preferences: Box<dyn PreferenceStore>,
    preload: PreloadCache,
    viewport: ViewportTracker,
    preload_next_chapter: bool,
}

impl ReaderSession {
    /// Open a session at `location.chapter_key` of an already validated work.
    pub fn open(
        work: Work,
        location: &Location,
        options: SessionOptions,
        ports: SessionPorts,
    ) -> Result<Self, LoadFailure> {
        if work.chapter(&location.chapter_key).is_none() {
            warn!(
                work = %location.work_slug,
                chapter = %location.chapter_key,
                "Requested chapter is not part of the work"
            );
            return Err(LoadFailure::chapter_not_found(
                &location.work_slug,
                &location.chapter_key,
            ));
        }

        let mode = load_reading_mode(ports.preferences.as_ref(), options.fallback_mode);
        let header_hidden = load_header_hidden(ports.preferences.as_ref());
        let index = ChapterIndex::from_work(&work);

        let mut session = Self {
            work,
            work_slug: location.work_slug.clone(),
            index,
            mode,
            header_hidden,
            current_chapter_key: location.chapter_key.clone(),
            current_page: 1,
            load_errors: BTreeMap::new(),
            preferences: ports.preferences,
            preload: PreloadCache::new(ports.image_loader),
            viewport: ViewportTracker::new(ports.observer, options.visibility_threshold),
            preload_next_chapter: options.preload_next_chapter,
        };
        session.begin_chapter();
        info!(
            work = %session.work_slug,
            chapter = %session.current_chapter_key,
            mode = session.mode.as_str(),
            pages = session.total_pages(),
            "Opened reader session"
        );
        Ok(session)
    }

    /// Re-initialize at another chapter of the loaded work.
    pub fn enter_chapter(
        &mut self,
        key: &str,
        effects: &mut Vec<Effect>,
    ) -> Result<(), LoadFailure> {
        if self.work.chapter(key).is_none() {
            return Err(LoadFailure::chapter_not_found(&self.work_slug, key));
        }
        self.current_chapter_key = key.to_string();
        self.begin_chapter();
        effects.push(self.chapter_start_effect());
        info!(
            chapter = %self.current_chapter_key,
            pages = self.total_pages(),
            "Entered chapter"
        );
        Ok(())
    }

    /// Swap in a freshly loaded copy of the work and enter `key`.
    pub fn replace_work(
        &mut self,
        work: Work,
        key: &str,
        effects: &mut Vec<Effect>,
    ) -> Result<(), LoadFailure> {
        validate_slug(&work, &self.work_slug)?;
        if work.chapter(key).is_none() {
            return Err(LoadFailure::chapter_not_found(&self.work_slug, key));
        }
        self.index = ChapterIndex::from_work(&work);
        self.work = work;
        self.enter_chapter(key, effects)
    }

    pub fn work(&self) -> &Work {
        &self.work
    }

    pub fn work_slug(&self) -> &str {
        &self.work_slug
    }

    pub fn chapter_index(&self) -> &ChapterIndex {
        &self.index
    }

    pub fn mode(&self) -> ReadingMode {
        self.mode
    }

    pub fn header_hidden(&self) -> bool {
        self.header_hidden
    }

    pub fn current_chapter_key(&self) -> &str {
        &self.current_chapter_key
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_urls(&self) -> &[String] {
        self.work.page_urls(&self.current_chapter_key)
    }

    pub fn total_pages(&self) -> usize {
        self.page_urls().len()
    }

    pub fn load_errors(&self) -> &BTreeMap<usize, bool> {
        &self.load_errors
    }

    pub fn preload(&self) -> &PreloadCache {
        &self.preload
    }

    pub fn viewport(&self) -> &ViewportTracker {
        &self.viewport
    }

    /// Switch reading mode. The page number is kept as is.
    pub fn set_mode(&mut self, mode: ReadingMode, effects: &mut Vec<Effect>) {
        let previous = self.mode;
        self.mode = mode;
        save_reading_mode(self.preferences.as_mut(), mode);

        if mode == ReadingMode::Vertical {
            if previous != ReadingMode::Vertical {
                self.viewport.subscribe(self.total_pages());
            }
        } else {
            self.viewport.unsubscribe();
            effects.push(Effect::ScrollToPage {
                page: self.current_page,
            });
        }
        info!(
            from = previous.as_str(),
            to = mode.as_str(),
            page = self.current_page,
            "Reading mode changed"
        );
    }

    pub fn toggle_header(&mut self) {
        self.header_hidden = !self.header_hidden;
        save_header_hidden(self.preferences.as_mut(), self.header_hidden);
        debug!(hidden = self.header_hidden, "Toggled header");
    }

    /// Request another chapter of this work. Returns false for unknown keys.
    pub fn go_to_chapter(&mut self, key: &str, effects: &mut Vec<Effect>) -> bool {
        if !self.index.contains(key) {
            warn!(chapter = %key, "Ignoring navigation to unknown chapter");
            return false;
        }
        info!(from = %self.current_chapter_key, to = %key, "Requesting chapter");
        effects.push(Effect::Navigate(NavigationIntent::Chapter {
            work_slug: self.work_slug.clone(),
            chapter_key: key.to_string(),
        }));
        true
    }

    /// No-op at the first chapter.
    pub fn go_to_previous_chapter(&mut self, effects: &mut Vec<Effect>) {
        match self.index.previous(&self.current_chapter_key) {
            Some(previous) => {
                let previous = previous.to_string();
                self.go_to_chapter(&previous, effects);
            }
            None => debug!(chapter = %self.current_chapter_key, "Already at the first chapter"),
        }
    }

    /// At the last chapter this requests the work overview.
    pub fn go_to_next_chapter(&mut self, effects: &mut Vec<Effect>) {
        if let Some(next) = self.index.next(&self.current_chapter_key) {
            let next = next.to_string();
            self.go_to_chapter(&next, effects);
        } else if self.index.is_last(&self.current_chapter_key) {
            info!(work = %self.work_slug, "Finished the last chapter; requesting overview");
            effects.push(Effect::Navigate(NavigationIntent::Overview {
                work_slug: self.work_slug.clone(),
            }));
        } else {
            warn!(chapter = %self.current_chapter_key, "Current chapter missing from index");
        }
    }

    /// Jump to a 1-based page. Targets past either end of the chapter cross
    /// into the neighbouring chapter instead. In Vertical mode the position
    /// follows visibility, so in-range targets are ignored there.
    pub fn set_page(&mut self, target: i64, effects: &mut Vec<Effect>) {
        let total = self.total_pages();
        if target > total as i64 {
            debug!(requested = target, total, "Page past chapter end");
            self.go_to_next_chapter(effects);
            return;
        }
        if target < 1 {
            debug!(requested = target, "Page before chapter start");
            self.go_to_previous_chapter(effects);
            return;
        }

        if self.mode == ReadingMode::Vertical {
            debug!(requested = target, "Ignoring page jump in Vertical mode");
            return;
        }

        let page = (target as usize).clamp(1, total.max(1));
        if page == self.current_page {
            return;
        }
        self.current_page = page;
        effects.push(Effect::ScrollToPage { page });
        info!(chapter = %self.current_chapter_key, page, "Navigated to page");
    }

    /// Move one position. In Double mode a position is a full spread unless
    /// only one page remains in that direction.
    pub fn step_page(&mut self, step: PageStep, effects: &mut Vec<Effect>) {
        let total = self.total_pages() as i64;
        let current = self.current_page as i64;
        let target = match (self.mode, step) {
            (ReadingMode::Double, PageStep::Forward) => {
                if current + 1 < total {
                    current + 2
                } else {
                    current + 1
                }
            }
            (ReadingMode::Double, PageStep::Backward) => {
                if current > 2 {
                    current - 2
                } else {
                    current - 1
                }
            }
            (_, PageStep::Forward) => current + 1,
            (_, PageStep::Backward) => current - 1,
        };
        self.set_page(target, effects);
    }

    /// A page element crossed the visibility threshold. Honored only in
    /// Vertical mode for indices of the current chapter, and never changes
    /// chapter.
    pub fn on_viewport_page_observed(&mut self, index: usize) -> bool {
        if self.mode != ReadingMode::Vertical {
            debug!(index, mode = self.mode.as_str(), "Ignoring visibility outside Vertical mode");
            return false;
        }
        if index >= self.total_pages() {
            debug!(index, total = self.total_pages(), "Ignoring visibility for unknown page");
            return false;
        }
        let page = index + 1;
        if page != self.current_page {
            self.current_page = page;
            debug!(page, "Visible page changed");
        }
        true
    }

    /// Apply a batch of crossings from the renderer.
    pub fn on_visibility_batch(&mut self, entries: &[VisibilityEntry]) -> bool {
        if self.mode != ReadingMode::Vertical {
            return false;
        }
        match self.viewport.select(entries) {
            Some(index) => self.on_viewport_page_observed(index),
            None => false,
        }
    }

    pub fn record_page_load_error(&mut self, index: usize) {
        if index >= self.total_pages() {
            debug!(index, "Load error for page outside chapter");
            return;
        }
        self.load_errors.insert(index, true);
        warn!(chapter = %self.current_chapter_key, page = index + 1, "Page image failed to load");
    }

    pub fn record_page_load_success(&mut self, index: usize) {
        let Some(url) = self.page_urls().get(index).cloned() else {
            debug!(index, "Load success for page outside chapter");
            return;
        };
        self.load_errors.insert(index, false);
        self.preload.mark_loaded(&url);
    }

    /// Collect finished preloads.
    pub fn poll_preloads(&mut self) -> usize {
        self.preload.pump()
    }

    pub fn can_go_previous_chapter(&self) -> bool {
        !self.index.is_first(&self.current_chapter_key)
            || (self.mode.is_paged() && self.current_page > 1)
    }

    pub fn can_go_next_chapter(&self) -> bool {
        !self.index.is_last(&self.current_chapter_key)
            || (self.mode.is_paged() && self.current_page < self.total_pages())
    }

    pub fn can_go_previous_page(&self) -> bool {
        self.mode.is_paged() && self.current_page > 1
    }

    pub fn can_go_next_page(&self) -> bool {
        self.mode.is_paged() && self.current_page < self.total_pages()
    }

    pub fn display_indices(&self) -> Vec<usize> {
        display_indices(self.mode, self.current_page, self.total_pages())
    }

    pub fn snapshot(&self) -> ReaderSnapshot {
        let chapter_title = self
            .work
            .chapter(&self.current_chapter_key)
            .map(|chapter| chapter.title.clone())
            .unwrap_or_default();
        let pages = self
            .page_urls()
            .iter()
            .enumerate()
            .map(|(index, url)| {
                let load_error = self.load_errors.get(&index).copied().unwrap_or(false);
                PageView {
                    index,
                    url: url.clone(),
                    load_error,
                    show_spinner: !load_error && !self.preload.has(url),
                }
            })
            .collect();

        ReaderSnapshot {
            work_slug: self.work_slug.clone(),
            work_title: self.work.title.clone(),
            work_genre: self.work.genre.clone(),
            chapter_key: self.current_chapter_key.clone(),
            chapter_title,
            chapter_keys: self.index.keys().to_vec(),
            chapter_position: self.index.index_of(&self.current_chapter_key).unwrap_or(0),
            mode: self.mode,
            header_hidden: self.header_hidden,
            current_page: self.current_page,
            total_pages: self.total_pages(),
            display_indices: self.display_indices(),
            pages,
            can_go_previous_chapter: self.can_go_previous_chapter(),
            can_go_next_chapter: self.can_go_next_chapter(),
            can_go_previous_page: self.can_go_previous_page(),
            can_go_next_page: self.can_go_next_page(),
        }
    }

    pub fn apply_command(&mut self, command: SessionCommand) -> SessionEvent {
        let action = command.action();
        let mut effects = Vec::new();
        match command {
            SessionCommand::GetSnapshot => {}
            SessionCommand::SetMode { mode } => self.set_mode(mode, &mut effects),
            SessionCommand::ToggleHeader => self.toggle_header(),
            SessionCommand::GoToChapter { key } => {
                self.go_to_chapter(&key, &mut effects);
            }
            SessionCommand::PreviousChapter => self.go_to_previous_chapter(&mut effects),
            SessionCommand::NextChapter => self.go_to_next_chapter(&mut effects),
            SessionCommand::SetPage { page } => self.set_page(page, &mut effects),
            SessionCommand::StepPage { step } => self.step_page(step, &mut effects),
            SessionCommand::ViewportPageObserved { index } => {
                self.on_viewport_page_observed(index);
            }
            SessionCommand::VisibilityChanged { entries } => {
                self.on_visibility_batch(&entries);
            }
            SessionCommand::PageLoadFailed { index } => self.record_page_load_error(index),
            SessionCommand::PageLoaded { index } => self.record_page_load_success(index),
            SessionCommand::PollPreloads => {
                self.poll_preloads();
            }
        }
        SessionEvent {
            action,
            effects,
            snapshot: self.snapshot(),
        }
    }

    /// Reset position for the current chapter and restart its side effects.
    fn begin_chapter(&mut self) {
        self.current_page = 1;
        self.load_errors.clear();
        if self.mode == ReadingMode::Vertical {
            self.viewport.subscribe(self.total_pages());
        } else {
            self.viewport.unsubscribe();
        }
        self.schedule_next_chapter_preload();
    }

    fn schedule_next_chapter_preload(&mut self) {
        if !self.preload_next_chapter {
            return;
        }
        let Some(next) = self.index.next(&self.current_chapter_key) else {
            return;
        };
        let urls = self.work.page_urls(next);
        let issued = self.preload.schedule(urls);
        debug!(next_chapter = %next, issued, "Preloading next chapter");
    }

    fn chapter_start_effect(&self) -> Effect {
        if self.mode == ReadingMode::Vertical {
            Effect::ScrollToTop
        } else {
            Effect::ScrollToPage { page: 1 }
        }
    }
}

impl std::fmt::Debug for ReaderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderSession")
            .field("work_slug", &self.work_slug)
            .field("mode", &self.mode)
            .field("header_hidden", &self.header_hidden)
            .field("current_chapter_key", &self.current_chapter_key)
            .field("current_page", &self.current_page)
            .field("load_errors", &self.load_errors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
