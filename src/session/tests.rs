use super::*;
use crate::preferences::{HEADER_HIDDEN_KEY, READING_MODE_KEY};
use crate::preload::PreloadState;
use crate::preload::testing::RecordingLoader;
use crate::viewport::ElementId;
use crate::viewport::testing::RecordingObserver;
use crate::work::build_test_work;
use anyhow::Result;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Clone, Default)]
struct RecordingPreferences {
    values: Rc<RefCell<HashMap<String, String>>>,
    writes: Rc<RefCell<Vec<(String, String)>>>,
}

impl PreferenceStore for RecordingPreferences {
    fn get(&self, name: &str) -> Option<String> {
        self.values.borrow().get(name).cloned()
    }

    fn set(&mut self, name: &str, value: &str) -> Result<()> {
        self.values
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
        self.writes
            .borrow_mut()
            .push((name.to_string(), value.to_string()));
        Ok(())
    }
}

struct Harness {
    session: ReaderSession,
    preferences: RecordingPreferences,
    loader: RecordingLoader,
    observer: RecordingObserver,
}

fn build_test_session(
    chapters: &[(&str, usize)],
    start: &str,
    stored_mode: Option<&str>,
) -> Harness {
    let preferences = RecordingPreferences::default();
    if let Some(mode) = stored_mode {
        preferences
            .values
            .borrow_mut()
            .insert(READING_MODE_KEY.to_string(), format!("\"{mode}\""));
    }
    let loader = RecordingLoader::default();
    let observer = RecordingObserver::default();
    let work = build_test_work("Test Work", chapters);
    let session = ReaderSession::open(
        work,
        &Location::new("test-work", start),
        SessionOptions::default(),
        SessionPorts {
            preferences: Box::new(preferences.clone()),
            image_loader: Box::new(loader.clone()),
            observer: Box::new(observer.clone()),
        },
    )
    .expect("session opens");
    Harness {
        session,
        preferences,
        loader,
        observer,
    }
}

fn paged(mode: &str, pages: usize) -> Harness {
    build_test_session(&[("1", pages), ("2", 3), ("3", 2)], "1", Some(mode))
}

fn chapter_intent(key: &str) -> Effect {
    Effect::Navigate(NavigationIntent::Chapter {
        work_slug: "test-work".to_string(),
        chapter_key: key.to_string(),
    })
}

fn overview_intent() -> Effect {
    Effect::Navigate(NavigationIntent::Overview {
        work_slug: "test-work".to_string(),
    })
}

fn visible(generation: u64, index: usize, ratio: f32) -> VisibilityEntry {
    VisibilityEntry {
        element: ElementId { generation, index },
        intersecting: true,
        ratio,
    }
}

#[test]
fn open_rejects_unknown_chapter() {
    let work = build_test_work("Test Work", &[("1", 2)]);
    let failure = ReaderSession::open(
        work,
        &Location::new("test-work", "9"),
        SessionOptions::default(),
        SessionPorts {
            preferences: Box::new(RecordingPreferences::default()),
            image_loader: Box::new(RecordingLoader::default()),
            observer: Box::new(RecordingObserver::default()),
        },
    )
    .expect_err("unknown chapter");
    assert_eq!(failure.kind, crate::loader::LoadFailureKind::ChapterNotFound);
    assert_eq!(
        failure.fallback,
        NavigationIntent::Overview {
            work_slug: "test-work".to_string()
        }
    );
}

#[test]
fn open_seeds_mode_and_header_from_preferences() {
    let harness = build_test_session(&[("1", 4)], "1", Some("single"));
    assert_eq!(harness.session.mode(), ReadingMode::Single);
    assert!(!harness.session.header_hidden());
    assert_eq!(harness.session.current_page(), 1);
    assert!(harness.preferences.writes.borrow().is_empty());
}

#[test]
fn open_falls_back_to_vertical_on_garbage_preference() {
    let harness = build_test_session(&[("1", 4)], "1", Some("sideways"));
    assert_eq!(harness.session.mode(), ReadingMode::Vertical);
}

#[test]
fn set_page_within_range_moves_and_scrolls_in_paged_mode() {
    let mut harness = paged("single", 5);
    let mut effects = Vec::new();
    harness.session.set_page(3, &mut effects);
    assert_eq!(harness.session.current_page(), 3);
    assert_eq!(effects, vec![Effect::ScrollToPage { page: 3 }]);
}

#[test]
fn set_page_lands_on_every_in_range_page_in_paged_modes() {
    for mode in ["single", "double"] {
        let mut harness = paged(mode, 6);
        for target in 1..=6 {
            let mut effects = Vec::new();
            harness.session.set_page(target, &mut effects);
            assert_eq!(harness.session.current_page(), target as usize, "{mode} page {target}");
            assert!(
                !effects
                    .iter()
                    .any(|effect| matches!(effect, Effect::Navigate(_))),
                "{mode} page {target} left the chapter"
            );
        }
    }
}

#[test]
fn set_page_in_vertical_keeps_visibility_position() {
    let mut harness = build_test_session(&[("1", 5), ("2", 2)], "1", None);
    let mut effects = Vec::new();
    harness.session.set_page(4, &mut effects);
    assert_eq!(harness.session.current_page(), 1);
    assert!(effects.is_empty());

    harness.session.set_page(6, &mut effects);
    assert_eq!(effects, vec![chapter_intent("2")]);
}

#[test]
fn set_page_past_end_requests_next_chapter_without_moving() {
    let mut harness = paged("single", 5);
    let mut effects = Vec::new();
    harness.session.set_page(6, &mut effects);
    assert_eq!(harness.session.current_page(), 1);
    assert_eq!(effects, vec![chapter_intent("2")]);
}

#[test]
fn set_page_below_one_at_first_chapter_is_noop() {
    let mut harness = paged("single", 5);
    let mut effects = Vec::new();
    harness.session.set_page(0, &mut effects);
    assert!(effects.is_empty());
    assert_eq!(harness.session.current_page(), 1);
}

#[test]
fn set_page_below_one_requests_previous_chapter() {
    let mut harness = build_test_session(&[("1", 2), ("2", 3)], "2", Some("single"));
    let mut effects = Vec::new();
    harness.session.set_page(0, &mut effects);
    assert_eq!(effects, vec![chapter_intent("1")]);
}

#[test]
fn double_mode_steps_by_spreads() {
    let mut harness = paged("double", 5);
    let mut effects = Vec::new();

    harness.session.step_page(PageStep::Forward, &mut effects);
    assert_eq!(harness.session.current_page(), 3);
    assert_eq!(harness.session.display_indices(), vec![2, 3]);

    harness.session.step_page(PageStep::Forward, &mut effects);
    assert_eq!(harness.session.current_page(), 5);
    assert_eq!(harness.session.display_indices(), vec![4]);

    effects.clear();
    harness.session.step_page(PageStep::Forward, &mut effects);
    assert_eq!(harness.session.current_page(), 5);
    assert_eq!(effects, vec![chapter_intent("2")]);

    effects.clear();
    harness.session.step_page(PageStep::Backward, &mut effects);
    assert_eq!(harness.session.current_page(), 3);
    harness.session.step_page(PageStep::Backward, &mut effects);
    assert_eq!(harness.session.current_page(), 1);
}

#[test]
fn double_mode_backward_from_page_two_lands_on_one() {
    let mut harness = paged("double", 6);
    let mut effects = Vec::new();
    harness.session.set_page(2, &mut effects);
    harness.session.step_page(PageStep::Backward, &mut effects);
    assert_eq!(harness.session.current_page(), 1);
}

#[test]
fn rapid_steps_apply_sequentially() {
    let mut harness = paged("single", 4);
    let mut effects = Vec::new();
    for _ in 0..3 {
        harness.session.step_page(PageStep::Forward, &mut effects);
    }
    assert_eq!(harness.session.current_page(), 4);
    assert_eq!(
        effects,
        vec![
            Effect::ScrollToPage { page: 2 },
            Effect::ScrollToPage { page: 3 },
            Effect::ScrollToPage { page: 4 },
        ]
    );
}

#[test]
fn mode_switch_keeps_page_and_persists_each_time() {
    let mut harness = paged("single", 6);
    let mut effects = Vec::new();
    harness.session.set_page(4, &mut effects);

    harness.session.set_mode(ReadingMode::Double, &mut effects);
    assert_eq!(harness.session.current_page(), 4);
    assert_eq!(harness.session.display_indices(), vec![3, 4]);

    harness.session.set_mode(ReadingMode::Double, &mut effects);
    let writes = harness.preferences.writes.borrow();
    assert_eq!(writes.len(), 2);
    assert!(
        writes
            .iter()
            .all(|(key, value)| key == READING_MODE_KEY && value == "\"double\"")
    );
}

#[test]
fn toggle_header_writes_once_per_call() {
    let mut harness = build_test_session(&[("1", 2)], "1", None);
    harness.session.toggle_header();
    assert!(harness.session.header_hidden());
    harness.session.toggle_header();
    assert!(!harness.session.header_hidden());

    let writes = harness.preferences.writes.borrow();
    assert_eq!(
        *writes,
        vec![
            (HEADER_HIDDEN_KEY.to_string(), "true".to_string()),
            (HEADER_HIDDEN_KEY.to_string(), "false".to_string()),
        ]
    );
}

#[test]
fn chapter_edges() {
    let mut harness = build_test_session(&[("1", 2), ("2", 2)], "1", None);
    let mut effects = Vec::new();
    harness.session.go_to_previous_chapter(&mut effects);
    assert!(effects.is_empty());
    assert!(!harness.session.can_go_previous_chapter());

    harness.session.go_to_next_chapter(&mut effects);
    assert_eq!(effects, vec![chapter_intent("2")]);

    let mut harness = build_test_session(&[("1", 2), ("2", 2)], "2", None);
    let mut effects = Vec::new();
    harness.session.go_to_next_chapter(&mut effects);
    assert_eq!(effects, vec![overview_intent()]);
    assert!(!harness.session.can_go_next_chapter());
}

#[test]
fn go_to_chapter_ignores_unknown_keys() {
    let mut harness = build_test_session(&[("1", 2)], "1", None);
    let mut effects = Vec::new();
    assert!(!harness.session.go_to_chapter("7", &mut effects));
    assert!(effects.is_empty());
}

#[test]
fn paged_predicates_account_for_pages() {
    let mut harness = build_test_session(&[("1", 3)], "1", Some("single"));
    assert!(!harness.session.can_go_previous_chapter());
    assert!(harness.session.can_go_next_chapter());
    assert!(harness.session.can_go_next_page());

    let mut effects = Vec::new();
    harness.session.set_page(3, &mut effects);
    assert!(harness.session.can_go_previous_chapter());
    assert!(harness.session.can_go_previous_page());
    assert!(!harness.session.can_go_next_chapter());
    assert!(!harness.session.can_go_next_page());

    harness.session.set_mode(ReadingMode::Vertical, &mut effects);
    assert!(!harness.session.can_go_previous_chapter());
    assert!(!harness.session.can_go_previous_page());
}

#[test]
fn preloads_next_chapter_only_and_deduplicates() {
    let mut harness = build_test_session(&[("1", 2), ("2", 3), ("3", 1)], "1", None);
    assert_eq!(
        *harness.loader.started.borrow(),
        vec![
            "https://img.test/2/001.png".to_string(),
            "https://img.test/2/002.png".to_string(),
            "https://img.test/2/003.png".to_string(),
        ]
    );

    let mut effects = Vec::new();
    harness.session.enter_chapter("2", &mut effects).expect("enter");
    harness.session.enter_chapter("1", &mut effects).expect("enter");
    let started = harness.loader.started.borrow();
    assert_eq!(started.len(), 4);
    assert_eq!(started[3], "https://img.test/3/001.png");
}

#[test]
fn no_preload_from_last_chapter() {
    let harness = build_test_session(&[("1", 2), ("2", 3)], "2", None);
    assert!(harness.loader.started.borrow().is_empty());
}

#[test]
fn poll_preloads_marks_completed_urls() {
    let mut harness = build_test_session(&[("1", 2), ("2", 2)], "1", None);
    harness.loader.finish("https://img.test/2/001.png", true);
    harness.loader.finish("https://img.test/2/002.png", false);
    assert_eq!(harness.session.poll_preloads(), 2);
    let cache = harness.session.preload();
    assert!(cache.has("https://img.test/2/001.png"));
    assert_eq!(
        cache.state("https://img.test/2/002.png"),
        Some(PreloadState::Failed)
    );
}

#[test]
fn viewport_updates_page_only_in_vertical() {
    let mut harness = build_test_session(&[("1", 5), ("2", 2)], "1", None);
    assert!(harness.session.on_viewport_page_observed(3));
    assert_eq!(harness.session.current_page(), 4);

    let mut effects = Vec::new();
    harness.session.set_mode(ReadingMode::Single, &mut effects);
    assert!(!harness.session.on_viewport_page_observed(0));
    assert_eq!(harness.session.current_page(), 4);
    assert!(harness.observer.observed.borrow().is_empty());
}

#[test]
fn viewport_ignores_indices_past_the_chapter() {
    let mut harness = build_test_session(&[("1", 5), ("2", 2)], "1", None);
    assert!(!harness.session.on_viewport_page_observed(40));
    assert!(!harness.session.on_viewport_page_observed(5));
    assert_eq!(harness.session.current_page(), 1);

    let mut effects = Vec::new();
    harness.session.set_mode(ReadingMode::Double, &mut effects);
    assert_eq!(harness.session.display_indices(), vec![0, 1]);
    assert_eq!(effects, vec![Effect::ScrollToPage { page: 1 }]);
}

#[test]
fn visibility_batch_ignores_previous_generation() {
    let mut harness = build_test_session(&[("1", 5), ("2", 4)], "1", None);
    let first = harness.session.viewport().generation().expect("subscribed");

    let mut effects = Vec::new();
    harness.session.enter_chapter("2", &mut effects).expect("enter");
    assert_eq!(effects, vec![Effect::ScrollToTop]);
    let second = harness.session.viewport().generation().expect("subscribed");
    assert_ne!(first, second);
    assert_eq!(harness.observer.observed.borrow().len(), 4);

    assert!(!harness.session.on_visibility_batch(&[visible(first, 2, 0.9)]));
    assert_eq!(harness.session.current_page(), 1);

    assert!(
        harness
            .session
            .on_visibility_batch(&[visible(second, 1, 0.6), visible(second, 2, 0.8)])
    );
    assert_eq!(harness.session.current_page(), 3);
}

#[test]
fn load_errors_reset_on_chapter_entry() {
    let mut harness = build_test_session(&[("1", 3), ("2", 3)], "1", None);
    harness.session.record_page_load_error(1);
    harness.session.record_page_load_error(9);
    assert_eq!(harness.session.load_errors().len(), 1);

    let snapshot = harness.session.snapshot();
    assert!(snapshot.pages[1].load_error);
    assert!(!snapshot.pages[1].show_spinner);
    assert!(snapshot.pages[0].show_spinner);

    harness.session.record_page_load_success(0);
    assert!(!harness.session.snapshot().pages[0].show_spinner);

    let mut effects = Vec::new();
    harness.session.enter_chapter("2", &mut effects).expect("enter");
    assert!(harness.session.load_errors().is_empty());
}

#[test]
fn empty_chapter_moves_forward_on_any_page() {
    let mut harness = build_test_session(&[("1", 0), ("2", 2)], "1", Some("single"));
    assert!(harness.session.display_indices().is_empty());
    let mut effects = Vec::new();
    harness.session.set_page(1, &mut effects);
    assert_eq!(effects, vec![chapter_intent("2")]);
}

#[test]
fn enter_chapter_in_paged_mode_scrolls_to_first_page() {
    let mut harness = build_test_session(&[("1", 3), ("2", 3)], "1", Some("double"));
    let mut effects = Vec::new();
    harness.session.set_page(3, &mut effects);
    effects.clear();
    harness.session.enter_chapter("2", &mut effects).expect("enter");
    assert_eq!(harness.session.current_page(), 1);
    assert_eq!(effects, vec![Effect::ScrollToPage { page: 1 }]);
    assert!(!harness.session.viewport().is_subscribed());
}

#[test]
fn replace_work_rejects_mismatched_title() {
    let mut harness = build_test_session(&[("1", 3)], "1", None);
    let other = build_test_work("Another Title", &[("1", 3)]);
    let mut effects = Vec::new();
    let failure = harness
        .session
        .replace_work(other, "1", &mut effects)
        .expect_err("title mismatch");
    assert_eq!(failure.kind, crate::loader::LoadFailureKind::TitleMismatch);
}

#[test]
fn apply_command_reports_action_and_snapshot() {
    let mut harness = build_test_session(&[("1", 4), ("2", 2)], "1", Some("single"));
    let event = harness.session.apply_command(SessionCommand::StepPage {
        step: PageStep::Forward,
    });
    assert_eq!(event.action, "reader_step_forward");
    assert_eq!(event.snapshot.current_page, 2);
    assert_eq!(event.effects, vec![Effect::ScrollToPage { page: 2 }]);
    assert!(event.navigation().is_none());

    let event = harness.session.apply_command(SessionCommand::NextChapter);
    assert_eq!(event.action, "reader_next_chapter");
    assert_eq!(
        event.navigation(),
        Some(&NavigationIntent::Chapter {
            work_slug: "test-work".to_string(),
            chapter_key: "2".to_string(),
        })
    );

    let event = harness.session.apply_command(SessionCommand::GetSnapshot);
    assert_eq!(event.snapshot.chapter_keys, vec!["1", "2"]);
    assert_eq!(event.snapshot.chapter_title, "Chapter 1");
    assert_eq!(event.snapshot.mode, ReadingMode::Single);
}

#[test]
fn snapshot_visible_pages_follow_the_spread() {
    let mut harness = build_test_session(&[("1", 5)], "1", Some("double"));
    let mut effects = Vec::new();
    harness.session.set_page(3, &mut effects);
    harness.session.record_page_load_error(3);

    let snapshot = harness.session.snapshot();
    let visible: Vec<(usize, bool)> = snapshot
        .visible_pages()
        .map(|page| (page.index, page.load_error))
        .collect();
    assert_eq!(visible, vec![(2, false), (3, true)]);
}
