//! Terminal front end for the reader engine.
//!
//! - Parse command-line arguments.
//! - Load configuration from `conf/config.toml` (or `--config`).
//! - Fetch the work and open a session at the requested chapter.
//! - Drive the session from stdin commands until the work is left.

use anyhow::{Context, Result, anyhow, bail};
use aphrodite_reader::config::load_config;
use aphrodite_reader::preferences::TomlPreferences;
use aphrodite_reader::preload::HttpImageLoader;
use aphrodite_reader::viewport::{ElementId, VisibilityEntry, VisibilityObserver};
use aphrodite_reader::{
    AppConfig, ClickZone, Effect, InputEvent, InputRouter, Key, KeyBindings, LoadFailure,
    Location, Modifiers, NavigationIntent, ReaderSession, ReadingMode, SessionCommand,
    SessionOptions, SessionPorts, WorkCatalog, load_work, parse_location, route_for,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const USAGE: &str = "Usage: aphrodite-reader [--config <path>] </work-slug/chapter-key>";

struct Args {
    config_path: PathBuf,
    location: String,
}

/// Logs observe/unobserve calls; a terminal has no elements to watch.
struct LoggingObserver;

impl VisibilityObserver for LoggingObserver {
    fn observe(&mut self, element: ElementId) {
        debug!(generation = element.generation, index = element.index, "Observe page");
    }

    fn unobserve(&mut self, element: ElementId) {
        debug!(generation = element.generation, index = element.index, "Unobserve page");
    }
}

enum Flow {
    Continue,
    Exit,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args()?;
    let config = load_config(&args.config_path);
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        config = %args.config_path.display(),
        location = %args.location,
        level = %config.log_level,
        "Starting reader"
    );

    let (mut session, location) = match open_session(&config, &args.location) {
        Ok(opened) => opened,
        Err(failure) => {
            report_failure(&failure);
            std::process::exit(1);
        }
    };
    let catalog = WorkCatalog::from_config(&config);
    let timeout = Duration::from_secs(config.http_timeout_secs);
    let mut router = InputRouter::new(KeyBindings::from_config(&config));
    info!(work = %location.work_slug, "Reader ready; type `help` for commands");
    print_status(&session, &router);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        session.apply_command(SessionCommand::PollPreloads);

        let effects = match handle_line(line.trim(), &mut router, &mut session) {
            Ok(Some(effects)) => effects,
            Ok(None) => break,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        match follow_effects(effects, &mut session, &catalog, timeout) {
            Flow::Continue => print_status(&session, &router),
            Flow::Exit => break,
        }
    }
    info!("Reader closed");
    Ok(())
}

fn open_session(config: &AppConfig, raw: &str) -> Result<(ReaderSession, Location), LoadFailure> {
    let location = parse_location(raw)?;
    let catalog = WorkCatalog::from_config(config);
    let timeout = Duration::from_secs(config.http_timeout_secs);
    let work = load_work(&catalog, &location.work_slug, timeout)?;

    let image_loader = match HttpImageLoader::new(config.preload_workers, timeout) {
        Ok(loader) => loader,
        Err(err) => {
            return Err(LoadFailure::new(
                aphrodite_reader::LoadFailureKind::Fetch,
                format!("Failed to start image preloader: {err}"),
                NavigationIntent::Home,
            ));
        }
    };
    let ports = SessionPorts {
        preferences: Box::new(TomlPreferences::open(&config.preferences_path)),
        image_loader: Box::new(image_loader),
        observer: Box::new(LoggingObserver),
    };
    let session = ReaderSession::open(work, &location, SessionOptions::from(config), ports)?;
    Ok((session, location))
}

/// `Ok(None)` ends the loop.
fn handle_line(
    line: &str,
    router: &mut InputRouter,
    session: &mut ReaderSession,
) -> Result<Option<Vec<Effect>>> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(Some(Vec::new()));
    };
    let argument = parts.next();

    let event = match command {
        "quit" | "q" | "exit" => return Ok(None),
        "help" => {
            print_help();
            return Ok(Some(Vec::new()));
        }
        "json" => {
            let snapshot = session.snapshot();
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            return Ok(Some(Vec::new()));
        }
        "left" => key_event(Key::ArrowLeft),
        "right" => key_event(Key::ArrowRight),
        "click" => InputEvent::Click(match argument.unwrap_or("content") {
            "left" => ClickZone::Left,
            "right" => ClickZone::Right,
            "content" => ClickZone::Content,
            other => bail!("Unknown click zone: {other}"),
        }),
        "key" => {
            let raw = argument.ok_or_else(|| anyhow!("Usage: key <token>"))?;
            key_event(Key::parse(raw).ok_or_else(|| anyhow!("Unknown key: {raw}"))?)
        }
        "chapter" => {
            let key = argument.ok_or_else(|| anyhow!("Usage: chapter <key>"))?;
            InputEvent::SelectChapter(key.to_string())
        }
        "prev-page" => InputEvent::PreviousPageButton,
        "next-page" => InputEvent::NextPageButton,
        "prev-chapter" => InputEvent::PreviousChapterButton,
        "next-chapter" => InputEvent::NextChapterButton,
        "mode" => {
            let raw = argument.ok_or_else(|| anyhow!("Usage: mode <vertical|single|double>"))?;
            let mode = ReadingMode::parse(raw).ok_or_else(|| anyhow!("Unknown mode: {raw}"))?;
            InputEvent::SelectMode(mode)
        }
        "page" => {
            let raw = argument.ok_or_else(|| anyhow!("Usage: page <number>"))?;
            InputEvent::SelectPage(raw.parse().with_context(|| format!("Invalid page: {raw}"))?)
        }
        "header" => InputEvent::ToggleHeader,
        "menu" => InputEvent::ToggleMenu,
        "close" => InputEvent::CloseMenu,
        "seen" => {
            let index: usize = argument
                .ok_or_else(|| anyhow!("Usage: seen <index> [ratio]"))?
                .parse()
                .context("Invalid page index")?;
            let ratio: f32 = match parts.next() {
                Some(raw) => raw.parse().context("Invalid ratio")?,
                None => 1.0,
            };
            let generation = session
                .viewport()
                .generation()
                .ok_or_else(|| anyhow!("Page visibility is only tracked in Vertical mode"))?;
            InputEvent::Visibility(vec![VisibilityEntry {
                element: ElementId { generation, index },
                intersecting: ratio > 0.0,
                ratio,
            }])
        }
        "loaded" | "failed" => {
            let index: usize = argument
                .ok_or_else(|| anyhow!("Usage: {command} <index>"))?
                .parse()
                .context("Invalid page index")?;
            if command == "loaded" {
                InputEvent::ImageLoaded(index)
            } else {
                InputEvent::ImageFailed(index)
            }
        }
        other => bail!("Unknown command: {other} (type `help`)"),
    };
    Ok(Some(router.dispatch(event, session)))
}

fn key_event(key: Key) -> InputEvent {
    InputEvent::Key {
        key,
        modifiers: Modifiers::NONE,
    }
}

fn follow_effects(
    effects: Vec<Effect>,
    session: &mut ReaderSession,
    catalog: &WorkCatalog,
    timeout: Duration,
) -> Flow {
    for effect in effects {
        match effect {
            Effect::ScrollToPage { page } => debug!(page, "Scroll to page"),
            Effect::ScrollToTop => debug!("Scroll to top"),
            Effect::Navigate(intent) => {
                println!("-> {}", route_for(&intent));
                match intent {
                    NavigationIntent::Chapter {
                        work_slug,
                        chapter_key,
                    } => {
                        if let Err(failure) =
                            reload_chapter(session, catalog, &work_slug, &chapter_key, timeout)
                        {
                            report_failure(&failure);
                            return Flow::Exit;
                        }
                    }
                    NavigationIntent::Overview { .. } => {
                        print_overview(session);
                        return Flow::Exit;
                    }
                    NavigationIntent::Home => return Flow::Exit,
                }
            }
        }
    }
    Flow::Continue
}

/// Refetch the manifest so new chapters show up, falling back to the copy
/// already in memory when the fetch fails.
fn reload_chapter(
    session: &mut ReaderSession,
    catalog: &WorkCatalog,
    work_slug: &str,
    chapter_key: &str,
    timeout: Duration,
) -> Result<(), LoadFailure> {
    let mut effects = Vec::new();
    match load_work(catalog, work_slug, timeout) {
        Ok(work) => session.replace_work(work, chapter_key, &mut effects)?,
        Err(failure) => {
            warn!(%failure, "Manifest refresh failed; using cached work");
            session.enter_chapter(chapter_key, &mut effects)?;
        }
    }
    for effect in effects {
        debug!(?effect, "Chapter entry effect");
    }
    Ok(())
}

fn report_failure(failure: &LoadFailure) {
    error!(kind = ?failure.kind, "{}", failure.message);
    println!("{}", failure.message);
    println!("Back: {}", route_for(&failure.fallback));
}

fn print_status(session: &ReaderSession, router: &InputRouter) {
    let snapshot = session.snapshot();
    let pages = snapshot
        .visible_pages()
        .map(|page| {
            let marker = if page.load_error { "!" } else { "" };
            format!("{}{marker}", page.index + 1)
        })
        .collect::<Vec<_>>()
        .join("+");
    let mut out = io::stdout().lock();
    let _ = writeln!(
        out,
        "[{}] {} | page {}/{} (showing {}) | {}{}{}",
        snapshot.work_title,
        snapshot.chapter_title,
        snapshot.current_page,
        snapshot.total_pages,
        if pages.is_empty() { "-".to_string() } else { pages },
        snapshot.mode,
        if snapshot.header_hidden { " | header hidden" } else { "" },
        if router.menu_open() { " | menu open" } else { "" },
    );
}

fn print_overview(session: &ReaderSession) {
    let work = session.work();
    println!("{}", work.title);
    for key in session.chapter_index().keys() {
        let title = work
            .chapter(key)
            .map(|chapter| chapter.title.as_str())
            .unwrap_or_default();
        println!("  {key:>6}  {title}");
    }
}

fn print_help() {
    println!(
        "left | right | click [left|right|content] | key <token> | chapter <key> | \
         prev-page | next-page | prev-chapter | next-chapter | mode <vertical|single|double> | page <n> | header | \
         menu | close | seen <index> [ratio] | loaded <index> | failed <index> | json | quit"
    );
}

fn parse_args() -> Result<Args> {
    let mut args = env::args().skip(1);
    let mut config_path = PathBuf::from("conf/config.toml");
    let mut location = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().ok_or_else(|| anyhow!(USAGE))?;
                config_path = PathBuf::from(path);
            }
            "--help" | "-h" => bail!(USAGE),
            _ if location.is_none() => location = Some(arg),
            _ => bail!(USAGE),
        }
    }
    let location = location.ok_or_else(|| anyhow!(USAGE))?;
    Ok(Args {
        config_path,
        location,
    })
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    debug!("Logging initialized; override level with config.log_level or RUST_LOG");
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("debug"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}
