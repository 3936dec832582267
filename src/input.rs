//! Raw reader input mapped onto session commands.

use crate::config::{AppConfig, ReadingMode};
use crate::session::{Effect, PageStep, ReaderSession, SessionCommand};
use crate::viewport::VisibilityEntry;
use tracing::debug;

/// A key as reported by the host, independent of any windowing toolkit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Escape,
    Space,
    Character(String),
}

impl Key {
    /// Token the key is matched under in bindings.
    fn token(&self) -> String {
        match self {
            Self::ArrowLeft => "left".to_string(),
            Self::ArrowRight => "right".to_string(),
            Self::ArrowUp => "up".to_string(),
            Self::ArrowDown => "down".to_string(),
            Self::Escape => "escape".to_string(),
            Self::Space => "space".to_string(),
            Self::Character(ch) => ch.to_ascii_lowercase(),
        }
    }

    /// Parse a binding-style token such as `left`, `esc` or `m`.
    pub fn parse(raw: &str) -> Option<Self> {
        let token = normalize_shortcut_token(raw, "");
        match token.as_str() {
            "" => None,
            "left" => Some(Self::ArrowLeft),
            "right" => Some(Self::ArrowRight),
            "up" => Some(Self::ArrowUp),
            "down" => Some(Self::ArrowDown),
            "escape" => Some(Self::Escape),
            "space" => Some(Self::Space),
            other => Some(Self::Character(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub logo: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        logo: false,
        shift: false,
    };
}

/// Click targets of the reading surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickZone {
    Left,
    Right,
    Content,
}

#[derive(Debug, Clone)]
pub enum InputEvent {
    Key { key: Key, modifiers: Modifiers },
    Click(ClickZone),
    SelectChapter(String),
    SelectMode(ReadingMode),
    SelectPage(usize),
    PreviousPageButton,
    NextPageButton,
    PreviousChapterButton,
    NextChapterButton,
    ToggleHeader,
    OpenMenu,
    CloseMenu,
    ToggleMenu,
    Visibility(Vec<VisibilityEntry>),
    ImageLoaded(usize),
    ImageFailed(usize),
}

/// What a bound key does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    PreviousPage,
    NextPage,
    ToggleHeader,
    ToggleMenu,
    CloseMenu,
}

#[derive(Debug, Clone)]
pub struct KeyBindings {
    previous_page: String,
    next_page: String,
    toggle_header: String,
    toggle_menu: String,
    close_menu: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl KeyBindings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            previous_page: config.key_previous_page.clone(),
            next_page: config.key_next_page.clone(),
            toggle_header: config.key_toggle_header.clone(),
            toggle_menu: config.key_toggle_menu.clone(),
            close_menu: config.key_close_menu.clone(),
        }
    }

    pub fn action_for(&self, key: &Key, modifiers: Modifiers) -> Option<KeyAction> {
        let pressed = key.token();
        let table = [
            (&self.previous_page, "left", KeyAction::PreviousPage),
            (&self.next_page, "right", KeyAction::NextPage),
            (&self.toggle_header, "h", KeyAction::ToggleHeader),
            (&self.toggle_menu, "m", KeyAction::ToggleMenu),
            (&self.close_menu, "escape", KeyAction::CloseMenu),
        ];
        table
            .into_iter()
            .find(|(raw, fallback, _)| shortcut_matches(raw, fallback, &pressed, modifiers))
            .map(|(_, _, action)| action)
    }
}

pub fn shortcut_matches(raw: &str, fallback: &str, pressed: &str, modifiers: Modifiers) -> bool {
    let normalized = normalize_shortcut_token(raw, fallback);

    let mut required = Modifiers::NONE;
    let mut required_key: Option<&str> = None;

    for token in normalized
        .split('+')
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        match token {
            "ctrl" | "control" => required.ctrl = true,
            "alt" => required.alt = true,
            "logo" | "meta" | "super" | "cmd" | "command" => required.logo = true,
            "shift" => required.shift = true,
            key => required_key = Some(key),
        }
    }

    let required_key = required_key.unwrap_or(fallback);
    pressed == required_key && modifiers == required
}

pub fn normalize_shortcut_token(raw: &str, fallback: &str) -> String {
    let normalized = raw.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return fallback.to_string();
    }
    normalized
        .split('+')
        .map(|token| match token.trim() {
            "spacebar" => "space",
            "esc" => "escape",
            "arrowleft" => "left",
            "arrowright" => "right",
            "arrowup" => "up",
            "arrowdown" => "down",
            other => other,
        })
        .collect::<Vec<_>>()
        .join("+")
}

/// Turns input into session commands and owns the settings-menu flag.
#[derive(Debug, Clone, Default)]
pub struct InputRouter {
    bindings: KeyBindings,
    menu_open: bool,
}

impl InputRouter {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            menu_open: false,
        }
    }

    pub fn menu_open(&self) -> bool {
        self.menu_open
    }

    /// Map one event for the given mode. Menu events update the router
    /// itself and produce no commands.
    pub fn route(&mut self, event: InputEvent, mode: ReadingMode) -> Vec<SessionCommand> {
        match event {
            InputEvent::Key { key, modifiers } => {
                let Some(action) = self.bindings.action_for(&key, modifiers) else {
                    debug!(?key, "Unbound key");
                    return Vec::new();
                };
                self.route_key_action(action, mode)
            }
            InputEvent::Click(zone) => {
                if self.menu_open {
                    debug!(?zone, "Click suppressed while menu is open");
                    return Vec::new();
                }
                match zone {
                    ClickZone::Left => directional(PageStep::Backward, mode),
                    ClickZone::Right => directional(PageStep::Forward, mode),
                    ClickZone::Content if mode.is_paged() => vec![SessionCommand::StepPage {
                        step: PageStep::Forward,
                    }],
                    ClickZone::Content => Vec::new(),
                }
            }
            InputEvent::SelectChapter(key) => vec![SessionCommand::GoToChapter { key }],
            InputEvent::SelectMode(mode) => vec![SessionCommand::SetMode { mode }],
            InputEvent::SelectPage(page) if mode.is_paged() => vec![SessionCommand::SetPage {
                page: i64::try_from(page).unwrap_or(i64::MAX),
            }],
            InputEvent::PreviousPageButton if mode.is_paged() => vec![SessionCommand::StepPage {
                step: PageStep::Backward,
            }],
            InputEvent::NextPageButton if mode.is_paged() => vec![SessionCommand::StepPage {
                step: PageStep::Forward,
            }],
            InputEvent::SelectPage(_)
            | InputEvent::PreviousPageButton
            | InputEvent::NextPageButton => {
                debug!("Page controls are disabled in Vertical mode");
                Vec::new()
            }
            InputEvent::PreviousChapterButton => vec![SessionCommand::PreviousChapter],
            InputEvent::NextChapterButton => vec![SessionCommand::NextChapter],
            InputEvent::ToggleHeader => vec![SessionCommand::ToggleHeader],
            InputEvent::OpenMenu => {
                self.menu_open = true;
                Vec::new()
            }
            InputEvent::CloseMenu => {
                self.menu_open = false;
                Vec::new()
            }
            InputEvent::ToggleMenu => {
                self.menu_open = !self.menu_open;
                Vec::new()
            }
            InputEvent::Visibility(entries) => vec![SessionCommand::VisibilityChanged { entries }],
            InputEvent::ImageLoaded(index) => vec![SessionCommand::PageLoaded { index }],
            InputEvent::ImageFailed(index) => vec![SessionCommand::PageLoadFailed { index }],
        }
    }

    /// Route and apply an event, returning the effects for the host.
    pub fn dispatch(&mut self, event: InputEvent, session: &mut ReaderSession) -> Vec<Effect> {
        self.route(event, session.mode())
            .into_iter()
            .flat_map(|command| session.apply_command(command).effects)
            .collect()
    }

    fn route_key_action(&mut self, action: KeyAction, mode: ReadingMode) -> Vec<SessionCommand> {
        match action {
            KeyAction::ToggleMenu => {
                self.menu_open = !self.menu_open;
                debug!(open = self.menu_open, "Toggled menu");
                Vec::new()
            }
            KeyAction::CloseMenu => {
                self.menu_open = false;
                Vec::new()
            }
            KeyAction::ToggleHeader => vec![SessionCommand::ToggleHeader],
            KeyAction::PreviousPage | KeyAction::NextPage if self.menu_open => {
                debug!(?action, "Key suppressed while menu is open");
                Vec::new()
            }
            KeyAction::PreviousPage => directional(PageStep::Backward, mode),
            KeyAction::NextPage => directional(PageStep::Forward, mode),
        }
    }
}

/// Left/right semantics: pages in paged modes, chapters in Vertical.
fn directional(step: PageStep, mode: ReadingMode) -> Vec<SessionCommand> {
    let command = match (mode.is_paged(), step) {
        (true, step) => SessionCommand::StepPage { step },
        (false, PageStep::Backward) => SessionCommand::PreviousChapter,
        (false, PageStep::Forward) => SessionCommand::NextChapter,
    };
    vec![command]
}
