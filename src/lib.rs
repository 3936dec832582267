//! Chapter-based image reader engine.
//!
//! The crate owns reading position, mode and prefetch for works published as
//! JSON manifests of chapters and page image URLs. Rendering stays with the
//! host: it forwards input through [`input::InputRouter`], follows the
//! [`session::Effect`]s it gets back and draws [`session::ReaderSnapshot`]s.

pub mod chapter_index;
pub mod config;
pub mod input;
pub mod loader;
pub mod location;
pub mod preferences;
pub mod preload;
pub mod session;
pub mod text_utils;
pub mod viewport;
pub mod work;

pub use config::{AppConfig, ReadingMode};
pub use input::{ClickZone, InputEvent, InputRouter, Key, KeyBindings, Modifiers};
pub use loader::{LoadFailure, LoadFailureKind, WorkCatalog, load_work, parse_location};
pub use location::{Location, NavigationIntent, route_for};
pub use session::{
    Effect, PageStep, ReaderSession, ReaderSnapshot, SessionCommand, SessionEvent, SessionOptions,
    SessionPorts,
};
pub use work::{Chapter, Work};
