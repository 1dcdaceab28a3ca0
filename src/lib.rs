#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod assets;
pub mod banner;
pub mod config;
pub mod dispatch;
pub mod fallback;
pub mod html;
pub mod i18n;
pub mod logging;
pub mod modal;
pub mod playback;
pub mod post;
pub mod selection;
pub mod storage;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::{list, run, RunOptions};
