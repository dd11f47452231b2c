//! UI layer for the desktop window: app shell and panels.

pub mod app;
pub mod panels;

pub use app::DesktopGuiApp;
