//! meetbar menu-bar frontend.
//!
//! The binary wires the [`meetbar_poller::Poller`] to the desktop: the poller
//! publishes meeting snapshots, [`app::run_ui`] renders them every second and
//! on every change, and the result is shown in the macOS menu bar
//! (tray-icon) or a StatusNotifierItem tray elsewhere (ksni).

pub mod actions;
pub mod app;
pub mod error;
#[cfg(target_os = "macos")]
pub mod menubar;
pub mod opener;
#[cfg(not(target_os = "macos"))]
pub mod tray;

pub use actions::{MenuAction, TrayCommand};
pub use app::{App, Presenter, Renderer, UI_TICK, run_ui};
pub use error::{AppError, AppResult};
#[cfg(not(target_os = "macos"))]
pub use tray::MeetbarTray;
