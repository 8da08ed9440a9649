//! What clicking a menu row does, independent of the tray backend.
//!
//! The macOS menu bar reports clicks by item id; the ids are derived from the
//! row's position in [`MenuState::entries`] and resolved back here.

use meetbar_core::{MenuEntry, MenuState};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::opener;

/// Commands sent from the tray to the main task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayCommand {
    Quit,
}

pub const QUIT_ID: &str = "quit";

/// Id of the meeting row at `index`.
pub fn item_id(index: usize) -> String {
    format!("entry-{index}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    Open(String),
    Quit,
}

/// Maps a clicked item id onto an action. Unknown ids, placeholders and
/// separators resolve to `None`.
pub fn resolve(state: &MenuState, id: &str) -> Option<MenuAction> {
    if id == QUIT_ID {
        return Some(MenuAction::Quit);
    }
    let index: usize = id.strip_prefix("entry-")?.parse().ok()?;
    match state.entries.get(index)? {
        MenuEntry::Meeting { link, .. } => Some(MenuAction::Open(link.clone())),
        MenuEntry::Quit => Some(MenuAction::Quit),
        MenuEntry::Placeholder(_) | MenuEntry::Separator => None,
    }
}

pub fn perform(action: MenuAction, tx: &UnboundedSender<TrayCommand>) {
    match action {
        MenuAction::Open(link) => {
            if let Err(e) = opener::open_link(&link) {
                warn!(error = %e, "failed to open meeting link");
            }
        }
        MenuAction::Quit => {
            let _ = tx.send(TrayCommand::Quit);
        }
    }
}
