//! macOS menu-bar item on tray-icon, driven by a tao event loop.
//!
//! AppKit wants the status item on the main thread, so the event loop owns
//! that thread and the tokio side talks to it through an
//! [`EventLoopProxy`](tao::event_loop::EventLoopProxy).

use meetbar_core::{MenuEntry, MenuState, NO_MEETINGS_LABEL};
use tao::event::{Event, StartCause};
use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder};
use tao::platform::macos::{ActivationPolicy, EventLoopExtMacOS};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use tray_icon::menu::{Menu, MenuEvent, MenuItem, PredefinedMenuItem};
use tray_icon::{TrayIcon, TrayIconBuilder};

use crate::actions::{self, TrayCommand};
use crate::error::AppResult;

/// Messages for the main thread.
#[derive(Debug)]
pub enum MenuBarEvent {
    State(MenuState),
    Menu(MenuEvent),
    /// Stops the event loop and the process.
    Exit(i32),
}

/// Creates the event loop as an accessory app: no Dock icon, no app menu.
pub fn event_loop() -> EventLoop<MenuBarEvent> {
    let mut event_loop = EventLoopBuilder::<MenuBarEvent>::with_user_event().build();
    event_loop.set_activation_policy(ActivationPolicy::Accessory);
    event_loop
}

fn tooltip(state: &MenuState) -> &str {
    state.tooltip.as_deref().unwrap_or(NO_MEETINGS_LABEL)
}

fn build_menu(state: &MenuState) -> AppResult<Menu> {
    let menu = Menu::new();
    for (index, entry) in state.entries.iter().enumerate() {
        match entry {
            MenuEntry::Meeting { label, .. } => {
                menu.append(&MenuItem::with_id(actions::item_id(index), label, true, None))?
            }
            MenuEntry::Placeholder(text) => menu.append(&MenuItem::new(text, false, None))?,
            MenuEntry::Separator => menu.append(&PredefinedMenuItem::separator())?,
            MenuEntry::Quit => {
                menu.append(&MenuItem::with_id(actions::QUIT_ID, "Quit", true, None))?
            }
        }
    }
    Ok(menu)
}

fn build_tray(state: &MenuState) -> AppResult<TrayIcon> {
    let tray = TrayIconBuilder::new()
        .with_menu(Box::new(build_menu(state)?))
        .with_title(&state.title)
        .with_tooltip(tooltip(state))
        .build()?;
    Ok(tray)
}

fn update(tray: &TrayIcon, current: &MenuState, next: &MenuState) {
    tray.set_title(Some(&next.title));
    if let Err(e) = tray.set_tooltip(Some(tooltip(next))) {
        warn!(error = %e, "failed to update tooltip");
    }
    if current.entries != next.entries {
        match build_menu(next) {
            Ok(menu) => tray.set_menu(Some(Box::new(menu))),
            Err(e) => warn!(error = %e, "failed to rebuild menu"),
        }
    }
}

/// Runs the event loop on the calling thread until [`MenuBarEvent::Exit`].
///
/// Menu clicks open links directly; Quit is forwarded through `tx`. If the
/// status item cannot be created, titles are logged instead.
pub fn run(
    event_loop: EventLoop<MenuBarEvent>,
    initial: MenuState,
    tx: UnboundedSender<TrayCommand>,
) -> ! {
    let proxy = event_loop.create_proxy();
    MenuEvent::set_event_handler(Some(move |event| {
        let _ = proxy.send_event(MenuBarEvent::Menu(event));
    }));

    let mut state = initial;
    let mut tray: Option<TrayIcon> = None;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::NewEvents(StartCause::Init) => match build_tray(&state) {
                Ok(icon) => {
                    info!("menu bar started");
                    tray = Some(icon);
                }
                Err(e) => warn!(error = %e, "no menu bar available, logging titles instead"),
            },
            Event::UserEvent(MenuBarEvent::State(next)) => {
                match &tray {
                    Some(icon) => update(icon, &state, &next),
                    None if next.title != state.title => {
                        info!(title = %next.title, tooltip = ?next.tooltip, "menu bar");
                    }
                    None => {}
                }
                state = next;
            }
            Event::UserEvent(MenuBarEvent::Menu(event)) => {
                let id = event.id().0.as_str();
                debug!(id, "menu item clicked");
                if let Some(action) = actions::resolve(&state, id) {
                    actions::perform(action, &tx);
                }
            }
            Event::UserEvent(MenuBarEvent::Exit(code)) => {
                *control_flow = ControlFlow::ExitWithCode(code);
            }
            _ => {}
        }
    })
}
