//! Wiring shared by the frontends: configuration, the poller, and the UI task
//! that renders the latest snapshot on every change and every tick.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use meetbar_core::{DisplayOptions, MeetingList, MenuState, render};
use meetbar_poller::{GoogleConnector, Poller, PollerConfig, SnapshotSubscriber, snapshot_channel};
use meetbar_providers::google::GoogleConfig;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::actions::TrayCommand;
use crate::error::AppResult;

#[cfg(target_os = "macos")]
use crate::menubar::MenuBarEvent;
#[cfg(not(target_os = "macos"))]
use crate::tray::{MeetbarTray, spawn_tray};
#[cfg(not(target_os = "macos"))]
use tokio::sync::mpsc::UnboundedSender;

/// Re-render period; relative times count down between polls.
pub const UI_TICK: Duration = Duration::from_secs(1);

/// Renders snapshots and remembers the last output.
#[derive(Debug, Default)]
pub struct Renderer {
    options: DisplayOptions,
    last: Option<MenuState>,
}

impl Renderer {
    pub fn new(options: DisplayOptions) -> Self {
        Self {
            options,
            last: None,
        }
    }

    /// What to show before the first fetch completes.
    pub fn initial(&self, now: DateTime<Utc>) -> MenuState {
        render(&MeetingList::empty(), now, &Local, &self.options)
    }

    /// Returns the new state if it differs from the last one returned.
    pub fn next(&mut self, meetings: &MeetingList, now: DateTime<Utc>) -> Option<MenuState> {
        let state = render(meetings, now, &Local, &self.options);
        if self.last.as_ref() == Some(&state) {
            return None;
        }
        self.last = Some(state.clone());
        Some(state)
    }
}

/// Where rendered states go.
pub enum Presenter {
    #[cfg(not(target_os = "macos"))]
    Tray(ksni::Handle<MeetbarTray>),
    #[cfg(target_os = "macos")]
    MenuBar(tao::event_loop::EventLoopProxy<MenuBarEvent>),
    /// No tray host: log title changes instead.
    Log { last_title: Option<String> },
}

impl Presenter {
    /// Starts the tray, falling back to logging when no host is available.
    #[cfg(not(target_os = "macos"))]
    pub async fn start(initial: MenuState, tx: UnboundedSender<TrayCommand>) -> Self {
        match spawn_tray(initial, tx).await {
            Ok(handle) => {
                info!("tray started");
                Self::Tray(handle)
            }
            Err(e) => {
                warn!(error = %e, "no tray host available, logging titles instead");
                Self::log_only()
            }
        }
    }

    /// Sends states to the event loop owning the menu-bar item.
    #[cfg(target_os = "macos")]
    pub fn menu_bar(proxy: tao::event_loop::EventLoopProxy<MenuBarEvent>) -> Self {
        Self::MenuBar(proxy)
    }

    pub fn log_only() -> Self {
        Self::Log { last_title: None }
    }

    pub async fn present(&mut self, state: MenuState) {
        match self {
            #[cfg(not(target_os = "macos"))]
            Self::Tray(handle) => {
                let title = state.title.clone();
                if handle.update(move |tray| tray.set_state(state)).await.is_none() {
                    warn!(%title, "tray service stopped, logging titles instead");
                    *self = Self::Log {
                        last_title: Some(title),
                    };
                }
            }
            #[cfg(target_os = "macos")]
            Self::MenuBar(proxy) => {
                let title = state.title.clone();
                if proxy.send_event(MenuBarEvent::State(state)).is_err() {
                    warn!(%title, "menu bar stopped, logging titles instead");
                    *self = Self::Log {
                        last_title: Some(title),
                    };
                }
            }
            Self::Log { last_title } => {
                if last_title.as_deref() != Some(state.title.as_str()) {
                    info!(title = %state.title, tooltip = ?state.tooltip, "menu bar");
                    *last_title = Some(state.title);
                }
            }
        }
    }
}

/// Runs until the snapshot publisher goes away.
pub async fn run_ui(
    mut subscriber: SnapshotSubscriber,
    mut presenter: Presenter,
    mut renderer: Renderer,
    tick: Duration,
) {
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let meetings = subscriber.latest();
        if let Some(state) = renderer.next(&meetings, Utc::now()) {
            debug!(title = %state.title, entries = state.entries.len(), "menu updated");
            presenter.present(state).await;
        }

        tokio::select! {
            _ = ticker.tick() => {}
            changed = subscriber.changed() => {
                if !changed {
                    debug!("snapshot publisher closed, stopping UI");
                    return;
                }
            }
        }
    }
}

/// The configured poller and the UI state it feeds.
pub struct App {
    poller: Poller<GoogleConnector>,
    subscriber: SnapshotSubscriber,
    renderer: Renderer,
}

impl App {
    /// Loads credentials and builds the poller. Nothing touches the network
    /// until [`serve`](Self::serve).
    pub fn setup() -> AppResult<Self> {
        let config = GoogleConfig::load_default()?;
        info!(token = %config.token_path.display(), "starting meetbar");
        let connector = GoogleConnector::new(config)?;

        let (publisher, subscriber) = snapshot_channel();
        Ok(Self {
            poller: Poller::new(connector, PollerConfig::default(), publisher),
            subscriber,
            renderer: Renderer::new(DisplayOptions::default()),
        })
    }

    pub fn initial_state(&self) -> MenuState {
        self.renderer.initial(Utc::now())
    }

    /// Polls and renders until the poller fails, Quit is clicked or the
    /// process is interrupted.
    pub async fn serve(
        self,
        presenter: Presenter,
        mut commands: UnboundedReceiver<TrayCommand>,
    ) -> AppResult<()> {
        tokio::spawn(run_ui(self.subscriber, presenter, self.renderer, UI_TICK));

        tokio::select! {
            result = self.poller.run() => {
                let Err(e) = result;
                Err(e.into())
            }
            Some(TrayCommand::Quit) = commands.recv() => {
                info!("quit requested");
                Ok(())
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                Ok(())
            }
        }
    }
}
