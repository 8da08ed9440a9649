//! StatusNotifierItem tray showing the rendered [`MenuState`].

use ksni::{MenuItem, TrayMethods, menu};
use meetbar_core::{MenuEntry, MenuState, NO_MEETINGS_LABEL, StatusIcon};
use tokio::sync::mpsc::UnboundedSender;

use crate::actions::{self, MenuAction, TrayCommand};

#[derive(Debug)]
pub struct MeetbarTray {
    state: MenuState,
    tx: UnboundedSender<TrayCommand>,
}

impl MeetbarTray {
    pub fn new(state: MenuState, tx: UnboundedSender<TrayCommand>) -> Self {
        Self { state, tx }
    }

    pub fn set_state(&mut self, state: MenuState) {
        self.state = state;
    }
}

fn icon_name(icon: StatusIcon) -> &'static str {
    match icon {
        StatusIcon::Idle => "x-office-calendar",
        StatusIcon::Upcoming => "appointment-soon",
        StatusIcon::Imminent => "alarm-symbolic",
        StatusIcon::InProgress => "call-start",
    }
}

impl ksni::Tray for MeetbarTray {
    fn id(&self) -> String {
        "meetbar".to_string()
    }

    fn title(&self) -> String {
        self.state.title.clone()
    }

    fn icon_name(&self) -> String {
        icon_name(self.state.icon).to_string()
    }

    fn tool_tip(&self) -> ksni::ToolTip {
        ksni::ToolTip {
            title: self.state.title.clone(),
            description: self
                .state
                .tooltip
                .clone()
                .unwrap_or_else(|| NO_MEETINGS_LABEL.to_string()),
            ..Default::default()
        }
    }

    fn menu(&self) -> Vec<MenuItem<Self>> {
        self.state
            .entries
            .iter()
            .map(|entry| match entry {
                MenuEntry::Meeting { label, link } => {
                    let link = link.clone();
                    menu::StandardItem {
                        label: label.clone(),
                        activate: Box::new(move |tray: &mut Self| {
                            actions::perform(MenuAction::Open(link.clone()), &tray.tx);
                        }),
                        ..Default::default()
                    }
                    .into()
                }
                MenuEntry::Placeholder(text) => menu::StandardItem {
                    label: text.clone(),
                    enabled: false,
                    ..Default::default()
                }
                .into(),
                MenuEntry::Separator => MenuItem::Separator,
                MenuEntry::Quit => menu::StandardItem {
                    label: "Quit".into(),
                    icon_name: "application-exit".into(),
                    activate: Box::new(|tray: &mut Self| actions::perform(MenuAction::Quit, &tray.tx)),
                    ..Default::default()
                }
                .into(),
            })
            .collect()
    }
}

/// Registers the tray with the session's StatusNotifierWatcher.
pub async fn spawn_tray(
    state: MenuState,
    tx: UnboundedSender<TrayCommand>,
) -> Result<ksni::Handle<MeetbarTray>, ksni::Error> {
    MeetbarTray::new(state, tx).spawn().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use ksni::Tray;
    use tokio::sync::mpsc;

    fn state() -> MenuState {
        MenuState {
            icon: StatusIcon::Upcoming,
            title: "📅 in 25m".to_string(),
            tooltip: Some("Standup".to_string()),
            entries: vec![
                MenuEntry::Meeting {
                    label: "Standup (10:00 - 10:15)".to_string(),
                    link: "https://meet.google.com/abc-defg-hij".to_string(),
                },
                MenuEntry::Meeting {
                    label: "Retro (15:00 - 16:00)".to_string(),
                    link: "https://zoom.us/j/1".to_string(),
                },
                MenuEntry::Separator,
                MenuEntry::Quit,
            ],
        }
    }

    fn labels(items: &[MenuItem<MeetbarTray>]) -> Vec<String> {
        items
            .iter()
            .map(|item| match item {
                MenuItem::Standard(item) => item.label.clone(),
                MenuItem::Separator => "---".to_string(),
                _ => "?".to_string(),
            })
            .collect()
    }

    #[test]
    fn menu_mirrors_entries() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let tray = MeetbarTray::new(state(), tx);

        assert_eq!(
            labels(&tray.menu()),
            vec!["Standup (10:00 - 10:15)", "Retro (15:00 - 16:00)", "---", "Quit"]
        );
        assert_eq!(tray.title(), "📅 in 25m");
        assert_eq!(tray.tool_tip().description, "Standup");
        assert_eq!(tray.icon_name(), "appointment-soon");
    }

    #[test]
    fn placeholder_is_disabled() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut tray = MeetbarTray::new(state(), tx);
        tray.set_state(MenuState {
            icon: StatusIcon::Idle,
            title: "🧘".to_string(),
            tooltip: None,
            entries: vec![
                MenuEntry::Placeholder(NO_MEETINGS_LABEL.to_string()),
                MenuEntry::Separator,
                MenuEntry::Quit,
            ],
        });

        let items = tray.menu();
        match &items[0] {
            MenuItem::Standard(item) => {
                assert_eq!(item.label, NO_MEETINGS_LABEL);
                assert!(!item.enabled);
            }
            _ => panic!("expected a standard item"),
        }
        assert_eq!(tray.tool_tip().description, NO_MEETINGS_LABEL);
    }

    #[test]
    fn quit_sends_command() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tray = MeetbarTray::new(state(), tx);

        let items = tray.menu();
        let Some(MenuItem::Standard(quit)) = items.last() else {
            panic!("expected quit item last");
        };
        (quit.activate)(&mut tray);

        assert_eq!(rx.try_recv().unwrap(), TrayCommand::Quit);
    }
}
