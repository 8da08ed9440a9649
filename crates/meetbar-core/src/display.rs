//! Menu-bar rendering.
//!
//! Everything here is a pure function of the latest [`MeetingList`], the
//! current instant and the local timezone. The tray calls [`render`] on every
//! snapshot change and on its own tick, so relative times keep counting down
//! between polls.
//!
//! ```text
//! 📅 in 1h 35m        next meeting starts later
//! ⏰ in 1m            starts in under two minutes
//! 🗣️ 12m left         in progress
//! 🧘                  nothing left today
//! ```

use std::fmt::Display;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use crate::meeting::{Meeting, MeetingList};

/// Default threshold below which a meeting is flagged as imminent.
pub const DEFAULT_IMMINENT_THRESHOLD_SECS: i64 = 120;

/// Label shown when there is nothing to list.
pub const NO_MEETINGS_LABEL: &str = "No upcoming meetings";

/// Icon shown in the menu bar next to the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusIcon {
    /// No meeting to highlight.
    Idle,
    /// Next meeting is further away than the imminent threshold.
    Upcoming,
    /// Next meeting starts within the imminent threshold.
    Imminent,
    /// Highlighted meeting has started.
    InProgress,
}

impl StatusIcon {
    /// Returns the glyph rendered in the menu-bar title.
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Idle => "🧘",
            Self::Upcoming => "📅",
            Self::Imminent => "⏰",
            Self::InProgress => "🗣️",
        }
    }
}

/// How meeting entries are labelled in the dropdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LabelStyle {
    /// `Title (10:00)`
    StartOnly,
    /// `Title (10:00 - 10:30)`
    #[default]
    StartEnd,
}

/// Rendering options.
#[derive(Debug, Clone)]
pub struct DisplayOptions {
    /// Below this time-until-start the [`StatusIcon::Imminent`] icon is used.
    pub imminent_threshold: TimeDelta,
    /// Dropdown label style.
    pub label_style: LabelStyle,
    /// `strftime` pattern for times in labels.
    pub time_format: String,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            imminent_threshold: TimeDelta::seconds(DEFAULT_IMMINENT_THRESHOLD_SECS),
            label_style: LabelStyle::default(),
            time_format: "%H:%M".to_string(),
        }
    }
}

impl DisplayOptions {
    /// Sets the imminent threshold.
    #[must_use]
    pub fn with_imminent_threshold(mut self, threshold: TimeDelta) -> Self {
        self.imminent_threshold = threshold;
        self
    }

    /// Sets the label style.
    #[must_use]
    pub fn with_label_style(mut self, style: LabelStyle) -> Self {
        self.label_style = style;
        self
    }
}

/// One row of the dropdown menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    /// A meeting; selecting it opens `link`.
    Meeting { label: String, link: String },
    /// Inert text row.
    Placeholder(String),
    Separator,
    /// Terminates the process.
    Quit,
}

/// Everything the tray needs to draw itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuState {
    pub icon: StatusIcon,
    /// Menu-bar title: glyph plus countdown.
    pub title: String,
    /// Summary of the highlighted meeting, if any.
    pub tooltip: Option<String>,
    pub entries: Vec<MenuEntry>,
}

/// Picks the meeting to show in the menu bar.
///
/// A meeting in progress wins; otherwise the one with the soonest future
/// start. Ties keep list order, which is start-ascending already.
pub fn highlight(meetings: &MeetingList, now: DateTime<Utc>) -> Option<&Meeting> {
    meetings
        .iter()
        .find(|m| m.is_in_progress(now))
        .or_else(|| {
            meetings
                .iter()
                .filter(|m| m.start > now)
                .min_by_key(|m| m.start)
        })
}

/// Selects the icon from the time left until a meeting starts.
pub fn icon_for(until_start: TimeDelta, imminent_threshold: TimeDelta) -> StatusIcon {
    if until_start <= TimeDelta::zero() {
        StatusIcon::InProgress
    } else if until_start < imminent_threshold {
        StatusIcon::Imminent
    } else {
        StatusIcon::Upcoming
    }
}

/// Formats a duration floored to whole minutes: `0m`, `45m`, `1h 35m`.
///
/// Zero and negative durations render as `0m`.
pub fn format_duration(duration: TimeDelta) -> String {
    let minutes = duration.num_minutes();
    if minutes <= 0 {
        return "0m".to_string();
    }

    let hours = minutes / 60;
    let minutes = minutes % 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Formats the countdown for a meeting.
///
/// Before the start: `in 5m`, or `now` inside the last minute. After the
/// start: time left until the end, e.g. `12m left`.
pub fn format_countdown(meeting: &Meeting, now: DateTime<Utc>) -> String {
    if meeting.has_started(now) {
        format!("{} left", format_duration(meeting.time_until_end(now)))
    } else {
        let until = meeting.time_until_start(now);
        if until.num_minutes() == 0 {
            "now".to_string()
        } else {
            format!("in {}", format_duration(until))
        }
    }
}

/// Renders the full menu state for a snapshot.
pub fn render<Tz>(
    meetings: &MeetingList,
    now: DateTime<Utc>,
    tz: &Tz,
    options: &DisplayOptions,
) -> MenuState
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let (icon, title, tooltip) = match highlight(meetings, now) {
        Some(meeting) => {
            let icon = icon_for(meeting.time_until_start(now), options.imminent_threshold);
            let title = format!("{} {}", icon.glyph(), format_countdown(meeting, now));
            (icon, title, Some(meeting.title().to_string()))
        }
        None => (StatusIcon::Idle, StatusIcon::Idle.glyph().to_string(), None),
    };

    let mut entries: Vec<MenuEntry> = if meetings.is_empty() {
        vec![MenuEntry::Placeholder(NO_MEETINGS_LABEL.to_string())]
    } else {
        meetings
            .iter()
            .map(|m| MenuEntry::Meeting {
                label: entry_label(m, tz, options),
                link: m.link.clone(),
            })
            .collect()
    };
    entries.push(MenuEntry::Separator);
    entries.push(MenuEntry::Quit);

    MenuState {
        icon,
        title,
        tooltip,
        entries,
    }
}

fn entry_label<Tz>(meeting: &Meeting, tz: &Tz, options: &DisplayOptions) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let start = meeting.start.with_timezone(tz).format(&options.time_format);
    match options.label_style {
        LabelStyle::StartOnly => format!("{} ({})", meeting.title(), start),
        LabelStyle::StartEnd => {
            let end = meeting.end.with_timezone(tz).format(&options.time_format);
            format!("{} ({} - {})", meeting.title(), start, end)
        }
    }
}
