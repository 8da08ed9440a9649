//! Core types: meetings, time windows, menu-bar rendering, tracing

pub mod display;
pub mod meeting;
pub mod time;
pub mod tracing;

pub use display::{
    DisplayOptions, LabelStyle, MenuEntry, MenuState, NO_MEETINGS_LABEL, StatusIcon, format_countdown,
    format_duration, highlight, icon_for, render,
};
pub use meeting::{Meeting, MeetingList};
pub use time::TimeWindow;
pub use crate::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
