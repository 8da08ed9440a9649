//! Google Calendar access.
//!
//! - [`TokenProvider`] loads the persisted OAuth token or runs the browser
//!   flow (PKCE, loopback redirect on a fixed port) and hands out a
//!   [`TokenSource`] that refreshes access tokens as they expire.
//! - [`GoogleCalendarClient`] lists primary-calendar events with those tokens
//!   and implements [`CalendarSource`](crate::CalendarSource).
//!
//! Users register their own desktop OAuth client and place its JSON at
//! `<data dir>/meetbar/credentials.json`; the token is kept next to it.

mod auth;
mod client;
mod config;
mod oauth;
mod tokens;

pub use auth::{Authorizer, TokenProvider, TokenSource};
pub use client::{GoogleCalendarClient, PROVIDER_NAME};
pub use config::{
    CREDENTIALS_FILE_NAME, GoogleConfig, OAuthCredentials, TOKEN_FILE_NAME, app_data_dir,
};
pub use oauth::{CALLBACK_PATH, CallbackParams, CallbackServer, OAuthClient, PkceFlow, RefreshedToken};
pub use tokens::{TokenInfo, TokenStorage};
