//! A small blocking Rust client for the Refinitiv Data Platform (RDP) REST APIs.
//!
//! This crate covers the flow of a typical RDP script:
//! sign in to obtain a token pair, call data endpoints with the access token,
//! and renew the session with the refresh token before it expires.
//!
//! ## Quick start
//! - Configure credentials via environment variables (`RDP_USERNAME`, `RDP_PASSWORD`,
//!   `RDP_CLIENTID`) or a `.env` file (see [`Config::from_env`]).
//! - Call [`Controller::authenticate`], then [`Controller::fetch_scored_entities`] or
//!   [`Controller::fetch_search_results`] with the access token.
//!
//! ```no_run
//! use anyhow::{Result, bail};
//! use rdpapi::{Config, Controller, Reply};
//!
//! fn main() -> Result<()> {
//!     let cfg = Config::from_env()?;
//!     let controller = Controller::new()?;
//!
//!     let token = match controller.authenticate(
//!         &cfg.auth_url(),
//!         &cfg.username,
//!         &cfg.password,
//!         &cfg.client_id,
//!         None,
//!     )? {
//!         Reply::Received(token) => token,
//!         Reply::Unreachable(err) => bail!("RDP is unreachable: {err}"),
//!     };
//!
//!     let scores = controller.fetch_scored_entities(&cfg.esg_url(), &token.access_token, "IBM.N")?;
//!     if let Some(scores) = scores.into_option() {
//!         println!("{scores:#}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Transport failures come back as [`Reply::Unreachable`] rather than as errors;
//! any non-200 status is an [`RdpError`] carrying the status and the raw body.

#![forbid(unsafe_code)]

mod auth;
mod client;
mod config;
mod error;
mod util;

pub use auth::{GrantKind, GrantRequest, SessionToken};
pub use client::{Controller, ControllerOptions, DEFAULT_SCOPE, RefreshArguments, Reply};
pub use config::{
    Config, DEFAULT_AUTH_PATH, DEFAULT_BASE_URL, DEFAULT_ESG_PATH, DEFAULT_SEARCH_PATH,
};
pub use error::{FieldError, INVALID_ARGUMENTS, RdpError, ServiceError};
