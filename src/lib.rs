//! m365-cli - manage Microsoft 365 from the terminal
//!
//! Schema-driven commands for SharePoint Online, Microsoft Teams and
//! Microsoft To Do, built on a small request dispatcher over Microsoft Graph
//! and SharePoint REST.

pub mod api;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod options;
pub mod session;
pub mod telemetry;
pub mod types;

pub use api::M365Client;
pub use config::Config;
pub use error::{CommandError, CommandResult};
pub use session::Session;
