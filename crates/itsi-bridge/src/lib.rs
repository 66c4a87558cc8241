//! ITSI notable-event bridge for Puppet Enterprise.
//!
//! This crate provides:
//! - the notable-event alert action that forwards grouped events to Puppet
//!   Enterprise ([`action::AlertAction`])
//! - field mapping and severity bucketing for the outbound payload
//! - the comment and response request handlers Puppet Enterprise calls back
//!   into ([`handlers`]), usable from stdin or through the HTTP server
//! - the [`platform::Platform`] seam over the Splunk/ITSI REST API

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod action;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mapping;
pub mod platform;
pub mod server;
pub mod severity;
pub mod splunk;
pub mod telemetry;

/// A notable event as delivered by ITSI: string keys to loosely-typed values.
pub type Record = serde_json::Map<String, serde_json::Value>;

pub use action::{ActionOutcome, AlertAction};
pub use config::{ActionConfig, AlertSettings, AuthScheme, Config};
pub use error::{ActionError, EventSourceError, HandlerError, PlatformError, SettingsError};
pub use handlers::{CommentHandler, HandlerResponse, RequestHandler, ResponseHandler};
pub use platform::{EventUpdate, Platform, PlatformConnector};
pub use severity::SeverityLabel;
pub use splunk::{SplunkConnector, SplunkPlatform};
