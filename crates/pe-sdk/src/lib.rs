//! Puppet Enterprise event model and HTTP client.
//!
//! This crate provides the pieces needed to forward ITSI notable events to
//! Puppet Enterprise:
//!
//! - [`rest::RestClient`] issues JSON GET/POST requests and reports failures
//!   as [`RestError`] values
//! - [`PeEvent`] builds the outbound event payload and validates its priority
//! - [`PeClient`] carries credentials and headers, posts an event and extracts
//!   the `requestId` from the response
//!
//! # Usage
//!
//! ```no_run
//! use pe_sdk::{Credentials, PeClient, PeEvent};
//!
//! # async fn example() -> Result<(), pe_sdk::PriorityError> {
//! let mut event = PeEvent::new();
//! event.add_property("event_id", "abc-123");
//! event.add_recipient("ops-team");
//! event.set_priority("high")?;
//!
//! let mut client = PeClient::new();
//! client.add_credentials(Credentials::Token("0000000".to_string()));
//!
//! match client.send_event("https://puppet.example.com:8143/orchestrator/v1/command/deploy", &event).await {
//!     Some(request_id) => println!("sent: {request_id}"),
//!     None => eprintln!("send failed"),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod error;
pub mod event;
pub mod rest;

pub use client::{Credentials, PeClient};
pub use error::{PriorityError, RestError};
pub use event::{PeEvent, Priority, Recipient};
pub use rest::RestClient;
