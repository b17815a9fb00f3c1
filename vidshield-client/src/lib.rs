//! vidshield-client library interface
//!
//! Follows one video processing job over the server-pushed progress stream.
//!
//! **Components:**
//! - [`connection`] / [`transport`] - single live stream, bounded reconnect
//! - [`dispatcher`] - applies named stream events to [`state::ProcessingState`]
//! - [`session`] - phase state machine
//! - [`detections`], [`live_updates`], [`timing`] - derived display state
//! - [`side_effects`] - completion redirect and error countdown
//! - [`prefetch`] - one-shot violation fetch on reaching review
//! - [`client`] - the task that ties them together
//!
//! **Usage:**
//! ```no_run
//! use std::sync::Arc;
//! use vidshield_client::{
//!     ClientConfig, Collaborators, Navigator, ProcessingClient, StaticToken,
//! };
//!
//! struct LogNavigator;
//!
//! impl Navigator for LogNavigator {
//!     fn navigate(&self, route: &str) {
//!         println!("navigate to {route}");
//!     }
//! }
//!
//! # async fn run() -> Result<(), vidshield_client::ClientError> {
//! let config = ClientConfig::default();
//! let collaborators = Collaborators::http(
//!     &config,
//!     Arc::new(LogNavigator),
//!     Arc::new(StaticToken::new(Some("token".to_string()))),
//! )?;
//! let client = ProcessingClient::spawn(config, collaborators);
//! client.connect("vid1").await?;
//!
//! let mut updates = client.subscribe();
//! while updates.changed().await.is_ok() {
//!     let state = updates.borrow().clone();
//!     println!("{} {}% eta {}", state.session.phase, state.session.progress, state.eta());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod collaborators;
pub mod config;
pub mod connection;
pub mod detections;
pub mod dispatcher;
pub mod error;
pub mod live_updates;
pub mod prefetch;
pub mod reconnect;
pub mod session;
pub mod side_effects;
pub mod state;
pub mod timers;
pub mod timing;
pub mod transport;

pub use crate::client::{Collaborators, ProcessingClient};
pub use crate::collaborators::{Navigator, StaticToken, TokenProvider, ViolationsApi};
pub use crate::config::ClientConfig;
pub use crate::error::{ClientError, ClientResult};
pub use crate::state::ProcessingState;
