//! # VidShield Common Library
//!
//! Shared code for the VidShield processing clients including:
//! - Stream protocol types (Phase, StreamEvent and payloads)
//! - Error types
//! - Configuration file discovery
//! - Human-readable time formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;

pub use error::{Error, Result};
pub use events::{Phase, StreamEvent};
