//! # AI Sample Organizer Common Library
//!
//! Shared code for the sample organizer service and its front ends:
//! - Error type
//! - Event types and the broadcast EventBus
//! - Configuration loading (service TOML, setup JSON, root folder resolution)

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
