//! Shared integration test helpers
//!
//! Not every test binary uses every helper.
#![allow(dead_code)]

pub mod app;
pub mod audio_generator;
pub mod backends;
