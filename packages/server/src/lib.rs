//! HTTP boundary for the unfurl extraction pipeline.

pub mod config;
pub mod server;

pub use config::Config;
