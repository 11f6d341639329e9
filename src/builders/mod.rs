//! Builders
//!
//! Fluent builder for the locally-supplied config layer.

pub mod config;

pub use config::{oauth_config, OAuthConfigBuilder};
