//! Lifecycle Types
//!
//! Data structures shared across the crate.

pub mod banner;
pub mod config;
pub mod redirect;
pub mod token;

pub use banner::*;
pub use config::*;
pub use redirect::*;
pub use token::*;
