//! Core Components
//!
//! Infrastructure shared by the lifecycle manager: clock, HTTP transport, backend calls,
//! config resolution, persistent storage and redirect state.

pub mod backend;
pub mod clock;
pub mod config;
pub mod location;
pub mod state;
pub mod storage;
pub mod transport;

pub use backend::*;
pub use clock::*;
pub use config::*;
pub use location::*;
pub use state::*;
pub use storage::*;
pub use transport::*;
