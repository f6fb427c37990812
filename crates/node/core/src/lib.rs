//! Node infrastructure for rumor.
//!
//! - [`args`] - CLI argument structs
//! - [`config`] - TOML configuration
//! - [`logging`] - Logging initialization
//! - [`node`] - Node lifecycle wiring the store, server and discovery together

pub mod args;
pub mod config;
pub mod constants;
pub mod logging;
pub mod node;

mod error;

pub use error::NodeError;
pub use node::Node;
