//! Configuration loading and management.
//!
//! - [`types`]: config structs and file loading
//! - [`validation`]: startup checks that report every problem at once

mod defaults;
mod types;
mod validation;

pub use types::{Config, ConfigError, ConnectionConfig, IdentityConfig, ServerConfig};
pub use validation::{ValidationError, validate};
