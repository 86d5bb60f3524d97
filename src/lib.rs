//! slircbot - Straylight IRC agent.
//!
//! A persistent IRC client that keeps an accurate model of every channel it
//! sits in. Incoming lines are parsed, deferred while the affected channel is
//! still being synchronized, applied to the model by built-in handlers and
//! then handed to feature modules through a typed callback registry.

pub mod burst;
pub mod callbacks;
pub mod config;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod session;
pub mod state;

pub use crate::callbacks::{Callbacks, Owner};
pub use crate::config::Config;
pub use crate::session::Session;
