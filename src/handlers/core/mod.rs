//! Core handler infrastructure: context types and the handler registry.

pub mod context;
pub mod registry;

pub use context::{
    Context, Core, HandlerResult, Identity, Outbound, Outbox, Priority, Replay, Signal,
    TimerCallback, TimerRequest,
};
pub use registry::{CoreHandler, Handler, Registry};

/// Current Unix time, for state timestamps the server did not supply.
pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
