//! Line dispatch.
//!
//! Every inbound line goes through [`Dispatcher::dispatch_line`]:
//!
//! 1. parse; a line without a usable command is dropped with a warning;
//! 2. ask the burst tracker whether to hold it back;
//! 3. run the built-in handler that keeps the network model current;
//! 4. re-dispatch anything the built-in released (burst replay);
//! 5. run feature handlers registered for the command, in order.

mod burst;
mod channel;
mod connection;
pub mod core;

use slirc_proto::Message;
use tracing::{debug_span, warn};

use self::core::Registry;
use crate::callbacks::Owner;
use crate::error::DispatchError;

pub use self::core::{
    Context, Core, CoreHandler, Handler, HandlerResult, Identity, Outbound, Outbox, Priority,
    Replay, Signal, TimerCallback, TimerRequest,
};

/// Outcome of dispatching one line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatched {
    /// Built-in and feature handlers ran.
    Handled,
    /// Buffered until a burst finishes; nothing ran.
    Deferred,
}

/// Routes parsed lines to built-in and feature handlers.
pub struct Dispatcher {
    core: Core,
    registry: Registry,
}

impl Dispatcher {
    pub fn new(me: Identity) -> Self {
        Self {
            core: Core::new(me),
            registry: Registry::new(),
        }
    }

    pub fn core(&self) -> &Core {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut Core {
        &mut self.core
    }

    /// Register a feature handler for `command`.
    pub fn register(
        &mut self,
        command: &str,
        owner: impl Into<Owner>,
        handler: impl FnMut(&mut Context<'_>, &Message) + 'static,
    ) {
        self.registry.register(command, owner.into(), Box::new(handler));
    }

    /// Drop every feature handler owned by `owner`.
    pub fn unregister_owner(&mut self, owner: &Owner) -> usize {
        self.registry.unregister_owner(owner)
    }

    pub fn handler_count(&self, command: &str) -> usize {
        self.registry.handler_count(command)
    }

    /// Parse and dispatch one raw line.
    pub fn dispatch_line(&mut self, line: &str) -> Result<Dispatched, DispatchError> {
        let msg: Message = match line.parse() {
            Ok(msg) => msg,
            Err(err) => {
                warn!(line = %line, error = %err, "dropping malformed line");
                return Err(err.into());
            }
        };
        self.dispatch(msg)
    }

    /// Dispatch an already parsed message.
    pub fn dispatch(&mut self, msg: Message) -> Result<Dispatched, DispatchError> {
        let Some(msg) = self.core.burst.defer(&mut self.core.state, &self.core.me.nick, msg) else {
            return Ok(Dispatched::Deferred);
        };

        let replay = self.registry.run_core(&mut self.core, &msg)?;
        self.replay(replay);

        let mut ctx = Context::new(&mut self.core);
        self.registry.run_external(&mut ctx, &msg);
        Ok(Dispatched::Handled)
    }

    /// Re-dispatch released lines in order. A failing line is logged and
    /// skipped; the rest still run.
    fn replay(&mut self, lines: Replay) {
        if lines.is_empty() {
            return;
        }
        let _span = debug_span!("replay", lines = lines.len()).entered();
        for msg in lines {
            let command = msg.command.clone();
            if let Err(err) = self.dispatch(msg) {
                warn!(command = %command, error = %err, "replayed line failed");
            }
        }
    }
}
