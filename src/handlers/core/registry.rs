//! Handler tables.
//!
//! Two tables keyed by command name: the fixed built-in handlers that keep
//! the network model current, and feature handlers registered at runtime.

use std::collections::HashMap;

use slirc_proto::Message;
use tracing::debug;

use super::context::{Context, Core, HandlerResult};
use crate::callbacks::Owner;
use crate::handlers::{burst, channel, connection};

/// A built-in handler that maintains core state.
pub trait CoreHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult;
}

/// A feature handler.
pub type Handler = Box<dyn FnMut(&mut Context<'_>, &Message)>;

/// Registry of command handlers.
pub struct Registry {
    core: HashMap<&'static str, Box<dyn CoreHandler>>,
    external: HashMap<String, Vec<(Owner, Handler)>>,
}

impl Registry {
    /// Create a registry with every built-in handler installed.
    pub fn new() -> Self {
        let mut core: HashMap<&'static str, Box<dyn CoreHandler>> = HashMap::new();

        // Liveness and registration
        core.insert("PING", Box::new(connection::PingHandler));
        core.insert("ERROR", Box::new(connection::ErrorHandler));
        core.insert("001", Box::new(connection::WelcomeHandler));
        core.insert("004", Box::new(connection::MyInfoHandler));
        core.insert("311", Box::new(connection::WhoisUserHandler));
        core.insert("318", Box::new(connection::EndOfWhoisHandler));
        core.insert("396", Box::new(connection::HostHiddenHandler));
        core.insert("433", Box::new(connection::NickInUseHandler));
        core.insert("NICK", Box::new(connection::NickHandler));
        core.insert("QUIT", Box::new(connection::QuitHandler));

        // Channel events
        core.insert("JOIN", Box::new(channel::JoinHandler));
        core.insert("PART", Box::new(channel::PartHandler));
        core.insert("KICK", Box::new(channel::KickHandler));
        core.insert("TOPIC", Box::new(channel::TopicHandler));
        core.insert("MODE", Box::new(channel::ModeHandler));

        // Burst replies
        core.insert("353", Box::new(burst::NamReplyHandler));
        core.insert("366", Box::new(burst::EndOfNamesHandler));
        core.insert("324", Box::new(burst::ChannelModeIsHandler));
        core.insert("329", Box::new(burst::CreationTimeHandler));
        core.insert("332", Box::new(burst::TopicReplyHandler));
        core.insert("333", Box::new(burst::TopicWhoTimeHandler));
        core.insert("367", Box::new(burst::BanListHandler));
        core.insert("368", Box::new(burst::EndOfBanListHandler));
        core.insert("352", Box::new(burst::WhoReplyHandler));
        core.insert("315", Box::new(burst::EndOfWhoHandler));

        Self {
            core,
            external: HashMap::new(),
        }
    }

    /// Run the built-in handler for `msg`, if there is one.
    pub fn run_core(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        match self.core.get(msg.command.as_str()) {
            Some(handler) => handler.handle(core, msg),
            None => Ok(Vec::new()),
        }
    }

    #[cfg(test)]
    pub(crate) fn replace_core(&mut self, command: &'static str, handler: Box<dyn CoreHandler>) {
        self.core.insert(command, handler);
    }

    /// Add a feature handler for `command`. Handlers for one command run in
    /// registration order.
    pub fn register(&mut self, command: &str, owner: Owner, handler: Handler) {
        debug!(command = %command, owner = %owner, "handler registered");
        self.external
            .entry(command.to_ascii_uppercase())
            .or_default()
            .push((owner, handler));
    }

    /// Remove every feature handler registered by `owner`.
    pub fn unregister_owner(&mut self, owner: &Owner) -> usize {
        let mut removed = 0;
        self.external.retain(|_, handlers| {
            let before = handlers.len();
            handlers.retain(|(o, _)| o != owner);
            removed += before - handlers.len();
            !handlers.is_empty()
        });
        removed
    }

    /// Number of feature handlers for `command`.
    pub fn handler_count(&self, command: &str) -> usize {
        self.external
            .get(&command.to_ascii_uppercase())
            .map_or(0, Vec::len)
    }

    /// Invoke every feature handler registered for `msg`'s command.
    pub fn run_external(&mut self, ctx: &mut Context<'_>, msg: &Message) {
        if let Some(handlers) = self.external.get_mut(msg.command.as_str()) {
            for (_, handler) in handlers.iter_mut() {
                handler(ctx, msg);
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
