//! Liveness, registration and user-level handlers.

use slirc_proto::{Message, Prefix};
use tracing::{debug, info, warn};

use super::channel::leave;
use super::core::{Core, CoreHandler, HandlerResult, Signal};
use crate::state::DeleteReason;

/// `PING` -> `PONG`, bypassing pacing.
pub struct PingHandler;

impl CoreHandler for PingHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        core.outbox.send_now(Message::new("PONG", msg.args.iter().map(String::as_str)));
        Ok(Vec::new())
    }
}

/// `ERROR`: the server is about to close the link.
pub struct ErrorHandler;

impl CoreHandler for ErrorHandler {
    fn handle(&self, _core: &mut Core, msg: &Message) -> HandlerResult {
        warn!(reason = msg.arg(0).unwrap_or_default(), "server sent ERROR");
        Ok(Vec::new())
    }
}

/// `001`: registration accepted.
///
/// Adopts the nick the server settled on, holds global lines back and asks
/// the server who we are.
pub struct WelcomeHandler;

impl CoreHandler for WelcomeHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        if let Some(nick) = msg.arg(0) {
            core.me.nick = nick.to_owned();
        }
        if core.me.registered {
            debug!("duplicate welcome ignored");
            return Ok(Vec::new());
        }
        core.me.registered = true;
        core.burst.begin();
        info!(nick = %core.me.nick, "registered");
        core.outbox.send_now(Message::new("WHOIS", [core.me.nick.as_str()]));
        Ok(Vec::new())
    }
}

/// `004`: remember the server name.
pub struct MyInfoHandler;

impl CoreHandler for MyInfoHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        if let Some(server) = msg.arg(1) {
            core.me.server = Some(server.to_owned());
        }
        Ok(Vec::new())
    }
}

/// Complete registration once our own WHOIS is in.
fn become_ready(core: &mut Core) -> HandlerResult {
    if core.me.ready {
        return Ok(Vec::new());
    }
    core.me.ready = true;
    core.signal(Signal::Ready);
    info!(
        nick = %core.me.nick,
        user = %core.me.username,
        host = %core.me.host,
        "ready"
    );
    Ok(core.burst.end())
}

/// `311 me <nick> <user> <host> * :<realname>`.
///
/// For the agent this fills in the identity and ends the registration
/// burst; for anyone else it refreshes what we know about them.
pub struct WhoisUserHandler;

impl CoreHandler for WhoisUserHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        let (Some(nick), Some(user), Some(host)) = (msg.arg(1), msg.arg(2), msg.arg(3)) else {
            return Ok(Vec::new());
        };
        let realname = msg.arg(5).unwrap_or_default();

        if core.me.is_me(nick) {
            core.me.username = user.to_owned();
            core.me.host = host.to_owned();
            core.me.realname = realname.to_owned();
            return become_ready(core);
        }

        if let Some(known) = core.state.user_mut(nick) {
            known.ident = user.to_owned();
            known.host = host.to_owned();
            known.info = realname.to_owned();
        }
        Ok(Vec::new())
    }
}

/// `318`: end of WHOIS. Servers that hide our own `311` still end the
/// registration burst here.
pub struct EndOfWhoisHandler;

impl CoreHandler for EndOfWhoisHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        match msg.arg(1) {
            Some(nick) if core.me.is_me(nick) && core.me.registered => become_ready(core),
            _ => Ok(Vec::new()),
        }
    }
}

/// `396 me <host> :is now your displayed host`.
pub struct HostHiddenHandler;

impl CoreHandler for HostHiddenHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        if let Some(host) = msg.arg(1) {
            debug!(host = %host, "displayed host changed");
            core.me.host = host.to_owned();
            let nick = core.me.nick.clone();
            if let Some(user) = core.state.user_mut(&nick) {
                user.host = host.to_owned();
            }
        }
        Ok(Vec::new())
    }
}

/// `433`: during registration, retry with an underscore appended.
pub struct NickInUseHandler;

impl CoreHandler for NickInUseHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        if core.me.registered {
            return Ok(Vec::new());
        }
        let taken = msg.arg(1).unwrap_or(&core.me.nick);
        let next = format!("{}_", taken);
        warn!(taken = %taken, next = %next, "nick in use");
        core.me.nick = next;
        core.outbox.send_now(Message::new("NICK", [core.me.nick.as_str()]));
        Ok(Vec::new())
    }
}

/// `:old!u@h NICK new`: rename before anyone else sees the event.
pub struct NickHandler;

impl CoreHandler for NickHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        let (Some(old), Some(new)) = (msg.source_nick(), msg.arg(0)) else {
            return Ok(Vec::new());
        };
        if core.state.has_user(old) {
            core.state.rename_user(old, new)?;
        }
        if core.me.is_me(old) {
            info!(old = %old, new = %new, "own nick changed");
            core.me.nick = new.to_owned();
        }
        Ok(Vec::new())
    }
}

/// `:nick!u@h QUIT :reason`: the user is gone from every channel at once.
pub struct QuitHandler;

impl CoreHandler for QuitHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        let Some(nick) = msg.source_nick() else {
            return Ok(Vec::new());
        };
        if core.me.is_me(nick) {
            info!("own QUIT echoed, tearing down every channel");
            let channels: Vec<String> = core.state.channels().map(|c| c.name().to_owned()).collect();
            let mut replay = Vec::new();
            for channel in channels {
                replay.extend(leave(core, &channel, nick, DeleteReason::Quit)?);
            }
            if core.state.has_user(nick) {
                core.state.delete_user(nick, DeleteReason::Quit)?;
            }
            return Ok(replay);
        }
        if core.state.has_user(nick) {
            core.state.delete_user(nick, DeleteReason::Quit)?;
        }
        Ok(Vec::new())
    }
}

/// Source ident and host, empty when the prefix lacks them.
pub(super) fn source_parts(msg: &Message) -> (&str, &str) {
    match &msg.prefix {
        Some(Prefix::Nickname(_, user, host)) => (user.as_str(), host.as_str()),
        _ => ("", ""),
    }
}
