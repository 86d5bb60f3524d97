//! Burst reply handlers.
//!
//! Each end-of-list numeric moves its channel one stage forward and sends
//! the query for the next stage. Replies for channels we are not in (a user
//! running `/NAMES` on some other channel, say) are ignored.

use slirc_proto::{Message, Prefix};
use tracing::debug;

use super::channel::apply_channel_modes;
use super::core::{Core, CoreHandler, HandlerResult};
use crate::burst::BurstState;
use crate::state::MemberModes;

/// Advance `channel` from `from` and queue `next_query` if it moved.
fn advance(core: &mut Core, channel: &str, from: BurstState, next_query: Message) {
    let moved = core
        .state
        .channel_mut(channel)
        .is_some_and(|c| c.advance_burst(from));
    if moved {
        debug!(channel = %channel, query = %next_query, "burst stage complete");
        core.outbox.send(next_query);
    }
}

/// `353 me <symbol> #chan :[@|+]nick[!user@host] ...`
pub struct NamReplyHandler;

impl CoreHandler for NamReplyHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        let (Some(channel), Some(names)) = (msg.arg(2), msg.arg(3)) else {
            return Ok(Vec::new());
        };
        if !core.state.has_channel(channel) {
            return Ok(Vec::new());
        }

        for entry in names.split_whitespace() {
            let (modes, mask) = MemberModes::split_prefixed(entry);
            let (nick, ident, host) = match Prefix::parse(mask) {
                Prefix::Nickname(nick, ident, host) => (nick, ident, host),
                Prefix::ServerName(name) => (name, String::new(), String::new()),
            };
            if nick.is_empty() {
                continue;
            }
            core.state.ensure_user(&nick, &ident, &host);
            match core.state.membership_mut(channel, &nick) {
                Some(membership) => membership.modes = modes,
                None => {
                    core.state.add_membership(channel, &nick, modes)?;
                }
            }
        }
        Ok(Vec::new())
    }
}

/// `366 me #chan :End of /NAMES list.` -> ask for modes.
pub struct EndOfNamesHandler;

impl CoreHandler for EndOfNamesHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        if let Some(channel) = msg.arg(1) {
            advance(core, channel, BurstState::Names, Message::new("MODE", [channel]));
        }
        Ok(Vec::new())
    }
}

/// `324 me #chan <modes> [args...]` -> apply, then ask for bans.
pub struct ChannelModeIsHandler;

impl CoreHandler for ChannelModeIsHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        let (Some(channel), Some(modes)) = (msg.arg(1), msg.arg(2)) else {
            return Ok(Vec::new());
        };
        if !core.state.has_channel(channel) {
            return Ok(Vec::new());
        }
        apply_channel_modes(core, channel, modes, &msg.args[3..], None)?;
        advance(core, channel, BurstState::Modes, Message::new("MODE", [channel, "+b"]));
        Ok(Vec::new())
    }
}

/// `329 me #chan <timestamp>`.
pub struct CreationTimeHandler;

impl CoreHandler for CreationTimeHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        let (Some(channel), Some(at)) = (msg.arg(1), msg.arg(2).and_then(|t| t.parse().ok())) else {
            return Ok(Vec::new());
        };
        if core.state.has_channel(channel) {
            core.state.set_created_at(channel, at)?;
        }
        Ok(Vec::new())
    }
}

/// `332 me #chan :topic`.
pub struct TopicReplyHandler;

impl CoreHandler for TopicReplyHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        let (Some(channel), Some(text)) = (msg.arg(1), msg.arg(2)) else {
            return Ok(Vec::new());
        };
        if core.state.has_channel(channel) {
            core.state.set_topic(channel, text, None, 0)?;
        }
        Ok(Vec::new())
    }
}

/// `333 me #chan <setter> <timestamp>`.
pub struct TopicWhoTimeHandler;

impl CoreHandler for TopicWhoTimeHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        let (Some(channel), Some(setter)) = (msg.arg(1), msg.arg(2)) else {
            return Ok(Vec::new());
        };
        let at = msg.arg(3).and_then(|t| t.parse().ok()).unwrap_or_default();
        if core.state.has_channel(channel) {
            core.state.set_topic_time(channel, Some(setter), at)?;
        }
        Ok(Vec::new())
    }
}

/// `367 me #chan <mask> [<setter> <timestamp>]`.
pub struct BanListHandler;

impl CoreHandler for BanListHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        let (Some(channel), Some(mask)) = (msg.arg(1), msg.arg(2)) else {
            return Ok(Vec::new());
        };
        if core.state.has_channel(channel) {
            let at = msg.arg(4).and_then(|t| t.parse().ok());
            core.state.add_ban(channel, mask, msg.arg(3), at)?;
        }
        Ok(Vec::new())
    }
}

/// `368 me #chan :End of channel ban list` -> ask WHO.
pub struct EndOfBanListHandler;

impl CoreHandler for EndOfBanListHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        if let Some(channel) = msg.arg(1) {
            advance(core, channel, BurstState::Bans, Message::new("WHO", [channel]));
        }
        Ok(Vec::new())
    }
}

/// `352 me #chan <user> <host> <server> <nick> <flags> :<hops> <realname>`.
pub struct WhoReplyHandler;

impl CoreHandler for WhoReplyHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        let (Some(channel), Some(ident), Some(host), Some(nick)) =
            (msg.arg(1), msg.arg(2), msg.arg(3), msg.arg(5))
        else {
            return Ok(Vec::new());
        };
        let flags = msg.arg(6).unwrap_or_default();
        let info = msg
            .arg(7)
            .map(|trailing| trailing.split_once(' ').map_or("", |(_, real)| real))
            .unwrap_or_default();

        if let Some(user) = core.state.user_mut(nick) {
            user.ident = ident.to_owned();
            user.host = host.to_owned();
            user.info = info.to_owned();
        }
        if let Some(membership) = core.state.membership_mut(channel, nick) {
            if flags.contains('@') {
                membership.modes.insert(MemberModes::OP);
            }
            if flags.contains('+') {
                membership.modes.insert(MemberModes::VOICE);
            }
        }
        if core.me.is_me(nick) && core.me.host.is_empty() {
            core.me.host = host.to_owned();
        }
        Ok(Vec::new())
    }
}

/// `315 me #chan :End of /WHO list.` -> the channel is synchronized; release
/// everything held back for it.
pub struct EndOfWhoHandler;

impl CoreHandler for EndOfWhoHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        let Some(channel) = msg.arg(1) else {
            return Ok(Vec::new());
        };
        Ok(core.burst.finish_channel(&mut core.state, channel))
    }
}
