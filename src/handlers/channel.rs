//! Channel event handlers: JOIN, PART, KICK, TOPIC, MODE.

use slirc_proto::{ChannelExt, Message, ModeClass, parse_channel_modes};
use tracing::{debug, info, warn};

use super::connection::source_parts;
use super::core::{Core, CoreHandler, HandlerResult, Replay, now};
use crate::error::StateError;
use crate::state::{DeleteReason, MemberModes};

/// `:nick!u@h JOIN #chan`.
///
/// Our own join creates the channel and starts its burst. Anyone else's join
/// only matters for channels we are already in.
pub struct JoinHandler;

impl CoreHandler for JoinHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        let (Some(nick), Some(channel)) = (msg.source_nick(), msg.arg(0)) else {
            return Ok(Vec::new());
        };
        let (ident, host) = source_parts(msg);

        if core.me.is_me(nick) {
            let mut replay = Vec::new();
            if let Some(existing) = core.state.channel(channel) {
                // The old channel's burst can no longer finish.
                if !existing.burst_state().is_finished() {
                    replay = core.burst.end();
                }
            }
            info!(channel = %channel, "joined");
            core.state.add_channel(channel, true);
            core.burst.begin();
            core.state.ensure_user(nick, ident, host);
            core.state.add_membership(channel, nick, MemberModes::NONE)?;
            if !host.is_empty() {
                core.me.host = host.to_owned();
            }
            return Ok(replay);
        }

        if !core.state.has_channel(channel) {
            debug!(channel = %channel, nick = %nick, "join for unknown channel ignored");
            return Ok(Vec::new());
        }
        core.state.ensure_user(nick, ident, host);
        core.state.add_membership(channel, nick, MemberModes::NONE)?;
        Ok(Vec::new())
    }
}

/// Remove `nick` from `channel`; for the agent the whole channel goes.
pub(super) fn leave(core: &mut Core, channel: &str, nick: &str, reason: DeleteReason) -> HandlerResult {
    if core.me.is_me(nick) {
        let Some(existing) = core.state.channel(channel) else {
            return Ok(Vec::new());
        };
        let replay = if existing.burst_state().is_finished() {
            Vec::new()
        } else {
            core.burst.end()
        };
        info!(channel = %channel, ?reason, "left channel");
        core.state.delete_channel(channel)?;
        return Ok(replay);
    }

    if core.state.membership(channel, nick).is_some() {
        core.state.delete_membership(channel, nick, reason, true)?;
    } else {
        debug!(channel = %channel, nick = %nick, "departure of unknown member ignored");
    }
    Ok(Vec::new())
}

/// `:nick!u@h PART #chan [:reason]`.
pub struct PartHandler;

impl CoreHandler for PartHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        match (msg.source_nick(), msg.arg(0)) {
            (Some(nick), Some(channel)) => leave(core, channel, nick, DeleteReason::Part),
            _ => Ok(Vec::new()),
        }
    }
}

/// `:op!u@h KICK #chan victim [:reason]`.
pub struct KickHandler;

impl CoreHandler for KickHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        match (msg.arg(0), msg.arg(1)) {
            (Some(channel), Some(victim)) => leave(core, channel, victim, DeleteReason::Kick),
            _ => Ok(Vec::new()),
        }
    }
}

/// `:nick!u@h TOPIC #chan :text`.
pub struct TopicHandler;

impl CoreHandler for TopicHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        let Some(channel) = msg.arg(0) else {
            return Ok(Vec::new());
        };
        if core.state.has_channel(channel) {
            let text = msg.arg(1).unwrap_or_default();
            core.state.set_topic(channel, text, msg.source_nick(), now())?;
        }
        Ok(Vec::new())
    }
}

/// `MODE <target> <modes> [args...]` for channels and for the agent itself.
pub struct ModeHandler;

impl CoreHandler for ModeHandler {
    fn handle(&self, core: &mut Core, msg: &Message) -> HandlerResult {
        let (Some(target), Some(modes)) = (msg.arg(0), msg.arg(1)) else {
            return Ok(Vec::new());
        };

        if target.is_channel_name() {
            if core.state.has_channel(target) {
                apply_channel_modes(core, target, modes, &msg.args[2..], msg.source_nick())?;
            }
            return Ok(Vec::new());
        }

        if core.me.is_me(target) {
            apply_user_modes(core, modes);
        }
        Ok(Vec::new())
    }
}

fn apply_user_modes(core: &mut Core, modes: &str) {
    let mut adding = true;
    for letter in modes.chars() {
        match letter {
            '+' => adding = true,
            '-' => adding = false,
            _ if adding => {
                core.me.umodes.insert(letter);
            }
            _ => {
                core.me.umodes.remove(&letter);
            }
        }
    }
    debug!(umodes = %core.me.umodes.iter().collect::<String>(), "user modes changed");
}

/// Apply a channel mode string to an existing channel.
///
/// A letter missing its argument is logged and skipped; the rest still apply.
pub(super) fn apply_channel_modes(
    core: &mut Core,
    channel: &str,
    modes: &str,
    args: &[String],
    set_by: Option<&str>,
) -> Result<Replay, StateError> {
    let state = &mut core.state;
    for change in parse_channel_modes(modes, args) {
        let arg = change.arg.as_deref();
        let needs_arg = match change.class() {
            ModeClass::Key | ModeClass::SetOnly => change.adding,
            ModeClass::Member => true,
            ModeClass::List | ModeClass::Flag => false,
        };
        if needs_arg && arg.is_none() {
            warn!(channel = %channel, modes = %modes, letter = %change.letter, "mode without argument skipped");
            continue;
        }
        match (change.class(), change.letter, arg) {
            (ModeClass::List, 'b', Some(mask)) => {
                let known = state.channel(channel).is_some_and(|c| c.ban(mask).is_some());
                if change.adding {
                    state.add_ban(channel, mask, set_by, Some(now()))?;
                } else if known {
                    state.delete_ban(channel, mask)?;
                }
            }
            (ModeClass::List, _, _) => {}
            (ModeClass::Key, _, key) => {
                state.set_key(channel, if change.adding { key } else { None })?;
            }
            (ModeClass::SetOnly, _, limit) => {
                let limit = if change.adding {
                    limit.and_then(|l| l.parse().ok())
                } else {
                    None
                };
                state.set_limit(channel, limit)?;
            }
            (ModeClass::Member, letter, Some(nick)) => {
                let (Some(mode), Some(membership)) =
                    (MemberModes::from_letter(letter), state.membership_mut(channel, nick))
                else {
                    continue;
                };
                if change.adding {
                    membership.modes.insert(mode);
                } else {
                    membership.modes.remove(mode);
                }
            }
            (ModeClass::Member, _, None) => {}
            (ModeClass::Flag, letter, _) => {
                state.set_mode(channel, letter, change.adding)?;
            }
        }
    }
    Ok(Vec::new())
}
