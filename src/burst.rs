//! Burst synchronization.
//!
//! After the agent joins a channel the server's view of it arrives in
//! pieces: names, then (on request) modes, bans and WHO replies. Until the
//! last piece is in, events about that channel are held back so feature code
//! never sees a half-built channel. A process-wide counter does the same for
//! lines that name no channel, covering the registration window and any
//! channel still bursting.
//!
//! The tracker only stores and releases lines; re-dispatching them is the
//! dispatcher's job.

use slirc_proto::{ChannelExt, Message, Response, irc_eq};
use tracing::{debug, trace};

use crate::state::{Channel, NetworkState};

/// Stage of a channel's burst. Only ever moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BurstState {
    /// Waiting for `RPL_ENDOFNAMES`.
    Names,
    /// Waiting for `RPL_CHANNELMODEIS`.
    Modes,
    /// Waiting for `RPL_ENDOFBANLIST`.
    Bans,
    /// Waiting for `RPL_ENDOFWHO`.
    Who,
    Finished,
}

impl BurstState {
    /// The stage after this one.
    pub fn next(self) -> Self {
        match self {
            Self::Names => Self::Modes,
            Self::Modes => Self::Bans,
            Self::Bans => Self::Who,
            Self::Who | Self::Finished => Self::Finished,
        }
    }

    pub fn is_finished(self) -> bool {
        self == Self::Finished
    }
}

impl Channel {
    /// Advance to the next stage if the channel is currently at `from`.
    pub(crate) fn advance_burst(&mut self, from: BurstState) -> bool {
        if self.burst != from || from.is_finished() {
            return false;
        }
        self.burst = from.next();
        trace!(channel = %self.name(), state = ?self.burst, "burst advanced");
        true
    }
}

/// How a command is gated while a burst is in progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope<'a> {
    /// Never held back: liveness, registration and the burst replies
    /// themselves.
    Exempt,
    /// Held back while the named channel is bursting.
    Channel(&'a str),
    /// Held back while any burst is in progress.
    Global,
}

/// Classify `msg` for the deferral check.
pub fn scope_of(msg: &Message) -> Scope<'_> {
    if let Some(response) = msg.response() {
        return match response {
            Response::RPL_WHOISUSER
            | Response::RPL_ENDOFWHOIS
            | Response::RPL_HOSTHIDDEN
            | Response::ERR_NICKNAMEINUSE => Scope::Exempt,
            r if r.is_registration() || r.is_burst_reply() => Scope::Exempt,
            _ => Scope::Global,
        };
    }

    match msg.command.as_str() {
        "PING" | "PONG" | "ERROR" => Scope::Exempt,
        "JOIN" | "PART" | "KICK" | "TOPIC" | "MODE" | "PRIVMSG" | "NOTICE" => match msg.arg(0) {
            Some(target) if target.is_channel_name() => Scope::Channel(target),
            _ => Scope::Global,
        },
        _ => Scope::Global,
    }
}

fn is_own_nick_change(msg: &Message, me: &str) -> bool {
    msg.command == "NICK" && msg.source_nick().is_some_and(|nick| irc_eq(nick, me))
}

/// Process-wide burst bookkeeping.
#[derive(Debug, Default)]
pub struct BurstTracker {
    active: usize,
    global: Vec<Message>,
}

impl BurstTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bursts in progress (registration plus bursting channels).
    pub fn active(&self) -> usize {
        self.active
    }

    /// Lines waiting for every burst to end.
    pub fn deferred_len(&self) -> usize {
        self.global.len()
    }

    /// A new burst started.
    pub fn begin(&mut self) {
        self.active += 1;
        trace!(active = self.active, "burst begun");
    }

    /// A burst ended. Returns the globally held lines once none remain.
    pub fn end(&mut self) -> Vec<Message> {
        self.active = self.active.saturating_sub(1);
        trace!(active = self.active, "burst ended");
        if self.active == 0 {
            std::mem::take(&mut self.global)
        } else {
            Vec::new()
        }
    }

    /// Forget everything. Used when the link drops.
    pub fn reset(&mut self) {
        if self.active > 0 || !self.global.is_empty() {
            debug!(active = self.active, dropped = self.global.len(), "burst state reset");
        }
        self.active = 0;
        self.global.clear();
    }

    /// Hold `msg` back if its channel, or the process, is still bursting.
    ///
    /// Returns the message back when it may be processed now. The agent's own
    /// `NICK` (source `me`) always goes through, so lines that follow it from
    /// the new nick are recognised as ours.
    pub fn defer(&mut self, state: &mut NetworkState, me: &str, msg: Message) -> Option<Message> {
        match scope_of(&msg) {
            Scope::Exempt => Some(msg),
            Scope::Channel(name) => match state.channel_mut(name) {
                Some(channel) if !channel.burst.is_finished() => {
                    trace!(channel = %name, command = %msg.command, "deferred until burst ends");
                    channel.deferred.push(msg);
                    None
                }
                _ => Some(msg),
            },
            Scope::Global if is_own_nick_change(&msg, me) => Some(msg),
            Scope::Global if self.active > 0 => {
                trace!(command = %msg.command, "deferred until global burst ends");
                self.global.push(msg);
                None
            }
            Scope::Global => Some(msg),
        }
    }

    /// Finish `channel`'s burst: the channel's held lines in arrival order,
    /// then the global ones if this was the last burst.
    pub fn finish_channel(&mut self, state: &mut NetworkState, channel: &str) -> Vec<Message> {
        let Some(c) = state.channel_mut(channel) else {
            return Vec::new();
        };
        if !c.advance_burst(BurstState::Who) {
            return Vec::new();
        }
        let mut replay = std::mem::take(&mut c.deferred);
        debug!(channel = %channel, replay = replay.len(), "channel burst finished");
        replay.extend(self.end());
        replay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(raw: &str) -> Message {
        raw.parse().unwrap()
    }

    #[test]
    fn stages_only_move_forward() {
        let mut state = NetworkState::new();
        let channel = state.add_channel("#c", true);
        assert!(!channel.advance_burst(BurstState::Modes));
        assert!(channel.advance_burst(BurstState::Names));
        assert!(!channel.advance_burst(BurstState::Names));
        assert!(channel.advance_burst(BurstState::Modes));
        assert!(channel.advance_burst(BurstState::Bans));
        assert!(channel.advance_burst(BurstState::Who));
        assert!(!channel.advance_burst(BurstState::Finished));
        assert_eq!(channel.burst_state(), BurstState::Finished);
    }

    #[test]
    fn scopes() {
        assert_eq!(scope_of(&line("PING :x")), Scope::Exempt);
        assert_eq!(scope_of(&line(":s 353 me = #c :a b")), Scope::Exempt);
        assert_eq!(scope_of(&line(":s 311 me me u h * :r")), Scope::Exempt);
        assert_eq!(scope_of(&line(":n!u@h JOIN #c")), Scope::Channel("#c"));
        assert_eq!(scope_of(&line(":n!u@h PRIVMSG me :hi")), Scope::Global);
        assert_eq!(scope_of(&line(":n!u@h QUIT :bye")), Scope::Global);
        assert_eq!(scope_of(&line(":me MODE me +i")), Scope::Global);
    }

    #[test]
    fn channel_lines_wait_for_their_own_channel() {
        let mut state = NetworkState::new();
        let mut tracker = BurstTracker::new();
        state.add_channel("#busy", true);
        state.add_channel("#done", false);
        tracker.begin();

        assert!(tracker.defer(&mut state, "me", line(":a!u@h JOIN #busy")).is_none());
        assert!(tracker.defer(&mut state, "me", line(":b!u@h JOIN #done")).is_some());
        assert!(tracker.defer(&mut state, "me", line(":c!u@h NICK d")).is_none());
        assert!(tracker.defer(&mut state, "me", line(":s 366 me #busy :End")).is_some());
        assert!(tracker.defer(&mut state, "me", line(":ME!u@h NICK me2")).is_some());
        assert_eq!(state.channel("#busy").unwrap().deferred_len(), 1);
        assert_eq!(tracker.deferred_len(), 1);
    }

    #[test]
    fn finishing_replays_once_in_order() {
        let mut state = NetworkState::new();
        let mut tracker = BurstTracker::new();
        state.add_channel("#c", true);
        tracker.begin();
        tracker.defer(&mut state, "me", line(":a!u@h JOIN #c"));
        tracker.defer(&mut state, "me", line(":a!u@h PRIVMSG #c :one"));
        tracker.defer(&mut state, "me", line(":a!u@h QUIT :later"));

        // Not at the WHO stage yet.
        assert!(tracker.finish_channel(&mut state, "#c").is_empty());
        for stage in [BurstState::Names, BurstState::Modes, BurstState::Bans] {
            state.channel_mut("#c").unwrap().advance_burst(stage);
        }

        let replay = tracker.finish_channel(&mut state, "#c");
        let commands: Vec<_> = replay.iter().map(|m| m.command.as_str()).collect();
        assert_eq!(commands, ["JOIN", "PRIVMSG", "QUIT"]);
        assert_eq!(state.channel("#c").unwrap().deferred_len(), 0);
        assert_eq!(tracker.active(), 0);

        assert!(tracker.finish_channel(&mut state, "#c").is_empty());
    }

    #[test]
    fn global_lines_wait_for_the_last_burst() {
        let mut tracker = BurstTracker::new();
        let mut state = NetworkState::new();
        tracker.begin();
        tracker.begin();
        tracker.defer(&mut state, "me", line(":a!u@h NICK b"));
        assert!(tracker.end().is_empty());
        assert_eq!(tracker.end().len(), 1);
        assert!(tracker.end().is_empty());
        assert_eq!(tracker.active(), 0);
    }

    #[test]
    fn reset_drops_everything() {
        let mut tracker = BurstTracker::new();
        let mut state = NetworkState::new();
        tracker.begin();
        tracker.defer(&mut state, "me", line(":a!u@h NICK b"));
        tracker.reset();
        assert_eq!((tracker.active(), tracker.deferred_len()), (0, 0));
    }
}
