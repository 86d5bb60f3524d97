//! Handler context and core types.
//!
//! Built-in handlers receive the whole [`Core`]; feature handlers receive a
//! narrower [`Context`] that cannot touch the burst machinery.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use slirc_proto::{Message, irc_eq};

use crate::burst::BurstTracker;
use crate::callbacks::Owner;
use crate::connection::template;
use crate::connection::timers::TimerKey;
use crate::error::StateError;
use crate::state::NetworkState;

/// Who the agent is on the current connection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Identity {
    /// Current nick. Starts as the configured nick and follows the server.
    pub nick: String,
    pub username: String,
    /// Host as the server shows it; empty until the self-WHOIS answers.
    pub host: String,
    pub realname: String,
    /// Server name from `RPL_MYINFO`.
    pub server: Option<String>,
    /// User modes set on the agent.
    pub umodes: BTreeSet<char>,
    /// The server accepted our registration (`RPL_WELCOME` seen).
    pub registered: bool,
    /// Our own WHOIS came back; feature code may run.
    pub ready: bool,
}

impl Identity {
    pub fn new(nick: &str, username: &str, realname: &str) -> Self {
        Self {
            nick: nick.to_owned(),
            username: username.to_owned(),
            realname: realname.to_owned(),
            ..Self::default()
        }
    }

    /// Whether `nick` refers to the agent.
    pub fn is_me(&self, nick: &str) -> bool {
        irc_eq(&self.nick, nick)
    }

    /// Drop everything learned from the last connection.
    pub fn reset(&mut self) {
        self.host.clear();
        self.server = None;
        self.umodes.clear();
        self.registered = false;
        self.ready = false;
    }
}

/// How an outbound line should be transmitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priority {
    /// Subject to pacing.
    Paced,
    /// Written straight away (PONG, registration).
    Immediate,
}

/// A line waiting to be handed to the connection manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outbound {
    pub line: String,
    pub priority: Priority,
}

/// Lines produced while handling one inbound line.
#[derive(Debug, Default)]
pub struct Outbox {
    lines: Vec<Outbound>,
}

impl Outbox {
    pub fn send(&mut self, msg: Message) {
        self.push(msg.to_string(), Priority::Paced);
    }

    pub fn send_now(&mut self, msg: Message) {
        self.push(msg.to_string(), Priority::Immediate);
    }

    pub fn push(&mut self, line: String, priority: Priority) {
        self.lines.push(Outbound { line, priority });
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Take everything queued so far.
    pub fn drain(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.lines)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// Things built-in handlers report to the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    /// The self-WHOIS answered; the connection is usable.
    Ready,
}

/// Runs when a feature timer fires.
pub type TimerCallback = Box<dyn FnMut(&mut Context<'_>)>;

/// A timer change made from feature code, applied by the session once the
/// current handler or timer callback returns.
pub enum TimerRequest {
    Add {
        key: TimerKey,
        delay: Duration,
        repeat: bool,
        callback: TimerCallback,
    },
    Cancel(TimerKey),
}

impl fmt::Debug for TimerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add { key, delay, repeat, .. } => f
                .debug_struct("Add")
                .field("key", key)
                .field("delay", delay)
                .field("repeat", repeat)
                .finish_non_exhaustive(),
            Self::Cancel(key) => f.debug_tuple("Cancel").field(key).finish(),
        }
    }
}

/// State owned by the dispatcher and mutated by built-in handlers.
#[derive(Debug, Default)]
pub struct Core {
    pub state: NetworkState,
    pub burst: BurstTracker,
    pub me: Identity,
    pub outbox: Outbox,
    pub(crate) signals: Vec<Signal>,
    pub(crate) timer_requests: Vec<TimerRequest>,
}

impl Core {
    pub fn new(me: Identity) -> Self {
        Self {
            me,
            ..Self::default()
        }
    }

    pub(crate) fn signal(&mut self, signal: Signal) {
        self.signals.push(signal);
    }

    /// Take pending signals.
    pub fn take_signals(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }

    /// Take timer changes queued by feature code.
    pub fn take_timer_requests(&mut self) -> Vec<TimerRequest> {
        std::mem::take(&mut self.timer_requests)
    }

    /// Forget everything tied to the current connection.
    pub fn reset(&mut self) {
        self.burst.reset();
        self.state.clear();
        self.me.reset();
        self.outbox.clear();
        self.signals.clear();
    }
}

/// Lines released by a handler for re-dispatch, in order.
pub type Replay = Vec<Message>;

/// Result type for built-in handlers.
pub type HandlerResult = Result<Replay, StateError>;

/// What a feature handler gets to work with.
pub struct Context<'a> {
    /// The network model, already updated for the current line.
    pub state: &'a mut NetworkState,
    pub me: &'a Identity,
    outbox: &'a mut Outbox,
    timers: &'a mut Vec<TimerRequest>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(core: &'a mut Core) -> Self {
        Self {
            state: &mut core.state,
            me: &core.me,
            outbox: &mut core.outbox,
            timers: &mut core.timer_requests,
        }
    }

    /// Arm a feature timer from inside a handler or another timer's
    /// callback. Re-arming an existing `(owner, name)` replaces it.
    pub fn add_timer(
        &mut self,
        owner: impl Into<Owner>,
        name: &str,
        delay: Duration,
        repeat: bool,
        callback: impl FnMut(&mut Context<'_>) + 'static,
    ) {
        self.timers.push(TimerRequest::Add {
            key: TimerKey::new(owner.into(), name),
            delay,
            repeat,
            callback: Box::new(callback),
        });
    }

    /// Cancel a feature timer, including the one currently firing.
    pub fn cancel_timer(&mut self, owner: &Owner, name: &str) {
        self.timers.push(TimerRequest::Cancel(TimerKey::new(owner.clone(), name)));
    }

    /// Queue a message (paced).
    pub fn send(&mut self, msg: Message) {
        self.outbox.send(msg);
    }

    /// Send `PRIVMSG target :text`, expanding `$` escapes in `text`.
    pub fn say(&mut self, target: &str, text: &str) {
        let text = template::expand(text, self.me);
        self.outbox.send(Message::new("PRIVMSG", [target, text.as_str()]));
    }

    /// Send `NOTICE target :text`, expanding `$` escapes in `text`.
    pub fn notice(&mut self, target: &str, text: &str) {
        let text = template::expand(text, self.me);
        self.outbox.send(Message::new("NOTICE", [target, text.as_str()]));
    }

    pub fn is_me(&self, nick: &str) -> bool {
        self.me.is_me(nick)
    }
}
