//! Connection manager.
//!
//! A sans-IO state machine in the style of a handshake tracker: callers feed
//! it events (transport up, line received, timer due, transport lost) and
//! collect [`LinkAction`]s to perform. It owns the link lifecycle, the
//! registration sequence, keep-alive and watchdog timers, outbound pacing,
//! and the reconnection policy. The tokio side lives in [`driver`].
//!
//! ```text
//! Disconnected --connect--> Connecting --transport up--> Registering --ready--> Ready
//!      ^                         |                            |                  |
//!      +------ reconnect timer <-+-------- disconnect --------+------------------+
//! ```
//!
//! Exceeding the reconnect ceiling moves to `Terminated` instead.

pub mod driver;
pub mod pacing;
pub mod template;
pub mod timers;

use std::time::{Duration, Instant};

use slirc_proto::Message;
use tracing::{debug, info, warn};

use crate::callbacks::Owner;
use crate::config::Config;
use crate::handlers::Priority;

use self::pacing::Pacer;
use self::timers::{TimerKey, Timers};

/// Give up on a connect attempt after this long.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
/// Send a keep-alive `PING` this often.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(90);
/// Declare the link stoned after this long without any inbound line.
pub const STONED_TIMEOUT: Duration = Duration::from_secs(180);

const CONNECT_TIMER: &str = "connect-timeout";
const KEEPALIVE_TIMER: &str = "keepalive";
const STONED_TIMER: &str = "stoned";
const RECONNECT_TIMER: &str = "reconnect";
const PUMP_TIMER: &str = "pump";

/// Link lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    /// Transport connect in flight.
    Connecting,
    /// Transport up, registration sent, waiting for the self-WHOIS.
    Registering,
    Ready,
    /// Reconnect ceiling reached or shutdown requested; nothing more happens.
    Terminated,
}

/// Why the link went down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectCause {
    /// Socket or codec error.
    Error,
    /// Peer closed the connection.
    Hangup,
    ConnectTimeout,
    /// Nothing received for [`STONED_TIMEOUT`].
    Watchdog,
}

impl DisconnectCause {
    /// Delay before the next connect attempt.
    pub fn reconnect_delay(self) -> Duration {
        match self {
            Self::Watchdog => Duration::ZERO,
            Self::Hangup => Duration::from_secs(5),
            Self::Error => Duration::from_secs(15),
            Self::ConnectTimeout => Duration::from_secs(30),
        }
    }
}

/// Something the driver must do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkAction {
    /// Open a transport to `host:port`, dropping any current one.
    Open { host: String, port: u16 },
    /// Write one line (without CRLF).
    Write(String),
    /// Drop the transport.
    Close,
    /// Stop the process cleanly.
    Terminate,
}

/// Connection parameters taken from the config.
#[derive(Clone, Debug)]
pub struct LinkSettings {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub nick: String,
    pub username: String,
    pub realname: String,
    /// 0 means unlimited.
    pub max_reconnects: u32,
    pub pacing: bool,
    pub max_line_len: usize,
}

impl From<&Config> for LinkSettings {
    fn from(config: &Config) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            password: config.server.password.clone(),
            nick: config.identity.nick.clone(),
            username: config.identity.username.clone(),
            realname: config.identity.realname.clone(),
            max_reconnects: config.connection.max_reconnects,
            pacing: config.connection.pacing,
            max_line_len: config.connection.max_line_len,
        }
    }
}

fn core_timer(name: &str) -> TimerKey {
    TimerKey::new(Owner::CORE, name)
}

/// Cut `line` to at most `max` bytes on a char boundary.
fn truncate_line(line: &mut String, max: usize) {
    if line.len() <= max {
        return;
    }
    let mut cut = max;
    while !line.is_char_boundary(cut) {
        cut -= 1;
    }
    warn!(len = line.len(), max, "outbound line truncated");
    line.truncate(cut);
}

/// Sans-IO connection manager.
#[derive(Debug)]
pub struct ConnectionManager {
    settings: LinkSettings,
    state: LinkState,
    tries: u32,
    timers: Timers,
    pacer: Pacer,
    actions: Vec<LinkAction>,
    lost: Option<DisconnectCause>,
}

impl ConnectionManager {
    pub fn new(settings: LinkSettings) -> Self {
        Self {
            settings,
            state: LinkState::Disconnected,
            tries: 0,
            timers: Timers::new(),
            pacer: Pacer::new(),
            actions: Vec::new(),
            lost: None,
        }
    }

    pub fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Reconnect attempts scheduled since the last time we were ready.
    pub fn tries(&self) -> u32 {
        self.tries
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut Timers {
        &mut self.timers
    }

    /// Lines waiting for pacing budget.
    pub fn queued(&self) -> usize {
        self.pacer.len()
    }

    pub fn is_terminated(&self) -> bool {
        self.state == LinkState::Terminated
    }

    /// Whether a reconnect is pending.
    pub fn reconnect_pending(&self) -> bool {
        self.timers.is_armed(&core_timer(RECONNECT_TIMER))
    }

    /// Take the actions produced since the last call.
    pub fn take_actions(&mut self) -> Vec<LinkAction> {
        std::mem::take(&mut self.actions)
    }

    /// The cause of the last disconnect not yet reported to the caller.
    /// Timer-driven disconnects (connect timeout, watchdog) surface here.
    pub fn take_lost(&mut self) -> Option<DisconnectCause> {
        self.lost.take()
    }

    /// Earliest timer deadline, core or module.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    // ========================================================================
    // Lifecycle events
    // ========================================================================

    /// Start a connect attempt.
    pub fn connect(&mut self, now: Instant) {
        if self.is_terminated() {
            return;
        }
        self.timers.cancel(&core_timer(RECONNECT_TIMER));
        info!(host = %self.settings.host, port = self.settings.port, "connecting");
        self.state = LinkState::Connecting;
        self.actions.push(LinkAction::Open {
            host: self.settings.host.clone(),
            port: self.settings.port,
        });
        self.timers.arm(core_timer(CONNECT_TIMER), now, CONNECT_TIMEOUT);
    }

    /// The transport is up: register and start liveness timers.
    pub fn transport_connected(&mut self, now: Instant) {
        if self.state != LinkState::Connecting {
            debug!(state = ?self.state, "spurious transport-connected ignored");
            return;
        }
        self.timers.cancel(&core_timer(CONNECT_TIMER));
        self.state = LinkState::Registering;
        info!("connected, registering");

        if let Some(password) = self.settings.password.clone() {
            self.write_now(Message::new("PASS", [password]).to_string());
        }
        // The realname always goes out as a trailing argument.
        let user = Message::new("USER", [self.settings.username.as_str(), "0", "*"]);
        self.write_now(format!("{} :{}", user, self.settings.realname));
        let nick = Message::new("NICK", [self.settings.nick.as_str()]);
        self.write_now(nick.to_string());

        self.timers.repeat(core_timer(KEEPALIVE_TIMER), now, KEEPALIVE_INTERVAL);
        self.timers.arm(core_timer(STONED_TIMER), now, STONED_TIMEOUT);
    }

    /// Push the stoned watchdog back. Call on every inbound line.
    pub fn reset_watchdog(&mut self, now: Instant) {
        if matches!(self.state, LinkState::Registering | LinkState::Ready) {
            self.timers.arm(core_timer(STONED_TIMER), now, STONED_TIMEOUT);
        }
    }

    /// The session finished registering.
    pub fn ready(&mut self) {
        if self.state == LinkState::Registering {
            self.state = LinkState::Ready;
            self.tries = 0;
        }
    }

    /// The link went down. Returns `false` if it was already down, so that
    /// late callbacks from a closed socket are harmless.
    pub fn disconnected(&mut self, now: Instant, cause: DisconnectCause) -> bool {
        if matches!(self.state, LinkState::Disconnected | LinkState::Terminated) {
            debug!(?cause, state = ?self.state, "disconnect while already down ignored");
            return false;
        }
        warn!(?cause, "link lost");

        for name in [CONNECT_TIMER, KEEPALIVE_TIMER, STONED_TIMER, PUMP_TIMER] {
            self.timers.cancel(&core_timer(name));
        }
        let dropped = self.pacer.clear();
        if dropped > 0 {
            debug!(dropped, "discarded queued output");
        }
        self.actions.push(LinkAction::Close);
        self.state = LinkState::Disconnected;
        self.lost = Some(cause);
        self.schedule_reconnect(now, cause);
        true
    }

    fn schedule_reconnect(&mut self, now: Instant, cause: DisconnectCause) {
        if self.reconnect_pending() {
            return;
        }
        self.tries += 1;
        let max = self.settings.max_reconnects;
        if max > 0 && self.tries > max {
            warn!(tries = self.tries, max, "reconnect limit reached, giving up");
            self.terminate();
            return;
        }
        let delay = cause.reconnect_delay();
        info!(?delay, attempt = self.tries, "reconnect scheduled");
        self.timers.arm(core_timer(RECONNECT_TIMER), now, delay);
    }

    fn terminate(&mut self) {
        if self.is_terminated() {
            return;
        }
        self.timers.cancel_owner(&Owner::CORE);
        self.pacer.clear();
        self.state = LinkState::Terminated;
        self.actions.push(LinkAction::Terminate);
    }

    /// Say goodbye and stop for good.
    pub fn shutdown(&mut self, reason: &str) {
        if self.is_terminated() {
            return;
        }
        if matches!(self.state, LinkState::Registering | LinkState::Ready) {
            self.write_now(Message::new("QUIT", [reason]).to_string());
            self.actions.push(LinkAction::Close);
        }
        self.terminate();
    }

    // ========================================================================
    // Timers
    // ========================================================================

    /// Fire due timers. Core timers are handled here; the keys of due module
    /// timers are returned for the caller to run.
    pub fn poll_timers(&mut self, now: Instant) -> Vec<TimerKey> {
        let mut module = Vec::new();
        for key in self.timers.poll_due(now) {
            if key.owner == Owner::CORE {
                self.on_core_timer(now, &key.name);
            } else {
                module.push(key);
            }
        }
        module
    }

    fn on_core_timer(&mut self, now: Instant, name: &str) {
        match name {
            CONNECT_TIMER => {
                self.disconnected(now, DisconnectCause::ConnectTimeout);
            }
            KEEPALIVE_TIMER => {
                let ping = Message::new("PING", [self.settings.host.as_str()]);
                self.write_now(ping.to_string());
            }
            STONED_TIMER => {
                warn!(timeout = ?STONED_TIMEOUT, "no traffic from server, link is stoned");
                self.disconnected(now, DisconnectCause::Watchdog);
            }
            RECONNECT_TIMER => self.connect(now),
            PUMP_TIMER => self.pump(now),
            other => debug!(timer = %other, "unknown core timer"),
        }
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Send a line, paced unless `priority` says otherwise or pacing is off.
    ///
    /// Lines are dropped while no transport is registered.
    pub fn send(&mut self, now: Instant, mut line: String, priority: Priority) {
        if !matches!(self.state, LinkState::Registering | LinkState::Ready) {
            debug!(line = %line, state = ?self.state, "no link, dropping output");
            return;
        }
        truncate_line(&mut line, self.settings.max_line_len.saturating_sub(2));

        if priority == Priority::Immediate || !self.settings.pacing {
            self.actions.push(LinkAction::Write(line));
            return;
        }
        self.pacer.enqueue(line);
        self.pump(now);
    }

    fn write_now(&mut self, mut line: String) {
        truncate_line(&mut line, self.settings.max_line_len.saturating_sub(2));
        self.actions.push(LinkAction::Write(line));
    }

    fn pump(&mut self, now: Instant) {
        for line in self.pacer.pump(now) {
            self.actions.push(LinkAction::Write(line));
        }
        let key = core_timer(PUMP_TIMER);
        match self.pacer.next_ready(now) {
            Some(at) => self.timers.arm(key, now, at.saturating_duration_since(now)),
            None => {
                self.timers.cancel(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> LinkSettings {
        LinkSettings {
            host: "irc.example.net".into(),
            port: 6667,
            password: None,
            nick: "bot".into(),
            username: "botuser".into(),
            realname: "Bot Real".into(),
            max_reconnects: 3,
            pacing: true,
            max_line_len: 512,
        }
    }

    fn writes(actions: Vec<LinkAction>) -> Vec<String> {
        actions
            .into_iter()
            .filter_map(|a| match a {
                LinkAction::Write(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    fn registered(settings: LinkSettings, now: Instant) -> ConnectionManager {
        let mut conn = ConnectionManager::new(settings);
        conn.connect(now);
        conn.transport_connected(now);
        conn.take_actions();
        conn
    }

    #[test]
    fn connect_then_register() {
        let t0 = Instant::now();
        let mut conn = ConnectionManager::new(LinkSettings {
            password: Some("hunter2".into()),
            ..settings()
        });

        conn.connect(t0);
        assert_eq!(conn.state(), LinkState::Connecting);
        assert_eq!(
            conn.take_actions(),
            [LinkAction::Open {
                host: "irc.example.net".into(),
                port: 6667
            }]
        );
        assert_eq!(conn.next_deadline(), Some(t0 + CONNECT_TIMEOUT));

        conn.transport_connected(t0);
        assert_eq!(conn.state(), LinkState::Registering);
        assert_eq!(
            writes(conn.take_actions()),
            ["PASS hunter2", "USER botuser 0 * :Bot Real", "NICK bot"]
        );
        assert!(!conn.timers().is_armed(&core_timer(CONNECT_TIMER)));
        assert_eq!(conn.next_deadline(), Some(t0 + KEEPALIVE_INTERVAL));
        assert_eq!(
            conn.timers().deadline(&core_timer(STONED_TIMER)),
            Some(t0 + STONED_TIMEOUT)
        );
    }

    #[test]
    fn connect_timeout_schedules_a_slow_retry() {
        let t0 = Instant::now();
        let mut conn = ConnectionManager::new(settings());
        conn.connect(t0);
        conn.take_actions();

        assert!(conn.poll_timers(t0 + CONNECT_TIMEOUT).is_empty());
        assert_eq!(conn.state(), LinkState::Disconnected);
        assert_eq!(conn.take_actions(), [LinkAction::Close]);
        assert_eq!(
            conn.timers().deadline(&core_timer(RECONNECT_TIMER)),
            Some(t0 + CONNECT_TIMEOUT + Duration::from_secs(30))
        );

        conn.poll_timers(t0 + CONNECT_TIMEOUT + Duration::from_secs(30));
        assert_eq!(conn.state(), LinkState::Connecting);
        assert!(matches!(conn.take_actions().as_slice(), [LinkAction::Open { .. }]));
    }

    #[test]
    fn keepalive_and_watchdog() {
        let t0 = Instant::now();
        let mut conn = registered(settings(), t0);

        conn.poll_timers(t0 + KEEPALIVE_INTERVAL);
        assert_eq!(writes(conn.take_actions()), ["PING irc.example.net"]);

        // Traffic keeps the watchdog away.
        conn.reset_watchdog(t0 + Duration::from_secs(170));
        conn.poll_timers(t0 + STONED_TIMEOUT);
        assert_eq!(conn.state(), LinkState::Registering);
        conn.take_actions();

        // Silence trips it and reconnects at once.
        let stoned = t0 + Duration::from_secs(170) + STONED_TIMEOUT;
        conn.poll_timers(stoned);
        assert_eq!(conn.state(), LinkState::Disconnected);
        assert_eq!(conn.timers().deadline(&core_timer(RECONNECT_TIMER)), Some(stoned));
        assert!(!conn.timers().is_armed(&core_timer(KEEPALIVE_TIMER)));
    }

    #[test]
    fn reconnect_delay_depends_on_cause() {
        assert_eq!(DisconnectCause::Watchdog.reconnect_delay(), Duration::ZERO);
        assert_eq!(DisconnectCause::Hangup.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(DisconnectCause::Error.reconnect_delay(), Duration::from_secs(15));
        assert_eq!(DisconnectCause::ConnectTimeout.reconnect_delay(), Duration::from_secs(30));
    }

    #[test]
    fn hangup_discards_queued_output() {
        let t0 = Instant::now();
        let mut conn = registered(settings(), t0);
        for i in 0..8 {
            conn.send(t0, format!("PRIVMSG #c :{i}"), Priority::Paced);
        }
        assert_eq!(writes(conn.take_actions()).len(), 5);
        assert_eq!(conn.queued(), 3);

        assert!(conn.disconnected(t0, DisconnectCause::Hangup));
        assert_eq!(conn.queued(), 0);
        assert_eq!(conn.take_actions(), [LinkAction::Close]);
        assert_eq!(
            conn.timers().deadline(&core_timer(RECONNECT_TIMER)),
            Some(t0 + Duration::from_secs(5))
        );
        assert!(!conn.timers().is_armed(&core_timer(PUMP_TIMER)));
    }

    #[test]
    fn only_one_reconnect_is_ever_pending() {
        let t0 = Instant::now();
        let mut conn = registered(settings(), t0);
        assert!(conn.disconnected(t0, DisconnectCause::Error));
        assert!(!conn.disconnected(t0, DisconnectCause::Hangup));
        assert_eq!(conn.tries(), 1);
        assert_eq!(
            conn.timers().deadline(&core_timer(RECONNECT_TIMER)),
            Some(t0 + Duration::from_secs(15))
        );
    }

    #[test]
    fn retry_ceiling_terminates_exactly_once() {
        let t0 = Instant::now();
        let mut conn = ConnectionManager::new(LinkSettings {
            max_reconnects: 2,
            ..settings()
        });
        let mut now = t0;
        let mut terminations = 0;
        for _ in 0..5 {
            conn.connect(now);
            conn.transport_connected(now);
            conn.disconnected(now, DisconnectCause::Hangup);
            now += Duration::from_secs(5);
            conn.poll_timers(now);
            terminations += conn
                .take_actions()
                .iter()
                .filter(|a| **a == LinkAction::Terminate)
                .count();
        }
        assert_eq!(terminations, 1);
        assert!(conn.is_terminated());
        assert!(!conn.reconnect_pending());
        assert_eq!(conn.next_deadline(), None);
    }

    #[test]
    fn ready_resets_the_try_counter() {
        let t0 = Instant::now();
        let mut conn = registered(settings(), t0);
        conn.disconnected(t0, DisconnectCause::Hangup);
        conn.poll_timers(t0 + Duration::from_secs(5));
        conn.transport_connected(t0 + Duration::from_secs(5));
        assert_eq!(conn.tries(), 1);
        conn.ready();
        assert_eq!(conn.state(), LinkState::Ready);
        assert_eq!(conn.tries(), 0);
    }

    #[test]
    fn unpaced_and_immediate_lines_skip_the_queue() {
        let t0 = Instant::now();
        let mut conn = registered(LinkSettings { pacing: false, ..settings() }, t0);
        for i in 0..20 {
            conn.send(t0, format!("PRIVMSG #c :{i}"), Priority::Paced);
        }
        assert_eq!(writes(conn.take_actions()).len(), 20);
        assert!(!conn.timers().is_armed(&core_timer(PUMP_TIMER)));

        let mut conn = registered(settings(), t0);
        for i in 0..6 {
            conn.send(t0, format!("PRIVMSG #c :{i}"), Priority::Paced);
        }
        conn.send(t0, "PONG :x".into(), Priority::Immediate);
        let out = writes(conn.take_actions());
        assert_eq!(out.last().map(String::as_str), Some("PONG :x"));
        assert_eq!(conn.queued(), 1);
    }

    #[test]
    fn pump_timer_drains_the_queue() {
        let t0 = Instant::now();
        let mut conn = registered(settings(), t0);
        for i in 0..7 {
            conn.send(t0, format!("PRIVMSG #c :{i}"), Priority::Paced);
        }
        conn.take_actions();
        assert_eq!(conn.queued(), 2);

        let mut now = t0;
        while conn.queued() > 0 {
            now = conn.timers().deadline(&core_timer(PUMP_TIMER)).unwrap();
            conn.poll_timers(now);
        }
        assert_eq!(writes(conn.take_actions()), ["PRIVMSG #c :5", "PRIVMSG #c :6"]);
        assert!(now >= t0 + Duration::from_secs(2));
        assert!(!conn.timers().is_armed(&core_timer(PUMP_TIMER)));
    }

    #[test]
    fn long_lines_are_truncated() {
        let t0 = Instant::now();
        let mut conn = registered(LinkSettings { pacing: false, ..settings() }, t0);
        let long = format!("PRIVMSG #c :{}", "é".repeat(400));
        conn.send(t0, long, Priority::Paced);
        let out = writes(conn.take_actions());
        assert!(out[0].len() <= 510);
        assert!(out[0].starts_with("PRIVMSG #c :é"));
    }

    #[test]
    fn output_without_a_link_is_dropped() {
        let t0 = Instant::now();
        let mut conn = ConnectionManager::new(settings());
        conn.send(t0, "PRIVMSG #c :lost".into(), Priority::Paced);
        assert!(conn.take_actions().is_empty());
    }

    #[test]
    fn shutdown_quits_and_terminates() {
        let t0 = Instant::now();
        let mut conn = registered(settings(), t0);
        conn.shutdown("bye");
        assert_eq!(
            conn.take_actions(),
            [
                LinkAction::Write("QUIT bye".into()),
                LinkAction::Close,
                LinkAction::Terminate
            ]
        );
        conn.shutdown("again");
        assert!(conn.take_actions().is_empty());
    }
}
