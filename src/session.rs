//! The agent's runtime object.
//!
//! A [`Session`] ties the dispatcher, the network model and the connection
//! manager together and is the single thing the transport driver talks to.
//! Everything is owned here and passed down by reference; there is no global
//! state. All entry points take the current [`Instant`] so the whole session
//! can be driven deterministically in tests.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use slirc_proto::Message;
use tracing::{debug, info};

use crate::callbacks::{Callbacks, Owner};
use crate::config::Config;
use crate::connection::timers::TimerKey;
use crate::connection::{ConnectionManager, DisconnectCause, LinkAction, LinkSettings, LinkState};
use crate::error::DispatchError;
use crate::handlers::{
    Context, Core, Dispatched, Dispatcher, Identity, Signal, TimerCallback, TimerRequest,
};
use crate::state::NetworkState;

/// One agent, one network.
pub struct Session {
    dispatcher: Dispatcher,
    conn: ConnectionManager,
    autojoin: Vec<String>,
    module_timers: HashMap<TimerKey, TimerCallback>,

    /// Fired when the transport comes up, before registration.
    pub on_connected: Callbacks<()>,
    /// Fired once our own WHOIS is in, with the final identity.
    pub on_ready: Callbacks<Identity>,
    /// Fired after the link drops and the network model has been cleared.
    pub on_disconnected: Callbacks<DisconnectCause>,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        let settings = LinkSettings::from(config);
        let me = Identity::new(&settings.nick, &settings.username, &settings.realname);
        Self {
            dispatcher: Dispatcher::new(me),
            conn: ConnectionManager::new(settings),
            autojoin: config.channels.clone(),
            module_timers: HashMap::new(),
            on_connected: Callbacks::new(),
            on_ready: Callbacks::new(),
            on_disconnected: Callbacks::new(),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    pub fn core(&self) -> &Core {
        self.dispatcher.core()
    }

    pub fn state(&self) -> &NetworkState {
        &self.dispatcher.core().state
    }

    pub fn state_mut(&mut self) -> &mut NetworkState {
        &mut self.dispatcher.core_mut().state
    }

    pub fn me(&self) -> &Identity {
        &self.dispatcher.core().me
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.conn
    }

    pub fn link_state(&self) -> LinkState {
        self.conn.state()
    }

    pub fn is_terminated(&self) -> bool {
        self.conn.is_terminated()
    }

    // ========================================================================
    // Feature registration
    // ========================================================================

    /// Register a feature handler for `command`.
    pub fn register(
        &mut self,
        command: &str,
        owner: impl Into<Owner>,
        handler: impl FnMut(&mut Context<'_>, &Message) + 'static,
    ) {
        self.dispatcher.register(command, owner, handler);
    }

    /// Arm a feature timer. With `repeat` it fires every `delay`.
    /// Re-arming an existing `(owner, name)` replaces it.
    pub fn add_timer(
        &mut self,
        now: Instant,
        owner: impl Into<Owner>,
        name: &str,
        delay: Duration,
        repeat: bool,
        callback: impl FnMut(&mut Context<'_>) + 'static,
    ) {
        let key = TimerKey::new(owner.into(), name);
        self.arm_timer(now, key, delay, repeat, Box::new(callback));
    }

    fn arm_timer(
        &mut self,
        now: Instant,
        key: TimerKey,
        delay: Duration,
        repeat: bool,
        callback: TimerCallback,
    ) {
        let timers = self.conn.timers_mut();
        if repeat {
            timers.repeat(key.clone(), now, delay);
        } else {
            timers.arm(key.clone(), now, delay);
        }
        self.module_timers.insert(key, callback);
    }

    /// Cancel one feature timer. Cancelling an unknown timer is fine.
    pub fn cancel_timer(&mut self, owner: &Owner, name: &str) -> bool {
        let key = TimerKey::new(owner.clone(), name);
        self.module_timers.remove(&key);
        self.conn.timers_mut().cancel(&key)
    }

    /// Cancel every timer armed by `owner`.
    pub fn cancel_timers(&mut self, owner: &Owner) -> usize {
        self.module_timers.retain(|key, _| key.owner != *owner);
        self.conn.timers_mut().cancel_owner(owner)
    }

    /// Remove everything a feature module registered: handlers, timers and
    /// subscriptions.
    pub fn unload(&mut self, owner: &Owner) {
        let handlers = self.dispatcher.unregister_owner(owner);
        let timers = self.cancel_timers(owner);
        let state = &mut self.dispatcher.core_mut().state;
        let subscriptions = state.on_channel_delete.unsubscribe_owner(owner)
            + state.on_user_delete.unsubscribe_owner(owner)
            + state.on_membership_delete.unsubscribe_owner(owner)
            + self.on_connected.unsubscribe_owner(owner)
            + self.on_ready.unsubscribe_owner(owner)
            + self.on_disconnected.unsubscribe_owner(owner);
        info!(owner = %owner, handlers, timers, subscriptions, "module unloaded");
    }

    // ========================================================================
    // Driver entry points
    // ========================================================================

    /// Begin the first connect attempt.
    pub fn start(&mut self, now: Instant) {
        self.conn.connect(now);
    }

    /// The transport connected.
    pub fn on_transport_connected(&mut self, now: Instant) {
        let settings = self.conn.settings();
        let me = &mut self.dispatcher.core_mut().me;
        me.nick = settings.nick.clone();
        me.username = settings.username.clone();
        me.realname = settings.realname.clone();

        self.conn.transport_connected(now);
        self.on_connected.notify(&());
    }

    /// A complete line arrived.
    pub fn on_line(&mut self, now: Instant, line: &str) -> Result<Dispatched, DispatchError> {
        self.conn.reset_watchdog(now);
        let result = self.dispatcher.dispatch_line(line);
        self.after_dispatch(now);
        result
    }

    /// The transport went away.
    pub fn on_disconnect(&mut self, now: Instant, cause: DisconnectCause) {
        self.conn.disconnected(now, cause);
        self.report_lost();
    }

    /// Run every timer due at `now`.
    pub fn on_timers(&mut self, now: Instant) {
        let due = self.conn.poll_timers(now);
        self.report_lost();
        for key in due {
            let Some(callback) = self.module_timers.get_mut(&key) else {
                debug!(owner = %key.owner, name = %key.name, "timer without callback");
                continue;
            };
            let mut ctx = Context::new(self.dispatcher.core_mut());
            callback(&mut ctx);
            self.apply_timer_requests(now);
            if !self.conn.timers().is_armed(&key) {
                self.module_timers.remove(&key);
            }
        }
        self.after_dispatch(now);
    }

    /// Quit and stop.
    pub fn shutdown(&mut self, reason: &str) {
        self.conn.shutdown(reason);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.conn.next_deadline()
    }

    pub fn take_actions(&mut self) -> Vec<LinkAction> {
        self.conn.take_actions()
    }

    /// Forget the dead connection's view of the network.
    fn report_lost(&mut self) {
        let Some(cause) = self.conn.take_lost() else {
            return;
        };
        self.dispatcher.core_mut().reset();
        self.on_disconnected.notify(&cause);
    }

    /// Arm or cancel the timers feature code asked for.
    fn apply_timer_requests(&mut self, now: Instant) {
        for request in self.dispatcher.core_mut().take_timer_requests() {
            match request {
                TimerRequest::Add {
                    key,
                    delay,
                    repeat,
                    callback,
                } => self.arm_timer(now, key, delay, repeat, callback),
                TimerRequest::Cancel(key) => {
                    self.module_timers.remove(&key);
                    self.conn.timers_mut().cancel(&key);
                }
            }
        }
    }

    /// Act on handler signals and hand queued output to the link.
    fn after_dispatch(&mut self, now: Instant) {
        self.apply_timer_requests(now);
        for signal in self.dispatcher.core_mut().take_signals() {
            match signal {
                Signal::Ready => self.become_ready(),
            }
        }
        for out in self.dispatcher.core_mut().outbox.drain() {
            self.conn.send(now, out.line, out.priority);
        }
    }

    fn become_ready(&mut self) {
        self.conn.ready();
        let core = self.dispatcher.core_mut();
        for channel in &self.autojoin {
            core.outbox.send(Message::new("JOIN", [channel.as_str()]));
        }
        let me = core.me.clone();
        self.on_ready.notify(&me);
    }
}
