//! Network state store.
//!
//! Owns every channel, user, membership and ban the agent knows about. The
//! store is pure data: no I/O, no protocol knowledge beyond what a mutator
//! needs. Keys are compared exactly as received; callers that need
//! rfc1459 case folding do it themselves.
//!
//! # Invariants
//!
//! - A membership id is listed under its channel's member index and its
//!   user's channel index, or under neither.
//! - Deleting a channel or user deletes its memberships first.
//! - A (channel, nick) pair has at most one membership.

mod channel;
mod membership;
mod user;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, error, warn};

use crate::burst::BurstState;
use crate::callbacks::Callbacks;
use crate::error::StateError;

pub use channel::{Ban, Channel, ChannelModes, Topic};
pub use membership::{DeleteReason, MemberModes, Membership, MembershipDeleted, MembershipId};
pub use user::{Account, User};

/// Report a broken invariant: panics in debug builds, logs in release.
fn violation(err: StateError) -> StateError {
    if cfg!(debug_assertions) {
        panic!("state invariant violated: {err}");
    }
    error!(code = err.error_code(), "state invariant violated: {err}");
    err
}

/// The agent's model of the network.
#[derive(Default)]
pub struct NetworkState {
    channels: HashMap<String, Channel>,
    users: HashMap<String, User>,
    memberships: HashMap<MembershipId, Membership>,
    next_membership: u64,

    /// Fired before a channel is torn down, while it still holds its members.
    pub on_channel_delete: Callbacks<Channel>,
    /// Fired before a user is torn down.
    pub on_user_delete: Callbacks<User>,
    /// Fired before a membership is removed from both indices.
    pub on_membership_delete: Callbacks<MembershipDeleted>,
}

impl NetworkState {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Channels
    // ========================================================================

    /// Create a channel. A `bursting` channel starts at
    /// [`BurstState::Names`]; otherwise it is already finished.
    ///
    /// If the channel already exists it is torn down first.
    pub fn add_channel(&mut self, name: &str, bursting: bool) -> &mut Channel {
        if self.channels.contains_key(name) {
            warn!(channel = %name, "channel re-announced, replacing");
            // Present, so this cannot fail.
            let _ = self.delete_channel(name);
        }
        let state = if bursting {
            BurstState::Names
        } else {
            BurstState::Finished
        };
        debug!(channel = %name, ?state, "channel created");
        self.channels
            .entry(name.to_owned())
            .or_insert_with(|| Channel::new(name, state))
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    pub(crate) fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.get_mut(name)
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Tear down a channel, its memberships and its bans.
    ///
    /// Subscribers see the channel intact. Users left without any channel are
    /// deleted as well.
    pub fn delete_channel(&mut self, name: &str) -> Result<(), StateError> {
        let Some(channel) = self.channels.get(name) else {
            return Err(violation(StateError::NoSuchChannel(name.to_owned())));
        };
        self.on_channel_delete.notify(channel);

        let ids: Vec<MembershipId> = channel.members.values().copied().collect();
        for id in ids {
            self.remove_membership(id, DeleteReason::Teardown, true);
        }

        if let Some(channel) = self.channels.remove(name) {
            debug!(
                channel = %name,
                bans = channel.bans.len(),
                dropped = channel.deferred.len(),
                "channel deleted"
            );
        }
        Ok(())
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// Create a user. An existing user under `nick` is torn down first.
    pub fn add_user(&mut self, nick: &str, ident: &str, host: &str) -> &mut User {
        if self.users.contains_key(nick) {
            warn!(nick = %nick, "user re-announced, replacing");
            let _ = self.delete_user(nick, DeleteReason::Teardown);
        }
        self.users
            .entry(nick.to_owned())
            .or_insert_with(|| User::new(nick, ident, host))
    }

    /// Find a user, creating it on first sighting. Known users keep their
    /// memberships; empty ident/host fields are filled in.
    pub fn ensure_user(&mut self, nick: &str, ident: &str, host: &str) -> &mut User {
        let user = self
            .users
            .entry(nick.to_owned())
            .or_insert_with(|| User::new(nick, ident, host));
        if user.ident.is_empty() {
            user.ident = ident.to_owned();
        }
        if user.host.is_empty() {
            user.host = host.to_owned();
        }
        user
    }

    pub fn user(&self, nick: &str) -> Option<&User> {
        self.users.get(nick)
    }

    pub fn user_mut(&mut self, nick: &str) -> Option<&mut User> {
        self.users.get_mut(nick)
    }

    pub fn has_user(&self, nick: &str) -> bool {
        self.users.contains_key(nick)
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Tear down a user and every membership it holds.
    ///
    /// Memberships are removed with `reason` and without garbage collection,
    /// so this never re-enters itself.
    pub fn delete_user(&mut self, nick: &str, reason: DeleteReason) -> Result<(), StateError> {
        let Some(user) = self.users.get(nick) else {
            return Err(violation(StateError::NoSuchUser(nick.to_owned())));
        };
        self.on_user_delete.notify(user);

        let ids: Vec<MembershipId> = user.channels.values().copied().collect();
        for id in ids {
            self.remove_membership(id, reason, false);
        }

        if let Some(mut user) = self.users.remove(nick) {
            user.detach_account();
            debug!(nick = %nick, ?reason, "user deleted");
        }
        Ok(())
    }

    /// Change a user's nick, rewriting every index that names it.
    ///
    /// Renaming to the current nick is a no-op. If `new` is already taken
    /// by a different user, that user is treated as stale and torn down.
    pub fn rename_user(&mut self, old: &str, new: &str) -> Result<(), StateError> {
        if old == new {
            return Ok(());
        }
        if !self.users.contains_key(old) {
            return Err(violation(StateError::NoSuchUser(old.to_owned())));
        }
        if self.users.contains_key(new) {
            warn!(old = %old, new = %new, "rename target already known, replacing");
            let _ = self.delete_user(new, DeleteReason::Teardown);
        }

        // Check the reverse index before touching anything.
        let Some(user) = self.users.get(old) else {
            return Err(violation(StateError::NoSuchUser(old.to_owned())));
        };
        for (channel_name, id) in &user.channels {
            let listed = self.channels.get(channel_name).and_then(|c| c.members.get(old));
            if listed != Some(id) {
                return Err(violation(StateError::IndexMismatch(format!(
                    "{old} missing from {channel_name} member index"
                ))));
            }
        }

        let Some(mut user) = self.users.remove(old) else {
            return Err(violation(StateError::NoSuchUser(old.to_owned())));
        };
        for (channel_name, id) in &user.channels {
            if let Some(channel) = self.channels.get_mut(channel_name) {
                channel.members.remove(old);
                channel.members.insert(new.to_owned(), *id);
            }
            if let Some(membership) = self.memberships.get_mut(id) {
                membership.nick = new.to_owned();
            }
        }

        if let Some(account) = user.account.upgrade() {
            for entry in account.borrow_mut().nicks.iter_mut() {
                if entry == old {
                    *entry = new.to_owned();
                }
            }
        }

        user.nick = new.to_owned();
        self.users.insert(new.to_owned(), user);
        debug!(old = %old, new = %new, "user renamed");
        Ok(())
    }

    // ========================================================================
    // Memberships
    // ========================================================================

    /// Add `nick` to `channel`. Both must exist.
    ///
    /// An existing membership for the pair is replaced.
    pub fn add_membership(
        &mut self,
        channel: &str,
        nick: &str,
        modes: MemberModes,
    ) -> Result<MembershipId, StateError> {
        if !self.channels.contains_key(channel) {
            return Err(violation(StateError::NoSuchChannel(channel.to_owned())));
        }
        if !self.users.contains_key(nick) {
            return Err(violation(StateError::NoSuchUser(nick.to_owned())));
        }

        if let Some(old) = self.channels.get(channel).and_then(|c| c.members.get(nick)).copied() {
            warn!(channel = %channel, nick = %nick, "membership re-announced, replacing");
            self.remove_membership(old, DeleteReason::Teardown, false);
        }

        self.next_membership += 1;
        let id = MembershipId(self.next_membership);
        self.memberships.insert(
            id,
            Membership {
                id,
                channel: channel.to_owned(),
                nick: nick.to_owned(),
                modes,
                joined: chrono::Utc::now().timestamp(),
            },
        );
        if let Some(c) = self.channels.get_mut(channel) {
            c.members.insert(nick.to_owned(), id);
        }
        if let Some(u) = self.users.get_mut(nick) {
            u.channels.insert(channel.to_owned(), id);
        }
        Ok(id)
    }

    pub fn membership(&self, channel: &str, nick: &str) -> Option<&Membership> {
        let id = self.channels.get(channel)?.members.get(nick)?;
        self.memberships.get(id)
    }

    pub fn membership_mut(&mut self, channel: &str, nick: &str) -> Option<&mut Membership> {
        let id = self.channels.get(channel)?.members.get(nick)?;
        self.memberships.get_mut(id)
    }

    pub fn membership_by_id(&self, id: MembershipId) -> Option<&Membership> {
        self.memberships.get(&id)
    }

    pub fn membership_count(&self) -> usize {
        self.memberships.len()
    }

    /// Remove `nick` from `channel`.
    ///
    /// With `gc`, a user left without channels is deleted too.
    pub fn delete_membership(
        &mut self,
        channel: &str,
        nick: &str,
        reason: DeleteReason,
        gc: bool,
    ) -> Result<(), StateError> {
        let Some(id) = self.channels.get(channel).and_then(|c| c.members.get(nick)).copied() else {
            return Err(violation(StateError::NoSuchMembership {
                channel: channel.to_owned(),
                nick: nick.to_owned(),
            }));
        };
        self.remove_membership(id, reason, gc);
        Ok(())
    }

    fn remove_membership(&mut self, id: MembershipId, reason: DeleteReason, gc: bool) {
        let Some(membership) = self.memberships.get(&id) else {
            let _ = violation(StateError::IndexMismatch(format!("dangling membership {id:?}")));
            return;
        };
        let event = MembershipDeleted {
            membership: membership.clone(),
            reason,
        };
        self.on_membership_delete.notify(&event);

        let MembershipDeleted { membership, .. } = event;
        self.memberships.remove(&id);
        if let Some(channel) = self.channels.get_mut(&membership.channel) {
            channel.members.remove(&membership.nick);
        }
        let orphaned = match self.users.get_mut(&membership.nick) {
            Some(user) => {
                user.channels.remove(&membership.channel);
                user.channels.is_empty()
            }
            None => false,
        };

        if gc && orphaned {
            debug!(nick = %membership.nick, "user has no channels left");
            let _ = self.delete_user(&membership.nick, reason);
        }
    }

    // ========================================================================
    // Bans
    // ========================================================================

    /// Record a ban. A ban with the same mask is replaced.
    pub fn add_ban(
        &mut self,
        channel: &str,
        mask: &str,
        set_by: Option<&str>,
        set_at: Option<i64>,
    ) -> Result<(), StateError> {
        let Some(c) = self.channels.get_mut(channel) else {
            return Err(violation(StateError::NoSuchChannel(channel.to_owned())));
        };
        if c.bans.contains_key(mask) {
            warn!(channel = %channel, mask = %mask, "ban re-announced, replacing");
        }
        c.bans.insert(
            mask.to_owned(),
            Ban {
                channel: channel.to_owned(),
                mask: mask.to_owned(),
                set_by: set_by.map(str::to_owned),
                set_at,
            },
        );
        Ok(())
    }

    pub fn delete_ban(&mut self, channel: &str, mask: &str) -> Result<(), StateError> {
        let Some(c) = self.channels.get_mut(channel) else {
            return Err(violation(StateError::NoSuchChannel(channel.to_owned())));
        };
        if c.bans.remove(mask).is_none() {
            return Err(violation(StateError::NoSuchBan {
                channel: channel.to_owned(),
                mask: mask.to_owned(),
            }));
        }
        Ok(())
    }

    // ========================================================================
    // Channel attributes
    // ========================================================================

    fn channel_or_violation(&mut self, name: &str) -> Result<&mut Channel, StateError> {
        match self.channels.get_mut(name) {
            Some(channel) => Ok(channel),
            None => Err(violation(StateError::NoSuchChannel(name.to_owned()))),
        }
    }

    /// Replace the topic text. An empty `text` clears the topic.
    pub fn set_topic(
        &mut self,
        channel: &str,
        text: &str,
        set_by: Option<&str>,
        set_at: i64,
    ) -> Result<(), StateError> {
        let c = self.channel_or_violation(channel)?;
        c.topic = (!text.is_empty()).then(|| Topic {
            text: text.to_owned(),
            set_by: set_by.map(str::to_owned),
            set_at,
        });
        Ok(())
    }

    /// Update who set the topic and when, keeping the text.
    pub fn set_topic_time(
        &mut self,
        channel: &str,
        set_by: Option<&str>,
        set_at: i64,
    ) -> Result<(), StateError> {
        let c = self.channel_or_violation(channel)?;
        if let Some(topic) = c.topic.as_mut() {
            topic.set_by = set_by.map(str::to_owned);
            topic.set_at = set_at;
        }
        Ok(())
    }

    pub fn set_key(&mut self, channel: &str, key: Option<&str>) -> Result<(), StateError> {
        self.channel_or_violation(channel)?.key = key.map(str::to_owned);
        Ok(())
    }

    pub fn set_limit(&mut self, channel: &str, limit: Option<u32>) -> Result<(), StateError> {
        self.channel_or_violation(channel)?.limit = limit;
        Ok(())
    }

    /// Set or clear a boolean channel mode.
    pub fn set_mode(&mut self, channel: &str, letter: char, on: bool) -> Result<(), StateError> {
        let c = self.channel_or_violation(channel)?;
        if !c.modes.set(letter, on) {
            debug!(channel = %channel, letter = %letter, "ignoring non-letter mode");
        }
        Ok(())
    }

    pub fn set_created_at(&mut self, channel: &str, at: i64) -> Result<(), StateError> {
        self.channel_or_violation(channel)?.created_at = Some(at);
        Ok(())
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    /// Link `nick` to `account`, replacing any previous link.
    pub fn login(&mut self, nick: &str, account: &Rc<RefCell<Account>>) -> Result<(), StateError> {
        let Some(user) = self.users.get_mut(nick) else {
            return Err(violation(StateError::NoSuchUser(nick.to_owned())));
        };
        user.detach_account();
        user.account = Rc::downgrade(account);
        account.borrow_mut().nicks.push(nick.to_owned());
        Ok(())
    }

    pub fn logout(&mut self, nick: &str) -> Result<(), StateError> {
        let Some(user) = self.users.get_mut(nick) else {
            return Err(violation(StateError::NoSuchUser(nick.to_owned())));
        };
        user.detach_account();
        Ok(())
    }

    /// Forget every link to an account that is being deleted.
    pub fn account_deleted(&mut self, account: &Rc<RefCell<Account>>) {
        let nicks = std::mem::take(&mut account.borrow_mut().nicks);
        for nick in nicks {
            if let Some(user) = self.users.get_mut(&nick) {
                user.account = std::rc::Weak::new();
            }
        }
    }

    // ========================================================================
    // Whole-store operations
    // ========================================================================

    /// Tear down everything, firing the usual delete notifications.
    pub fn clear(&mut self) {
        let names: Vec<String> = self.channels.keys().cloned().collect();
        for name in names {
            let _ = self.delete_channel(&name);
        }
        let nicks: Vec<String> = self.users.keys().cloned().collect();
        for nick in nicks {
            let _ = self.delete_user(&nick, DeleteReason::Teardown);
        }
        debug_assert!(self.memberships.is_empty());
    }

    /// Walk both indices and check they describe the same memberships.
    pub fn check_consistency(&self) -> Result<(), StateError> {
        let mismatch = |what: String| -> Result<(), StateError> { Err(StateError::IndexMismatch(what)) };

        for (name, channel) in &self.channels {
            for (nick, id) in &channel.members {
                match self.users.get(nick).and_then(|u| u.channels.get(name)) {
                    Some(other) if other == id => {}
                    _ => return mismatch(format!("{name} lists {nick} but not the reverse")),
                }
                match self.memberships.get(id) {
                    Some(m) if m.channel == *name && m.nick == *nick => {}
                    _ => return mismatch(format!("{name}/{nick} points at a stale record")),
                }
            }
        }
        for (nick, user) in &self.users {
            for (name, id) in &user.channels {
                if self.channels.get(name).and_then(|c| c.members.get(nick)) != Some(id) {
                    return mismatch(format!("{nick} lists {name} but not the reverse"));
                }
            }
        }
        let indexed: usize = self.channels.values().map(|c| c.members.len()).sum();
        if indexed != self.memberships.len() {
            return mismatch(format!(
                "{} memberships stored, {indexed} indexed",
                self.memberships.len()
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for NetworkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkState")
            .field("channels", &self.channels.len())
            .field("users", &self.users.len())
            .field("memberships", &self.memberships.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn two_channels() -> NetworkState {
        let mut state = NetworkState::new();
        state.add_channel("#a", false);
        state.add_channel("#b", false);
        for nick in ["alice", "bob", "carol"] {
            state.add_user(nick, "u", "h");
        }
        state.add_membership("#a", "alice", MemberModes::OP).unwrap();
        state.add_membership("#a", "bob", MemberModes::NONE).unwrap();
        state.add_membership("#b", "bob", MemberModes::VOICE).unwrap();
        state.add_membership("#b", "carol", MemberModes::NONE).unwrap();
        state
    }

    #[test]
    fn both_indices_share_one_record() {
        let state = two_channels();
        state.check_consistency().unwrap();

        let from_channel = state.channel("#b").unwrap().members().find(|(n, _)| *n == "bob");
        let from_user = state.user("bob").unwrap().channels().find(|(c, _)| *c == "#b");
        assert_eq!(from_channel.map(|(_, id)| id), from_user.map(|(_, id)| id));
        assert_eq!(state.membership("#b", "bob").unwrap().modes, MemberModes::VOICE);
        assert_eq!(state.membership_count(), 4);
    }

    #[test]
    fn deleting_a_channel_cascades() {
        let mut state = two_channels();
        let deleted = Rc::new(Cell::new(0));
        let seen = deleted.clone();
        state.on_membership_delete.subscribe("test", move |event: &MembershipDeleted| {
            assert_eq!(event.reason, DeleteReason::Teardown);
            seen.set(seen.get() + 1);
        });
        let members_seen = Rc::new(Cell::new(0));
        let seen = members_seen.clone();
        state
            .on_channel_delete
            .subscribe("test", move |channel: &Channel| seen.set(channel.member_count()));
        state.add_ban("#a", "*!*@spam", None, None).unwrap();

        state.delete_channel("#a").unwrap();

        assert_eq!(members_seen.get(), 2);
        assert_eq!(deleted.get(), 2);
        assert!(!state.has_channel("#a"));
        // alice only shared #a
        assert!(!state.has_user("alice"));
        assert_eq!(state.user("bob").unwrap().channel_count(), 1);
        state.check_consistency().unwrap();
    }

    #[test]
    fn part_collects_dead_users() {
        let mut state = two_channels();
        state.delete_membership("#b", "carol", DeleteReason::Part, true).unwrap();
        assert!(!state.has_user("carol"));

        state.delete_membership("#a", "bob", DeleteReason::Kick, true).unwrap();
        assert!(state.has_user("bob"));

        // Without gc the user stays around with no channels.
        state.delete_membership("#a", "alice", DeleteReason::Part, false).unwrap();
        assert_eq!(state.user("alice").unwrap().channel_count(), 0);
        state.check_consistency().unwrap();
    }

    #[test]
    fn quit_deletes_user_directly() {
        let mut state = two_channels();
        let reasons = Rc::new(RefCell::new(Vec::new()));
        let seen = reasons.clone();
        state
            .on_membership_delete
            .subscribe("test", move |event: &MembershipDeleted| seen.borrow_mut().push(event.reason));

        state.delete_user("bob", DeleteReason::Quit).unwrap();

        assert_eq!(*reasons.borrow(), vec![DeleteReason::Quit, DeleteReason::Quit]);
        assert!(!state.channel("#a").unwrap().has_member("bob"));
        assert!(!state.channel("#b").unwrap().has_member("bob"));
        assert!(state.has_user("alice") && state.has_user("carol"));
        state.check_consistency().unwrap();
    }

    #[test]
    fn rename_rewrites_both_indices() {
        let mut state = two_channels();
        let before: Vec<_> = {
            let mut ids: Vec<_> = state.user("bob").unwrap().channels().map(|(_, id)| id).collect();
            ids.sort();
            ids
        };

        state.rename_user("bob", "robert").unwrap();

        assert!(!state.has_user("bob"));
        let mut after: Vec<_> = state.user("robert").unwrap().channels().map(|(_, id)| id).collect();
        after.sort();
        assert_eq!(before, after);
        assert!(state.channel("#a").unwrap().has_member("robert"));
        assert!(!state.channel("#b").unwrap().has_member("bob"));
        assert_eq!(state.membership("#b", "robert").unwrap().nick(), "robert");
        state.check_consistency().unwrap();
    }

    #[test]
    fn rename_to_self_is_a_no_op() {
        let mut state = two_channels();
        let id = state.membership("#a", "alice").unwrap().id();
        state.rename_user("alice", "alice").unwrap();
        assert_eq!(state.membership("#a", "alice").unwrap().id(), id);
        assert_eq!(state.user_count(), 3);
    }

    #[test]
    fn case_only_rename_is_a_real_rename() {
        let mut state = two_channels();
        state.rename_user("alice", "Alice").unwrap();
        assert!(state.has_user("Alice"));
        assert!(!state.has_user("alice"));
        state.check_consistency().unwrap();
    }

    #[test]
    fn re_announced_channel_is_replaced() {
        let mut state = two_channels();
        state.add_channel("#a", true);
        let channel = state.channel("#a").unwrap();
        assert_eq!(channel.member_count(), 0);
        assert_eq!(channel.burst_state(), BurstState::Names);
        state.check_consistency().unwrap();
    }

    #[test]
    fn re_announced_membership_keeps_one_record() {
        let mut state = two_channels();
        state.add_membership("#a", "bob", MemberModes::VOICE).unwrap();
        assert_eq!(state.membership_count(), 4);
        assert_eq!(state.membership("#a", "bob").unwrap().modes, MemberModes::VOICE);
        state.check_consistency().unwrap();
    }

    #[test]
    fn accounts_follow_renames_and_deletes() {
        let mut state = two_channels();
        let account = Account::new("bobacct");
        state.login("bob", &account).unwrap();
        assert_eq!(state.user("bob").unwrap().account().unwrap().borrow().name, "bobacct");

        state.rename_user("bob", "bobby").unwrap();
        assert_eq!(account.borrow().nicks, vec!["bobby".to_owned()]);

        state.delete_user("bobby", DeleteReason::Quit).unwrap();
        assert!(account.borrow().nicks.is_empty());
    }

    #[test]
    fn account_deletion_clears_back_references() {
        let mut state = two_channels();
        let account = Account::new("shared");
        state.login("alice", &account).unwrap();
        state.login("carol", &account).unwrap();

        state.account_deleted(&account);
        drop(account);
        assert!(state.user("alice").unwrap().account().is_none());
        assert!(state.user("carol").unwrap().account().is_none());
    }

    #[test]
    fn topic_key_limit_and_modes() {
        let mut state = two_channels();
        state.set_topic("#a", "hello", Some("alice"), 100).unwrap();
        state.set_topic_time("#a", Some("bob"), 200).unwrap();
        state.set_key("#a", Some("sekrit")).unwrap();
        state.set_limit("#a", Some(10)).unwrap();
        state.set_mode("#a", 'n', true).unwrap();

        let channel = state.channel("#a").unwrap();
        let topic = channel.topic().unwrap();
        assert_eq!((topic.text.as_str(), topic.set_by.as_deref(), topic.set_at), ("hello", Some("bob"), 200));
        assert_eq!(channel.key(), Some("sekrit"));
        assert_eq!(channel.limit(), Some(10));
        assert!(channel.modes().contains('n'));

        state.set_topic("#a", "", None, 300).unwrap();
        assert!(state.channel("#a").unwrap().topic().is_none());
    }

    #[test]
    fn bans_are_owned_by_the_channel() {
        let mut state = two_channels();
        state.add_ban("#a", "*!*@bad", Some("alice"), Some(5)).unwrap();
        assert_eq!(state.channel("#a").unwrap().ban("*!*@bad").unwrap().set_at, Some(5));
        state.delete_ban("#a", "*!*@bad").unwrap();
        assert_eq!(state.channel("#a").unwrap().bans().count(), 0);
    }

    #[test]
    fn clear_empties_everything() {
        let mut state = two_channels();
        state.add_user("loner", "u", "h");
        let users = Rc::new(Cell::new(0));
        let seen = users.clone();
        state.on_user_delete.subscribe("test", move |_: &User| seen.set(seen.get() + 1));

        state.clear();

        assert_eq!(users.get(), 4);
        assert_eq!((state.channel_count(), state.user_count(), state.membership_count()), (0, 0, 0));
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "state invariant violated"))]
    fn deleting_a_missing_membership_is_a_bug() {
        let mut state = two_channels();
        let result = state.delete_membership("#a", "carol", DeleteReason::Part, true);
        assert!(matches!(result, Err(StateError::NoSuchMembership { .. })));
    }
}
