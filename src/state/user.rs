//! User entity and the account relation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::MembershipId;

/// A services account, owned outside the state store.
///
/// The store only keeps a [`Weak`] pointer from each logged-in user and keeps
/// `nicks` in step when users are renamed or deleted.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    /// Nicks currently logged in to this account.
    pub nicks: Vec<String>,
}

impl Account {
    pub fn new(name: impl Into<String>) -> Rc<RefCell<Account>> {
        Rc::new(RefCell::new(Account {
            name: name.into(),
            nicks: Vec::new(),
        }))
    }
}

/// A user sharing at least one channel with the agent.
#[derive(Debug)]
pub struct User {
    pub(super) nick: String,
    pub ident: String,
    pub host: String,
    /// Free-form info (realname / gecos).
    pub info: String,
    pub(super) channels: HashMap<String, MembershipId>,
    pub(super) account: Weak<RefCell<Account>>,
}

impl User {
    pub(super) fn new(nick: &str, ident: &str, host: &str) -> Self {
        Self {
            nick: nick.to_owned(),
            ident: ident.to_owned(),
            host: host.to_owned(),
            info: String::new(),
            channels: HashMap::new(),
            account: Weak::new(),
        }
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// `nick!ident@host`.
    pub fn mask(&self) -> String {
        format!("{}!{}@{}", self.nick, self.ident, self.host)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn is_on(&self, channel: &str) -> bool {
        self.channels.contains_key(channel)
    }

    /// Channel names with their membership ids, in no particular order.
    pub fn channels(&self) -> impl Iterator<Item = (&str, MembershipId)> {
        self.channels.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// The account this user is logged in to, if it is still alive.
    pub fn account(&self) -> Option<Rc<RefCell<Account>>> {
        self.account.upgrade()
    }

    pub(super) fn detach_account(&mut self) {
        if let Some(account) = self.account.upgrade() {
            account.borrow_mut().nicks.retain(|n| *n != self.nick);
        }
        self.account = Weak::new();
    }
}
