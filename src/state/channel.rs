//! Channel entity.

use std::collections::HashMap;

use slirc_proto::Message;

use super::MembershipId;
use crate::burst::BurstState;

/// Boolean channel modes, one bit per letter `a-z` then `A-Z`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChannelModes(u64);

impl ChannelModes {
    fn bit(letter: char) -> Option<u64> {
        match letter {
            'a'..='z' => Some(1 << (letter as u32 - 'a' as u32)),
            'A'..='Z' => Some(1 << (26 + letter as u32 - 'A' as u32)),
            _ => None,
        }
    }

    /// Whether `letter` is set. Non-letters are never set.
    pub fn contains(self, letter: char) -> bool {
        Self::bit(letter).is_some_and(|bit| self.0 & bit != 0)
    }

    /// Set or clear `letter`. Returns `false` if it is not a mode letter.
    pub fn set(&mut self, letter: char, on: bool) -> bool {
        let Some(bit) = Self::bit(letter) else {
            return false;
        };
        if on {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
        true
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Set letters in `a-zA-Z` order.
    pub fn letters(self) -> impl Iterator<Item = char> {
        ('a'..='z')
            .chain('A'..='Z')
            .filter(move |&c| self.contains(c))
    }
}

/// Renders as a mode string such as `+nt`, or the empty string.
impl std::fmt::Display for ChannelModes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        f.write_str("+")?;
        for letter in self.letters() {
            write!(f, "{}", letter)?;
        }
        Ok(())
    }
}

/// A ban mask on a channel. Masks are never resolved to users.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ban {
    pub channel: String,
    pub mask: String,
    /// Who set it, when the server told us.
    pub set_by: Option<String>,
    /// Unix timestamp, when the server told us.
    pub set_at: Option<i64>,
}

/// Channel topic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Topic {
    pub text: String,
    pub set_by: Option<String>,
    /// Unix timestamp.
    pub set_at: i64,
}

/// A channel the agent is in.
///
/// Members are indexed by nick exactly as last seen on the wire. Mutation goes
/// through [`NetworkState`](super::NetworkState) so both membership indices
/// stay in step.
#[derive(Debug)]
pub struct Channel {
    pub(super) name: String,
    pub(super) topic: Option<Topic>,
    pub(super) key: Option<String>,
    pub(super) limit: Option<u32>,
    pub(super) modes: ChannelModes,
    pub(super) members: HashMap<String, MembershipId>,
    pub(super) bans: HashMap<String, Ban>,
    pub(super) created_at: Option<i64>,
    pub(crate) burst: BurstState,
    pub(crate) deferred: Vec<Message>,
}

impl Channel {
    pub(super) fn new(name: &str, burst: BurstState) -> Self {
        Self {
            name: name.to_owned(),
            topic: None,
            key: None,
            limit: None,
            modes: ChannelModes::default(),
            members: HashMap::new(),
            bans: HashMap::new(),
            created_at: None,
            burst,
            deferred: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topic(&self) -> Option<&Topic> {
        self.topic.as_ref()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn modes(&self) -> ChannelModes {
        self.modes
    }

    /// Creation time reported by `RPL_CREATIONTIME`.
    pub fn created_at(&self) -> Option<i64> {
        self.created_at
    }

    pub fn burst_state(&self) -> BurstState {
        self.burst
    }

    /// Number of lines waiting for this channel's burst to finish.
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    pub fn has_member(&self, nick: &str) -> bool {
        self.members.contains_key(nick)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Member nicks with their membership ids, in no particular order.
    pub fn members(&self) -> impl Iterator<Item = (&str, MembershipId)> {
        self.members.iter().map(|(nick, id)| (nick.as_str(), *id))
    }

    pub fn ban(&self, mask: &str) -> Option<&Ban> {
        self.bans.get(mask)
    }

    pub fn bans(&self) -> impl Iterator<Item = &Ban> {
        self.bans.values()
    }
}
