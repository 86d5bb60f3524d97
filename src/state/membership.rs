//! Channel membership records.

use std::fmt;

/// Handle into the membership arena. Both the channel's member index and
/// the user's channel index store this id, never a copy of the record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MembershipId(pub(super) u64);

/// Per-channel privileges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MemberModes(u8);

impl MemberModes {
    pub const NONE: MemberModes = MemberModes(0);
    pub const OP: MemberModes = MemberModes(1);
    pub const VOICE: MemberModes = MemberModes(1 << 1);

    pub fn contains(self, other: MemberModes) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: MemberModes) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: MemberModes) {
        self.0 &= !other.0;
    }

    /// Mode for a channel mode letter (`o`, `v`).
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'o' => Some(Self::OP),
            'v' => Some(Self::VOICE),
            _ => None,
        }
    }

    /// Split a names-reply entry such as `@+nick` into its modes and nick.
    ///
    /// `@` and `+` are kept; any other status symbol is stripped.
    pub fn split_prefixed(entry: &str) -> (Self, &str) {
        let mut modes = Self::NONE;
        let nick = entry.trim_start_matches(|c: char| match c {
            '@' => {
                modes.insert(Self::OP);
                true
            }
            '+' => {
                modes.insert(Self::VOICE);
                true
            }
            '~' | '&' | '%' => true,
            _ => false,
        });
        (modes, nick)
    }
}

/// Highest status symbol, as shown in a names list.
impl fmt::Display for MemberModes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.contains(Self::OP) {
            f.write_str("@")
        } else if self.contains(Self::VOICE) {
            f.write_str("+")
        } else {
            Ok(())
        }
    }
}

/// A (channel, user) pairing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Membership {
    pub(super) id: MembershipId,
    pub(super) channel: String,
    pub(super) nick: String,
    pub modes: MemberModes,
    /// Unix timestamp of when the membership was first seen.
    pub joined: i64,
}

impl Membership {
    pub fn id(&self) -> MembershipId {
        self.id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }
}

/// Why a membership went away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteReason {
    Part,
    Kick,
    Quit,
    /// The channel or user it belonged to was torn down.
    Teardown,
}

/// Event delivered to `on_membership_delete` subscribers.
#[derive(Clone, Debug)]
pub struct MembershipDeleted {
    pub membership: Membership,
    pub reason: DeleteReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_prefixes() {
        assert_eq!(MemberModes::split_prefixed("@alice"), (MemberModes::OP, "alice"));
        assert_eq!(MemberModes::split_prefixed("+bob"), (MemberModes::VOICE, "bob"));
        assert_eq!(MemberModes::split_prefixed("carol"), (MemberModes::NONE, "carol"));
        assert_eq!(MemberModes::split_prefixed("~%dave"), (MemberModes::NONE, "dave"));

        let (modes, nick) = MemberModes::split_prefixed("@+eve");
        assert_eq!(nick, "eve");
        assert!(modes.contains(MemberModes::OP) && modes.contains(MemberModes::VOICE));
        assert_eq!(modes.to_string(), "@");
    }

    #[test]
    fn insert_and_remove() {
        let mut modes = MemberModes::NONE;
        modes.insert(MemberModes::VOICE);
        assert!(modes.contains(MemberModes::VOICE));
        assert!(!modes.contains(MemberModes::OP));
        modes.remove(MemberModes::VOICE);
        assert_eq!(modes, MemberModes::NONE);
        assert_eq!(MemberModes::from_letter('o'), Some(MemberModes::OP));
        assert_eq!(MemberModes::from_letter('k'), None);
    }
}
