//! Channel mode-string parsing.
//!
//! Turns `MODE #chan +ov-k alice bob secret` (or the body of a
//! `RPL_CHANNELMODEIS`) into an ordered list of [`ModeChange`]s. Which letters
//! consume an argument follows the common `CHANMODES=beI,k,l,...` and
//! `PREFIX=(qaohv)` defaults.

/// How a mode letter treats arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeClass {
    /// List modes (`b`, `e`, `I`); argument optional only when querying.
    List,
    /// Always takes an argument when set; removal may omit it (`k`).
    Key,
    /// Takes an argument only when set (`l`).
    SetOnly,
    /// Membership prefix modes (`q`, `a`, `o`, `h`, `v`); always takes a nick.
    Member,
    /// Plain on/off flag.
    Flag,
}

impl ModeClass {
    /// Classify a channel mode letter.
    pub fn of(letter: char) -> Self {
        match letter {
            'b' | 'e' | 'I' => ModeClass::List,
            'k' => ModeClass::Key,
            'l' => ModeClass::SetOnly,
            'q' | 'a' | 'o' | 'h' | 'v' => ModeClass::Member,
            _ => ModeClass::Flag,
        }
    }
}

/// One signed mode letter with its argument, if it took one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeChange {
    /// `true` for `+`, `false` for `-`.
    pub adding: bool,
    /// The mode letter.
    pub letter: char,
    /// Consumed argument. `None` also when a letter that needs one ran out of
    /// arguments; callers skip such changes.
    pub arg: Option<String>,
}

impl ModeChange {
    /// Class of this change's letter.
    pub fn class(&self) -> ModeClass {
        ModeClass::of(self.letter)
    }
}

/// Parse a channel mode string and its argument list.
///
/// A mode string without a leading sign is treated as `+`. Surplus arguments
/// are ignored. Running out of arguments never fails the whole string.
pub fn parse_channel_modes<S: AsRef<str>>(modes: &str, args: &[S]) -> Vec<ModeChange> {
    let mut args = args.iter().map(|a| AsRef::<str>::as_ref(a));
    let mut adding = true;
    let mut out = Vec::new();

    for letter in modes.chars() {
        match letter {
            '+' => adding = true,
            '-' => adding = false,
            _ => {
                let arg = match (ModeClass::of(letter), adding) {
                    (ModeClass::Flag, _) | (ModeClass::SetOnly, false) => None,
                    _ => args.next(),
                };
                out.push(ModeChange {
                    adding,
                    letter,
                    arg: arg.map(str::to_owned),
                });
            }
        }
    }

    out
}
