//! RFC 1459 case mapping.
//!
//! Nicks and channel names compare case-insensitively on the wire, with
//! `[]\~` folding onto `{}|^`. The state store keys entities by the literal
//! spelling it last saw; callers that need protocol equality use these.

/// Fold one character. ASCII letters go to lowercase, and
/// `[` `]` `\` `~` map to `{` `}` `|` `^`.
#[inline]
pub const fn irc_lower_char(c: char) -> char {
    match c {
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        '~' => '^',
        'A'..='Z' => c.to_ascii_lowercase(),
        _ => c,
    }
}

/// Fold a whole string.
pub fn irc_to_lower(s: &str) -> String {
    s.chars().map(irc_lower_char).collect()
}

/// Case-insensitive equality under RFC 1459 rules.
pub fn irc_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .chars()
            .zip(b.chars())
            .all(|(x, y)| irc_lower_char(x) == irc_lower_char(y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_letters_and_brackets() {
        assert_eq!(irc_lower_char('Q'), 'q');
        assert_eq!(irc_lower_char('['), '{');
        assert_eq!(irc_lower_char('~'), '^');
        assert_eq!(irc_lower_char('#'), '#');
        assert_eq!(irc_to_lower("Nick[Away]\\x"), "nick{away}|x");
    }

    #[test]
    fn equality() {
        assert!(irc_eq("SlircBot", "slircbot"));
        assert!(irc_eq("bot[1]", "BOT{1}"));
        assert!(!irc_eq("bot", "bot_"));
        assert!(!irc_eq("abc", "abd"));
    }
}
