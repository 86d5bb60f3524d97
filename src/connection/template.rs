//! In-band formatting escapes for outbound text.
//!
//! | escape | expands to            |
//! |--------|-----------------------|
//! | `$$`   | a literal `$`         |
//! | `$b`   | bold                  |
//! | `$c`   | colour start          |
//! | `$o`   | reset                 |
//! | `$r`   | reverse               |
//! | `$u`   | underline             |
//! | `$N`   | our nick              |
//! | `$U`   | our username          |
//! | `$H`   | our host              |
//! | `$G`   | our real name (gecos) |
//!
//! Anything else after `$`, and a trailing lone `$`, is copied verbatim.

use slirc_proto::format::{BOLD, COLOR, RESET, REVERSE, UNDERLINE};

use crate::handlers::Identity;

pub fn expand(text: &str, me: &Identity) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('$') => out.push('$'),
            Some('b') => out.push(BOLD),
            Some('c') => out.push(COLOR),
            Some('o') => out.push(RESET),
            Some('r') => out.push(REVERSE),
            Some('u') => out.push(UNDERLINE),
            Some('N') => out.push_str(&me.nick),
            Some('U') => out.push_str(&me.username),
            Some('H') => out.push_str(&me.host),
            Some('G') => out.push_str(&me.realname),
            Some(other) => {
                out.push('$');
                out.push(other);
            }
            None => out.push('$'),
        }
    }
    out
}
