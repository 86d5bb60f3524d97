//! IRC formatting control characters.
//!
//! Message text may carry in-band formatting codes. Only the ones outbound
//! templates expand to are named here.
//!
//! See <https://modern.ircdocs.horse/formatting>.

/// Toggle bold.
pub const BOLD: char = '\x02';
/// Start a color sequence, followed by optional `fg[,bg]` digits.
pub const COLOR: char = '\x03';
/// Reset all formatting.
pub const RESET: char = '\x0F';
/// Toggle reverse video.
pub const REVERSE: char = '\x16';
/// Toggle underline.
pub const UNDERLINE: char = '\x1F';
