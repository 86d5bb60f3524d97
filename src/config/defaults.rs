//! Serde default value functions.

pub fn default_port() -> u16 {
    6667
}

pub fn default_true() -> bool {
    true
}

pub fn default_max_line_len() -> usize {
    slirc_proto::DEFAULT_MAX_LINE_LEN
}

pub fn default_username() -> String {
    "slircbot".to_string()
}

pub fn default_realname() -> String {
    "slircbot".to_string()
}
