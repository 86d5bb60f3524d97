//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use thiserror::Error;

/// Smallest maximum line length that still fits a registration exchange.
const MIN_LINE_LEN: usize = 64;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.host is required")]
    MissingHost,
    #[error("server.port must not be 0")]
    InvalidPort,
    #[error("identity.nick is required")]
    MissingNick,
    #[error("identity.nick is not a valid nickname: '{0}'")]
    InvalidNick(String),
    #[error("identity.username is required")]
    MissingUsername,
    #[error("connection.max_line_len must be at least {min}, got {0}", min = MIN_LINE_LEN)]
    LineLenTooSmall(usize),
    #[error("channels entry is not a channel name: '{0}'")]
    InvalidChannel(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    use slirc_proto::ChannelExt;

    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ValidationError::MissingHost);
    }
    if config.server.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }

    let nick = &config.identity.nick;
    if nick.is_empty() {
        errors.push(ValidationError::MissingNick);
    } else if nick.contains(' ') || nick.starts_with(':') || nick.starts_with('#') {
        errors.push(ValidationError::InvalidNick(nick.clone()));
    }
    if config.identity.username.is_empty() {
        errors.push(ValidationError::MissingUsername);
    }

    if config.connection.max_line_len < MIN_LINE_LEN {
        errors.push(ValidationError::LineLenTooSmall(config.connection.max_line_len));
    }

    for channel in &config.channels {
        if !channel.is_channel_name() {
            errors.push(ValidationError::InvalidChannel(channel.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_valid_config() -> String {
        r#"
[server]
host = "irc.example.net"

[identity]
nick = "bot"
"#
        .to_string()
    }

    #[test]
    fn test_valid_config_passes() {
        let config: Config = toml::from_str(&minimal_valid_config()).unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_every_problem_is_reported() {
        let toml = r##"
channels = ["#ok", "nochan"]

[server]
host = ""
port = 0

[identity]
nick = "bad nick"
username = ""

[connection]
max_line_len = 10
"##;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 6);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingHost)));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidPort)));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidNick(_))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingUsername)));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::LineLenTooSmall(10))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidChannel(c) if c == "nochan")));
    }

    #[test]
    fn test_empty_nick_fails() {
        let toml = r#"
[server]
host = "irc.example.net"

[identity]
nick = ""
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(matches!(errors.as_slice(), [ValidationError::MissingNick]));
    }
}
