//! Connection profile resolution.
//!
//! Server url and user are each resolved in order:
//! 1) CLI `--server` / `--user`
//! 2) `RTSYNC_SERVER` / `RTSYNC_USER` environment variables
//! 3) Config value (`server.url`, `server.user`)
//!
//! The password is only ever read from the environment variable named by
//! `server.password_env`.

use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::gateway::Credentials;

pub const SERVER_ENV: &str = "RTSYNC_SERVER";
pub const USER_ENV: &str = "RTSYNC_USER";

/// Resolved connection settings.
#[derive(Debug, Clone)]
pub struct Profile {
    pub server: String,
    pub credentials: Option<Credentials>,
    pub timeout: Duration,
}

/// Resolve the profile from CLI overrides, environment and config.
pub fn resolve_profile(
    config: &Config,
    cli_server: Option<&str>,
    cli_user: Option<&str>,
) -> Result<Profile> {
    let server = pick(cli_server, SERVER_ENV, Some(config.server.url.as_str())).ok_or_else(|| {
        Error::InvalidConfig(format!(
            "no server configured (use --server, {SERVER_ENV}, or server.url)"
        ))
    })?;
    if !(server.starts_with("http://") || server.starts_with("https://")) {
        return Err(Error::InvalidConfig(format!(
            "server url must start with http:// or https:// (got '{server}')"
        )));
    }

    let user = pick(cli_user, USER_ENV, config.server.user.as_deref());
    let credentials = user.map(|user| Credentials {
        user,
        password: std::env::var(&config.server.password_env).unwrap_or_default(),
    });

    Ok(Profile {
        server,
        credentials,
        timeout: Duration::from_secs(config.server.timeout_secs),
    })
}

fn pick(cli: Option<&str>, env_name: &str, configured: Option<&str>) -> Option<String> {
    if let Some(value) = non_empty(cli) {
        return Some(value.to_string());
    }
    if let Ok(env_value) = std::env::var(env_name) {
        if let Some(value) = non_empty(Some(env_value.as_str())) {
            return Some(value.to_string());
        }
    }
    non_empty(configured).map(str::to_string)
}

fn non_empty(input: Option<&str>) -> Option<&str> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_value_wins_over_config() {
        let mut config = Config::default();
        config.server.url = "https://config.example.com".to_string();
        config.server.user = Some("config-user".to_string());

        let profile =
            resolve_profile(&config, Some("https://cli.example.com"), Some("cli-user")).unwrap();
        assert_eq!(profile.server, "https://cli.example.com");
        assert_eq!(profile.credentials.unwrap().user, "cli-user");
    }

    #[test]
    fn blank_cli_value_is_ignored() {
        assert_eq!(
            pick(Some("  "), "RTSYNC_TEST_UNSET_VARIABLE", Some("fallback")),
            Some("fallback".to_string())
        );
    }

    #[test]
    fn non_http_server_is_rejected() {
        let config = Config::default();
        let err = resolve_profile(&config, Some("rt.example.com"), None).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn timeout_comes_from_config() {
        let mut config = Config::default();
        config.server.timeout_secs = 7;
        let profile = resolve_profile(&config, Some("http://localhost"), None).unwrap();
        assert_eq!(profile.timeout, Duration::from_secs(7));
    }
}
