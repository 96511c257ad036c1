use crate::bulk::{Throttle, ThrottlePolicy};
use crate::default_struct;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("{name} must be a number, got {value:?}")]
    Invalid { name: &'static str, value: String },
}

default_struct! {
#[derive(Debug, Clone)]
pub struct Limits {
    pub max_channels: usize = 300,
    pub max_repeats: usize = 300,
    pub max_message_len: usize = 4000,
}
}

/// Everything the command layer needs to know about its own behaviour.
#[derive(Debug, Clone)]
pub struct Settings {
    pub prefix: String,
    pub limits: Limits,
    pub throttle: ThrottlePolicy,
    pub confirm_window: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            limits: Limits::default(),
            throttle: ThrottlePolicy::default(),
            confirm_window: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub port: u16,
    pub activity_log: Option<PathBuf>,
    pub settings: Settings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("DISCORD_BOT_TOKEN")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::Missing("DISCORD_BOT_TOKEN"))?;

        let defaults = Settings::default();
        let port = parse_or(&lookup, "PORT", 3000u16)?;
        let channel_delay = parse_or(&lookup, "CHANNEL_DELAY_MS", 1000u64)?;
        let message_delay = parse_or(&lookup, "MESSAGE_DELAY_MS", 1000u64)?;
        let confirm_secs = parse_or(&lookup, "DELETE_CONFIRM_SECS", 30u64)?;

        let prefix = lookup("BOT_PREFIX")
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or(defaults.prefix);

        let activity_log = lookup("ACTIVITY_LOG_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            token,
            port,
            activity_log,
            settings: Settings {
                prefix,
                limits: defaults.limits,
                throttle: ThrottlePolicy {
                    channels: Throttle::new(Duration::from_millis(channel_delay)),
                    messages: Throttle::new(Duration::from_millis(message_delay)),
                },
                confirm_window: Duration::from_secs(confirm_secs),
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        _ => Ok(default),
    }
}
