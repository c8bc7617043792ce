//! Shared types used across Watchman crates.

use crate::error::{ConfigError, ConfigResult};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Environment variable holding the Enterprise Grid discovery token.
pub const TOKEN_ENV_VAR: &str = "SLACK_WATCHMAN_EG_TOKEN";

/// Bearer token for the discovery API.
///
/// The token is zeroized on drop and never printed by `Debug`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ApiToken(String);

impl ApiToken {
    /// Wrap a token value.
    ///
    /// # Errors
    /// Returns `MissingToken` if the value is empty or whitespace.
    pub fn new(value: impl Into<String>) -> ConfigResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ConfigError::MissingToken {
                var: TOKEN_ENV_VAR.to_string(),
            });
        }
        Ok(Self(value.trim().to_string()))
    }

    /// Read the token from `SLACK_WATCHMAN_EG_TOKEN`.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_env_var(TOKEN_ENV_VAR)
    }

    /// Read the token from a named environment variable.
    pub fn from_env_var(var: &str) -> ConfigResult<Self> {
        let value = std::env::var(var).map_err(|_| ConfigError::MissingToken {
            var: var.to_string(),
        })?;
        Self::new(value).map_err(|_| ConfigError::MissingToken {
            var: var.to_string(),
        })
    }

    /// Get the raw token for building an `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(****)")
    }
}

/// How far back a run looks for content.
///
/// Built from an hours component (1-24) and a minutes component (1-60).
/// Out-of-range components are ignored; when neither is usable the window is
/// one hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookback {
    minutes: u32,
}

impl Lookback {
    /// Window used when no usable component is given.
    pub const DEFAULT_MINUTES: u32 = 60;

    /// Build a window from optional hour and minute components.
    #[must_use]
    pub fn from_parts(hours: Option<u32>, minutes: Option<u32>) -> Self {
        let hours = hours.filter(|h| (1..=24).contains(h)).unwrap_or(0);
        let minutes = minutes.filter(|m| (1..=60).contains(m)).unwrap_or(0);

        let total = hours * 60 + minutes;
        Self {
            minutes: if total == 0 {
                Self::DEFAULT_MINUTES
            } else {
                total
            },
        }
    }

    /// Length of the window in minutes.
    #[must_use]
    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    /// Length of the window.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.minutes))
    }

    /// Oldest epoch second inside the window ending at `now`.
    #[must_use]
    pub fn oldest_from(&self, now: DateTime<Utc>) -> i64 {
        (now - self.duration()).timestamp()
    }

    /// Oldest epoch second inside the window ending now.
    #[must_use]
    pub fn oldest(&self) -> i64 {
        self.oldest_from(Utc::now())
    }
}

impl Default for Lookback {
    fn default() -> Self {
        Self {
            minutes: Self::DEFAULT_MINUTES,
        }
    }
}

/// Whole epoch seconds of a message timestamp such as `"1700000000.123456"`.
#[must_use]
pub fn ts_seconds(ts: &str) -> Option<i64> {
    let whole = ts.split('.').next()?;
    whole.trim().parse().ok()
}

/// Render epoch seconds as `YYYY-MM-DD HH:MM:SS` in UTC.
#[must_use]
pub fn format_epoch(secs: i64) -> String {
    match Utc.timestamp_opt(secs, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => secs.to_string(),
    }
}
