//! Configuration module
//!
//! This module provides the configuration for upload validation, per-action rate
//! limits and telemetry. Values come from the process environment (optionally
//! seeded from a `.env` file); every setting has a default so development and
//! tests need no environment at all.

use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::action::RateLimitAction;

// Common constants
const MAX_CONTENT_LENGTH_MB: u64 = 10;
const DEFAULT_ALLOWED_EXTENSIONS: &str = "png,jpg,jpeg,gif,mp4,mov";
const DEFAULT_UPLOAD_FOLDER: &str = "instance/uploads";
const LOGIN_RATE_LIMIT: u32 = 5;
const REGISTER_RATE_LIMIT: u32 = 10;
const UPLOAD_RATE_LIMIT: u32 = 30;
const RATE_WINDOW_SECS: u64 = 900;
const RATE_LIMITER_SHARD_COUNT: usize = 16;
const DEFAULT_LOG_FILTER: &str = "questlab=debug";

/// A `(limit, window)` pair for one throttled action
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitRule {
    pub limit: u32,
    pub window_secs: u64,
}

impl RateLimitRule {
    pub const fn new(limit: u32, window_secs: u64) -> Self {
        Self { limit, window_secs }
    }
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct QuestlabConfig {
    pub environment: String,
    pub upload_folder: PathBuf,
    pub max_content_length_bytes: u64,
    /// Lowercased extensions without the leading dot
    pub allowed_extensions: BTreeSet<String>,
    pub login_rate_limit: RateLimitRule,
    pub register_rate_limit: RateLimitRule,
    pub upload_rate_limit: RateLimitRule,
    pub rate_limiter_shard_count: usize,
    pub log_filter: String,
}

impl Default for QuestlabConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            upload_folder: PathBuf::from(DEFAULT_UPLOAD_FOLDER),
            max_content_length_bytes: MAX_CONTENT_LENGTH_MB * 1024 * 1024,
            allowed_extensions: parse_extensions(DEFAULT_ALLOWED_EXTENSIONS),
            login_rate_limit: RateLimitRule::new(LOGIN_RATE_LIMIT, RATE_WINDOW_SECS),
            register_rate_limit: RateLimitRule::new(REGISTER_RATE_LIMIT, RATE_WINDOW_SECS),
            upload_rate_limit: RateLimitRule::new(UPLOAD_RATE_LIMIT, RATE_WINDOW_SECS),
            rate_limiter_shard_count: RATE_LIMITER_SHARD_COUNT,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl QuestlabConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or(defaults.environment);

        let max_content_length_mb = env_number("MAX_CONTENT_LENGTH_MB", MAX_CONTENT_LENGTH_MB)?;

        let allowed_extensions = parse_extensions(
            &env::var("ALLOWED_EXTENSIONS")
                .unwrap_or_else(|_| DEFAULT_ALLOWED_EXTENSIONS.to_string()),
        );

        let config = QuestlabConfig {
            environment,
            upload_folder: env::var("UPLOAD_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_folder),
            max_content_length_bytes: megabytes_to_bytes(max_content_length_mb)?,
            allowed_extensions,
            login_rate_limit: rule_from_env("LOGIN", defaults.login_rate_limit)?,
            register_rate_limit: rule_from_env("REGISTER", defaults.register_rate_limit)?,
            upload_rate_limit: rule_from_env("UPLOAD", defaults.upload_rate_limit)?,
            rate_limiter_shard_count: env_number(
                "RATE_LIMITER_SHARD_COUNT",
                RATE_LIMITER_SHARD_COUNT,
            )?,
            log_filter: env::var("LOG_FILTER").unwrap_or(defaults.log_filter),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_EXTENSIONS must not be empty"));
        }
        if self.max_content_length_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_CONTENT_LENGTH_MB must be greater than 0"));
        }
        if self.rate_limiter_shard_count == 0 {
            return Err(anyhow::anyhow!(
                "RATE_LIMITER_SHARD_COUNT must be greater than 0"
            ));
        }
        for action in RateLimitAction::ALL {
            let rule = self.rate_limit(action);
            if rule.limit == 0 || rule.window_secs == 0 {
                return Err(anyhow::anyhow!(
                    "Rate limit for '{}' needs a positive limit and window",
                    action
                ));
            }
        }
        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn rate_limit(&self, action: RateLimitAction) -> RateLimitRule {
        match action {
            RateLimitAction::Login => self.login_rate_limit,
            RateLimitAction::Register => self.register_rate_limit,
            RateLimitAction::Upload => self.upload_rate_limit,
        }
    }
}

fn parse_extensions(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(|s| s.trim().trim_start_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn megabytes_to_bytes(mb: u64) -> Result<u64, anyhow::Error> {
    mb.checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("MAX_CONTENT_LENGTH_MB is too large"))
}

/// Unset means `default`; a value that does not parse is an error.
fn parse_number<T: FromStr>(
    name: &str,
    raw: Option<String>,
    default: T,
) -> Result<T, anyhow::Error> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number", name)),
    }
}

fn env_number<T: FromStr>(name: &str, default: T) -> Result<T, anyhow::Error> {
    parse_number(name, env::var(name).ok(), default)
}

fn rule_from_env(prefix: &str, fallback: RateLimitRule) -> Result<RateLimitRule, anyhow::Error> {
    let limit = env_number(&format!("{}_RATE_LIMIT", prefix), fallback.limit)?;
    let window_secs = env_number(&format!("{}_RATE_WINDOW_SECS", prefix), fallback.window_secs)?;
    Ok(RateLimitRule::new(limit, window_secs))
}
