use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Actions throttled by the rate limiter
///
/// Each action has its own `(limit, window)` rule in configuration and its own
/// key namespace, so exhausting the login budget never blocks uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitAction {
    Login,
    Register,
    Upload,
}

impl RateLimitAction {
    pub const ALL: [RateLimitAction; 3] = [
        RateLimitAction::Login,
        RateLimitAction::Register,
        RateLimitAction::Upload,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitAction::Login => "login",
            RateLimitAction::Register => "register",
            RateLimitAction::Upload => "upload",
        }
    }
}

impl FromStr for RateLimitAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "login" => Ok(RateLimitAction::Login),
            "register" | "registration" => Ok(RateLimitAction::Register),
            "upload" => Ok(RateLimitAction::Upload),
            _ => Err(anyhow::anyhow!("Invalid rate limit action: {}", s)),
        }
    }
}

impl Display for RateLimitAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Compose the bucket key for an action and a client identifier,
/// e.g. `login:203.0.113.4`.
pub fn rate_limit_key(action: RateLimitAction, client: &str) -> String {
    format!("{}:{}", action, client)
}
