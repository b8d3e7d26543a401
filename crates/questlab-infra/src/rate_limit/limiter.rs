use std::sync::Arc;

use questlab_core::{rate_limit_key, AppError, QuestlabConfig, RateLimitAction, RateLimitRule};

use super::clock::{Clock, SystemClock};
use super::store::{InMemoryStore, RateLimitStore};

/// Key-based sliding-window limiter
///
/// Never fails: an exhausted budget is reported as `false` / `0` and the caller
/// decides what the client sees.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// In-memory store on the wall clock.
    pub fn in_memory(shard_count: usize) -> Self {
        Self::new(
            Arc::new(InMemoryStore::with_shards(shard_count)),
            Arc::new(SystemClock),
        )
    }

    /// Record an attempt for `key` if fewer than `limit` attempts fall inside the
    /// trailing window. A denied attempt is not recorded.
    pub fn check(&self, key: &str, limit: u32, window_secs: u64) -> bool {
        let allowed = self
            .store
            .try_acquire(key, limit, window_secs, self.clock.now());
        if !allowed {
            tracing::warn!(
                key = %key,
                limit = limit,
                window_secs = window_secs,
                "Rate limit exceeded"
            );
        }
        allowed
    }

    /// Record a failure regardless of any limit and return the in-window count,
    /// including this one.
    pub fn record_failure(&self, key: &str, window_secs: u64) -> u32 {
        let count = self.store.append(key, window_secs, self.clock.now());
        tracing::debug!(key = %key, count = count, window_secs = window_secs, "Recorded failure");
        count
    }

    /// Attempts left in the current window, clamped at zero. Records nothing.
    pub fn remaining(&self, key: &str, limit: u32, window_secs: u64) -> u32 {
        limit.saturating_sub(self.store.count(key, window_secs, self.clock.now()))
    }
}

/// Limiter bound to the configured rule of each [`RateLimitAction`]
///
/// Keys are composed as `"{action}:{client}"`.
#[derive(Clone)]
pub struct ActionRateLimiter {
    limiter: RateLimiter,
    login: RateLimitRule,
    register: RateLimitRule,
    upload: RateLimitRule,
}

impl ActionRateLimiter {
    pub fn new(limiter: RateLimiter, config: &QuestlabConfig) -> Self {
        Self {
            limiter,
            login: config.rate_limit(RateLimitAction::Login),
            register: config.rate_limit(RateLimitAction::Register),
            upload: config.rate_limit(RateLimitAction::Upload),
        }
    }

    /// In-memory limiter sized from configuration.
    pub fn from_config(config: &QuestlabConfig) -> Self {
        Self::new(RateLimiter::in_memory(config.rate_limiter_shard_count), config)
    }

    pub fn rule(&self, action: RateLimitAction) -> RateLimitRule {
        match action {
            RateLimitAction::Login => self.login,
            RateLimitAction::Register => self.register,
            RateLimitAction::Upload => self.upload,
        }
    }

    pub fn check(&self, action: RateLimitAction, client: &str) -> bool {
        let rule = self.rule(action);
        self.limiter
            .check(&rate_limit_key(action, client), rule.limit, rule.window_secs)
    }

    /// Like [`check`](Self::check) but maps exhaustion to
    /// [`AppError::TooManyRequests`].
    pub fn enforce(&self, action: RateLimitAction, client: &str) -> Result<(), AppError> {
        if self.check(action, client) {
            Ok(())
        } else {
            Err(AppError::TooManyRequests {
                action,
                window_secs: self.rule(action).window_secs,
            })
        }
    }

    pub fn remaining(&self, action: RateLimitAction, client: &str) -> u32 {
        let rule = self.rule(action);
        self.limiter
            .remaining(&rate_limit_key(action, client), rule.limit, rule.window_secs)
    }

    pub fn record_failure(&self, action: RateLimitAction, client: &str) -> u32 {
        let rule = self.rule(action);
        self.limiter
            .record_failure(&rate_limit_key(action, client), rule.window_secs)
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}
