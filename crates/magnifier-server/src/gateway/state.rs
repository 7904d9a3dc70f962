use std::sync::Arc;
use std::time::{Duration, Instant};

use magnifier::admin::ScriptRunner;
use magnifier::cache::CacheAccessor;
use magnifier::constants::DEFAULT_CACHE_TTL_SECS;
use magnifier::keys::KeyRotator;
use magnifier::upstream::UpstreamClient;

#[derive(Clone)]
pub struct HandlerState {
    pub cache: CacheAccessor,

    pub upstream: UpstreamClient,

    pub rotator: Arc<KeyRotator>,

    pub scripts: Arc<ScriptRunner>,

    /// `None` rejects every admin request.
    pub admin_token: Option<Arc<str>>,

    pub cache_ttl: Duration,

    pub started_at: Instant,
}

impl HandlerState {
    pub fn new(
        cache: CacheAccessor,
        upstream: UpstreamClient,
        rotator: Arc<KeyRotator>,
        scripts: Arc<ScriptRunner>,
    ) -> Self {
        Self {
            cache,
            upstream,
            rotator,
            scripts,
            admin_token: None,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            started_at: Instant::now(),
        }
    }

    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin_token = token.map(Arc::from);
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}
