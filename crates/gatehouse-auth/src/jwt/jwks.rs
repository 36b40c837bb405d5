//! JWKS (JSON Web Key Set) fetching and caching
//!
//! The [`KeyResolver`] maps a token's `kid` to a verification key:
//!
//! - **Snapshots**: the parsed key set lives behind an [`ArcSwapOption`]; a
//!   refresh builds a whole new [`KeySet`] and swaps it in, so concurrent
//!   readers never observe a half-updated map.
//! - **Refresh on miss**: an unknown `kid` triggers one refetch (key rotation).
//! - **TTL**: a snapshot older than the cache TTL is refetched on next use; if
//!   the fetch fails, keys from the stale snapshot keep being served.
//! - **Single flight**: concurrent misses wait on one refresh lock and reuse
//!   the set fetched by whoever got there first. A failed fetch is shared the
//!   same way.
//! - **Rate limiting**: request-triggered refreshes are spaced by at least the
//!   minimum refresh interval, and a failure is reused for that long. An eager
//!   [`KeyResolver::prefetch`] does not count against the interval.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use arc_swap::{ArcSwap, ArcSwapOption};
use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::{JwkSet, KeyAlgorithm, PublicKeyUse};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::{AuthorizationConfig, check_key_source_uri};
use crate::error::{ConfigError, KeyResolutionError};

/// A public verification key taken from the key set
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    algorithm: Option<KeyAlgorithm>,
    key: DecodingKey,
}

impl SigningKey {
    /// Key identifier
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Algorithm advertised by the JWK, if any
    pub fn algorithm(&self) -> Option<KeyAlgorithm> {
        self.algorithm
    }

    /// Key material for signature verification
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }
}

// Key material stays out of logs
impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// One immutable generation of the key set
#[derive(Debug)]
pub struct KeySet {
    keys: HashMap<String, Arc<SigningKey>>,
    generation: u64,
    fetched_at: Instant,
}

impl KeySet {
    /// Parse a JWK set into usable signing keys
    ///
    /// Keys without a `kid`, encryption keys, and keys the decoder cannot
    /// use are skipped.
    pub fn from_jwk_set(jwks: &JwkSet, generation: u64) -> Self {
        let mut keys = HashMap::with_capacity(jwks.keys.len());

        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                debug!("Skipping JWK without kid");
                continue;
            };
            if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
                debug!(kid = %kid, "Skipping encryption JWK");
                continue;
            }
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    let signing_key = SigningKey {
                        kid: kid.clone(),
                        algorithm: jwk.common.key_algorithm,
                        key,
                    };
                    keys.insert(kid, Arc::new(signing_key));
                }
                Err(e) => {
                    warn!(kid = %kid, error = %e, "Skipping unusable JWK");
                }
            }
        }

        Self {
            keys,
            generation,
            fetched_at: Instant::now(),
        }
    }

    /// Look up a key by identifier
    pub fn get(&self, kid: &str) -> Option<Arc<SigningKey>> {
        self.keys.get(kid).map(Arc::clone)
    }

    /// Number of usable keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set holds no usable key
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Generation counter of this snapshot
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() >= ttl
    }
}

/// Where key sets come from
#[async_trait]
pub trait KeySource: Send + Sync + 'static {
    /// Fetch the current key set
    async fn fetch(&self) -> Result<JwkSet, KeyResolutionError>;

    /// Location of the key set, for logs
    fn uri(&self) -> &str;
}

/// Fetches the key set from a JWKS endpoint over HTTPS
#[derive(Debug, Clone)]
pub struct HttpKeySource {
    uri: String,
    client: reqwest::Client,
}

impl HttpKeySource {
    /// Create a source for `uri` with a per-request timeout
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the URI is not HTTPS (loopback hosts
    /// excepted) or the HTTP client cannot be built.
    pub fn new(uri: impl Into<String>, timeout: Duration) -> Result<Self, ConfigError> {
        let uri = uri.into();
        check_key_source_uri(&uri)?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { uri, client })
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch(&self) -> Result<JwkSet, KeyResolutionError> {
        info!(jwks_uri = %self.uri, "Fetching JWKS from endpoint");

        let response = self.client.get(&self.uri).send().await.map_err(|e| {
            error!(jwks_uri = %self.uri, error = %e, "Failed to fetch JWKS");
            KeyResolutionError::unavailable(&self.uri, e)
        })?;

        if !response.status().is_success() {
            error!(
                jwks_uri = %self.uri,
                status = %response.status(),
                "JWKS endpoint returned error status"
            );
            return Err(KeyResolutionError::unavailable(
                &self.uri,
                format!("status {}", response.status()),
            ));
        }

        response.json::<JwkSet>().await.map_err(|e| {
            error!(jwks_uri = %self.uri, error = %e, "Failed to parse JWKS JSON");
            KeyResolutionError::unavailable(&self.uri, format!("invalid JWKS format: {e}"))
        })
    }

    fn uri(&self) -> &str {
        &self.uri
    }
}

/// In-process key source, for embedding a fixed key set or driving rotation
/// without a network endpoint
#[derive(Debug)]
pub struct StaticKeySource {
    jwks: ArcSwap<JwkSet>,
    fetches: AtomicUsize,
}

impl StaticKeySource {
    /// Serve `jwks` until replaced
    pub fn new(jwks: JwkSet) -> Self {
        Self {
            jwks: ArcSwap::from_pointee(jwks),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Publish a new key set; resolvers see it on their next refresh
    pub fn replace(&self, jwks: JwkSet) {
        self.jwks.store(Arc::new(jwks));
    }

    /// How many times the set has been fetched
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn fetch(&self) -> Result<JwkSet, KeyResolutionError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(JwkSet::clone(&self.jwks.load()))
    }

    fn uri(&self) -> &str {
        "static"
    }
}

/// Bookkeeping guarded by the refresh lock
#[derive(Debug, Default)]
struct RefreshState {
    /// Start of the last request-triggered fetch; prefetches are not counted
    last_attempt: Option<Instant>,
    /// Most recent failed fetch, cleared by the next success
    last_failure: Option<(Instant, KeyResolutionError)>,
}

/// Resolves key identifiers to verification keys, caching the key set
///
/// # Example
///
/// ```rust,no_run
/// # use gatehouse_auth::{AuthorizationConfig, jwt::KeyResolver};
/// # tokio_test::block_on(async {
/// let config = AuthorizationConfig::new(
///     "https://tenant.example.com/.well-known/jwks.json",
///     "https://tenant.example.com/",
///     vec!["https://api.example.com".to_string()],
///     "read:messages",
/// );
/// let resolver = KeyResolver::from_config(&config)?;
/// let key = resolver.resolve("key-id-123").await?;
/// println!("resolved {}", key.kid());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
pub struct KeyResolver {
    source: Arc<dyn KeySource>,
    keys: ArcSwapOption<KeySet>,
    /// Serializes refreshes
    refresh_lock: Mutex<RefreshState>,
    next_generation: AtomicU64,
    cache_ttl: Duration,
    min_refresh_interval: Duration,
}

impl fmt::Debug for KeyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyResolver")
            .field("source", &self.source.uri())
            .field("generation", &self.generation())
            .field("cache_ttl", &self.cache_ttl)
            .field("min_refresh_interval", &self.min_refresh_interval)
            .finish()
    }
}

impl KeyResolver {
    /// Create a resolver over any key source
    ///
    /// Defaults: 10 minute cache TTL, 5 second minimum refresh interval.
    pub fn new(source: Arc<dyn KeySource>) -> Self {
        Self {
            source,
            keys: ArcSwapOption::empty(),
            refresh_lock: Mutex::new(RefreshState::default()),
            next_generation: AtomicU64::new(1),
            cache_ttl: Duration::from_secs(600),
            min_refresh_interval: Duration::from_secs(5),
        }
    }

    /// Create a resolver fetching from the configured JWKS endpoint
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the key source cannot be set up.
    pub fn from_config(config: &AuthorizationConfig) -> Result<Self, ConfigError> {
        let source = HttpKeySource::new(config.jwks_uri.clone(), config.fetch_timeout())?;
        Ok(Self::new(Arc::new(source))
            .with_cache_ttl(config.cache_ttl())
            .with_min_refresh_interval(config.min_refresh_interval()))
    }

    /// Set the key-set cache TTL
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the minimum spacing of miss-triggered refreshes
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Generation of the current snapshot, 0 before the first fetch
    pub fn generation(&self) -> u64 {
        self.snapshot().map_or(0, |set| set.generation())
    }

    /// The current snapshot, if any
    pub fn snapshot(&self) -> Option<Arc<KeySet>> {
        self.keys.load_full()
    }

    /// Fetch the key set now, ahead of the first request
    ///
    /// # Errors
    ///
    /// Returns [`KeyResolutionError::KeySourceUnavailable`] if the fetch fails.
    pub async fn prefetch(&self) -> Result<usize, KeyResolutionError> {
        let observed = self.snapshot().map(|set| set.generation());
        let set = self.refresh(observed, true).await?;
        Ok(set.len())
    }

    /// Resolve a key identifier to a verification key
    ///
    /// # Errors
    ///
    /// - [`KeyResolutionError::KeySourceUnavailable`] if a needed fetch fails
    ///   and no cached copy of the key exists
    /// - [`KeyResolutionError::KeyNotFound`] if the key is absent after refresh
    pub async fn resolve(&self, kid: &str) -> Result<Arc<SigningKey>, KeyResolutionError> {
        let current = self.keys.load_full();

        if let Some(set) = current.as_deref()
            && !set.is_expired(self.cache_ttl)
        {
            if let Some(key) = set.get(kid) {
                debug!(kid = %kid, generation = set.generation(), "Using cached signing key");
                return Ok(key);
            }
            debug!(kid = %kid, "Key ID not in cached JWKS, refreshing");
        }

        let observed = current.as_ref().map(|set| set.generation());
        match self.refresh(observed, false).await {
            Ok(set) => set.get(kid).ok_or_else(|| {
                warn!(kid = %kid, generation = set.generation(), "Key ID not found in JWKS");
                KeyResolutionError::KeyNotFound {
                    kid: kid.to_string(),
                }
            }),
            Err(e) => match current.as_ref().and_then(|set| set.get(kid)) {
                Some(key) => {
                    warn!(kid = %kid, error = %e, "JWKS refresh failed, serving stale key");
                    Ok(key)
                }
                None => Err(e),
            },
        }
    }

    /// Replace the snapshot with a freshly fetched key set
    ///
    /// `observed` is the generation the caller saw; if another task swapped in
    /// a newer one while we waited for the lock, that set is returned as is.
    /// A failure is handed to every task that queued behind the failing fetch,
    /// and request-triggered refreshes reuse it for `min_refresh_interval`, so
    /// an outage costs each request at most one fetch timeout.
    async fn refresh(
        &self,
        observed: Option<u64>,
        force: bool,
    ) -> Result<Arc<KeySet>, KeyResolutionError> {
        let requested_at = Instant::now();
        let mut state = self.refresh_lock.lock().await;
        let current = self.keys.load_full();

        if let Some(set) = current.as_ref()
            && Some(set.generation()) != observed
        {
            debug!(generation = set.generation(), "JWKS refreshed by another request");
            return Ok(Arc::clone(set));
        }

        if let Some((failed_at, error)) = state.last_failure.as_ref()
            && (*failed_at >= requested_at
                || (!force && failed_at.elapsed() < self.min_refresh_interval))
        {
            debug!(
                jwks_uri = %self.source.uri(),
                since_failure_ms = failed_at.elapsed().as_millis(),
                "Reusing recent JWKS fetch failure"
            );
            return Err(error.clone());
        }

        if !force
            && let Some(set) = current.as_ref()
            && !set.is_expired(self.cache_ttl)
            && let Some(at) = state.last_attempt
            && at.elapsed() < self.min_refresh_interval
        {
            warn!(
                jwks_uri = %self.source.uri(),
                since_last_ms = at.elapsed().as_millis(),
                "JWKS refresh rate limited, using cache"
            );
            return Ok(Arc::clone(set));
        }

        if !force {
            state.last_attempt = Some(Instant::now());
        }

        let jwks = match self.source.fetch().await {
            Ok(jwks) => jwks,
            Err(e) => {
                state.last_failure = Some((Instant::now(), e.clone()));
                return Err(e);
            }
        };
        state.last_failure = None;

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let set = Arc::new(KeySet::from_jwk_set(&jwks, generation));
        self.keys.store(Some(Arc::clone(&set)));

        info!(
            jwks_uri = %self.source.uri(),
            key_count = set.len(),
            generation,
            "JWKS cache updated"
        );

        Ok(set)
    }
}
