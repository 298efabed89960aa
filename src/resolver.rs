//! Name resolution strategies.
//!
//! Two resolvers implement the same [`NameResolver`] contract:
//!
//! - [`CachingResolver`] queries one upstream server and caches results.
//!   Concurrent callers for the same uncached name share a single
//!   in-flight upstream attempt.
//! - [`TunnelResolver`] walks an ordered list of servers reachable through
//!   a tunnel, returning the first success. No caching; every call
//!   re-resolves from scratch.
//!
//! The lookup itself is delegated to a [`NameLookup`]; resolvers only
//! decide when to ask, which server to ask, and how long to wait.

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::broadcast;

use crate::cache::{AddrCache, DEFAULT_MAX_ENTRIES};
use crate::context::ResolveContext;
use crate::error::{Error, Result};
use crate::lookup::NameLookup;

/// Default per-lookup timeout.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time a resolved address stays cached.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Maps a name to one IP address, honoring cancellation.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Resolve `name` to a single address, or fail with a typed error.
    async fn resolve(&self, ctx: &ResolveContext, name: &str) -> Result<IpAddr>;
}

type Outcome = Result<IpAddr>;
type InflightMap = FxHashMap<String, broadcast::Sender<Outcome>>;

/// Caching resolver bound to one upstream DNS server.
pub struct CachingResolver {
    lookup: Arc<dyn NameLookup>,
    server: SocketAddr,
    timeout: Duration,
    cache_ttl: Duration,
    cache: Arc<AddrCache>,
    inflight: Arc<Mutex<InflightMap>>,
}

impl CachingResolver {
    /// Create a resolver querying `server` through `lookup`.
    ///
    /// A zero `timeout` selects [`DEFAULT_LOOKUP_TIMEOUT`]; the cache TTL
    /// defaults to [`DEFAULT_CACHE_TTL`].
    pub fn new(lookup: Arc<dyn NameLookup>, server: SocketAddr, timeout: Duration) -> Self {
        let timeout = if timeout.is_zero() {
            DEFAULT_LOOKUP_TIMEOUT
        } else {
            timeout
        };
        Self {
            lookup,
            server,
            timeout,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Arc::new(AddrCache::new(DEFAULT_MAX_ENTRIES)),
            inflight: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    /// Override the per-lookup timeout. Zero means unbounded.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override how long resolved addresses stay cached.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Override the maximum number of cached names.
    pub fn with_cache_capacity(mut self, max_entries: usize) -> Self {
        self.cache = Arc::new(AddrCache::new(max_entries));
        self
    }

    /// Drop every cached address.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Join the in-flight attempt for `name`, or launch one.
    ///
    /// At most one upstream attempt per name exists at any instant; every
    /// caller that arrives while it runs subscribes to the same outcome.
    fn join_or_launch(&self, name: &str) -> Joined {
        let mut inflight = self.inflight.lock();
        if let Some(tx) = inflight.get(name) {
            return Joined::Pending(tx.subscribe());
        }

        // An attempt that settled between the caller's cache miss and this
        // point stored its result before leaving the registry, so a second
        // cache check here sees it instead of launching a duplicate.
        if let Some(addr) = self.cache.lookup(name) {
            return Joined::Hit(addr);
        }

        let (tx, rx) = broadcast::channel(1);
        inflight.insert(name.to_string(), tx.clone());

        // The attempt is detached from its callers: it runs to completion
        // even if every one of them cancels, so a late success still fills
        // the cache, and the buffered channel absorbs an outcome nobody is
        // waiting for. The registry entry is removed before the outcome is
        // sent so a caller arriving after settlement starts fresh.
        let lookup = self.lookup.clone();
        let cache = self.cache.clone();
        let registry = self.inflight.clone();
        let server = self.server;
        let timeout = self.timeout;
        let cache_ttl = self.cache_ttl;
        let name = name.to_string();
        tokio::spawn(async move {
            let outcome = match bounded(timeout, lookup.lookup_ip(server, &name)).await {
                Ok(addrs) => match addrs.first() {
                    Some(addr) => Ok(*addr),
                    None => Err(Error::NoAddress(name.clone())),
                },
                Err(e) => Err(e),
            };

            if let Ok(addr) = outcome {
                cache.store(&name, addr, cache_ttl);
            }

            registry.lock().remove(&name);
            let _ = tx.send(outcome);
        });

        Joined::Pending(rx)
    }
}

enum Joined {
    Hit(IpAddr),
    Pending(broadcast::Receiver<Outcome>),
}

#[async_trait]
impl NameResolver for CachingResolver {
    async fn resolve(&self, ctx: &ResolveContext, name: &str) -> Result<IpAddr> {
        if let Some(addr) = self.cache.lookup(name) {
            log::debug!("cache hit for {name}");
            return Ok(addr);
        }
        log::debug!("cache miss for {name}");

        let mut rx = match self.join_or_launch(name) {
            Joined::Hit(addr) => return Ok(addr),
            Joined::Pending(rx) => rx,
        };
        tokio::select! {
            _ = ctx.cancelled() => Err(Error::Cancelled),
            outcome = rx.recv() => {
                outcome.unwrap_or_else(|_| Err(Error::Lookup("lookup attempt went away".into())))
            }
        }
    }
}

/// Resolver that walks an ordered list of DNS servers reachable through a
/// tunnel, returning the first success.
pub struct TunnelResolver {
    lookup: Arc<dyn NameLookup>,
    servers: Vec<SocketAddr>,
    timeout: Duration,
}

impl std::fmt::Debug for TunnelResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunnelResolver")
            .field("servers", &self.servers)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TunnelResolver {
    /// Create a resolver trying `servers` in order through `lookup`.
    ///
    /// `timeout` bounds each server's attempt; zero means unbounded. The
    /// server list must not be empty.
    pub fn new(
        lookup: Arc<dyn NameLookup>,
        servers: Vec<SocketAddr>,
        timeout: Duration,
    ) -> Result<Self> {
        if servers.is_empty() {
            return Err(Error::Config("no DNS servers configured".into()));
        }
        Ok(Self {
            lookup,
            servers,
            timeout,
        })
    }
}

#[async_trait]
impl NameResolver for TunnelResolver {
    async fn resolve(&self, ctx: &ResolveContext, name: &str) -> Result<IpAddr> {
        let mut last_err: Option<Error> = None;

        for &server in &self.servers {
            if ctx.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let outcome = tokio::select! {
                _ = ctx.cancelled() => return Err(Error::Cancelled),
                outcome = bounded(self.timeout, self.lookup.lookup_ip(server, name)) => outcome,
            };

            match outcome {
                Ok(addrs) => match addrs.first() {
                    Some(addr) => return Ok(*addr),
                    None => last_err = Some(Error::NoAddress(name.to_string())),
                },
                Err(e) => {
                    log::debug!("DNS server {server} failed for {name}: {e}");
                    last_err = Some(e);
                }
            }
        }

        // Only the most recent cause is kept; earlier servers' failures
        // are dropped.
        let cause = last_err.unwrap_or_else(|| Error::NoAddress(name.to_string()));
        Err(Error::AllServersFailed(Box::new(cause)))
    }
}

/// Await `fut`, bounded by `timeout` unless it is zero.
async fn bounded<F>(timeout: Duration, fut: F) -> Result<Vec<IpAddr>>
where
    F: Future<Output = Result<Vec<IpAddr>>>,
{
    if timeout.is_zero() {
        return fut.await;
    }
    match tokio::time::timeout(timeout, fut).await {
        Ok(outcome) => outcome,
        Err(_) => Err(Error::TimedOut(timeout)),
    }
}
