//! burrow - DNS resolution for tunneled network clients.
//!
//! Two resolvers share one contract, [`NameResolver`]: turn a domain name
//! into a single IP address, honoring cancellation.
//!
//! - [`CachingResolver`] queries one upstream DNS server directly and
//!   caches results with a fixed TTL. Concurrent callers for the same
//!   uncached name share a single upstream attempt.
//! - [`TunnelResolver`] tries an ordered list of DNS servers that are only
//!   reachable through an already-established tunnel, returning the first
//!   success.
//!
//! The actual DNS exchange is behind [`NameLookup`]; the shipped
//! [`WireLookup`] speaks standard DNS over any [`Dialer`], so pointing the
//! same resolver at a tunnel is a matter of supplying a dialer backed by
//! the tunnel's network stack.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use burrow::{CachingResolver, NameResolver, ResolveContext, WireLookup, parse_server_addr};
//!
//! # async fn example() -> burrow::Result<()> {
//! let upstream = parse_server_addr("8.8.8.8")?;
//! let resolver = CachingResolver::new(
//!     Arc::new(WireLookup::host()),
//!     upstream,
//!     Duration::from_secs(5),
//! );
//!
//! let ctx = ResolveContext::new();
//! let addr = resolver.resolve(&ctx, "example.com").await?;
//! # let _ = addr;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod lookup;
pub mod resolver;
pub mod transport;

pub use cache::AddrCache;
pub use config::parse_server_addr;
pub use context::ResolveContext;
pub use error::{Error, Result};
pub use lookup::{NameLookup, WireLookup};
pub use resolver::{CachingResolver, NameResolver, TunnelResolver};
pub use transport::{Datagram, Dialer, HostDialer};
