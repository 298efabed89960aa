//! The DNS lookup primitive used by both resolvers.
//!
//! Resolvers never see DNS wire format; they only consume [`NameLookup`],
//! which turns a name into zero or more addresses by querying one server.
//! [`WireLookup`] is the production implementation: it speaks standard DNS
//! over whatever [`Dialer`] it was given, so the same code queries an
//! upstream server on the host network or a server that is only reachable
//! through a tunnel.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{Name, RData, RecordType};

use crate::error::{Error, Result};
use crate::transport::{Dialer, HostDialer, MAX_DNS_PACKET_SIZE};

/// Resolves a name to its addresses by querying a single DNS server.
#[async_trait]
pub trait NameLookup: Send + Sync {
    /// Query `server` for the addresses of `name`.
    ///
    /// An empty result is a successful lookup that yielded no candidates;
    /// callers decide how to treat it.
    async fn lookup_ip(&self, server: SocketAddr, name: &str) -> Result<Vec<IpAddr>>;
}

/// Standard DNS lookups over a dialed datagram transport.
///
/// Queries A and AAAA concurrently and returns IPv4 candidates first.
pub struct WireLookup {
    dialer: Arc<dyn Dialer>,
}

impl WireLookup {
    pub fn new(dialer: Arc<dyn Dialer>) -> Self {
        Self { dialer }
    }

    /// Lookup over the host network.
    pub fn host() -> Self {
        Self::new(Arc::new(HostDialer))
    }

    async fn query(&self, server: SocketAddr, name: &str, rtype: RecordType) -> Result<Vec<IpAddr>> {
        let id: u16 = rand::random();
        let query = build_query(id, name, rtype)?;

        let conn = self
            .dialer
            .dial(server)
            .await
            .map_err(|e| Error::Lookup(format!("dial {server} failed: {e}")))?;

        conn.send(&query)
            .await
            .map_err(|e| Error::Lookup(format!("send to {server} failed: {e}")))?;

        let mut buf = vec![0u8; MAX_DNS_PACKET_SIZE];
        let len = conn
            .recv(&mut buf)
            .await
            .map_err(|e| Error::Lookup(format!("receive from {server} failed: {e}")))?;

        parse_answers(id, &buf[..len])
    }
}

#[async_trait]
impl NameLookup for WireLookup {
    async fn lookup_ip(&self, server: SocketAddr, name: &str) -> Result<Vec<IpAddr>> {
        let (v4, v6) = futures::future::join(
            self.query(server, name, RecordType::A),
            self.query(server, name, RecordType::AAAA),
        )
        .await;

        // One family failing is tolerable as long as the other answered.
        match (v4, v6) {
            (Ok(mut addrs), Ok(more)) => {
                addrs.extend(more);
                Ok(addrs)
            }
            (Ok(addrs), Err(_)) => Ok(addrs),
            (Err(_), Ok(addrs)) => Ok(addrs),
            (Err(e), Err(_)) => Err(e),
        }
    }
}

fn build_query(id: u16, name: &str, rtype: RecordType) -> Result<Vec<u8>> {
    let qname =
        Name::from_str(name).map_err(|e| Error::Lookup(format!("invalid name '{name}': {e}")))?;

    let mut message = Message::new();
    message.set_id(id);
    message.set_message_type(MessageType::Query);
    message.set_op_code(OpCode::Query);
    message.set_recursion_desired(true);
    message.add_query(Query::query(qname, rtype));

    message
        .to_vec()
        .map_err(|e| Error::Lookup(format!("failed to encode query: {e}")))
}

fn parse_answers(id: u16, data: &[u8]) -> Result<Vec<IpAddr>> {
    let message =
        Message::from_vec(data).map_err(|e| Error::Lookup(format!("invalid response: {e}")))?;

    if message.id() != id {
        return Err(Error::Lookup("response id mismatch".into()));
    }
    if message.response_code() != ResponseCode::NoError {
        return Err(Error::Lookup(format!(
            "server returned {}",
            message.response_code()
        )));
    }

    Ok(message
        .answers()
        .iter()
        .filter_map(|record| match record.data() {
            Some(RData::A(a)) => Some(IpAddr::V4(a.0)),
            Some(RData::AAAA(aaaa)) => Some(IpAddr::V6(aaaa.0)),
            _ => None,
        })
        .collect())
}
