//! End-to-end resolution tests through the public API.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;

use burrow::{
    CachingResolver, Datagram, Dialer, Error, NameLookup, NameResolver, ResolveContext, Result,
    TunnelResolver, WireLookup,
};

/// Derives a stable per-name address, so cross-key corruption is visible.
struct PerNameLookup {
    calls: AtomicUsize,
}

fn addr_for(name: &str) -> IpAddr {
    let index: u32 = name
        .strip_prefix("host-")
        .and_then(|rest| rest.strip_suffix(".example.com"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0);
    IpAddr::V4(Ipv4Addr::new(10, 0, (index >> 8) as u8, (index & 0xff) as u8))
}

#[async_trait]
impl NameLookup for PerNameLookup {
    async fn lookup_ip(&self, _server: SocketAddr, name: &str) -> Result<Vec<IpAddr>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1)).await;
        Ok(vec![addr_for(name)])
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_callers_never_receive_another_names_address() {
    let lookup = Arc::new(PerNameLookup {
        calls: AtomicUsize::new(0),
    });
    let resolver = Arc::new(CachingResolver::new(
        lookup.clone(),
        "10.0.0.1:53".parse().unwrap(),
        Duration::from_secs(5),
    ));

    let names: Vec<String> = (0..100).map(|i| format!("host-{i}.example.com")).collect();

    let callers: Vec<_> = (0..50)
        .map(|_| {
            let resolver = resolver.clone();
            let names = names.clone();
            tokio::spawn(async move {
                let ctx = ResolveContext::new();
                for name in &names {
                    let resolved = resolver.resolve(&ctx, name).await.unwrap();
                    assert_eq!(resolved, addr_for(name), "wrong address for {name}");
                }
            })
        })
        .collect();

    for caller in join_all(callers).await {
        caller.unwrap();
    }

    // Coalescing plus the cache keep the upstream attempts at one per name.
    assert_eq!(lookup.calls.load(Ordering::SeqCst), 100);
}

/// Dialer whose first server is unreachable and whose second answers
/// every query with a fixed A record.
struct FlakyTunnel {
    dead: SocketAddr,
    answer: Ipv4Addr,
    dialed: Mutex<Vec<SocketAddr>>,
}

struct AnswerConn {
    answer: Ipv4Addr,
    pending: Mutex<Option<Vec<u8>>>,
}

#[async_trait]
impl Dialer for FlakyTunnel {
    async fn dial(&self, server: SocketAddr) -> io::Result<Box<dyn Datagram>> {
        self.dialed.lock().unwrap().push(server);
        if server == self.dead {
            return Err(io::Error::new(io::ErrorKind::HostUnreachable, "no route"));
        }
        Ok(Box::new(AnswerConn {
            answer: self.answer,
            pending: Mutex::new(None),
        }))
    }
}

#[async_trait]
impl Datagram for AnswerConn {
    async fn send(&self, buf: &[u8]) -> io::Result<usize> {
        use hickory_proto::op::{Message, MessageType, ResponseCode};
        use hickory_proto::rr::rdata::A;
        use hickory_proto::rr::{RData, Record, RecordType};

        let query = Message::from_vec(buf).unwrap();
        let question = query.queries()[0].clone();

        let mut response = Message::new();
        response.set_id(query.id());
        response.set_message_type(MessageType::Response);
        response.set_response_code(ResponseCode::NoError);
        if question.query_type() == RecordType::A {
            response.add_answer(Record::from_rdata(
                question.name().clone(),
                300,
                RData::A(A(self.answer)),
            ));
        }

        *self.pending.lock().unwrap() = Some(response.to_vec().unwrap());
        Ok(buf.len())
    }

    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        let response = self.pending.lock().unwrap().take().unwrap();
        buf[..response.len()].copy_from_slice(&response);
        Ok(response.len())
    }
}

#[tokio::test]
async fn tunnel_resolver_fails_over_to_a_reachable_server() {
    let dead: SocketAddr = "10.64.0.1:53".parse().unwrap();
    let alive: SocketAddr = "10.64.0.2:53".parse().unwrap();
    let answer = Ipv4Addr::new(93, 184, 216, 34);

    let tunnel = Arc::new(FlakyTunnel {
        dead,
        answer,
        dialed: Mutex::new(Vec::new()),
    });
    let resolver = TunnelResolver::new(
        Arc::new(WireLookup::new(tunnel.clone())),
        vec![dead, alive],
        Duration::from_secs(2),
    )
    .unwrap();

    let ctx = ResolveContext::new();
    let resolved = resolver.resolve(&ctx, "example.com").await.unwrap();

    assert_eq!(resolved, IpAddr::V4(answer));
    let dialed = tunnel.dialed.lock().unwrap().clone();
    assert_eq!(dialed[0], dead, "dead server must be attempted first");
    assert!(dialed.contains(&alive));
}

#[tokio::test]
async fn deadline_context_cancels_resolution() {
    struct NeverAnswers;

    #[async_trait]
    impl NameLookup for NeverAnswers {
        async fn lookup_ip(&self, _server: SocketAddr, _name: &str) -> Result<Vec<IpAddr>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![])
        }
    }

    let resolver = CachingResolver::new(
        Arc::new(NeverAnswers),
        "10.0.0.1:53".parse().unwrap(),
        Duration::ZERO,
    )
    .with_lookup_timeout(Duration::ZERO);

    let ctx = ResolveContext::with_deadline(Duration::from_millis(30));
    let err = resolver.resolve(&ctx, "example.com").await.unwrap_err();

    assert!(matches!(err, Error::Cancelled));
}
