//! Loopback stand-ins for real SSDP and mDNS devices.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dns_parser::{Packet, QueryType};
use socket2::{Domain, Socket, Type};
use sonar_common::config::Config;
use sonar_common::network::interface::Interface;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

pub const RUN_TIME: Duration = Duration::from_millis(750);

pub fn loopback() -> Interface {
    Interface::new("lo", 1, vec!["127.0.0.1/8".parse().unwrap()])
}

/// An interface whose address is not configured on this host, so binding fails.
pub fn unbindable() -> Interface {
    Interface::new("bogus0", 99, vec!["192.0.2.123/24".parse().unwrap()])
}

/// A config with every protocol off and a short time limit.
pub fn quiet_config() -> Config {
    Config {
        ssdp: false,
        mdns: false,
        passive: false,
        duration: Some(RUN_TIME),
        ..Config::default()
    }
}

pub struct Responder {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl Drop for Responder {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Answers every M-SEARCH with `replies` copies of a response carrying `server`,
/// spaced `gap` apart.
pub async fn ssdp_responder(server: &'static str, replies: usize, gap: Duration) -> Responder {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let mut buf = [0u8; 2048];
        loop {
            let Ok((n, peer)) = socket.recv_from(&mut buf).await else {
                return;
            };
            if !buf[..n].starts_with(b"M-SEARCH * HTTP/1.1\r\n") {
                continue;
            }
            let reply = format!(
                "HTTP/1.1 200 OK\r\n\
                 CACHE-CONTROL: max-age=1800\r\n\
                 ST: upnp:rootdevice\r\n\
                 SERVER: {server}\r\n\
                 \r\n"
            );
            for i in 0..replies {
                if i > 0 {
                    tokio::time::sleep(gap).await;
                }
                let _ = socket.send_to(reply.as_bytes(), peer).await;
            }
        }
    });
    Responder { addr, handle }
}

/// Answers every M-SEARCH with a stream of distinct responses until aborted.
pub async fn ssdp_flood() -> Responder {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let mut buf = [0u8; 2048];
        let Ok((_, peer)) = socket.recv_from(&mut buf).await else {
            return;
        };
        for i in 0u64.. {
            let reply = format!("HTTP/1.1 200 OK\r\nSERVER: dev{i}\r\n\r\n");
            let _ = socket.send_to(reply.as_bytes(), peer).await;
            tokio::task::yield_now().await;
        }
    });
    Responder { addr, handle }
}

/// A loopback multicast sender for exercising passive listeners.
pub fn multicast_sender() -> std::net::UdpSocket {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, None).unwrap();
    socket.set_multicast_if_v4(&Ipv4Addr::LOCALHOST).unwrap();
    socket.set_multicast_loop_v4(true).unwrap();
    socket
        .bind(&SocketAddr::from((Ipv4Addr::LOCALHOST, 0)).into())
        .unwrap();
    socket.into()
}

/// A port nothing is bound to right now.
pub fn free_port() -> u16 {
    std::net::UdpSocket::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Counts ERROR events emitted on this thread while the guard lives.
pub struct ErrorCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

pub fn count_errors() -> (Arc<AtomicUsize>, DefaultGuard) {
    let errors = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(ErrorCounter(errors.clone()));
    (errors, tracing::subscriber::set_default(subscriber))
}

/// Answers every PTR question for `service` with one PTR record pointing at `target`.
pub async fn mdns_responder(service: &'static str, target: &'static str) -> Responder {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let mut buf = [0u8; 2048];
        loop {
            let Ok((n, peer)) = socket.recv_from(&mut buf).await else {
                return;
            };
            let asks_for_service = Packet::parse(&buf[..n]).is_ok_and(|packet| {
                packet.questions.iter().any(|q| {
                    q.qtype == QueryType::PTR
                        && q.prefer_unicast
                        && format!("{}.", q.qname) == service
                })
            });
            if asks_for_service {
                let _ = socket.send_to(&ptr_response(service, target), peer).await;
            }
        }
    });
    Responder { addr, handle }
}

fn encode_name(name: &str, out: &mut Vec<u8>) {
    for label in name.trim_end_matches('.').split('.') {
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
}

pub fn ptr_response(owner: &str, target: &str) -> Vec<u8> {
    let mut msg: Vec<u8> = vec![0, 0, 0x84, 0x00, 0, 0, 0, 1, 0, 0, 0, 0];
    encode_name(owner, &mut msg);
    msg.extend_from_slice(&12u16.to_be_bytes());
    msg.extend_from_slice(&1u16.to_be_bytes());
    msg.extend_from_slice(&120u32.to_be_bytes());
    let mut rdata = Vec::new();
    encode_name(target, &mut rdata);
    msg.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    msg.extend_from_slice(&rdata);
    msg
}

pub fn lines(sink: Vec<u8>) -> Vec<String> {
    String::from_utf8(sink)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
