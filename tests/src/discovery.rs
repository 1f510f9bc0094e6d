use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::Ordering;
use std::time::Duration;

use sonar_common::network::target::Protocol;
use sonar_core::discovery::{self, DiscoverySummary};
use sonar_core::reporter::render;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::support::{self, count_errors, lines, loopback, quiet_config, unbindable};

const DEADLINE: Duration = Duration::from_secs(10);

async fn run(
    interfaces: &[sonar_common::network::interface::Interface],
    cfg: &sonar_common::config::Config,
) -> (DiscoverySummary, Vec<String>) {
    let (summary, sink) = timeout(
        DEADLINE,
        discovery::run(interfaces, cfg, Vec::new(), &CancellationToken::new()),
    )
    .await
    .expect("discovery did not stop")
    .expect("discovery failed");
    (summary, lines(sink))
}

#[tokio::test]
async fn mdns_ptr_answer_is_printed_once() {
    let responder = support::mdns_responder("_http._tcp.local.", "host.local.").await;
    let mut cfg = quiet_config();
    cfg.mdns = true;
    cfg.mdns_targets.v4 = responder.addr;

    let (errors, _guard) = count_errors();
    let (summary, printed) = run(&[loopback()], &cfg).await;

    let expected = render(
        "127.0.0.1".parse().unwrap(),
        Protocol::Mdns,
        "_http._tcp.local.\t120\tIN\tPTR\thost.local.",
    );
    assert_eq!(printed, vec![expected]);
    assert!(printed[0].starts_with("127.0.0.1                mDNS     "));
    assert_eq!(summary.sessions_failed, 0);
    assert_eq!(errors.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn passive_listener_reports_multicast_announcements() {
    let group = SocketAddr::from((Ipv4Addr::new(239, 255, 77, 77), support::free_port()));
    let mut cfg = quiet_config();
    cfg.mdns = true;
    cfg.passive = true;
    cfg.mdns_targets.v4 = group;

    let sender = support::multicast_sender();
    let announcement = support::ptr_response("_ipp._tcp.local.", "printer.local.");
    let announcer = tokio::spawn(async move {
        loop {
            sender.send_to(&announcement, group).unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    });

    let (errors, _guard) = count_errors();
    let (summary, printed) = run(&[loopback()], &cfg).await;
    announcer.abort();

    assert_eq!(summary.sessions_started, 2);
    assert_eq!(summary.sessions_failed, 0);
    assert_eq!(errors.load(Ordering::SeqCst), 0);
    assert_eq!(
        printed,
        vec![render(
            "127.0.0.1".parse().unwrap(),
            Protocol::Mdns,
            "_ipp._tcp.local.\t120\tIN\tPTR\tprinter.local.",
        )]
    );
}

#[tokio::test]
async fn bind_failure_does_not_stop_other_addresses() {
    let responder = support::ssdp_responder("Acme/1.0 UPnP/1.0", 1, Duration::ZERO).await;
    let mut cfg = quiet_config();
    cfg.ssdp = true;
    cfg.ssdp_targets.v4 = responder.addr;

    let (summary, printed) = run(&[unbindable(), loopback()], &cfg).await;

    assert_eq!(summary.sessions_started, 2);
    assert_eq!(summary.sessions_failed, 1);
    assert_eq!(
        printed,
        vec![render("127.0.0.1".parse().unwrap(), Protocol::Ssdp, "Acme/1.0 UPnP/1.0")]
    );
}

#[tokio::test]
async fn repeated_ssdp_response_prints_one_line() {
    let responder = support::ssdp_responder("Camera/3.1", 2, Duration::from_millis(50)).await;
    let mut cfg = quiet_config();
    cfg.ssdp = true;
    cfg.ssdp_targets.v4 = responder.addr;

    let (summary, printed) = run(&[loopback()], &cfg).await;

    assert_eq!(printed.len(), 1);
    assert!(printed[0].ends_with("Camera/3.1"));
    assert_eq!(summary.lines_emitted, 1);
    assert_eq!(summary.duplicates_dropped, 1);
}

#[tokio::test]
async fn both_protocols_report_side_by_side() {
    let ssdp = support::ssdp_responder("Router/2.0", 1, Duration::ZERO).await;
    let mdns = support::mdns_responder("_googlecast._tcp.local.", "tv.local.").await;
    let mut cfg = quiet_config();
    cfg.ssdp = true;
    cfg.mdns = true;
    cfg.ssdp_targets.v4 = ssdp.addr;
    cfg.mdns_targets.v4 = mdns.addr;

    let (summary, mut printed) = run(&[loopback()], &cfg).await;
    printed.sort();

    assert_eq!(summary.sessions_started, 2);
    assert_eq!(printed.len(), 2);
    assert!(printed[0].contains(" SSDP ") && printed[0].ends_with("Router/2.0"));
    assert!(printed[1].contains(" mDNS ") && printed[1].ends_with("tv.local."));
}

#[tokio::test]
async fn external_cancel_ends_an_unbounded_run() {
    let responder = support::ssdp_responder("Quiet/1.0", 1, Duration::ZERO).await;
    let mut cfg = quiet_config();
    cfg.ssdp = true;
    cfg.duration = None;
    cfg.ssdp_targets.v4 = responder.addr;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let interfaces = [loopback()];
    let (summary, sink) = timeout(DEADLINE, discovery::run(&interfaces, &cfg, Vec::new(), &cancel))
        .await
        .expect("cancel was ignored")
        .unwrap();

    assert_eq!(summary.sessions_failed, 0);
    assert_eq!(lines(sink).len(), 1);
}

#[tokio::test]
async fn time_limit_during_a_reply_flood_is_not_a_failure() {
    for _ in 0..10 {
        let flood = support::ssdp_flood().await;
        let mut cfg = quiet_config();
        cfg.ssdp = true;
        cfg.duration = Some(Duration::from_millis(100));
        cfg.ssdp_targets.v4 = flood.addr;

        let (errors, _guard) = count_errors();
        let (summary, printed) = run(&[loopback()], &cfg).await;

        assert_eq!(summary.sessions_failed, 0);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
        assert!(!printed.is_empty());
    }
}
