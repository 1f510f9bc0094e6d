//! # Discovery Run
//!
//! Wires the scanners, the reporters and the aggregator together for one run.
//!
//! Every session holds a clone of the report sender, so the report channel closes
//! exactly when the last session has exited. That closure is what ends the
//! aggregator in the absence of a shutdown signal.

use anyhow::Context;
use sonar_common::config::Config;
use sonar_common::error::SessionError;
use sonar_common::network::interface::Interface;
use sonar_common::network::target::Protocol;
use sonar_protocols::mdns::MdnsCodec;
use sonar_protocols::ssdp::SsdpCodec;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::aggregator::Aggregator;
use crate::reporter::Reporter;
use crate::scanner::Scanner;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiscoverySummary {
    pub sessions_started: usize,
    pub sessions_failed: usize,
    pub lines_emitted: usize,
    pub duplicates_dropped: usize,
}

/// Scans `interfaces` and writes each unique report line to `sink`.
///
/// Returns once every session has exited, or once `cancel` fires (or the configured
/// duration elapses) and the sessions have wound down.
pub async fn run<W: AsyncWrite + Unpin>(
    interfaces: &[Interface],
    cfg: &Config,
    sink: W,
    cancel: &CancellationToken,
) -> anyhow::Result<(DiscoverySummary, W)> {
    let cancel = cancel.child_token();
    let (tx, rx) = mpsc::unbounded_channel();
    let mut handles: Vec<JoinHandle<Result<(), SessionError>>> = Vec::new();

    if cfg.ssdp {
        let scanner = Scanner::new(SsdpCodec, cfg.ssdp_targets, false);
        let reporter = Reporter::new(tx.clone(), Protocol::Ssdp);
        handles.extend(scanner.launch(interfaces, &reporter, &cancel));
    }

    if cfg.mdns {
        let scanner = Scanner::new(
            MdnsCodec::new(cfg.mdns_services.clone()),
            cfg.mdns_targets,
            cfg.passive,
        );
        let reporter = Reporter::new(tx.clone(), Protocol::Mdns);
        handles.extend(scanner.launch(interfaces, &reporter, &cancel));
    }

    drop(tx);
    info!("started {} sessions on {} interfaces", handles.len(), interfaces.len());

    if let Some(limit) = cfg.duration {
        let timer = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(limit) => {
                    debug!("scan time limit of {limit:?} reached");
                    timer.cancel();
                }
                _ = timer.cancelled() => {}
            }
        });
    }

    let aggregated = Aggregator::new(sink).run(rx, &cancel).await;
    cancel.cancel();
    let aggregator = aggregated.context("failed to write report")?;

    let mut summary = DiscoverySummary {
        sessions_started: handles.len(),
        lines_emitted: aggregator.emitted(),
        duplicates_dropped: aggregator.duplicates(),
        ..DiscoverySummary::default()
    };

    for handle in handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => summary.sessions_failed += 1,
            Err(e) => {
                error!("session task aborted: {e}");
                summary.sessions_failed += 1;
            }
        }
    }

    Ok((summary, aggregator.into_sink()))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
