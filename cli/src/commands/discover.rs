use anyhow::Context;
use sonar_common::config::Config;
use sonar_common::network::interface;
use sonar_core::discovery::{self, DiscoverySummary};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn discover(cfg: &Config) -> anyhow::Result<()> {
    let interfaces = interface::enumerate(cfg).context("failed to enumerate network interfaces")?;
    for iface in &interfaces {
        info!("scanning on {} ({} addresses)", iface.name, iface.addresses.len());
    }

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupted, shutting down");
                shutdown.cancel();
            }
            Err(e) => warn!("cannot listen for Ctrl-C: {e}"),
        }
    });

    let (summary, _) = discovery::run(&interfaces, cfg, tokio::io::stdout(), &cancel).await?;
    discovery_ends(&summary);
    Ok(())
}

fn discovery_ends(summary: &DiscoverySummary) {
    info!(
        "discovery complete: {} devices reported, {} duplicates dropped",
        summary.lines_emitted, summary.duplicates_dropped
    );
    if summary.sessions_failed > 0 {
        warn!(
            "{} of {} sessions ended with an error",
            summary.sessions_failed, summary.sessions_started
        );
    }
}
