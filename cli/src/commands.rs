pub mod discover;

use std::time::Duration;

use clap::{ArgAction, Parser};
use sonar_common::config::Config;

#[derive(Parser)]
#[command(name = "sonar")]
#[command(about = "Discover devices on the local network with SSDP and mDNS.")]
pub struct CommandLine {
    /// Only scan on this interface (repeatable)
    #[arg(short, long = "interface", value_name = "NAME")]
    pub interfaces: Vec<String>,
    /// Do not send SSDP M-SEARCH queries
    #[arg(long)]
    pub no_ssdp: bool,
    /// Do not send mDNS queries or listen for announcements
    #[arg(long)]
    pub no_mdns: bool,
    /// Do not join the mDNS multicast groups
    #[arg(long)]
    pub no_passive: bool,
    /// Include loopback interfaces
    #[arg(long)]
    pub loopback: bool,
    /// Stop after this many seconds instead of running until interrupted
    #[arg(short, long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
    /// mDNS service to probe, replacing the default list (repeatable)
    #[arg(short, long = "service", value_name = "NAME")]
    pub services: Vec<String>,
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn to_config(&self) -> Config {
        let mut cfg = Config {
            ssdp: !self.no_ssdp,
            mdns: !self.no_mdns,
            passive: !self.no_passive,
            include_loopback: self.loopback,
            interfaces: self.interfaces.clone(),
            duration: self.timeout.map(Duration::from_secs),
            ..Config::default()
        };
        if !self.services.is_empty() {
            cfg.mdns_services = self.services.clone();
        }
        cfg
    }
}
