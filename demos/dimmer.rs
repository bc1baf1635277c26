//! Dimmer device demo.
//!
//! Connects one dimmer to Sinric Pro and keeps its power state and level in
//! sync with the app. Press Enter to toggle power locally; every five
//! minutes a random power level is reported.
//!
//! Usage:
//!     SINRIC_APP_KEY=... SINRIC_APP_SECRET=... SINRIC_DEVICE_ID=... \
//!         cargo run --example dimmer -- [--debug] [--endpoint ws://host:port/]

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use sinric_client::{ActionRequest, Cause, Client};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use common::{Args, Credentials};

// ============================================================================
// Constants
// ============================================================================

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const REPORT_INTERVAL: Duration = Duration::from_secs(300);

// ============================================================================
// Device State
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Dimmer {
    power: bool,
    level: i64,
}

impl Dimmer {
    fn apply(&mut self, request: &ActionRequest) -> bool {
        match (request.action(), request.value.as_str(), request.value.as_i64()) {
            ("setPowerState", Some(state), _) => self.power = state == "On",
            ("setPowerLevel", _, Some(level)) => self.level = level.clamp(0, 100),
            ("adjustPowerLevel", _, Some(delta)) => {
                self.level = (self.level + delta).clamp(0, 100);
            }
            _ => return false,
        }
        info!(power = self.power, level = self.level, "Dimmer updated");
        true
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    common::init_logging(args.debug);
    let credentials = Credentials::from_env()?;

    let mut builder = Client::builder()
        .app_key(&credentials.app_key)
        .app_secret(&credentials.app_secret)
        .device_id(&credentials.device_id)
        .firmware_version("0.1.1");
    if let Some(endpoint) = &args.endpoint {
        builder = builder.endpoint(endpoint);
    }
    let mut client = builder.build()?;

    let dimmer = Arc::new(Mutex::new(Dimmer {
        power: false,
        level: 100,
    }));
    let state = Arc::clone(&dimmer);
    client.connect(move |request| state.lock().apply(request))?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut poll = tokio::time::interval(POLL_INTERVAL);
    let mut report = tokio::time::interval(REPORT_INTERVAL);
    report.tick().await;
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = poll.tick() => client.poll(),

            line = stdin.next_line(), if stdin_open => {
                if !matches!(line, Ok(Some(_))) {
                    stdin_open = false;
                    continue;
                }
                let next = if dimmer.lock().power { "Off" } else { "On" };
                info!(state = next, "Power toggled locally");
                match client.notify(&credentials.device_id, "setPowerState", Cause::PhysicalInteraction, "state", next) {
                    Ok(()) => dimmer.lock().power = next == "On",
                    Err(e) => warn!(error = %e, "Power change not reported"),
                }
            }

            _ = report.tick() => {
                let level = i64::from(rand::random::<u8>() % 100) + 1;
                info!(server_time = client.server_time(), level, "Reporting power level");
                match client.notify(&credentials.device_id, "setPowerLevel", Cause::PeriodicPoll, "powerLevel", level) {
                    Ok(()) => {
                        let mut dimmer = dimmer.lock();
                        dimmer.level = level;
                        dimmer.power = true;
                    }
                    Err(e) => warn!(error = %e, "Power level not reported"),
                }
            }

            _ = tokio::signal::ctrl_c() => break,
        }
    }

    client.disconnect();
    Ok(())
}
