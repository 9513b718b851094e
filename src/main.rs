//! Uroslink Firmware — Main Entry Point
//!
//! Hexagonal architecture around a single blocking tick loop.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                  │
//! │                                                          │
//! │  EspMicroRos           LogLinkSink     Esp32TimeAdapter  │
//! │  (Agent+Middleware)    (EventSink)     (tick cadence)    │
//! │  AxisReportHandler                                       │
//! │  (MessageHandler)                                        │
//! │                                                          │
//! │  ──────────────── Port trait boundary ───────────────    │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │             LinkService (pure logic)               │  │
//! │  │  connection FSM · session provisioner · dispatch   │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │                                                          │
//! │  W5500 Ethernet (transport) · TWDT (watchdog)            │
//! └──────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Module declarations ───────────────────────────────────────
pub mod config;
pub mod error;
pub mod fsm;
pub mod msg;
pub mod session;
mod pins;

pub mod app;
mod adapters;
mod reset;
mod transport;
mod watchdog;

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use esp_idf_svc::hal::delay::FreeRtos;
use log::{error, info};

use adapters::log_sink::{AxisReportHandler, LogLinkSink};
use adapters::microros::EspMicroRos;
use adapters::time::Esp32TimeAdapter;
use app::service::LinkService;
use config::{LinkConfig, NetConfig};
use watchdog::Watchdog;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Uroslink v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = LinkConfig::default();
    let net = NetConfig::default();
    if let Err(e) = config.validate() {
        // A rejected build-time config cannot self-heal across
        // reboots, so restarting would only loop.  Log and halt.
        error!("config rejected: {}", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    let tick_ms = config.tick_interval_ms;
    let cooldown_ms = config.restart_cooldown_ms;

    // ── 3. Wired transport ────────────────────────────────────
    let _eth = match transport::bring_up(&net) {
        Ok(link) => link,
        Err(e) => reset::restart_loop(&e.into(), cooldown_ms),
    };

    // Let the agent-side switch port settle before the first probe.
    FreeRtos::delay_ms(config.boot_settle_ms);

    // ── 4. Supervision + clock ────────────────────────────────
    let watchdog = Watchdog::new();
    let clock = Esp32TimeAdapter::new();
    info!("boot complete at t+{}s", clock.uptime_secs());

    // ── 5. Middleware adapter + link service ──────────────────
    let mut mw = match EspMicroRos::new(&net) {
        Ok(mw) => mw,
        Err(e) => reset::restart_loop(&e, cooldown_ms),
    };

    let mut sink = LogLinkSink::new();
    let mut handler = AxisReportHandler::new();
    let mut service = LinkService::new(config);
    service.start(&mut sink);

    // ── 6. Tick loop ──────────────────────────────────────────
    loop {
        let tick_start = clock.uptime_ms();

        if let Err(e) = service.tick(&mut mw, &mut handler, &mut sink) {
            reset::restart_loop(&e, cooldown_ms);
        }

        watchdog.feed();

        // Fixed cadence: sleep out whatever the tick left of its
        // interval.  The 1ms floor keeps an overlong tick from
        // starving the idle task.
        let elapsed =
            u32::try_from(clock.uptime_ms().saturating_sub(tick_start)).unwrap_or(u32::MAX);
        FreeRtos::delay_ms(tick_ms.saturating_sub(elapsed).max(1));
    }
}
