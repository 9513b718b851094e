//! Log-based event sink and message handler adapters.
//!
//! [`LogLinkSink`] implements [`EventSink`] by writing structured link
//! events to the ESP-IDF logger (which goes to UART / USB-CDC in
//! production).  [`AxisReportHandler`] implements [`MessageHandler`] by
//! logging a one-line report per delivered sample.  A future adapter
//! could publish either stream over a diagnostics topic instead.

use log::{info, warn};

use crate::app::events::LinkEvent;
use crate::app::ports::{EventSink, MessageHandler};
use crate::msg::AxisArray;

// ───────────────────────────────────────────────────────────────
// Event sink
// ───────────────────────────────────────────────────────────────

/// Adapter that logs every [`LinkEvent`] to the serial console.
#[derive(Default)]
pub struct LogLinkSink;

impl LogLinkSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogLinkSink {
    fn emit(&mut self, event: &LinkEvent) {
        match event {
            LinkEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            LinkEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            LinkEvent::AgentLost { connected_ticks } => {
                warn!("LINK | agent lost after {} ticks connected", connected_ticks);
            }
            LinkEvent::ProvisionFailed(e) => {
                warn!("SESSION | create failed at {}: {}", e.step, e.source);
            }
            LinkEvent::Heartbeat(t) => {
                info!(
                    "TELEM | state={:?} | ticks={} | in_state={} | sessions={} | \
                     probe_fail={} | rx={} | dispatch_err={}",
                    t.state,
                    t.total_ticks,
                    t.ticks_in_state,
                    t.sessions_established,
                    t.probe_failures,
                    t.messages_delivered,
                    t.dispatch_errors,
                );
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Message handler
// ───────────────────────────────────────────────────────────────

/// Axis whose value is reported on every delivery (thumbstick Y on the
/// bench controller).
const REPORT_AXIS: usize = 4;

/// Adapter that logs a one-line report per delivered axis sample.
///
/// Samples shorter than [`REPORT_AXIS`] + 1 are still valid deliveries;
/// the report just notes the axis is absent instead of indexing past the
/// end of the sample.
#[derive(Default)]
pub struct AxisReportHandler;

impl AxisReportHandler {
    pub fn new() -> Self {
        Self
    }
}

impl MessageHandler for AxisReportHandler {
    fn on_message(&mut self, axes: &AxisArray) {
        match axes.get(REPORT_AXIS) {
            Some(v) => info!("RX | {} axes, axis[{}]={:.3}", axes.len(), REPORT_AXIS, v),
            None => info!("RX | {} axes, axis[{}] absent", axes.len(), REPORT_AXIS),
        }
    }
}
