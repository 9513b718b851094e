//! Fuzz target: connection lifecycle state machine
//!
//! Interprets the input as a script of agent weather, fault arming and
//! sample injections, runs it through `LinkService` over the simulator,
//! and verifies:
//! - No panics under any script
//! - Every observed transition is in the lifecycle edge table
//! - Middleware entities never leak (0 or 4 live at tick boundaries)
//! - A session handle exists exactly in the states that own one
//!
//! cargo fuzz run fuzz_link_lifecycle

#![no_main]

use libfuzzer_sys::fuzz_target;
use uroslink::adapters::microros::SimMicroRos;
use uroslink::app::events::LinkEvent;
use uroslink::app::ports::{EventSink, MessageHandler};
use uroslink::app::service::LinkService;
use uroslink::config::LinkConfig;
use uroslink::error::{MiddlewareError, ProvisionStep};
use uroslink::fsm::{is_legal_transition, ConnState};
use uroslink::msg::AxisArray;

struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &LinkEvent) {}
}

struct NullHandler;

impl MessageHandler for NullHandler {
    fn on_message(&mut self, _axes: &AxisArray) {}
}

fuzz_target!(|data: &[u8]| {
    let mut sim = SimMicroRos::new();
    let mut service: LinkService<SimMicroRos> = LinkService::new(LinkConfig::default());
    let mut handler = NullHandler;
    let mut sink = NullSink;
    service.start(&mut sink);

    for &byte in data.iter().take(256) {
        match byte % 8 {
            0 => sim.set_agent_up(true),
            1 => sim.set_agent_up(false),
            2 => sim.fail_next_create(ProvisionStep::Support, MiddlewareError::Unavailable),
            3 => sim.fail_next_create(ProvisionStep::Executor, MiddlewareError::Unavailable),
            4 => sim.fail_next_create(ProvisionStep::Registration, MiddlewareError::Unavailable),
            5 => sim.push_sample(&[f32::from(byte), 1.0, -1.0]),
            6 => sim.push_sample(&[0.0; 12]),
            _ => {}
        }

        let before = service.state();
        // Agent-unavailable faults are recoverable; the tick must not error.
        service.tick(&mut sim, &mut handler, &mut sink).unwrap();
        let after = service.state();

        assert!(
            is_legal_transition(before, after),
            "illegal edge {:?} -> {:?}",
            before,
            after
        );
        assert!(matches!(sim.live_entities(), 0 | 4), "entity leak");
        assert_eq!(
            service.has_session(),
            matches!(after, ConnState::Connected | ConnState::Disconnected),
            "session handle out of step with the machine"
        );
    }
});
