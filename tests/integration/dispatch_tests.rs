//! Dispatch-pass tests: budget plumbing, delivery, and the soft-error
//! policy for a Connected link.

use crate::mock_ros::{MockRos, MwCall, RecordingHandler, RecordingSink};

use uroslink::app::service::LinkService;
use uroslink::config::LinkConfig;
use uroslink::error::MiddlewareError;
use uroslink::fsm::ConnState;

/// Boot a service and walk it to Connected against a live mock agent.
fn connected_service(
    config: LinkConfig,
) -> (LinkService<MockRos>, MockRos, RecordingHandler, RecordingSink) {
    let mut service: LinkService<MockRos> = LinkService::new(config);
    let mut mw = MockRos::new();
    let mut handler = RecordingHandler::default();
    let mut sink = RecordingSink::default();
    service.start(&mut sink);
    for _ in 0..3 {
        service.tick(&mut mw, &mut handler, &mut sink).unwrap();
    }
    assert_eq!(service.state(), ConnState::Connected);
    (service, mw, handler, sink)
}

// ── Delivery ──────────────────────────────────────────────────

#[test]
fn samples_arrive_one_per_tick_in_order() {
    let (mut service, mut mw, mut handler, mut sink) =
        connected_service(LinkConfig::default());

    mw.push_sample(&[1.0, 2.0]);
    mw.push_sample(&[3.0, 4.0]);

    service.tick(&mut mw, &mut handler, &mut sink).unwrap();
    service.tick(&mut mw, &mut handler, &mut sink).unwrap();

    assert_eq!(handler.received, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    assert_eq!(service.stats().messages_delivered, 2);
    assert_eq!(service.stats().last_sample_len, Some(2));
}

#[test]
fn empty_sample_is_still_a_delivery() {
    let (mut service, mut mw, mut handler, mut sink) =
        connected_service(LinkConfig::default());

    mw.push_sample(&[]);
    service.tick(&mut mw, &mut handler, &mut sink).unwrap();

    assert_eq!(handler.received, vec![Vec::<f32>::new()]);
    assert_eq!(service.stats().messages_delivered, 1);
    assert_eq!(service.stats().last_sample_len, Some(0));
}

#[test]
fn oversized_sample_is_rejected_without_delivery() {
    let (mut service, mut mw, mut handler, mut sink) =
        connected_service(LinkConfig::default());

    // Twelve axes against a ten-axis buffer.
    mw.push_sample(&[0.5; 12]);
    service.tick(&mut mw, &mut handler, &mut sink).unwrap();

    assert!(handler.received.is_empty());
    assert_eq!(service.stats().messages_delivered, 0);
    assert_eq!(service.state(), ConnState::Connected, "rejection is not a fault");
}

// ── Budget plumbing ───────────────────────────────────────────

#[test]
fn spin_budget_comes_from_config() {
    let mut config = LinkConfig::default();
    config.spin_budget_ms = 250;
    let (mut service, mut mw, mut handler, mut sink) = connected_service(config);

    mw.clear_calls();
    service.tick(&mut mw, &mut handler, &mut sink).unwrap();

    assert!(mw.calls.contains(&MwCall::SpinSome(250)));
}

// ── Soft-error policy ─────────────────────────────────────────

#[test]
fn dispatch_errors_are_soft_and_counted() {
    let (mut service, mut mw, mut handler, mut sink) =
        connected_service(LinkConfig::default());

    mw.spin_error = Some(MiddlewareError::Internal(-3));
    service.tick(&mut mw, &mut handler, &mut sink).unwrap();
    assert_eq!(service.state(), ConnState::Connected);
    assert_eq!(service.stats().dispatch_errors, 1);

    mw.spin_error = Some(MiddlewareError::Unavailable);
    service.tick(&mut mw, &mut handler, &mut sink).unwrap();
    assert_eq!(service.state(), ConnState::Connected);
    assert_eq!(service.stats().dispatch_errors, 2);
    assert!(
        service.has_session(),
        "a failed pass never tears the session down; the probe decides that"
    );

    // The pass after the faults delivers normally.
    mw.push_sample(&[7.0]);
    service.tick(&mut mw, &mut handler, &mut sink).unwrap();
    assert_eq!(handler.received, vec![vec![7.0]]);
}
