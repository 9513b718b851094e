//! Integration tests for the connection lifecycle: boot, probe,
//! session establishment, loss, teardown, and recovery — all driven
//! through `LinkService::tick` against the scripted mock.

use crate::mock_ros::{MockRos, MwCall, RecordingHandler, RecordingSink};

use uroslink::app::events::LinkEvent;
use uroslink::app::service::LinkService;
use uroslink::config::LinkConfig;
use uroslink::error::{LinkError, MiddlewareError, ProvisionError, ProvisionStep};
use uroslink::fsm::ConnState;

fn make_service() -> (LinkService<MockRos>, MockRos, RecordingHandler, RecordingSink) {
    let mut service: LinkService<MockRos> = LinkService::new(LinkConfig::default());
    let mw = MockRos::new();
    let handler = RecordingHandler::default();
    let mut sink = RecordingSink::default();
    service.start(&mut sink);
    (service, mw, handler, sink)
}

/// Run `n` ticks, panicking if any returns a fatal error.
fn run_ticks(
    service: &mut LinkService<MockRos>,
    mw: &mut MockRos,
    handler: &mut RecordingHandler,
    sink: &mut RecordingSink,
    n: usize,
) {
    for _ in 0..n {
        service.tick(mw, handler, sink).unwrap();
    }
}

// ── Cold boot reaches Connected in entity order ───────────────

#[test]
fn cold_boot_walks_to_connected_in_entity_order() {
    let (mut service, mut mw, mut handler, mut sink) = make_service();
    assert_eq!(service.state(), ConnState::Initializing);
    assert!(matches!(
        sink.events[0],
        LinkEvent::Started(ConnState::Initializing)
    ));

    // Tick 1: transport is up, so the machine arms the probe state.
    service.tick(&mut mw, &mut handler, &mut sink).unwrap();
    assert_eq!(service.state(), ConnState::WaitingForAgent);
    assert!(
        mw.calls.is_empty(),
        "no middleware traffic before the probe state"
    );

    // Tick 2: probe answers, move to Connecting.
    service.tick(&mut mw, &mut handler, &mut sink).unwrap();
    assert_eq!(service.state(), ConnState::Connecting);
    assert_eq!(
        mw.calls,
        vec![MwCall::Ping {
            timeout_ms: 200,
            attempts: 3
        }]
    );

    // Tick 3: the session comes up in support → node → executor →
    // subscription → registration order.
    service.tick(&mut mw, &mut handler, &mut sink).unwrap();
    assert_eq!(service.state(), ConnState::Connected);
    assert!(service.has_session());
    assert_eq!(
        mw.calls[1..],
        [
            MwCall::CreateSupport,
            MwCall::CreateNode("ControllerESP".to_string()),
            MwCall::CreateExecutor(10),
            MwCall::CreateSubscription("Joy".to_string()),
            MwCall::Register,
        ]
    );
    assert_eq!(service.stats().sessions_established, 1);

    let changes: Vec<&LinkEvent> = sink
        .events
        .iter()
        .filter(|e| matches!(e, LinkEvent::StateChanged { .. }))
        .collect();
    assert_eq!(changes.len(), 3, "one StateChanged per lifecycle edge");
}

// ── Connected tick delivers the sample to the handler ─────────

#[test]
fn connected_tick_delivers_sample_within_budget() {
    let (mut service, mut mw, mut handler, mut sink) = make_service();
    run_ticks(&mut service, &mut mw, &mut handler, &mut sink, 3);
    assert_eq!(service.state(), ConnState::Connected);

    mw.push_sample(&[0.1, 0.2, 0.3, 0.4, 0.5]);
    mw.clear_calls();
    service.tick(&mut mw, &mut handler, &mut sink).unwrap();

    // Liveness check first, then one bounded dispatch pass.
    assert_eq!(
        mw.calls,
        vec![
            MwCall::Ping {
                timeout_ms: 200,
                attempts: 3
            },
            MwCall::SpinSome(100),
        ]
    );
    assert_eq!(handler.received, vec![vec![0.1, 0.2, 0.3, 0.4, 0.5]]);
    assert_eq!(service.stats().messages_delivered, 1);
    assert_eq!(service.stats().last_sample_len, Some(5));
}

// ── Agent absent: keep probing, create nothing ────────────────

#[test]
fn agent_absent_keeps_probing_without_entities() {
    let (mut service, mut mw, mut handler, mut sink) = make_service();
    mw.agent_up = false;

    run_ticks(&mut service, &mut mw, &mut handler, &mut sink, 5);

    assert_eq!(service.state(), ConnState::WaitingForAgent);
    assert!(!service.has_session());
    // Tick 1 leaves Initializing; ticks 2-5 each probe and fail.
    assert_eq!(service.stats().probe_failures, 4);
    assert_eq!(mw.created(), 0, "no entity creation while the agent is down");
}

// ── Agent loss: Disconnected, then ordered teardown ───────────

#[test]
fn agent_loss_disconnects_then_tears_down_in_order() {
    let (mut service, mut mw, mut handler, mut sink) = make_service();
    run_ticks(&mut service, &mut mw, &mut handler, &mut sink, 3);
    assert_eq!(service.state(), ConnState::Connected);

    mw.agent_up = false;
    mw.clear_calls();

    // Loss tick: probe fails, no dispatch pass, session still held.
    service.tick(&mut mw, &mut handler, &mut sink).unwrap();
    assert_eq!(service.state(), ConnState::Disconnected);
    assert!(service.has_session(), "teardown happens on the next tick");
    assert!(
        !mw.calls.iter().any(|c| matches!(c, MwCall::SpinSome(_))),
        "no dispatch once the probe fails"
    );
    assert!(sink
        .events
        .iter()
        .any(|e| matches!(e, LinkEvent::AgentLost { .. })));

    // Teardown tick: zero the confirmation timeout first, then destroy
    // in reverse creation order.
    service.tick(&mut mw, &mut handler, &mut sink).unwrap();
    assert_eq!(service.state(), ConnState::WaitingForAgent);
    assert!(!service.has_session());
    assert_eq!(
        mw.teardown_sequence(),
        vec![
            MwCall::SetTeardownTimeout(0),
            MwCall::DestroySubscription,
            MwCall::DestroyExecutor,
            MwCall::DestroyNode,
            MwCall::DestroySupport,
        ]
    );
}

// ── Agent returns: a full second session comes up ─────────────

#[test]
fn agent_return_establishes_second_session() {
    let (mut service, mut mw, mut handler, mut sink) = make_service();
    run_ticks(&mut service, &mut mw, &mut handler, &mut sink, 3);

    // Lose the agent, ride through Disconnected + teardown.
    mw.agent_up = false;
    run_ticks(&mut service, &mut mw, &mut handler, &mut sink, 2);
    assert_eq!(service.state(), ConnState::WaitingForAgent);

    // Agent comes back: probe, then a fresh provisioning pass.
    mw.agent_up = true;
    run_ticks(&mut service, &mut mw, &mut handler, &mut sink, 2);

    assert_eq!(service.state(), ConnState::Connected);
    assert!(service.has_session());
    assert_eq!(service.stats().sessions_established, 2);
    assert_eq!(mw.created(), 8, "four entities per session, two sessions");
    assert_eq!(mw.destroyed(), 4, "first session fully torn down");
}

// ── Recoverable provisioning failure: roll back and retry ─────

#[test]
fn recoverable_executor_failure_rolls_back_and_retries() {
    let (mut service, mut mw, mut handler, mut sink) = make_service();
    mw.arm_failure(ProvisionStep::Executor, MiddlewareError::Unavailable);

    // Boot, probe, then the provisioning attempt that fails.
    run_ticks(&mut service, &mut mw, &mut handler, &mut sink, 3);

    assert_eq!(
        service.state(),
        ConnState::WaitingForAgent,
        "agent-unavailable failures re-enter the probe state"
    );
    assert!(!service.has_session());
    // Only support and node existed; both get destroyed, newest first.
    assert_eq!(
        mw.teardown_sequence(),
        vec![
            MwCall::SetTeardownTimeout(0),
            MwCall::DestroyNode,
            MwCall::DestroySupport,
        ]
    );
    assert!(sink
        .events
        .iter()
        .any(|e| matches!(e, LinkEvent::ProvisionFailed(p) if p.step == ProvisionStep::Executor)));

    // The fault was one-shot: the next cycle establishes a session.
    run_ticks(&mut service, &mut mw, &mut handler, &mut sink, 2);
    assert_eq!(service.state(), ConnState::Connected);
    assert_eq!(service.stats().sessions_established, 1);
}

// ── Fatal provisioning failure: roll back and surface ─────────

#[test]
fn fatal_node_failure_rolls_back_and_surfaces() {
    let (mut service, mut mw, mut handler, mut sink) = make_service();
    mw.arm_failure(ProvisionStep::Node, MiddlewareError::Internal(-12));

    run_ticks(&mut service, &mut mw, &mut handler, &mut sink, 2);
    assert_eq!(service.state(), ConnState::Connecting);

    let err = service
        .tick(&mut mw, &mut handler, &mut sink)
        .unwrap_err();
    assert_eq!(
        err,
        LinkError::Provision(ProvisionError {
            step: ProvisionStep::Node,
            source: MiddlewareError::Internal(-12),
        })
    );
    assert!(err.is_fatal());

    // The partial session was still rolled back before surfacing.
    assert_eq!(
        mw.teardown_sequence(),
        vec![MwCall::SetTeardownTimeout(0), MwCall::DestroySupport]
    );
    assert!(sink
        .events
        .iter()
        .any(|e| matches!(e, LinkEvent::ProvisionFailed(p) if p.step == ProvisionStep::Node)));
}

// ── Heartbeat telemetry fires on its tick schedule ────────────

#[test]
fn heartbeat_fires_on_schedule() {
    let (mut service, mut mw, mut handler, mut sink) = make_service();
    mw.agent_up = false;

    run_ticks(&mut service, &mut mw, &mut handler, &mut sink, 9);
    assert!(
        !sink
            .events
            .iter()
            .any(|e| matches!(e, LinkEvent::Heartbeat(_))),
        "no heartbeat before the interval elapses"
    );

    run_ticks(&mut service, &mut mw, &mut handler, &mut sink, 1);
    let beat = sink
        .events
        .iter()
        .find_map(|e| match e {
            LinkEvent::Heartbeat(t) => Some(t),
            _ => None,
        })
        .expect("heartbeat after ten ticks");
    assert_eq!(beat.state, ConnState::WaitingForAgent);
    assert_eq!(beat.total_ticks, 10);
    assert_eq!(beat.probe_failures, 9);
}
