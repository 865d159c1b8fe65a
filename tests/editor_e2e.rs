use std::sync::Arc;
use std::time::Duration;

use queuescope::{
    start_monitor, BrokerSession, ConnectParams, Destination, EventKind, InMemoryBroker,
    MessageBody, MessageDraft, MonitorSession, PropertyMap, SchedulerConfig,
};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn fast_config() -> SchedulerConfig {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    SchedulerConfig {
        poll_interval: Duration::from_millis(20),
        stream_capacity: 1024,
    }
}

#[test]
fn observe_edit_and_resend_produces_a_new_message() {
    let broker = InMemoryBroker::new();
    let inbound = Destination::queue("inbound");
    let mut props = PropertyMap::new();
    props.insert("attempt", "1");
    let original_id = broker
        .publish(&inbound, MessageBody::from("order #42"), props)
        .unwrap();
    let session: Arc<dyn BrokerSession> = Arc::new(broker.connect(&ConnectParams::default()).unwrap());

    // Observe the message through a monitor.
    let monitor = MonitorSession::new([inbound.clone()], false);
    let registration = start_monitor(monitor, Arc::clone(&session), fast_config());
    let ev = registration.stream.recv_timeout(RECV_TIMEOUT).unwrap();
    let EventKind::MessageAdded { message, .. } = ev.kind else {
        panic!("expected message added event, got {:?}", ev.kind);
    };
    registration.handle.stop();

    // Edit a copy and resend to a different destination.
    let retry = Destination::queue("retry");
    let mut draft = MessageDraft::from_observed(&message);
    draft.set_destination(retry.clone());
    draft.set_text("order #42 (redriven)");
    draft.set_properties_text("attempt=2,redriven=true").unwrap();

    let new_id = draft.send(session.as_ref()).unwrap();
    assert_ne!(new_id, original_id);

    // The original is untouched; the copy landed with the edits.
    let original = broker.consume(&inbound).unwrap().unwrap();
    assert_eq!(original.message_id, original_id);
    assert_eq!(original.body.as_text(), Some("order #42"));
    assert_eq!(original.properties.get("attempt"), Some("1"));

    let sent = broker.consume(&retry).unwrap().unwrap();
    assert_eq!(sent.message_id, new_id);
    assert_eq!(sent.body.as_text(), Some("order #42 (redriven)"));
    assert_eq!(sent.properties.get("attempt"), Some("2"));
    assert_eq!(sent.properties.get("redriven"), Some("true"));
}

#[test]
fn resent_message_is_observed_by_a_monitor_on_the_target() {
    let broker = InMemoryBroker::new();
    let target = Destination::queue("target");
    broker.create_destination(target.clone()).unwrap();
    let session: Arc<dyn BrokerSession> = Arc::new(broker.connect(&ConnectParams::default()).unwrap());

    let monitor = MonitorSession::new([target.clone()], false);
    let registration = start_monitor(monitor, Arc::clone(&session), fast_config());

    let mut draft = MessageDraft::new(target.clone());
    draft.set_text("fresh");
    let id = draft.send(session.as_ref()).unwrap();

    let ev = registration.stream.recv_timeout(RECV_TIMEOUT).unwrap();
    match &ev.kind {
        EventKind::MessageAdded { destination, message } => {
            assert_eq!(*destination, target);
            assert_eq!(message.message_id, id);
        }
        other => panic!("expected message added event, got {other:?}"),
    }

    registration.handle.stop();
}

#[test]
fn failed_send_is_correctable_and_resendable() {
    let broker = InMemoryBroker::new();
    let session = broker.connect(&ConnectParams::default()).unwrap();
    broker.set_available(false).unwrap();

    let mut draft = MessageDraft::new(Destination::queue("out"));
    draft.set_text("payload");

    let failed = draft.send(&session).unwrap_err();
    assert_eq!(failed.draft.body().as_text(), Some("payload"));

    broker.set_available(true).unwrap();
    let mut draft = failed.draft;
    draft.set_property("resent", "true");
    let id = draft.send(&session).unwrap();

    let delivered = broker.consume(&Destination::queue("out")).unwrap().unwrap();
    assert_eq!(delivered.message_id, id);
    assert_eq!(delivered.properties.get("resent"), Some("true"));
}

#[test]
fn send_works_against_the_trait_object() {
    let broker = InMemoryBroker::new();
    let session: Arc<dyn BrokerSession> =
        Arc::new(broker.connect(&ConnectParams::default()).unwrap());

    let mut draft = MessageDraft::new(Destination::topic("alerts"));
    draft.set_text("ping");
    draft.send(session.as_ref()).unwrap();

    let delivered = broker.consume(&Destination::topic("alerts")).unwrap().unwrap();
    assert_eq!(delivered.body.as_text(), Some("ping"));
}
