//! Unit tests for the event bus.

use std::sync::{Arc, Mutex};

use crate::bus::{EventBus, Subscriber, Topic};
use crate::error::SubscriberError;

/// Records every payload it sees, tagged with its own label.
fn recorder(
    log: &Arc<Mutex<Vec<String>>>,
    label: &'static str,
) -> impl Fn(&u32) + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |payload: &u32| log.lock().unwrap().push(format!("{label}:{payload}"))
}

// ── subscribe / dispatch ─────────────────────────────────────────────

#[test]
fn dispatch_without_subscribers_is_a_no_op() {
    let bus: EventBus<u32> = EventBus::new();
    assert_eq!(bus.dispatch(Topic::Event, &1), 0);
}

#[test]
fn subscribers_are_notified_in_registration_order() {
    let bus = EventBus::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    bus.subscribe_fn(Topic::Event, recorder(&log, "a"));
    bus.subscribe_fn(Topic::Event, recorder(&log, "b"));
    bus.subscribe_fn(Topic::Event, recorder(&log, "c"));

    assert_eq!(bus.dispatch(Topic::Event, &7), 3);
    assert_eq!(*log.lock().unwrap(), vec!["a:7", "b:7", "c:7"]);
}

#[test]
fn topics_are_isolated() {
    let bus = EventBus::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    bus.subscribe_fn(Topic::Event, recorder(&log, "event"));
    bus.subscribe_fn(Topic::Session, recorder(&log, "session"));

    bus.dispatch(Topic::Session, &1);
    assert_eq!(*log.lock().unwrap(), vec!["session:1"]);
}

// ── unsubscribe ──────────────────────────────────────────────────────

#[test]
fn unsubscribe_removes_only_that_subscriber() {
    let bus = EventBus::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let a = bus.subscribe_fn(Topic::Event, recorder(&log, "a"));
    bus.subscribe_fn(Topic::Event, recorder(&log, "b"));

    assert!(bus.unsubscribe(Topic::Event, &a));
    bus.dispatch(Topic::Event, &2);
    assert_eq!(*log.lock().unwrap(), vec!["b:2"]);
    assert_eq!(bus.subscriber_count(Topic::Event), 1);
}

#[test]
fn unsubscribe_unknown_subscriber_is_a_no_op() {
    let bus: EventBus<u32> = EventBus::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let stranger: Arc<dyn Subscriber<u32>> = {
        let f = recorder(&log, "x");
        Arc::new(move |p: &u32| -> Result<(), SubscriberError> {
            f(p);
            Ok(())
        })
    };
    assert!(!bus.unsubscribe(Topic::Event, &stranger));

    bus.subscribe_fn(Topic::Event, recorder(&log, "a"));
    assert!(!bus.unsubscribe(Topic::Event, &stranger));
    assert_eq!(bus.subscriber_count(Topic::Event), 1);
}

// ── re-entrancy ──────────────────────────────────────────────────────

#[test]
fn subscriber_may_unsubscribe_itself_during_dispatch() {
    let bus: Arc<EventBus<u32>> = Arc::new(EventBus::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let own_handle: Arc<Mutex<Option<Arc<dyn Subscriber<u32>>>>> = Arc::new(Mutex::new(None));

    let handle = {
        let inner_bus = Arc::clone(&bus);
        let log = Arc::clone(&log);
        let own_handle = Arc::clone(&own_handle);
        bus.subscribe_fn(Topic::Event, move |payload: &u32| {
            log.lock().unwrap().push(format!("once:{payload}"));
            let me = own_handle.lock().unwrap().take();
            if let Some(me) = me {
                inner_bus.unsubscribe(Topic::Event, &me);
            }
        })
    };
    *own_handle.lock().unwrap() = Some(handle);
    bus.subscribe_fn(Topic::Event, recorder(&log, "after"));

    bus.dispatch(Topic::Event, &1);
    bus.dispatch(Topic::Event, &2);

    assert_eq!(
        *log.lock().unwrap(),
        vec!["once:1", "after:1", "after:2"]
    );
}

#[test]
fn subscriber_added_during_dispatch_waits_for_next_dispatch() {
    let bus: Arc<EventBus<u32>> = Arc::new(EventBus::new());
    let log = Arc::new(Mutex::new(Vec::new()));

    {
        let inner_bus = Arc::clone(&bus);
        let log = Arc::clone(&log);
        bus.subscribe_fn(Topic::Event, move |payload: &u32| {
            log.lock().unwrap().push(format!("outer:{payload}"));
            if *payload == 1 {
                inner_bus.subscribe_fn(Topic::Event, recorder(&log, "late"));
            }
        });
    }

    bus.dispatch(Topic::Event, &1);
    bus.dispatch(Topic::Event, &2);

    assert_eq!(
        *log.lock().unwrap(),
        vec!["outer:1", "outer:2", "late:2"]
    );
}

// ── failure isolation ────────────────────────────────────────────────

#[test]
fn failing_subscriber_does_not_block_later_subscribers() {
    let bus = EventBus::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    bus.subscribe(
        Topic::Event,
        Arc::new(|_: &u32| -> Result<(), SubscriberError> {
            Err(SubscriberError::new("boom"))
        }),
    );
    bus.subscribe_fn(Topic::Event, recorder(&log, "b"));

    assert_eq!(bus.dispatch(Topic::Event, &3), 1);
    assert_eq!(*log.lock().unwrap(), vec!["b:3"]);
}

#[test]
fn panicking_subscriber_does_not_block_later_subscribers() {
    let bus = EventBus::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    bus.subscribe_fn(Topic::Event, |_: &u32| panic!("subscriber bug"));
    bus.subscribe_fn(Topic::Event, recorder(&log, "b"));

    assert_eq!(bus.dispatch(Topic::Event, &4), 1);
    assert_eq!(*log.lock().unwrap(), vec!["b:4"]);

    // The bus is still usable afterwards.
    assert_eq!(bus.dispatch(Topic::Event, &5), 1);
}
