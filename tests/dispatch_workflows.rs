//! Integration tests for common Relay workflows.
//!
//! These tests drive the public facade the way application code does.

use relay::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

struct User {
    culture: Mutex<String>,
}

impl User {
    fn new(culture: &str) -> Arc<Self> {
        Arc::new(Self {
            culture: Mutex::new(culture.to_string()),
        })
    }
}

fn counting(counter: &Arc<AtomicU32>) -> Listener {
    let counter = counter.clone();
    Listener::notify(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

// =============================================================================
// Broadcast
// =============================================================================

#[test]
fn test_change_culture_notification() {
    let dispatcher = Dispatcher::new();
    let seen = Arc::new(AtomicBool::new(false));
    let s = seen.clone();

    dispatcher.connect(
        "user.change_culture",
        Listener::notify(move |event| {
            assert_eq!(event.get("culture")?, "fr");

            let user = event
                .subject_as::<User>()
                .ok_or_else(|| ListenerError::failed("subject dropped"))?;
            *user.culture.lock().unwrap() = event.get_as::<String>("culture")?;

            s.store(true, Ordering::SeqCst);
            Ok(())
        }),
    );

    let user = User::new("en");
    let mut event = Event::for_subject(&user, "user.change_culture")
        .unwrap()
        .with_parameter("culture", "fr");

    dispatcher.notify(&mut event).unwrap();

    assert!(seen.load(Ordering::SeqCst));
    assert_eq!(*user.culture.lock().unwrap(), "fr");
}

#[test]
fn test_missing_parameter_surfaces_to_caller() {
    let dispatcher = Dispatcher::new();
    dispatcher.connect(
        "user.change_culture",
        Listener::notify(|event| {
            event.get("culture")?;
            Ok(())
        }),
    );

    let err = dispatcher
        .notify(&mut Event::new("user.change_culture").unwrap())
        .unwrap_err();

    assert!(matches!(
        err.listener_error(),
        Some(ListenerError::Event(EventError::KeyNotFound(key))) if key == "culture"
    ));
}

#[test]
fn test_disconnect_stops_delivery() {
    let dispatcher = Dispatcher::new();
    let counter = Arc::new(AtomicU32::new(0));
    let listener = counting(&counter);

    dispatcher.connect("tick", listener.clone());
    dispatcher.notify(&mut Event::new("tick").unwrap()).unwrap();

    assert!(dispatcher.disconnect("tick", &listener));
    assert!(!dispatcher.disconnect("tick", &listener));
    dispatcher.notify(&mut Event::new("tick").unwrap()).unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(!dispatcher.has_listeners("tick"));
}

#[test]
fn test_listener_added_parameters_flow_forward() {
    let dispatcher = Dispatcher::new();
    dispatcher.connect(
        "request.received",
        Listener::notify(|event| {
            event.set("authenticated", true);
            Ok(())
        }),
    );
    dispatcher.connect(
        "request.received",
        Listener::notify(|event| {
            let ok = event.get_as::<bool>("authenticated")?;
            event.set_return_value(if ok { "welcome" } else { "denied" });
            Ok(())
        }),
    );

    let mut event = Event::new("request.received").unwrap();
    dispatcher.notify(&mut event).unwrap();

    assert_eq!(event.return_value(), Some(&json!("welcome")));
}

// =============================================================================
// Short-circuit
// =============================================================================

#[test]
fn test_method_not_found_dispatch() {
    let dispatcher = Dispatcher::new();
    let calls = Arc::new(Mutex::new(Vec::new()));

    let c = calls.clone();
    dispatcher.connect(
        "foo.method_is_not_found",
        Listener::until(move |event| {
            c.lock().unwrap().push("a");
            if event.get("method")? == "bar" {
                return Ok(false);
            }
            event.set_return_value("handled by a");
            Ok(true)
        }),
    );

    let c = calls.clone();
    dispatcher.connect(
        "foo.method_is_not_found",
        Listener::until(move |event| {
            c.lock().unwrap().push("b");
            if event.get("method")? != "bar" {
                return Ok(false);
            }
            event.set_return_value(42);
            event.set_processed();
            Ok(true)
        }),
    );

    let c = calls.clone();
    dispatcher.connect(
        "foo.method_is_not_found",
        Listener::until(move |_| {
            c.lock().unwrap().push("c");
            Ok(true)
        }),
    );

    let mut event = Event::new("foo.method_is_not_found")
        .unwrap()
        .with_parameter("method", "bar")
        .with_parameter("arguments", json!([]));

    assert!(dispatcher.notify_until(&mut event).unwrap());
    assert!(event.is_processed());
    assert_eq!(event.return_value(), Some(&json!(42)));
    assert_eq!(*calls.lock().unwrap(), vec!["a", "b"]);
}

#[test]
fn test_unhandled_call_stays_unprocessed() {
    let dispatcher = Dispatcher::new();
    let counter = Arc::new(AtomicU32::new(0));

    for _ in 0..3 {
        let c = counter.clone();
        dispatcher.connect(
            "foo.method_is_not_found",
            Listener::until(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(false)
            }),
        );
    }

    let mut event = Event::new("foo.method_is_not_found")
        .unwrap()
        .with_parameter("method", "baz");

    assert!(!dispatcher.notify_until(&mut event).unwrap());
    assert!(!event.is_processed());
    assert!(event.return_value().is_none());
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

// =============================================================================
// Filter
// =============================================================================

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Arguments {
    name: String,
    tags: Vec<String>,
}

#[test]
fn test_filter_pipeline_builds_abc() {
    let dispatcher = Dispatcher::new();
    for token in ["a", "b", "c"] {
        dispatcher.connect(
            "content.filter",
            Listener::filter(move |_, value| {
                Ok(json!(format!("{}{token}", value.as_str().unwrap_or_default())))
            }),
        );
    }

    let mut event = Event::new("content.filter").unwrap();
    let value = dispatcher.filter(&mut event, "").unwrap();

    assert_eq!(value, "abc");
    assert_eq!(event.return_value(), Some(&value));
}

#[test]
fn test_filter_typed_arguments() {
    let dispatcher = Dispatcher::new();
    dispatcher.connect(
        "form.arguments",
        Listener::filter(|_, mut value| {
            let name = value["name"].as_str().map(|n| n.trim().to_lowercase());
            if let Some(name) = name {
                value["name"] = json!(name);
            }
            Ok(value)
        }),
    );
    dispatcher.connect(
        "form.arguments",
        Listener::filter(|event, mut value| {
            let tag = event.get_as::<String>("source")?;
            if let Some(tags) = value["tags"].as_array_mut() {
                tags.push(json!(tag));
            }
            Ok(value)
        }),
    );

    let mut event = Event::new("form.arguments")
        .unwrap()
        .with_parameter("source", "signup");
    let args = dispatcher
        .filter_as(
            &mut event,
            Arguments {
                name: "  Alice ".to_string(),
                tags: vec![],
            },
        )
        .unwrap();

    assert_eq!(
        args,
        Arguments {
            name: "alice".to_string(),
            tags: vec!["signup".to_string()],
        }
    );
}

#[test]
fn test_filter_without_listeners_returns_input() {
    let dispatcher = Dispatcher::new();
    let mut event = Event::new("content.filter").unwrap();

    let value = dispatcher.filter(&mut event, json!({ "keep": true })).unwrap();
    assert_eq!(value, json!({ "keep": true }));
}

#[test]
fn test_filter_rejects_wrong_shape() {
    let dispatcher = Dispatcher::new();
    dispatcher.connect("content.filter", Listener::notify(|_| Ok(())));

    let err = dispatcher
        .filter(&mut Event::new("content.filter").unwrap(), "x")
        .unwrap_err();
    assert_eq!(err.as_label(), "dispatch_invalid_listener");
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_connect_during_dispatch_uses_snapshot() {
    let dispatcher = Dispatcher::new();
    let barrier = Arc::new(Barrier::new(2));
    let first_run = Arc::new(AtomicBool::new(true));
    let late_calls = Arc::new(AtomicU32::new(0));

    let b = barrier.clone();
    let f = first_run.clone();
    dispatcher.connect(
        "job.run",
        Listener::notify(move |_| {
            if f.swap(false, Ordering::SeqCst) {
                b.wait(); // dispatch is in flight
                b.wait(); // late listener connected
            }
            Ok(())
        }),
    );

    thread::scope(|scope| {
        let worker = scope.spawn(|| dispatcher.notify(&mut Event::new("job.run").unwrap()));

        barrier.wait();
        dispatcher.connect("job.run", counting(&late_calls));
        barrier.wait();

        worker.join().unwrap().unwrap();
    });

    assert_eq!(late_calls.load(Ordering::SeqCst), 0);

    dispatcher.notify(&mut Event::new("job.run").unwrap()).unwrap();
    assert_eq!(late_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_connects_are_all_kept() {
    let dispatcher = Dispatcher::new();
    let counter = Arc::new(AtomicU32::new(0));

    thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..25 {
                    dispatcher.connect("metrics.flush", counting(&counter));
                }
            });
        }
    });

    assert_eq!(dispatcher.listener_count("metrics.flush"), 200);
    dispatcher
        .notify(&mut Event::new("metrics.flush").unwrap())
        .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 200);
}
