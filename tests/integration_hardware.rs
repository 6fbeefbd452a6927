//! Hardware integration tests against a real fan controller.
//!
//! These tests require the board on a serial port and are ignored by default.
//! Run with: FANCONTROLLER_TEST_PORT=/dev/ttyUSB0 cargo test --features hardware-tests -- --ignored

#![cfg(feature = "hardware-tests")]

mod common;

use common::{wait_until, RecordingObserver};
use fancontroller::session::{Session, SessionObserver, SessionOptions, SessionState};
use std::env;
use std::sync::Arc;
use std::time::Duration;

fn test_port() -> Option<String> {
    env::var("FANCONTROLLER_TEST_PORT").ok()
}

#[test]
#[ignore]
fn test_real_controller_handshake_and_query() {
    let Some(port) = test_port() else {
        eprintln!("FANCONTROLLER_TEST_PORT not set, skipping");
        return;
    };

    let observer = Arc::new(RecordingObserver::default());
    let session = Session::with_system_ports(
        Arc::clone(&observer) as Arc<dyn SessionObserver>,
        SessionOptions::default(),
    );

    session.connect(&port).expect("controller should answer within the handshake budget");
    assert_eq!(session.state(), SessionState::Connected);
    assert!(session.status().is_some());

    assert!(
        wait_until(Duration::from_secs(5), || session.config().is_some()),
        "controller never reported its configuration"
    );
    let config = session.config().unwrap();
    println!("Controller configuration: {config:?}");

    session.stop();
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
#[ignore]
fn test_reapplying_current_config_is_accepted() {
    let Some(port) = test_port() else {
        eprintln!("FANCONTROLLER_TEST_PORT not set, skipping");
        return;
    };

    let observer = Arc::new(RecordingObserver::default());
    let session = Session::with_system_ports(
        Arc::clone(&observer) as Arc<dyn SessionObserver>,
        SessionOptions::default(),
    );
    session.connect(&port).unwrap();
    assert!(wait_until(Duration::from_secs(5), || session.config().is_some()));

    let current = *session.config().unwrap();
    session.apply_config(&current).unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        observer.count(|e| *e == fancontroller::SessionEvent::ApplyAccepted) == 1
    }));
    assert!(wait_until(Duration::from_secs(5), || {
        session.config().is_some_and(|config| *config == current)
    }));

    session.stop();
}
