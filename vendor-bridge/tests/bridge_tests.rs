//! End-to-end bridge behaviour against the in-memory property service

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use proptest::prelude::*;

use property_service::{
    CallKind, InMemoryConnector, InMemoryPropertyService, PropertyId, RawValue, AREA, I2C_CONTROL_INT, LED_CONTROL,
};
use vendor_bridge::{
    BridgeConfig, BridgeError, Dispatched, Dispatcher, GaugeReading, GaugeStatus, LedState, VendorBridge,
};

// ============================================================================
// Test Helpers
// ============================================================================

const INTERVAL: Duration = Duration::from_millis(20);

fn service(sensor: i32) -> InMemoryPropertyService {
    InMemoryPropertyService::new()
        .with_property(LED_CONTROL, AREA, RawValue::Int32(0))
        .with_property(I2C_CONTROL_INT, AREA, RawValue::Int32(sensor))
}

fn bridge(service: &InMemoryPropertyService) -> VendorBridge {
    let config = BridgeConfig::default().with_poll_interval(INTERVAL);
    VendorBridge::connect(&InMemoryConnector::new(service.clone()), config)
}

/// Poll `check` until it holds or `timeout` runs out
fn eventually(timeout: Duration, check: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    check()
}

// ============================================================================
// LED
// ============================================================================

#[test]
fn test_led_writes_reach_the_service() {
    let backing = service(0);
    let bridge = bridge(&backing);

    bridge.led_on().unwrap();
    assert_eq!(backing.value(LED_CONTROL, AREA), Some(RawValue::Int32(1)));

    bridge.led_off().unwrap();
    assert_eq!(backing.value(LED_CONTROL, AREA), Some(RawValue::Int32(0)));

    let writes: Vec<_> = backing
        .calls()
        .into_iter()
        .filter(|call| call.kind == CallKind::Set)
        .map(|call| (call.property, call.area, call.value))
        .collect();
    assert_eq!(
        writes,
        vec![
            (LED_CONTROL, AREA, Some(RawValue::Int32(1))),
            (LED_CONTROL, AREA, Some(RawValue::Int32(0))),
        ]
    );
}

#[test]
fn test_led_failure_is_returned_not_panicked() {
    let backing = service(0);
    let bridge = bridge(&backing);

    backing.fail_next_sets(1);
    assert!(matches!(bridge.led_on(), Err(BridgeError::Property(_))));
    assert_eq!(bridge.led_state().unwrap(), LedState::Off);

    backing.disconnect();
    match bridge.led_on() {
        Err(BridgeError::Property(e)) => assert!(e.is_disconnect()),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_custom_led_property() {
    let custom = PropertyId::new(0x2140_0120);
    let backing = service(0);
    backing.register(custom, AREA, RawValue::Int32(0));

    let mut config = BridgeConfig::led_only();
    config.led.property = custom;
    let bridge = VendorBridge::connect(&InMemoryConnector::new(backing.clone()), config);

    bridge.set_led(LedState::On).unwrap();
    assert_eq!(backing.value(custom, AREA), Some(RawValue::Int32(1)));
    assert_eq!(backing.value(LED_CONTROL, AREA), Some(RawValue::Int32(0)));
}

#[test]
fn test_concurrent_led_writers_are_serialized() {
    let backing = service(0);
    backing.set_latency(Some(Duration::from_millis(1)));
    let bridge = Arc::new(bridge(&backing));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let bridge = Arc::clone(&bridge);
            thread::spawn(move || {
                for _ in 0..10 {
                    bridge.set_led(LedState::from(i % 2 == 0)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(backing.overlap_count(), 0);
    assert_eq!(backing.set_count(), 40);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_toggle_parity(toggles in 0usize..12) {
        let backing = service(0);
        let bridge = bridge(&backing);

        for _ in 0..toggles {
            bridge.toggle_led().unwrap();
        }

        let expected = if toggles % 2 == 1 { LedState::On } else { LedState::Off };
        prop_assert_eq!(bridge.led_state().unwrap(), expected);
    }
}

// ============================================================================
// Gauge
// ============================================================================

#[test]
fn test_gauge_follows_the_sensor() {
    let backing = service(0);
    let bridge = bridge(&backing);
    let (tx, rx) = mpsc::channel();

    bridge
        .start_gauge(move |reading: GaugeReading| {
            let _ = tx.send(reading);
        })
        .unwrap();
    assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap().percent, 0);

    backing.poke(I2C_CONTROL_INT, AREA, RawValue::Int32(66));
    let full = rx
        .iter()
        .take(50)
        .find(|reading| reading.raw == 66)
        .unwrap();
    assert_eq!(full, GaugeReading { raw: 66, mapped: 100, percent: 100 });

    bridge.shutdown_gauge().unwrap();
    assert_eq!(bridge.gauge_status(), GaugeStatus::Stopped);
}

#[test]
fn test_gauge_delivers_on_dispatcher_thread() {
    let backing = service(33);
    let bridge = bridge(&backing);
    let ui = Dispatcher::new();
    let owner = thread::current().id();
    let (tx, rx) = mpsc::channel();

    bridge
        .start_gauge(Dispatched::new(ui.handle(), move |reading: GaugeReading| {
            let _ = tx.send((thread::current().id(), reading.percent));
        }))
        .unwrap();

    assert!(ui.run_next_timeout(Duration::from_secs(1)));
    assert_eq!(rx.try_recv().unwrap(), (owner, 50));
    bridge.shutdown_gauge().unwrap();
}

#[test]
fn test_gauge_status_reports_faults_and_recovery() {
    let backing = service(33);
    let bridge = bridge(&backing);
    assert_eq!(bridge.gauge_status(), GaugeStatus::Idle);

    backing.fail_all_gets(true);
    bridge.start_gauge(|_: GaugeReading| {}).unwrap();

    assert!(eventually(Duration::from_secs(2), || matches!(
        bridge.gauge_status(),
        GaugeStatus::Faulted { consecutive_errors, .. } if consecutive_errors >= 2
    )));
    match bridge.gauge_status() {
        GaugeStatus::Faulted { last_error, .. } => assert!(last_error.contains("injected read failure")),
        other => panic!("unexpected status: {other:?}"),
    }

    backing.fail_all_gets(false);
    assert!(eventually(Duration::from_secs(2), || bridge.gauge_status() == GaugeStatus::Healthy));
    assert!(bridge.gauge_status().is_running());

    bridge.stop_gauge();
    assert_eq!(bridge.gauge_status(), GaugeStatus::Stopped);
}

#[test]
fn test_gauge_restart() {
    let backing = service(33);
    let bridge = bridge(&backing);

    let first = bridge.start_gauge(|_: GaugeReading| {}).unwrap();
    assert!(matches!(
        bridge.start_gauge(|_: GaugeReading| {}),
        Err(BridgeError::Polling(_))
    ));

    bridge.stop_gauge();
    let second = bridge.start_gauge(|_: GaugeReading| {}).unwrap();
    assert_ne!(first, second);
    bridge.shutdown_gauge().unwrap();
}

#[test]
fn test_dropping_bridge_stops_polling() {
    let backing = service(33);
    let bridge = bridge(&backing);

    bridge.start_gauge(|_: GaugeReading| {}).unwrap();
    assert!(eventually(Duration::from_secs(1), || backing.get_count() >= 2));
    drop(bridge);

    thread::sleep(INTERVAL * 3);
    let settled = backing.get_count();
    thread::sleep(INTERVAL * 5);
    assert_eq!(backing.get_count(), settled);
}

#[test]
fn test_led_and_gauge_share_the_connection_safely() {
    let backing = service(33);
    backing.set_latency(Some(Duration::from_millis(1)));
    let bridge = bridge(&backing);

    bridge.start_gauge(|_: GaugeReading| {}).unwrap();
    for _ in 0..20 {
        bridge.toggle_led().unwrap();
    }
    bridge.shutdown_gauge().unwrap();

    assert_eq!(backing.overlap_count(), 0);
    assert_eq!(bridge.led_state().unwrap(), LedState::Off);
}

#[test]
fn test_config_from_env_style_overrides() {
    let config = BridgeConfig::default()
        .with_overrides_from(|var| (var == "VHAL_GAUGE").then(|| "off".to_string()))
        .unwrap();
    let bridge = VendorBridge::connect(&InMemoryConnector::new(service(0)), config);

    assert!(matches!(
        bridge.start_gauge(|_: GaugeReading| {}),
        Err(BridgeError::GaugeDisabled)
    ));
    bridge.led_on().unwrap();
}
