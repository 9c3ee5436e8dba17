//! LED panel demo against a simulated property service
//!
//! Blinks the vendor LED once a second and prints the gauge as the simulated
//! sensor sweeps its range. Readings are delivered on the main thread through
//! a dispatcher, the way a UI would receive them.
//!
//! Run with: cargo run -p vendor-bridge --example led_panel
//!
//! Set `VHAL_LOG_MODE=development` to see the bridge's logs, `VHAL_GAUGE=off`
//! to run LED-only, or `VHAL_POLL_INTERVAL_MS` to change the poll rate.
//! Stops after 10 seconds or on Ctrl+C.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use property_client::logging;
use property_service::{InMemoryConnector, InMemoryPropertyService, RawValue, AREA, I2C_CONTROL_INT, LED_CONTROL};
use vendor_bridge::{BridgeConfig, BridgeError, Dispatched, Dispatcher, GaugeReading, VendorBridge};

const RUN_FOR: Duration = Duration::from_secs(10);
const BLINK: Duration = Duration::from_secs(1);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = logging::init_logging_from_env() {
        eprintln!("logging disabled: {e}");
    }

    println!("Vendor LED panel");
    println!("================");

    let service = InMemoryPropertyService::new()
        .with_property(LED_CONTROL, AREA, RawValue::Int32(0))
        .with_property(I2C_CONTROL_INT, AREA, RawValue::Int32(0));

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;

    // Simulated hardware: the sensor sweeps 0..=66 and back
    let sensor = service.clone();
    let sweeping = Arc::clone(&running);
    let sweeper = thread::spawn(move || {
        let mut raw = 0;
        let mut step = 3;
        while sweeping.load(Ordering::SeqCst) {
            sensor.poke(I2C_CONTROL_INT, AREA, RawValue::Int32(raw));
            if raw + step > 66 || raw + step < 0 {
                step = -step;
            }
            raw += step;
            thread::sleep(Duration::from_millis(100));
        }
    });

    let config = BridgeConfig::default().with_env_overrides()?;
    println!("Gauge: {}", if config.gauge.enabled { "on" } else { "off" });
    println!("Poll interval: {:?}\n", config.gauge.interval());

    let bridge = VendorBridge::connect(&InMemoryConnector::new(service), config);

    let ui = Dispatcher::new();
    match bridge.start_gauge(Dispatched::new(ui.handle(), |reading: GaugeReading| {
        let filled = usize::from(reading.percent) / 5;
        println!("gauge [{:<20}] {}", "#".repeat(filled), reading);
    })) {
        Ok(session) => println!("Gauge session {session} started"),
        Err(BridgeError::GaugeDisabled) => println!("Gauge disabled, LED only"),
        Err(e) => return Err(e.into()),
    }

    let started = Instant::now();
    let mut last_blink = Instant::now();
    while running.load(Ordering::SeqCst) && started.elapsed() < RUN_FOR {
        ui.run_for(Duration::from_millis(50));

        if last_blink.elapsed() >= BLINK {
            match bridge.toggle_led() {
                Ok(state) => println!("LED {state}"),
                Err(e) => println!("LED error: {e}"),
            }
            last_blink = Instant::now();
        }
    }

    running.store(false, Ordering::SeqCst);
    bridge.shutdown_gauge()?;
    bridge.led_off()?;
    let _ = sweeper.join();

    println!("\nGauge status at exit: {:?}", bridge.gauge_status());
    Ok(())
}
