use std::path::PathBuf;
use std::sync::Arc;

use dht_opcua::cache::{spawn_poller, Poller, SampleCache};
use dht_opcua::config::{Config, CONFIG_ENV};
use dht_opcua::diagnosis::{DiagnosisLed, GpioLed, LedPin, LoggingLed};
use dht_opcua::opcua_server::SensorServer;
use dht_opcua::sensor::{DhtSensor, SensorReader, SimulatedSensor};
use tokio::runtime::Handle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config_path = std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os(CONFIG_ENV))
        .map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    tracing::info!("Starting DHT OPC UA server");

    // Sensor and cache
    let cache = Arc::new(SampleCache::new(config.sensor.staleness()));
    let reader: Box<dyn SensorReader> = if config.sensor.simulate {
        tracing::info!("Using simulated {} sensor", config.sensor.kind.name());
        Box::new(
            SimulatedSensor::new(config.sensor.kind)
                .with_failure_rate(config.sensor.simulated_failure_rate),
        )
    } else {
        Box::new(DhtSensor::new(config.sensor.kind, config.sensor.gpio_pin))
    };

    // Diagnosis LED, falling back to log output without GPIO
    let led_pin: Box<dyn LedPin> = if config.sensor.simulate {
        Box::new(LoggingLed)
    } else {
        match GpioLed::open(config.diagnosis.gpio_pin) {
            Ok(pin) => Box::new(pin),
            Err(e) => {
                tracing::warn!("Diagnosis LED unavailable, only logging commands: {:#}", e);
                Box::new(LoggingLed)
            }
        }
    };
    let mut led = DiagnosisLed::new(led_pin, config.diagnosis.receiver.as_str());
    if let Some(hold) = config.diagnosis.hold() {
        led = led.with_hold(hold, Handle::current());
    }
    let led = Arc::new(led);

    let server = SensorServer::new(&config, cache.clone(), led)?;
    let layout = server.layout().clone();

    let poll = spawn_poller(Poller::new(reader, cache), config.sensor.poll_interval());
    let server = server.start()?;

    tracing::info!("Backend initialized:");
    tracing::info!(
        "  - {} on GPIO {} every {} ms",
        config.sensor.kind.name(),
        config.sensor.gpio_pin,
        config.sensor.poll_interval_ms
    );
    tracing::info!(
        "  - Temperature {} / Humidity {}",
        layout.temperature,
        layout.humidity
    );
    tracing::info!(
        "  - dropMessage {} for receiver {:?}",
        layout.drop_message,
        config.diagnosis.receiver
    );

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        _ = poll => {
            tracing::error!("Sensor poll loop terminated");
        }
    }

    tokio::task::spawn_blocking(move || server.stop()).await??;

    tracing::info!("Shutting down");
    Ok(())
}
