//! # Session orchestration
//!
//! Top level recovery ladder:
//!
//! 1. Each lifecycle stage retries on its own
//! 2. At startup the whole WIFI lifecycle is retried, during operation a failed transmission
//!    triggers a single re-association
//! 3. If that fails as well, the device gets restarted
//!
//! ## Example
//!
//! ````
//! # use esp_at_telemetry::example::{ExampleDelay, ExampleDevice, ExampleSensors, ExampleTimer, ExampleTransport};
//! use esp_at_telemetry::config::{LifecycleConfig, NetworkConfig, SessionConfig};
//! use esp_at_telemetry::session::{Cycle, Session, Startup};
//! use esp_at_telemetry::wifi::Adapter;
//!
//! const CONFIG: SessionConfig =
//!     SessionConfig::new(NetworkConfig::new("test_wifi", "secret", "10.0.0.1", 80), LifecycleConfig::DEFAULT);
//!
//! let adapter: Adapter<_, _, _, 1_000_000> = Adapter::new(
//!     ExampleTransport::default(),
//!     ExampleTimer::default(),
//!     ExampleDelay,
//!     CONFIG.lifecycle,
//! );
//! let mut session = Session::new(adapter, ExampleSensors::default(), ExampleDevice::default(), ExampleDelay, CONFIG);
//!
//! assert_eq!(Startup::Connected, session.start());
//! assert_eq!(Cycle::Sent, session.cycle());
//! ````
use crate::config::SessionConfig;
use crate::payload::SensorReading;
use crate::retry::{with_retry, BackoffDelay};
use crate::stack::TelemetryStack;
use crate::wifi::WifiAdapter;
use embedded_hal::delay::DelayNs;
use log::{debug, error, info, warn};

/// Source of the analog readings
pub trait SensorSource {
    /// Samples all sensors once
    fn sample(&mut self) -> SensorReading;
}

/// Control over the host device
pub trait DeviceControl {
    /// Hard reset of the host. On real hardware this does not return.
    fn restart(&mut self);
}

/// Result of the startup phase
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Startup {
    /// WIFI lifecycle succeeded
    Connected,
    /// All attempts failed, device restart was issued
    Restarted,
}

/// Result of a single sampling cycle
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Cycle {
    /// Reading was transmitted
    Sent,
    /// Transmission failed, but re-association succeeded. The reading is dropped.
    Reassociated,
    /// Transmission and re-association failed, device restart was issued
    Restarted,
}

/// Drives sampling, transmission and recovery
pub struct Session<L: WifiAdapter + TelemetryStack, S: SensorSource, C: DeviceControl, D: DelayNs> {
    /// Network adapter
    pub(crate) link: L,

    pub(crate) sensors: S,

    pub(crate) device: C,

    /// Delay used for backoff, cooldown and sampling interval
    pub(crate) delay: D,

    pub(crate) config: SessionConfig,
}

impl<L: WifiAdapter + TelemetryStack, S: SensorSource, C: DeviceControl, D: DelayNs> Session<L, S, C, D> {
    pub fn new(link: L, sensors: S, device: C, delay: D, config: SessionConfig) -> Self {
        Self {
            link,
            sensors,
            device,
            delay,
            config,
        }
    }

    /// Runs the WIFI lifecycle with retries. If all attempts fail, the device is restarted after
    /// the configured cooldown.
    pub fn start(&mut self) -> Startup {
        let network = self.config.network;
        let policy = self.config.startup_retry;

        match with_retry(self, &policy, "WIFI startup", |session| session.link.connect_wifi(&network)) {
            Ok(_) => {
                info!("WIFI {:?} ready", network.ssid);
                Startup::Connected
            }
            Err(error) => {
                error!(
                    "WIFI startup failed: {:?}. Restarting device in {} ms",
                    error, self.config.restart_cooldown_ms
                );
                self.delay.delay_ms(self.config.restart_cooldown_ms);
                self.restart_device();
                Startup::Restarted
            }
        }
    }

    /// Samples the sensors and transmits the reading.
    /// On failure, the WIFI gets re-associated once, and if that fails, the device gets restarted.
    pub fn cycle(&mut self) -> Cycle {
        let network = self.config.network;
        let reading = self.sensors.sample();
        debug!("Sampled {:?}", reading);

        let error = match self.link.send_data(&network, &reading) {
            Ok(_) => return Cycle::Sent,
            Err(error) => error,
        };

        warn!("Transmission failed: {:?}. Re-associating WIFI...", error);
        match self.link.connect_wifi(&network) {
            Ok(_) => {
                info!("WIFI re-associated");
                Cycle::Reassociated
            }
            Err(error) => {
                error!("Re-association failed: {:?}. Restarting device", error);
                self.restart_device();
                Cycle::Restarted
            }
        }
    }

    /// Runs startup and sampling cycles forever
    pub fn run(&mut self) -> ! {
        loop {
            if self.start() == Startup::Restarted {
                continue;
            }

            while self.cycle() != Cycle::Restarted {
                self.delay.delay_ms(self.config.sample_interval_ms);
            }
        }
    }

    /// Returns the network adapter
    pub fn release(self) -> L {
        self.link
    }

    fn restart_device(&mut self) {
        error!("Restarting device");
        self.device.restart();
    }
}

impl<L: WifiAdapter + TelemetryStack, S: SensorSource, C: DeviceControl, D: DelayNs> BackoffDelay
    for Session<L, S, C, D>
{
    fn backoff_ms(&mut self, duration_ms: u32) {
        self.delay.delay_ms(duration_ms);
    }
}
