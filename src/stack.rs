//! # TCP data transmission
//!
//! A single TCP session per reading: connect, transmit the HTTP request, close.
//!
//! The connection gets closed on every exit path, including validation errors and exhausted
//! retries. A failing close is only logged.
//!
//! ## Example
//!
//! ````
//! # use esp_at_telemetry::example::{ExampleDelay, ExampleTimer, ExampleTransport};
//! use esp_at_telemetry::config::{LifecycleConfig, NetworkConfig};
//! use esp_at_telemetry::payload::SensorReading;
//! use esp_at_telemetry::stack::{ConnectionState, TelemetryStack};
//! use esp_at_telemetry::wifi::{Adapter, WifiAdapter};
//!
//! let network = NetworkConfig::new("test_wifi", "secret", "10.0.0.1", 80);
//! let mut adapter: Adapter<_, _, _, 1_000_000> = Adapter::new(
//!     ExampleTransport::default(),
//!     ExampleTimer::default(),
//!     ExampleDelay,
//!     LifecycleConfig::DEFAULT,
//! );
//!
//! adapter.connect_wifi(&network).unwrap();
//! adapter.send_data(&network, &SensorReading::new(412, 231, 7)).unwrap();
//!
//! assert_eq!(ConnectionState::TcpClosed, adapter.state());
//! ````
use crate::commands::{connect_command, send_prepare_command, Command, ValidationError, SEND_OK, SEND_PROMPT};
use crate::config::NetworkConfig;
use crate::payload::{build_request, SensorReading};
use crate::responses::ModuleStatus;
use crate::retry::retry_while;
use crate::transaction::CommandError;
use crate::transport::Transport;
use crate::wifi::Adapter;
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use fugit_timer::Timer;
use log::{debug, error, info, warn};

/// Sends sensor readings to the configured server
pub trait TelemetryStack {
    type Error: Debug;

    /// Opens a TCP session, transmits the reading as HTTP request and closes the session.
    /// Expects an already associated WIFI.
    fn send_data(&mut self, network: &NetworkConfig, reading: &SensorReading) -> Result<(), Self::Error>;
}

/// Logical connection state
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    /// Module was not reset yet or the reset failed
    #[default]
    Idle,
    /// Module restarted and booted
    ModuleReady,
    /// Joined to the access point and an IP was obtained
    WifiAssociated,
    /// TCP connection is established
    TcpOpen,
    /// Data transmission was confirmed by the module
    DataSent,
    /// TCP connection close was attempted
    TcpClosed,
}

/// Data transmission related errors
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError {
    /// Server host does not fit into the connect command
    InvalidEndpoint(ValidationError),

    /// TCP connect command failed or status did not confirm the connection, even after retrying
    ConnectError(CommandError),

    /// HTTP request exceeds the max. payload length
    InvalidPayload(ValidationError),

    /// Transmission of data failed, even after retrying
    SendFailed(CommandError),
}

impl<P: Transport, T: Timer<TIMER_HZ>, D: DelayNs, const TIMER_HZ: u32> TelemetryStack for Adapter<P, T, D, TIMER_HZ> {
    type Error = SendError;

    /// Exactly one close command is sent per call, independent of the result
    fn send_data(&mut self, network: &NetworkConfig, reading: &SensorReading) -> Result<(), SendError> {
        let result = self.transmit(network, reading);
        self.close_connection();

        match &result {
            Ok(_) => info!("Sent {:?} to {}:{}", reading, network.host, network.port),
            Err(error) => error!("Sending {:?} failed: {:?}", reading, error),
        }

        result
    }
}

impl<P: Transport, T: Timer<TIMER_HZ>, D: DelayNs, const TIMER_HZ: u32> Adapter<P, T, D, TIMER_HZ> {
    fn transmit(&mut self, network: &NetworkConfig, reading: &SensorReading) -> Result<(), SendError> {
        let command = connect_command(network.host, network.port).map_err(|error| {
            warn!("Host {:?} exceeds the command length", network.host);
            SendError::InvalidEndpoint(error)
        })?;
        self.open_connection(command.as_str())?;

        let request = build_request(network, reading).map_err(|error| {
            warn!("HTTP request for {:?} exceeds the payload length", reading);
            SendError::InvalidPayload(error)
        })?;
        self.send_payload(request.as_bytes())
    }

    /// Opens the TCP connection. An attempt only succeeds if the status confirms the connection.
    fn open_connection(&mut self, text: &str) -> Result<(), SendError> {
        let timeouts = self.config.timeouts;
        let policy = self.config.connect_retry;
        let command = Command::ok(text, timeouts.connect_ms);
        let status = Command::status(ModuleStatus::TcpConnected, &timeouts);

        retry_while(self, &policy, "TCP connect", CommandError::is_retryable, |adapter| {
            adapter.engine.execute(&command)?;
            adapter.engine.execute(&status)
        })
        .map_err(SendError::ConnectError)?;

        self.set_state(ConnectionState::TcpOpen);
        Ok(())
    }

    /// Waits for the send prompt, writes the raw payload and waits for the confirmation.
    /// The three steps are retried together.
    fn send_payload(&mut self, payload: &[u8]) -> Result<(), SendError> {
        let timeouts = self.config.timeouts;
        let policy = self.config.send_retry;
        let text = send_prepare_command(payload.len()).map_err(SendError::InvalidPayload)?;
        let prepare = Command::new(text.as_str(), SEND_PROMPT, timeouts.send_prompt_ms);

        retry_while(self, &policy, "Data send", CommandError::is_retryable, |adapter| {
            adapter.engine.execute(&prepare)?;
            adapter.engine.write_raw(payload)?;
            adapter.engine.await_token(SEND_OK, timeouts.send_ack_ms).map(|_| ())
        })
        .map_err(SendError::SendFailed)?;

        self.set_state(ConnectionState::DataSent);
        Ok(())
    }

    /// Best-effort close, errors are just logged
    fn close_connection(&mut self) {
        let command = Command::close(&self.config.timeouts);

        match self.engine.execute(&command) {
            Ok(_) => debug!("TCP connection closed"),
            Err(error) => warn!("Closing TCP connection failed: {:?}", error),
        }

        self.set_state(ConnectionState::TcpClosed);
    }
}
