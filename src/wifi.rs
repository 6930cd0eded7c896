//! # WIFI access point client
//!
//! Joining a network runs a fixed sequence of stages, each one a precondition for the next:
//!
//! 1. Module reset, retried with backoff
//! 2. Liveness probe, single attempt
//! 3. Station mode set and verified
//! 4. Access point association, retried with backoff
//! 5. Status verification, which must report an obtained IP
//! 6. Local address query, best-effort
//!
//! ## Example
//!
//! ````
//! # use esp_at_telemetry::example::{ExampleDelay, ExampleTimer, ExampleTransport};
//! use esp_at_telemetry::config::{LifecycleConfig, NetworkConfig};
//! use esp_at_telemetry::stack::ConnectionState;
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
//! assert_eq!(ConnectionState::WifiAssociated, adapter.state());
//!
//! let address = adapter.get_address().unwrap();
//! assert_eq!("10:fe:ed:05:ba:50", address.mac.unwrap().as_str());
//! assert_eq!("10.0.0.181", address.ipv4.unwrap().to_string());
//! ````
use crate::commands::{join_command, Command, ValidationError};
use crate::config::{LifecycleConfig, NetworkConfig};
use crate::responses::{LocalAddressResponse, ModuleStatus};
use crate::retry::{retry_while, BackoffDelay};
use crate::stack::ConnectionState;
use crate::transaction::{CommandError, Engine};
use crate::transport::Transport;
use core::fmt::Debug;
use core::net::{Ipv4Addr, Ipv6Addr};
use core::str::FromStr;
use embedded_hal::delay::DelayNs;
use fugit_timer::Timer;
use heapless::String;
use log::{debug, info, warn};

/// Wifi network adapter trait
pub trait WifiAdapter {
    /// Error when joining a WIFI network
    type JoinError: Debug;

    /// Error when receiving local address information
    type AddressError: Debug;

    /// Runs the complete WIFI lifecycle from module reset until association
    fn connect_wifi(&mut self, network: &NetworkConfig) -> Result<(), Self::JoinError>;

    /// Returns local address information
    fn get_address(&mut self) -> Result<LocalAddress, Self::AddressError>;
}

/// Central client for network communication
pub struct Adapter<P: Transport, T: Timer<TIMER_HZ>, D: DelayNs, const TIMER_HZ: u32> {
    /// AT transaction engine
    pub(crate) engine: Engine<P, T, D, TIMER_HZ>,

    /// Timeouts and retry policies
    pub(crate) config: LifecycleConfig,

    /// Logical connection state, updated on each completed stage
    pub(crate) state: ConnectionState,
}

/// Possible errors when joining an access point
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JoinError {
    /// Module did not restart, even after retrying
    ResetFailed(CommandError),

    /// Module did not respond to the liveness probe
    Unresponsive(CommandError),

    /// Error while setting or verifying the station mode
    ModeError(CommandError),

    /// SSID and password do not fit into a single command line
    InvalidCredentials(ValidationError),

    /// Error while joining the access point, even after retrying
    ConnectError(CommandError),

    /// Associated to the access point, but the status does not report a usable network path
    NoNetworkPath(CommandError),
}

/// Errors when receiving local address information
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressError {
    /// CIFSR command failed
    CommandError(CommandError),

    /// Error while parsing addresses
    AddressParseError,
}

impl<P: Transport, T: Timer<TIMER_HZ>, D: DelayNs, const TIMER_HZ: u32> WifiAdapter for Adapter<P, T, D, TIMER_HZ> {
    type JoinError = JoinError;
    type AddressError = AddressError;

    /// Succeeds only if reset, probe, mode set, association and status verification succeeded.
    /// A failing address query gets just logged.
    fn connect_wifi(&mut self, network: &NetworkConfig) -> Result<(), JoinError> {
        info!("Connecting to WIFI {:?}...", network.ssid);
        self.set_state(ConnectionState::Idle);

        self.reset_module()?;
        self.probe()?;
        self.set_station_mode()?;
        self.join_access_point(network.ssid, network.password)?;
        self.verify_association()?;

        match self.get_address() {
            Ok(address) => info!("Joined {:?}, local address: {:?}", network.ssid, address),
            Err(error) => warn!("Joined {:?}, but address query failed: {:?}", network.ssid, error),
        }

        Ok(())
    }

    /// Returns local address information
    fn get_address(&mut self) -> Result<LocalAddress, AddressError> {
        let response = self
            .engine
            .query(&Command::local_address(&self.config.timeouts))
            .map_err(AddressError::CommandError)?;
        let response = response.as_str().ok_or(AddressError::AddressParseError)?;

        LocalAddress::from_responses(LocalAddressResponse::parse_all(response))
    }
}

impl<P: Transport, T: Timer<TIMER_HZ>, D: DelayNs, const TIMER_HZ: u32> Adapter<P, T, D, TIMER_HZ> {
    /// Creates a new network adapter
    pub fn new(transport: P, timer: T, delay: D, config: LifecycleConfig) -> Self {
        Self {
            engine: Engine::new(transport, timer, delay),
            config,
            state: ConnectionState::Idle,
        }
    }

    /// Returns the current logical connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Direct access to the transaction engine, e.g. for sending custom commands
    pub fn engine(&mut self) -> &mut Engine<P, T, D, TIMER_HZ> {
        &mut self.engine
    }

    pub(crate) fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            debug!("Connection state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Restarts the module and waits for the boot banner
    fn reset_module(&mut self) -> Result<(), JoinError> {
        let command = Command::restart(&self.config.timeouts);
        let policy = self.config.reset_retry;

        retry_while(self, &policy, "Module reset", CommandError::is_retryable, |adapter| {
            adapter.engine.execute(&command)
        })
        .map_err(JoinError::ResetFailed)?;

        self.set_state(ConnectionState::ModuleReady);
        Ok(())
    }

    /// Bare liveness check, not retried
    fn probe(&mut self) -> Result<(), JoinError> {
        self.engine
            .execute(&Command::probe(&self.config.timeouts))
            .map_err(JoinError::Unresponsive)
    }

    /// Switches to station mode and verifies the mode afterwards
    fn set_station_mode(&mut self) -> Result<(), JoinError> {
        let timeouts = self.config.timeouts;

        self.engine
            .execute(&Command::station_mode(&timeouts))
            .map_err(JoinError::ModeError)?;
        self.engine
            .execute(&Command::query_station_mode(&timeouts))
            .map_err(JoinError::ModeError)
    }

    /// Sends the WIFI credentials. The command is validated before the first attempt.
    fn join_access_point(&mut self, ssid: &str, password: &str) -> Result<(), JoinError> {
        let text = join_command(ssid, password).map_err(|error| {
            warn!("Credentials for {:?} exceed the command length", ssid);
            JoinError::InvalidCredentials(error)
        })?;
        let command = Command::ok(text.as_str(), self.config.timeouts.join_ms);
        let policy = self.config.join_retry;

        retry_while(self, &policy, "Access point join", CommandError::is_retryable, |adapter| {
            adapter.engine.execute(&command)
        })
        .map_err(JoinError::ConnectError)
    }

    /// Requires the status to report an obtained IP
    fn verify_association(&mut self) -> Result<(), JoinError> {
        let command = Command::status(ModuleStatus::Associated, &self.config.timeouts);

        self.engine.execute(&command).map_err(|error| {
            warn!("Associated, but no usable network path: {:?}", error);
            JoinError::NoNetworkPath(error)
        })?;

        self.set_state(ConnectionState::WifiAssociated);
        Ok(())
    }
}

impl<P: Transport, T: Timer<TIMER_HZ>, D: DelayNs, const TIMER_HZ: u32> BackoffDelay for Adapter<P, T, D, TIMER_HZ> {
    fn backoff_ms(&mut self, duration_ms: u32) {
        self.engine.backoff_ms(duration_ms);
    }
}

/// Local IP and MAC addresses
#[derive(Default, Clone, Debug, PartialEq)]
pub struct LocalAddress {
    /// Local IPv4 address if assigned
    pub ipv4: Option<Ipv4Addr>,

    /// Local MAC address
    pub mac: Option<String<17>>,

    /// Link local IPv6 address if assigned
    pub ipv6_link_local: Option<Ipv6Addr>,

    /// Global IPv6 address if assigned
    pub ipv6_global: Option<Ipv6Addr>,
}

impl LocalAddress {
    pub(crate) fn from_responses<'a>(
        responses: impl Iterator<Item = LocalAddressResponse<'a>>,
    ) -> Result<Self, AddressError> {
        let mut data = Self::default();

        for response in responses {
            match response.address_type {
                "STAIP" => {
                    data.ipv4 = Some(Ipv4Addr::from_str(response.address).map_err(|_| AddressError::AddressParseError)?)
                }
                "STAIP6LL" => {
                    data.ipv6_link_local =
                        Some(Ipv6Addr::from_str(response.address).map_err(|_| AddressError::AddressParseError)?)
                }
                "STAIP6GL" => {
                    data.ipv6_global =
                        Some(Ipv6Addr::from_str(response.address).map_err(|_| AddressError::AddressParseError)?)
                }
                "STAMAC" => {
                    data.mac = Some(String::from_str(response.address).map_err(|_| AddressError::AddressParseError)?);
                }
                _ => {}
            }
        }

        Ok(data)
    }
}
