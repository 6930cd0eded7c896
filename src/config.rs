//! # Build time configuration
//!
//! Protocol limits, network credentials and the timing of every lifecycle stage. All values are
//! plain constants and get passed by value into [Session](crate::session::Session) and
//! [Adapter](crate::wifi::Adapter). There is no runtime reconfiguration.
//!
//! ## Example
//!
//! ````
//! use esp_at_telemetry::config::{LifecycleConfig, NetworkConfig, SessionConfig};
//!
//! const NETWORK: NetworkConfig = NetworkConfig::new("test_wifi", "secret", "10.0.0.1", 80);
//! const CONFIG: SessionConfig = SessionConfig::new(NETWORK, LifecycleConfig::DEFAULT);
//!
//! assert_eq!(3, CONFIG.lifecycle.join_retry.max_attempts);
//! assert_eq!(5_000, CONFIG.sample_interval_ms);
//! ````
use crate::retry::RetryPolicy;

/// Max. length of a single AT command line, excluding the CRLF terminator
pub const MAX_CMD_LENGTH: usize = 128;

/// Capacity of the response buffer of a single transaction
pub const MAX_RESPONSE_LENGTH: usize = 512;

/// Number of bytes freed when the response buffer runs full
pub const SAFETY_MARGIN: usize = 32;

/// Max. number of stale input bytes dropped before a command is sent
pub const MAX_DISCARD_LENGTH: usize = MAX_RESPONSE_LENGTH;

/// Max. length of the HTTP request sent to the server
pub const MAX_PAYLOAD_LENGTH: usize = 384;

/// Delay between two polls of the transport while waiting for a token
pub const POLL_INTERVAL_MS: u32 = 10;

/// Default attempt count of all retried lifecycle stages
pub const DEFAULT_MAX_RETRIES: u8 = 3;

/// Target access point and server endpoint
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NetworkConfig {
    /// SSID of the access point
    pub ssid: &'static str,

    /// Password/key of the access point
    pub password: &'static str,

    /// Server hostname or IP address
    pub host: &'static str,

    /// Server TCP port
    pub port: u16,

    /// HTTP path the readings are sent to
    pub path: &'static str,
}

impl NetworkConfig {
    pub const fn new(ssid: &'static str, password: &'static str, host: &'static str, port: u16) -> Self {
        Self {
            ssid,
            password,
            host,
            port,
            path: "/update",
        }
    }

    /// Overrides the default HTTP path
    pub const fn with_path(mut self, path: &'static str) -> Self {
        self.path = path;
        self
    }
}

/// Timeouts of the single AT transactions in milliseconds
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Timeouts {
    /// Waiting for the boot banner after module reset
    pub reset_ms: u32,

    /// Bare liveness probe
    pub probe_ms: u32,

    /// Setting and querying the WIFI mode
    pub mode_ms: u32,

    /// Joining the access point
    pub join_ms: u32,

    /// Status queries
    pub status_ms: u32,

    /// Local address query
    pub address_ms: u32,

    /// Opening the TCP connection
    pub connect_ms: u32,

    /// Waiting for the send prompt
    pub send_prompt_ms: u32,

    /// Waiting for the send confirmation after the payload was written
    pub send_ack_ms: u32,

    /// Closing the TCP connection
    pub close_ms: u32,
}

impl Timeouts {
    pub const DEFAULT: Self = Self {
        reset_ms: 5_000,
        probe_ms: 2_000,
        mode_ms: 1_000,
        join_ms: 30_000,
        status_ms: 3_000,
        address_ms: 3_000,
        connect_ms: 10_000,
        send_prompt_ms: 5_000,
        send_ack_ms: 8_000,
        close_ms: 5_000,
    };
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Timeouts and retry policies of the connection lifecycle
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LifecycleConfig {
    pub timeouts: Timeouts,

    /// Module reset
    pub reset_retry: RetryPolicy,

    /// Access point association
    pub join_retry: RetryPolicy,

    /// TCP connection establishment
    pub connect_retry: RetryPolicy,

    /// Send prompt, payload and confirmation
    pub send_retry: RetryPolicy,
}

impl LifecycleConfig {
    pub const DEFAULT: Self = Self {
        timeouts: Timeouts::DEFAULT,
        reset_retry: RetryPolicy::linear(DEFAULT_MAX_RETRIES, 1_000),
        join_retry: RetryPolicy::linear(DEFAULT_MAX_RETRIES, 5_000),
        connect_retry: RetryPolicy::linear(DEFAULT_MAX_RETRIES, 2_000),
        send_retry: RetryPolicy::linear(DEFAULT_MAX_RETRIES, 1_000),
    };
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Configuration of the whole session
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub network: NetworkConfig,

    pub lifecycle: LifecycleConfig,

    /// Policy for running the complete WIFI lifecycle at startup
    pub startup_retry: RetryPolicy,

    /// Wait time before restarting the device after the startup failed
    pub restart_cooldown_ms: u32,

    /// Interval between two sensor readings
    pub sample_interval_ms: u32,
}

impl SessionConfig {
    pub const fn new(network: NetworkConfig, lifecycle: LifecycleConfig) -> Self {
        Self {
            network,
            lifecycle,
            startup_retry: RetryPolicy::linear(3, 5_000),
            restart_cooldown_ms: 10_000,
            sample_interval_ms: 5_000,
        }
    }
}
