//! # HTTP request payload
//!
//! Each reading is transmitted as a single HTTP/1.1 GET request, with the values as query
//! parameters.
//!
//! ````
//! use esp_at_telemetry::config::NetworkConfig;
//! use esp_at_telemetry::payload::{build_request, SensorReading};
//!
//! let network = NetworkConfig::new("test_wifi", "secret", "example.org", 80);
//! let request = build_request(&network, &SensorReading::new(412, 231, 7)).unwrap();
//!
//! assert_eq!(
//!     "GET /update?gas=412&temperature=231&aux=7 HTTP/1.1\r\nHost: example.org\r\nConnection: close\r\n\r\n",
//!     request.as_str()
//! );
//! ````
use crate::commands::ValidationError;
use crate::config::{NetworkConfig, MAX_PAYLOAD_LENGTH};
use core::fmt::Write;
use heapless::String;

/// Encoded HTTP request, bounded to [MAX_PAYLOAD_LENGTH]
pub type Request = String<MAX_PAYLOAD_LENGTH>;

/// Raw analog samples of a single measurement. No calibration is applied.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorReading {
    pub gas: u16,
    pub temperature: u16,
    pub aux: u16,
}

impl SensorReading {
    pub const fn new(gas: u16, temperature: u16, aux: u16) -> Self {
        Self { gas, temperature, aux }
    }
}

/// Renders the GET request for the given reading. Fails if the request exceeds [MAX_PAYLOAD_LENGTH].
pub fn build_request(network: &NetworkConfig, reading: &SensorReading) -> Result<Request, ValidationError> {
    let mut request = Request::new();

    write!(
        request,
        "GET {}?gas={}&temperature={}&aux={} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        network.path, reading.gas, reading.temperature, reading.aux, network.host
    )
    .map_err(|_| ValidationError::PayloadTooLong)?;

    Ok(request)
}
