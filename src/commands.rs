use crate::config::{MAX_CMD_LENGTH, Timeouts};
use crate::responses::ModuleStatus;
use core::fmt::Write;
use heapless::String;

/// Default success token of most commands
pub const OK: &str = "OK";

/// Boot banner printed by the module after restart
pub const READY: &str = "ready";

/// Prompt signaling that the module accepts the raw payload
pub const SEND_PROMPT: &str = ">";

/// Confirmation of a successful data transmission
pub const SEND_OK: &str = "SEND OK";

/// Response of the WIFI mode query when in station mode
pub const STATION_MODE: &str = "+CWMODE:1";

/// Encoded command line, bounded to [MAX_CMD_LENGTH]
pub type CommandText = String<MAX_CMD_LENGTH>;

/// A single AT transaction: command line, token to wait for and timeout
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Command<'a> {
    /// Command line without CRLF terminator
    pub text: &'a str,

    /// Substring whose appearance classifies the transaction as successful
    pub expected: &'a str,

    pub timeout_ms: u32,
}

/// Input validation failures. Always detected before any I/O takes place.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValidationError {
    /// Command line is empty
    EmptyCommand,

    /// Command line is longer then [MAX_CMD_LENGTH]
    CommandTooLong,

    /// No success token given
    EmptyToken,

    /// HTTP request exceeds [MAX_PAYLOAD_LENGTH](crate::config::MAX_PAYLOAD_LENGTH)
    PayloadTooLong,
}

/// Tokens signaling that the module rejected or failed a command
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorToken {
    Error,
    Fail,
    Busy,
}

impl ErrorToken {
    pub const ALL: [ErrorToken; 3] = [ErrorToken::Error, ErrorToken::Fail, ErrorToken::Busy];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorToken::Error => "ERROR",
            ErrorToken::Fail => "FAIL",
            ErrorToken::Busy => "busy",
        }
    }
}

impl<'a> Command<'a> {
    pub const fn new(text: &'a str, expected: &'a str, timeout_ms: u32) -> Self {
        Self {
            text,
            expected,
            timeout_ms,
        }
    }

    /// Command which just gets responded by OK
    pub const fn ok(text: &'a str, timeout_ms: u32) -> Self {
        Self::new(text, OK, timeout_ms)
    }

    /// Checks the length constraints of command line and token
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.text.is_empty() {
            return Err(ValidationError::EmptyCommand);
        }

        if self.text.len() > MAX_CMD_LENGTH {
            return Err(ValidationError::CommandTooLong);
        }

        if self.expected.is_empty() {
            return Err(ValidationError::EmptyToken);
        }

        Ok(())
    }

    /// Restarts the module and waits for the boot banner
    pub fn restart(timeouts: &Timeouts) -> Command<'static> {
        Command::new("AT+RST", READY, timeouts.reset_ms)
    }

    /// Bare liveness probe
    pub fn probe(timeouts: &Timeouts) -> Command<'static> {
        Command::ok("AT", timeouts.probe_ms)
    }

    /// Switches to station mode
    pub fn station_mode(timeouts: &Timeouts) -> Command<'static> {
        Command::ok("AT+CWMODE=1", timeouts.mode_ms)
    }

    /// Verifies that station mode is active
    pub fn query_station_mode(timeouts: &Timeouts) -> Command<'static> {
        Command::new("AT+CWMODE?", STATION_MODE, timeouts.mode_ms)
    }

    /// Queries the connection status and expects the given status code
    pub fn status(expected: ModuleStatus, timeouts: &Timeouts) -> Command<'static> {
        Command::new("AT+CIPSTATUS", expected.token(), timeouts.status_ms)
    }

    /// Obtains the local IP and MAC addresses
    pub fn local_address(timeouts: &Timeouts) -> Command<'static> {
        Command::ok("AT+CIFSR", timeouts.address_ms)
    }

    /// Closes the (single) TCP connection
    pub fn close(timeouts: &Timeouts) -> Command<'static> {
        Command::ok("AT+CIPCLOSE", timeouts.close_ms)
    }
}

/// Command for setting the target WIFI access point parameters, e.g. `AT+CWJAP="ssid","password"`
pub fn join_command(ssid: &str, password: &str) -> Result<CommandText, ValidationError> {
    let mut text = CommandText::new();
    write!(text, "AT+CWJAP=\"{}\",\"{}\"", ssid, password).map_err(|_| ValidationError::CommandTooLong)?;
    Ok(text)
}

/// Establishes a TCP connection, e.g. `AT+CIPSTART="TCP","10.0.0.1",80`
pub fn connect_command(host: &str, port: u16) -> Result<CommandText, ValidationError> {
    let mut text = CommandText::new();
    write!(text, "AT+CIPSTART=\"TCP\",\"{}\",{}", host, port).map_err(|_| ValidationError::CommandTooLong)?;
    Ok(text)
}

/// Prepares the transmission of the given byte count, e.g. `AT+CIPSEND=42`
pub fn send_prepare_command(length: usize) -> Result<CommandText, ValidationError> {
    let mut text = CommandText::new();
    write!(text, "AT+CIPSEND={}", length).map_err(|_| ValidationError::CommandTooLong)?;
    Ok(text)
}
