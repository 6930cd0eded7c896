//! # AT command transaction engine
//!
//! Sends one command line and classifies the response by substring matching. A transaction ends as
//! soon as either the expected token or one of the [ErrorToken]s has been received, or when the
//! timeout expired.
//!
//! Stale input is discarded before each command, so bytes of a previous transaction can not cause
//! false matches. Retries are not handled here, s. [retry](crate::retry).
//!
//! ## Example
//!
//! ````
//! # use esp_at_telemetry::example::{ExampleDelay, ExampleTimer, ExampleTransport};
//! use esp_at_telemetry::commands::{Command, ErrorToken};
//! use esp_at_telemetry::transaction::{CommandError, Engine};
//!
//! let mut engine: Engine<_, _, _, 1_000_000> =
//!     Engine::new(ExampleTransport::default(), ExampleTimer::default(), ExampleDelay);
//!
//! engine.execute(&Command::ok("AT", 2_000)).unwrap();
//!
//! let error = engine.execute(&Command::ok("AT+CWLAP", 2_000)).unwrap_err();
//! assert_eq!(CommandError::ErrorDetected(ErrorToken::Error), error);
//! ````
use crate::buffer::ResponseBuffer;
use crate::commands::{Command, ErrorToken, ValidationError};
use crate::config::{MAX_DISCARD_LENGTH, POLL_INTERVAL_MS};
use crate::retry::BackoffDelay;
use crate::transport::Transport;
use embedded_hal::delay::DelayNs;
use fugit::TimerDurationU32;
use fugit_timer::Timer;
use log::{debug, error, trace, warn};

/// Classified outcome of a single transaction. `Ok(())` means the expected token was received.
pub type TransactionOutcome = Result<(), CommandError>;

/// Reasons why a transaction did not succeed
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Command was rejected before any I/O took place
    InvalidCommand(ValidationError),

    /// Module responded with an error token
    ErrorDetected(ErrorToken),

    /// Neither the expected token nor an error token was received in time.
    /// Contains the partial response for diagnostics.
    Timeout(ResponseBuffer),

    /// Writing to or flushing the transport failed
    TransportError,

    /// Upstream timer error
    TimerError,
}

impl CommandError {
    /// True for failures caused by invalid input, which must never be retried
    pub fn is_validation_error(&self) -> bool {
        matches!(self, CommandError::InvalidCommand(_))
    }

    /// True if another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        !self.is_validation_error()
    }
}

/// Executes AT transactions on the given transport
///
/// The timer is used for measuring the transaction deadline, the delay for sleeping between two
/// polls and between retry attempts.
pub struct Engine<P: Transport, T: Timer<TIMER_HZ>, D: DelayNs, const TIMER_HZ: u32> {
    pub(crate) transport: P,

    /// Timer used for timeout measurement
    pub(crate) timer: T,

    pub(crate) delay: D,
}

impl<P: Transport, T: Timer<TIMER_HZ>, D: DelayNs, const TIMER_HZ: u32> Engine<P, T, D, TIMER_HZ> {
    pub fn new(transport: P, timer: T, delay: D) -> Self {
        Self {
            transport,
            timer,
            delay,
        }
    }

    /// Sends the command and waits for the expected token
    pub fn execute(&mut self, command: &Command<'_>) -> TransactionOutcome {
        self.query(command).map(|_| ())
    }

    /// Same as [Engine::execute] but returns the received response on success
    pub fn query(&mut self, command: &Command<'_>) -> Result<ResponseBuffer, CommandError> {
        if let Err(error) = command.validate() {
            warn!("Rejected command {:?}: {:?}", command.text, error);
            return Err(CommandError::InvalidCommand(error));
        }

        self.discard_input()?;

        debug!(">> {}", command.text);
        self.write(command.text.as_bytes())?;
        self.write(b"\r\n")?;

        self.await_token(command.expected, command.timeout_ms)
    }

    /// Polls the transport until the expected token, an error token or the timeout.
    /// Does neither send anything nor discard pending input.
    pub fn await_token(&mut self, expected: &str, timeout_ms: u32) -> Result<ResponseBuffer, CommandError> {
        let mut response = ResponseBuffer::new();
        self.timer
            .start(TimerDurationU32::millis(timeout_ms))
            .map_err(|_| CommandError::TimerError)?;

        loop {
            while self.transport.available() > 0 {
                let Some(byte) = self.transport.read() else {
                    break;
                };
                response.push(byte);

                if response.ends_with(expected) {
                    trace!("<< {}", response);
                    debug!("Received expected token {:?}", expected);
                    return Ok(response);
                }

                if let Some(token) = Self::find_error_token(&response) {
                    trace!("<< {}", response);
                    debug!("Received error token {:?}", token.as_str());
                    return Err(CommandError::ErrorDetected(token));
                }

                // Continuous input must not extend the transaction
                if self.deadline_expired()? {
                    return Self::timeout(response, expected, timeout_ms);
                }
            }

            if self.deadline_expired()? {
                return Self::timeout(response, expected, timeout_ms);
            }

            self.delay.delay_ms(POLL_INTERVAL_MS);
        }
    }

    /// Writes the given bytes without any token matching, e.g. socket payload
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<(), CommandError> {
        debug!(">> [{} bytes raw data]", bytes.len());
        self.write(bytes)
    }

    /// Returns transport, timer and delay
    pub fn release(self) -> (P, T, D) {
        (self.transport, self.timer, self.delay)
    }

    /// Flushes the output queue and drops all unread input bytes
    fn discard_input(&mut self) -> Result<(), CommandError> {
        self.transport.flush().map_err(|e| {
            error!("Flushing transport failed: {:?}", e);
            CommandError::TransportError
        })?;

        let mut discarded = 0;
        while discarded < MAX_DISCARD_LENGTH && self.transport.available() > 0 {
            if self.transport.read().is_none() {
                break;
            }
            discarded += 1;
        }

        if discarded >= MAX_DISCARD_LENGTH {
            warn!("Input still pending after discarding {} bytes", discarded);
        } else if discarded > 0 {
            trace!("Discarded {} stale bytes", discarded);
        }

        Ok(())
    }

    /// Returns true once the timer started by [Engine::await_token] expired
    fn deadline_expired(&mut self) -> Result<bool, CommandError> {
        match self.timer.wait() {
            Ok(_) => Ok(true),
            Err(nb::Error::WouldBlock) => Ok(false),
            Err(nb::Error::Other(_)) => Err(CommandError::TimerError),
        }
    }

    fn timeout(response: ResponseBuffer, expected: &str, timeout_ms: u32) -> Result<ResponseBuffer, CommandError> {
        trace!("<< {}", response);
        debug!("Timeout after {} ms waiting for {:?}", timeout_ms, expected);
        Err(CommandError::Timeout(response))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), CommandError> {
        self.transport.write(bytes).map_err(|e| {
            error!("Writing to transport failed: {:?}", e);
            CommandError::TransportError
        })
    }

    fn find_error_token(response: &ResponseBuffer) -> Option<ErrorToken> {
        ErrorToken::ALL.into_iter().find(|token| response.ends_with(token.as_str()))
    }
}

impl<P: Transport, T: Timer<TIMER_HZ>, D: DelayNs, const TIMER_HZ: u32> BackoffDelay for Engine<P, T, D, TIMER_HZ> {
    fn backoff_ms(&mut self, duration_ms: u32) {
        self.delay.delay_ms(duration_ms);
    }
}
