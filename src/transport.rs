//! # Serial transport
//!
//! The engine talks to the modem through the [Transport] trait. [SerialTransport] adapts any
//! blocking [embedded_io] serial peripheral.
use core::fmt::Debug;
use embedded_io::{Read, ReadReady, Write};

/// Byte oriented, buffered and bidirectional channel to the ESP-AT modem
pub trait Transport {
    type Error: Debug;

    /// Blocks until all queued output bytes have been transmitted
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Number of received bytes which can be read without blocking
    fn available(&mut self) -> usize;

    /// Reads a single received byte. Returns None if no byte is available.
    fn read(&mut self) -> Option<u8>;

    /// Writes all given bytes
    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}

/// [Transport] for [embedded_io] serial peripherals, e.g. a HAL UART driver
///
/// As [ReadReady] only signals if data is pending, `available()` reports at most one byte.
pub struct SerialTransport<S> {
    serial: S,
}

impl<S> SerialTransport<S> {
    pub fn new(serial: S) -> Self {
        Self { serial }
    }

    /// Returns the wrapped peripheral
    pub fn release(self) -> S {
        self.serial
    }
}

impl<S: Read + Write + ReadReady> Transport for SerialTransport<S> {
    type Error = S::Error;

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.serial.flush()
    }

    fn available(&mut self) -> usize {
        match self.serial.read_ready() {
            Ok(true) => 1,
            _ => 0,
        }
    }

    fn read(&mut self) -> Option<u8> {
        let mut byte = [0x0; 1];

        match self.serial.read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.serial.write_all(bytes)
    }
}
