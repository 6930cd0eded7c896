//! Mocks for doc examples
use crate::payload::SensorReading;
use crate::session::{DeviceControl, SensorSource};
use crate::transport::Transport;
use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer;
use heapless::{Deque, String};

/// Transport mock simulating an ESP-AT modem with echo disabled
#[derive(Default)]
pub struct ExampleTransport {
    /// Command line currently being written
    line: String<256>,

    /// Pending response bytes
    rx: Deque<u8, 512>,

    /// Next write is socket payload
    prompt: bool,

    /// TCP connection is open
    connected: bool,
}

impl ExampleTransport {
    fn respond(&mut self, response: &[u8]) {
        for byte in response {
            let _ = self.rx.push_back(*byte);
        }
    }

    fn handle_command(&mut self) {
        let line = self.line.clone();

        match line.as_str() {
            "AT+RST" => self.respond(b"\r\nOK\r\n ets Jan  8 2013,rst cause:2, boot mode:(3,6)\r\n\r\nready\r\n"),
            "AT+CWMODE?" => self.respond(b"+CWMODE:1\r\n\r\nOK\r\n"),
            "AT+CWLAP" => self.respond(b"\r\nERROR\r\n"),
            "AT+CIFSR" => self.respond(b"+CIFSR:STAIP,\"10.0.0.181\"\r\n+CIFSR:STAMAC,\"10:fe:ed:05:ba:50\"\r\n\r\nOK\r\n"),
            "AT+CIPSTATUS" if self.connected => {
                self.respond(b"STATUS:3\r\n+CIPSTATUS:0,\"TCP\",\"10.0.0.1\",80,1024,0\r\n\r\nOK\r\n")
            }
            "AT+CIPSTATUS" => self.respond(b"STATUS:2\r\n\r\nOK\r\n"),
            "AT+CIPCLOSE" => {
                self.connected = false;
                self.respond(b"CLOSED\r\n\r\nOK\r\n");
            }
            line if line.starts_with("AT+CWJAP=") => self.respond(b"WIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n"),
            line if line.starts_with("AT+CIPSTART=") => {
                self.connected = true;
                self.respond(b"CONNECT\r\n\r\nOK\r\n");
            }
            line if line.starts_with("AT+CIPSEND=") => {
                self.prompt = true;
                self.respond(b"\r\nOK\r\n> ");
            }
            _ => self.respond(b"\r\nOK\r\n"),
        }
    }
}

impl Transport for ExampleTransport {
    type Error = Infallible;

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn available(&mut self) -> usize {
        self.rx.len()
    }

    fn read(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.prompt {
            self.prompt = false;
            self.respond(b"\r\nRecv bytes\r\n\r\nSEND OK\r\n");
            return Ok(());
        }

        for byte in bytes {
            match byte {
                b'\r' => {}
                b'\n' => {
                    self.handle_command();
                    self.line.clear();
                }
                _ => {
                    let _ = self.line.push(*byte as char);
                }
            }
        }

        Ok(())
    }
}

/// Timer mock, never expires
#[derive(Default)]
pub struct ExampleTimer {}

impl Timer<1_000_000> for ExampleTimer {
    type Error = u32;

    fn now(&mut self) -> TimerInstantU32<1000000> {
        TimerInstantU32::from_ticks(0)
    }

    fn start(&mut self, _duration: TimerDurationU32<1000000>) -> Result<(), Self::Error> {
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn wait(&mut self) -> nb::Result<(), Self::Error> {
        nb::Result::Err(nb::Error::WouldBlock)
    }
}

/// Delay mock, returns immediately
#[derive(Default)]
pub struct ExampleDelay;

impl DelayNs for ExampleDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Sensor mock returning a constant reading
#[derive(Default)]
pub struct ExampleSensors {}

impl SensorSource for ExampleSensors {
    fn sample(&mut self) -> SensorReading {
        SensorReading::new(412, 231, 7)
    }
}

/// Device mock counting restarts
#[derive(Default)]
pub struct ExampleDevice {
    pub restarts: usize,
}

impl DeviceControl for ExampleDevice {
    fn restart(&mut self) {
        self.restarts += 1;
    }
}
