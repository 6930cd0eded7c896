//! Example that runs on Linux using a serial-USB-adapter.
//!
//! Pushes synthetic sensor readings to the given HTTP server every few seconds.
use std::{
    env,
    io::{self, Read, Write},
    thread,
    time::Duration,
};

use embedded_hal::delay::DelayNs;
use esp_at_telemetry::{
    config::{LifecycleConfig, NetworkConfig, SessionConfig},
    payload::SensorReading,
    session::{DeviceControl, SensorSource, Session},
    transport::Transport,
    wifi::Adapter,
};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

// Timer frequency in Hz
const TIMER_HZ: u32 = 1000;

fn main() {
    env_logger::init();

    // Parse args
    let args: Vec<String> = env::args().collect();
    if args.len() != 7 {
        println!("Usage: {} <path-to-serial> <baudrate> <ssid> <psk> <host> <port>", args[0]);
        println!("Example: {} /dev/ttyUSB0 115200 mywifi hellopasswd123 10.0.0.1 8080", args[0]);
        println!("\nNote: To run the example with debug logging, run it like this:");
        println!("\n  RUST_LOG=trace cargo run --example linux -- /dev/ttyUSB0 115200 mywifi hellopasswd123 10.0.0.1 8080");
        std::process::exit(1);
    }
    let dev = &args[1];
    let baud_rate: u32 = args[2].parse().expect("Invalid baudrate");
    let port: u16 = args[6].parse().expect("Invalid port");

    // Credentials and host are needed for the whole process lifetime
    let network = NetworkConfig::new(
        args[3].clone().leak(),
        args[4].clone().leak(),
        args[5].clone().leak(),
        port,
    );
    let config = SessionConfig::new(network, LifecycleConfig::DEFAULT);

    println!("Starting (dev={}, baud={:?})...", dev, baud_rate);

    // Open serial port
    let mut serial = serialport::new(dev, baud_rate)
        .data_bits(DataBits::Eight)
        .flow_control(FlowControl::None)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .timeout(Duration::from_millis(500))
        .open()
        .expect("Could not open serial port");

    // Flush serial RX buffer, to ensure that there isn't any remaining left
    // form previous sessions.
    flush_serial(&mut serial);

    let adapter: Adapter<_, _, _, TIMER_HZ> = Adapter::new(
        SerialPortTransport { port: serial },
        timer::SysTimer::new(),
        StdDelay,
        config.lifecycle,
    );

    let mut session = Session::new(adapter, SyntheticSensors::default(), ProcessControl, StdDelay, config);
    session.run();
}

/// [Transport] on top of a host serial port
struct SerialPortTransport {
    port: Box<dyn SerialPort>,
}

impl Transport for SerialPortTransport {
    type Error = io::Error;

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.port.flush()
    }

    fn available(&mut self) -> usize {
        match self.port.bytes_to_read() {
            Ok(count) => count as usize,
            Err(e) => {
                log::error!("Serial port status error: {}", e);
                0
            }
        }
    }

    fn read(&mut self) -> Option<u8> {
        let mut byte = [0; 1];

        match self.port.read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.port.write_all(bytes)
    }
}

/// Blocking delay using thread sleep
struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns as u64));
    }
}

/// Generates slowly changing readings in the 10-bit ADC range
#[derive(Default)]
struct SyntheticSensors {
    tick: u16,
}

impl SensorSource for SyntheticSensors {
    fn sample(&mut self) -> SensorReading {
        self.tick = self.tick.wrapping_add(1);

        SensorReading::new(
            300 + self.tick % 200,
            200 + self.tick % 50,
            self.tick % 1024,
        )
    }
}

/// There is no device to reset on a host, so the process just exits
struct ProcessControl;

impl DeviceControl for ProcessControl {
    fn restart(&mut self) {
        println!("Restart requested, exiting");
        std::process::exit(2);
    }
}

/// Flush the serial port receive buffer.
fn flush_serial(serial: &mut Box<dyn SerialPort>) {
    let mut buf = [0; 32];
    loop {
        match serial.read(&mut buf[..]) {
            Ok(0) => break,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => break,
            Ok(_) => continue,
            Err(e) => panic!("Error while flushing serial: {}", e),
        }
    }
}

mod timer {
    use std::time::Instant as StdInstant;

    use fugit_timer::Timer;

    /// A timer with millisecond precision.
    pub struct SysTimer {
        start: StdInstant,
        duration_ms: u32,
        started: bool,
    }

    impl SysTimer {
        pub fn new() -> SysTimer {
            SysTimer {
                start: StdInstant::now(),
                duration_ms: 0,
                started: false,
            }
        }
    }

    impl Timer<1000> for SysTimer {
        type Error = &'static str;

        /// Return current time `Instant`
        fn now(&mut self) -> fugit::TimerInstantU32<1000> {
            let milliseconds = (StdInstant::now() - self.start).as_millis();
            fugit::TimerInstantU32::from_ticks(milliseconds as u32)
        }

        /// Start timer with a `duration`
        fn start(&mut self, duration: fugit::TimerDurationU32<1000>) -> Result<(), Self::Error> {
            self.start = StdInstant::now();
            self.duration_ms = duration.ticks();
            self.started = true;

            Ok(())
        }

        fn cancel(&mut self) -> Result<(), Self::Error> {
            if !self.started {
                Err("cannot cancel stopped timer")
            } else {
                self.started = false;
                Ok(())
            }
        }

        /// Returns `Ok(())` as soon as the duration has expired
        fn wait(&mut self) -> nb::Result<(), Self::Error> {
            if !self.started {
                return Err(nb::Error::Other("timer not started"));
            }

            if (StdInstant::now() - self.start).as_millis() >= self.duration_ms.into() {
                Ok(())
            } else {
                Err(nb::Error::WouldBlock)
            }
        }
    }

}
