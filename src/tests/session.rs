use crate::config::{LifecycleConfig, NetworkConfig, SessionConfig};
use crate::payload::SensorReading;
use crate::retry::RetryPolicy;
use crate::session::{Cycle, Session, Startup};
use crate::stack::SendError;
use crate::tests::mock::{Clock, FakeDelay, MockDevice, MockLink, MockSensors};
use crate::transaction::CommandError;
use crate::wifi::JoinError;

type SessionType = Session<MockLink, MockSensors, MockDevice, FakeDelay>;

const CONFIG: SessionConfig = SessionConfig::new(
    NetworkConfig::new("test_wifi", "secret", "10.0.0.1", 80),
    LifecycleConfig::DEFAULT,
);

fn session(clock: &Clock, link: MockLink, sensors: MockSensors, device: MockDevice) -> SessionType {
    Session::new(link, sensors, device, clock.delay(), CONFIG)
}

fn join_error() -> JoinError {
    JoinError::ResetFailed(CommandError::TransportError)
}

fn send_error() -> SendError {
    SendError::SendFailed(CommandError::TransportError)
}

#[test]
fn test_start_connected() {
    let clock = Clock::new();
    let mut link = MockLink::new();
    link.expect_connect_wifi()
        .withf(|network| network.ssid == "test_wifi" && network.password == "secret")
        .times(1)
        .returning(|_| Ok(()));

    let mut device = MockDevice::new();
    device.expect_restart().times(0);

    let mut session = session(&clock, link, MockSensors::new(), device);

    assert_eq!(Startup::Connected, session.start());
    assert!(clock.backoffs().is_empty());
}

#[test]
fn test_start_connected_after_retry() {
    let clock = Clock::new();
    let mut link = MockLink::new();
    let mut attempts = 0;
    link.expect_connect_wifi().times(3).returning(move |_| {
        attempts += 1;
        if attempts < 3 {
            Err(join_error())
        } else {
            Ok(())
        }
    });

    let mut device = MockDevice::new();
    device.expect_restart().times(0);

    let mut session = session(&clock, link, MockSensors::new(), device);

    assert_eq!(Startup::Connected, session.start());
    assert_eq!(vec![5_000, 10_000], clock.backoffs());
}

#[test]
fn test_start_restart_after_cooldown() {
    let clock = Clock::new();
    let mut link = MockLink::new();
    link.expect_connect_wifi().times(3).returning(|_| Err(join_error()));

    let mut device = MockDevice::new();
    device.expect_restart().times(1).return_const(());

    let mut session = session(&clock, link, MockSensors::new(), device);

    assert_eq!(Startup::Restarted, session.start());
    assert_eq!(vec![5_000, 10_000, 10_000], clock.backoffs());
}

#[test]
fn test_start_custom_policy() {
    let clock = Clock::new();
    let mut link = MockLink::new();
    link.expect_connect_wifi().times(1).returning(|_| Err(join_error()));

    let mut device = MockDevice::new();
    device.expect_restart().times(1).return_const(());

    let mut config = CONFIG;
    config.startup_retry = RetryPolicy::once();
    config.restart_cooldown_ms = 500;
    let mut session = Session::new(link, MockSensors::new(), device, clock.delay(), config);

    assert_eq!(Startup::Restarted, session.start());
    assert_eq!(vec![500], clock.backoffs());
}

#[test]
fn test_cycle_sent() {
    let clock = Clock::new();
    let mut sensors = MockSensors::new();
    sensors
        .expect_sample()
        .times(1)
        .returning(|| SensorReading::new(412, 231, 7));

    let mut link = MockLink::new();
    link.expect_send_data()
        .withf(|network, reading| network.host == "10.0.0.1" && *reading == SensorReading::new(412, 231, 7))
        .times(1)
        .returning(|_, _| Ok(()));
    link.expect_connect_wifi().times(0);

    let mut device = MockDevice::new();
    device.expect_restart().times(0);

    let mut session = session(&clock, link, sensors, device);

    assert_eq!(Cycle::Sent, session.cycle());
}

#[test]
fn test_cycle_reassociated() {
    let clock = Clock::new();
    let mut sensors = MockSensors::new();
    sensors.expect_sample().times(1).returning(SensorReading::default);

    let mut link = MockLink::new();
    link.expect_send_data().times(1).returning(|_, _| Err(send_error()));
    link.expect_connect_wifi().times(1).returning(|_| Ok(()));

    let mut device = MockDevice::new();
    device.expect_restart().times(0);

    let mut session = session(&clock, link, sensors, device);

    assert_eq!(Cycle::Reassociated, session.cycle());
}

#[test]
fn test_cycle_restarted() {
    let clock = Clock::new();
    let mut sensors = MockSensors::new();
    sensors.expect_sample().times(1).returning(SensorReading::default);

    let mut link = MockLink::new();
    link.expect_send_data().times(1).returning(|_, _| Err(send_error()));
    link.expect_connect_wifi().times(1).returning(|_| Err(join_error()));

    let mut device = MockDevice::new();
    device.expect_restart().times(1).return_const(());

    let mut session = session(&clock, link, sensors, device);

    assert_eq!(Cycle::Restarted, session.cycle());
    assert!(clock.backoffs().is_empty());
}
