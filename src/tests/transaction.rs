use crate::buffer::ResponseBuffer;
use crate::commands::{Command, ErrorToken, ValidationError};
use crate::config::{MAX_CMD_LENGTH, MAX_DISCARD_LENGTH, MAX_RESPONSE_LENGTH, POLL_INTERVAL_MS};
use crate::tests::mock::{Clock, FakeDelay, FakeTimer, FloodTransport, MockTimer, MockTransport, MockedCommand};
use crate::transaction::{CommandError, Engine};

type EngineType = Engine<MockTransport, FakeTimer, FakeDelay, 1_000_000>;

fn engine(clock: &Clock) -> EngineType {
    Engine::new(MockTransport::new(clock), clock.timer(), clock.delay())
}

fn buffer(content: &[u8]) -> ResponseBuffer {
    let mut buffer = ResponseBuffer::new();
    buffer.extend(content);
    buffer
}

#[test]
fn test_ok_response() {
    let clock = Clock::new();
    let mut engine = engine(&clock);
    engine.transport.add_response(MockedCommand::new(Some(b"AT\r\n"), b"AT\r\nOK\r\n"));

    assert_eq!(Ok(()), engine.execute(&Command::ok("AT", 2_000)));
    assert_eq!(vec!["AT\r\n".to_string()], engine.transport.get_commands_as_strings());
    assert_eq!(vec![2_000], engine.timer.durations);
    assert_eq!(0, clock.now_ms());
}

#[test]
fn test_query_returns_response() {
    let clock = Clock::new();
    let mut engine = engine(&clock);
    engine
        .transport
        .add_response(MockedCommand::new(None, b"+CWMODE:1\r\n\r\nOK\r\n"));

    let response = engine.query(&Command::ok("AT+CWMODE?", 1_000)).unwrap();
    assert_eq!(Some("+CWMODE:1\r\n\r\nOK"), response.as_str());
}

#[test]
fn test_error_tokens() {
    let cases: [(&'static [u8], ErrorToken); 3] = [
        (b"\r\nERROR\r\n", ErrorToken::Error),
        (b"+CWJAP:3\r\n\r\nFAIL\r\n", ErrorToken::Fail),
        (b"busy s...\r\n", ErrorToken::Busy),
    ];

    for (response, token) in cases {
        let clock = Clock::new();
        let mut engine = engine(&clock);
        engine.transport.add_response(MockedCommand::new(None, response));

        let result = engine.execute(&Command::ok("AT+CWJAP=\"a\",\"b\"", 1_000));
        assert_eq!(Err(CommandError::ErrorDetected(token)), result);
    }
}

#[test]
fn test_error_token_stops_reading() {
    let clock = Clock::new();
    let mut engine = engine(&clock);
    engine
        .transport
        .add_response(MockedCommand::new(None, b"busy p...\r\n\r\nOK\r\n"));

    let result = engine.execute(&Command::ok("AT", 1_000));

    assert_eq!(Err(CommandError::ErrorDetected(ErrorToken::Busy)), result);
    assert_eq!(4, engine.transport.read_count());
    assert_eq!(b"busy p...\r\n\r\nOK\r\n".len() - 4, engine.transport.pending());
}

#[test]
fn test_expected_token_wins_if_completed_first() {
    let clock = Clock::new();
    let mut engine = engine(&clock);
    engine
        .transport
        .add_response(MockedCommand::new(None, b"\r\nOK\r\n\r\nERROR\r\n"));

    assert_eq!(Ok(()), engine.execute(&Command::ok("AT", 1_000)));
    assert_eq!(4, engine.transport.read_count());
}

#[test]
fn test_timeout_contains_partial_response() {
    let clock = Clock::new();
    let mut engine = engine(&clock);
    engine
        .transport
        .add_response(MockedCommand::new(Some(b"AT+RST\r\n"), b"\r\nOK\r\n"));

    let result = engine.execute(&Command::new("AT+RST", "ready", 100));

    assert_eq!(Err(CommandError::Timeout(buffer(b"\r\nOK\r\n"))), result);
    assert!(clock.now_ms() >= 100);
    assert!(clock.now_ms() <= 100 + POLL_INTERVAL_MS as u64);
}

#[test]
fn test_silent_module_times_out() {
    let clock = Clock::new();
    let mut engine = engine(&clock);
    engine.transport.add_response(MockedCommand::silent(None));

    let result = engine.execute(&Command::ok("AT", 2_000));

    assert_eq!(Err(CommandError::Timeout(ResponseBuffer::new())), result);
    assert!(clock.now_ms() >= 2_000);
    assert!(clock.now_ms() <= 2_000 + POLL_INTERVAL_MS as u64);
    assert_eq!(200, clock.poll_count());
}

#[test]
fn test_late_response_times_out() {
    let clock = Clock::new();
    let mut engine = engine(&clock);
    engine
        .transport
        .add_response(MockedCommand::silent(None).then(150, b"\r\nOK\r\n"));

    let result = engine.execute(&Command::ok("AT", 100));
    assert_eq!(Err(CommandError::Timeout(ResponseBuffer::new())), result);
}

#[test]
fn test_truncated_token_times_out() {
    let clock = Clock::new();
    let mut engine = engine(&clock);
    let noise: &'static [u8] = &[b'x'; 200];
    engine.transport.add_response(
        MockedCommand::new(Some(b"AT+RST\r\n"), b"\r\nOK\r\n")
            .then(10, noise)
            .then(20, noise)
            .then(30, noise),
    );

    let result = engine.execute(&Command::new("AT+RST", "ready", 100));

    let partial = match result {
        Err(CommandError::Timeout(partial)) => partial,
        other => panic!("Unexpected result {:?}", other),
    };
    assert!(partial.len() <= MAX_RESPONSE_LENGTH);
    assert!(!partial.contains("OK"));
    assert_eq!(0, engine.transport.pending());
}

#[test]
fn test_continuous_input_stops_at_deadline() {
    let clock = Clock::new();
    let mut timer = MockTimer::new();
    timer.expect_start().times(1).returning(|_| Ok(()));
    timer.expect_wait().times(1).returning(|| Ok(()));

    let mut engine: Engine<_, _, _, 1_000_000> = Engine::new(FloodTransport::new(&clock, 0), timer, clock.delay());

    let mut partial = ResponseBuffer::new();
    partial.push(b'x');
    assert_eq!(Err(CommandError::Timeout(partial)), engine.await_token("OK", 100));
    assert_eq!(1, engine.transport.read_count);
}

#[test]
fn test_continuous_input_bounded_timeout() {
    let clock = Clock::new();
    let mut engine: Engine<_, _, _, 1_000_000> =
        Engine::new(FloodTransport::new(&clock, 100), clock.timer(), clock.delay());

    let result = engine.execute(&Command::ok("AT", 100));

    let partial = match result {
        Err(CommandError::Timeout(partial)) => partial,
        other => panic!("Unexpected result {:?}", other),
    };
    assert!(partial.len() <= MAX_RESPONSE_LENGTH);

    // Stale input is drained up to the limit, then 100 ms of input is read
    assert_eq!(MAX_DISCARD_LENGTH + 1_000, engine.transport.read_count);
    assert_eq!(151, clock.now_ms());
    assert_eq!(0, clock.poll_count());
}

#[test]
fn test_token_split_across_polls() {
    let clock = Clock::new();
    let mut engine = engine(&clock);
    engine.transport.add_response(
        MockedCommand::new(None, b"\r\nSEND O")
            .then(30, b"K")
            .then(60, b"\r\n"),
    );

    let result = engine.execute(&Command::new("AT+CIPSEND=1", "SEND OK", 1_000));
    assert_eq!(Ok(()), result);
    assert!(clock.now_ms() >= 30);
    assert!(clock.now_ms() < 60);
}

#[test]
fn test_stale_input_discarded() {
    let clock = Clock::new();
    let mut engine = engine(&clock);
    engine.transport.add_stale_input(b"\r\nOK\r\n");
    engine.transport.add_error_response();

    let result = engine.execute(&Command::ok("AT", 1_000));

    assert_eq!(Err(CommandError::ErrorDetected(ErrorToken::Error)), result);
    assert_eq!(1, engine.transport.flush_count());
}

#[test]
fn test_invalid_command_no_io() {
    let clock = Clock::new();
    let mut engine = engine(&clock);
    let text = "A".repeat(MAX_CMD_LENGTH + 1);

    let result = engine.execute(&Command::ok(&text, 1_000));
    assert_eq!(
        Err(CommandError::InvalidCommand(ValidationError::CommandTooLong)),
        result
    );
    assert!(result.unwrap_err().is_validation_error());

    let result = engine.execute(&Command::ok("", 1_000));
    assert_eq!(Err(CommandError::InvalidCommand(ValidationError::EmptyCommand)), result);

    let result = engine.execute(&Command::new("AT", "", 1_000));
    assert_eq!(Err(CommandError::InvalidCommand(ValidationError::EmptyToken)), result);

    assert!(engine.transport.get_commands_as_strings().is_empty());
    assert_eq!(0, engine.transport.flush_count());
    assert!(engine.timer.durations.is_empty());
}

#[test]
fn test_max_length_command_accepted() {
    let clock = Clock::new();
    let mut engine = engine(&clock);
    engine.transport.add_ok_response();
    let text = "A".repeat(MAX_CMD_LENGTH);

    assert_eq!(Ok(()), engine.execute(&Command::ok(&text, 1_000)));
}

#[test]
fn test_transport_write_error() {
    let clock = Clock::new();
    let mut engine = engine(&clock);
    engine.transport.fail_writes();

    assert_eq!(
        Err(CommandError::TransportError),
        engine.execute(&Command::ok("AT", 1_000))
    );
}

#[test]
fn test_timer_start_error() {
    let clock = Clock::new();
    let mut timer = MockTimer::new();
    timer
        .expect_start()
        .times(1)
        .with(mockall::predicate::eq(MockTimer::duration_ms(1_000)))
        .returning(|_| Err(1));

    let mut engine: Engine<_, _, _, 1_000_000> = Engine::new(MockTransport::new(&clock), timer, clock.delay());
    engine.transport.add_ok_response();

    assert_eq!(Err(CommandError::TimerError), engine.execute(&Command::ok("AT", 1_000)));
}

#[test]
fn test_timer_wait_error() {
    let clock = Clock::new();
    let mut timer = MockTimer::new();
    timer.expect_start().times(1).returning(|_| Ok(()));
    timer.expect_wait().times(1).returning(|| Err(nb::Error::Other(1)));

    let mut engine: Engine<_, _, _, 1_000_000> = Engine::new(MockTransport::new(&clock), timer, clock.delay());
    engine.transport.add_response(MockedCommand::silent(None));

    assert_eq!(Err(CommandError::TimerError), engine.execute(&Command::ok("AT", 1_000)));
}
