use crate::buffer::ResponseBuffer;
use crate::config::{MAX_RESPONSE_LENGTH, SAFETY_MARGIN};

#[test]
fn test_contains_token() {
    let mut buffer = ResponseBuffer::new();
    buffer.extend(b"AT\r\n\r\nOK\r\n");

    assert!(buffer.contains("OK"));
    assert!(buffer.contains("\r\nOK"));
    assert!(!buffer.contains("ERROR"));
}

#[test]
fn test_contains_empty_or_too_long_token() {
    let mut buffer = ResponseBuffer::new();
    assert!(!buffer.contains("OK"));

    buffer.extend(b"O");
    assert!(!buffer.contains(""));
    assert!(!buffer.contains("OK"));
}

#[test]
fn test_full_buffer_keeps_recent_window() {
    let mut buffer = ResponseBuffer::new();
    for i in 0..=MAX_RESPONSE_LENGTH {
        buffer.push((i % 256) as u8);
    }

    let keep = MAX_RESPONSE_LENGTH - SAFETY_MARGIN;
    assert_eq!(keep + 1, buffer.len());

    let expected: Vec<u8> = (MAX_RESPONSE_LENGTH - keep..=MAX_RESPONSE_LENGTH)
        .map(|i| (i % 256) as u8)
        .collect();
    assert_eq!(expected.as_slice(), buffer.as_bytes());
}

#[test]
fn test_token_scrolled_out_of_window() {
    let mut buffer = ResponseBuffer::new();
    buffer.extend(b"OK");
    buffer.extend(&[b'x'; MAX_RESPONSE_LENGTH - 1]);

    assert!(!buffer.contains("OK"));
    assert!(buffer.len() <= MAX_RESPONSE_LENGTH);

    buffer.extend(b"SEND OK");
    assert!(buffer.contains("SEND OK"));
}

#[test]
fn test_as_str_invalid_utf8() {
    let mut buffer = ResponseBuffer::new();
    buffer.extend(&[0xff, 0xfe]);
    assert!(buffer.as_str().is_none());

    let mut buffer = ResponseBuffer::new();
    buffer.extend(b"ready");
    assert_eq!(Some("ready"), buffer.as_str());
}

#[test]
fn test_display_escapes_control_characters() {
    let mut buffer = ResponseBuffer::new();
    buffer.extend(b"OK\r\n");

    assert_eq!("OK\\r\\n", format!("{}", buffer));
    assert_eq!("ResponseBuffer(\"OK\\r\\n\")", format!("{:?}", buffer));
}

#[test]
fn test_ends_with_token() {
    let mut buffer = ResponseBuffer::new();
    assert!(!buffer.ends_with("OK"));

    buffer.extend(b"\r\nOK");
    assert!(buffer.ends_with("OK"));
    assert!(!buffer.ends_with(""));

    buffer.extend(b"\r\n");
    assert!(!buffer.ends_with("OK"));
    assert!(buffer.contains("OK"));
}

#[test]
fn test_ends_with_after_truncation() {
    let mut buffer = ResponseBuffer::new();
    buffer.extend(&[b'x'; MAX_RESPONSE_LENGTH]);
    buffer.extend(b"SEND OK");

    assert!(buffer.ends_with("SEND OK"));
    assert!(buffer.len() <= MAX_RESPONSE_LENGTH);
}
