use crate::config::{MAX_RESPONSE_LENGTH, SAFETY_MARGIN};
use core::fmt::{Debug, Display, Formatter};
use heapless::Vec;

/// Bounded accumulator of the bytes received during a single transaction
///
/// When the capacity is reached, only the most recent `MAX_RESPONSE_LENGTH - SAFETY_MARGIN` bytes
/// are kept. So a token which scrolled out of this window can no longer be matched.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResponseBuffer {
    bytes: Vec<u8, MAX_RESPONSE_LENGTH>,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Appends a single byte, discarding the oldest data if the buffer is full
    pub fn push(&mut self, byte: u8) {
        if self.bytes.is_full() {
            self.discard_oldest();
        }

        // Can not fail, as space was freed above
        let _ = self.bytes.push(byte);
    }

    /// Appends all given bytes
    pub fn extend(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.push(*byte);
        }
    }

    /// Returns true if the given token is contained anywhere in the retained bytes
    pub fn contains(&self, token: &str) -> bool {
        let token = token.as_bytes();

        if token.is_empty() || token.len() > self.bytes.len() {
            return false;
        }

        self.bytes.windows(token.len()).any(|window| window == token)
    }

    /// Returns true if the retained bytes end with the given token. Checking this after every
    /// [ResponseBuffer::push] finds the same tokens as [ResponseBuffer::contains].
    pub fn ends_with(&self, token: &str) -> bool {
        !token.is_empty() && self.bytes.ends_with(token.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    /// Returns the content as string, if valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.bytes.as_slice()).ok()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Keeps just the most recent window of `capacity - margin` bytes
    fn discard_oldest(&mut self) {
        let keep = MAX_RESPONSE_LENGTH - SAFETY_MARGIN;
        let start = self.bytes.len() - keep;

        self.bytes.copy_within(start.., 0);
        self.bytes.truncate(keep);
    }
}

/// Prints the content with escaped control characters, e.g. `AT\r\nOK\r\n`
impl Display for ResponseBuffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        for byte in self.bytes.iter() {
            for char in core::ascii::escape_default(*byte) {
                write!(f, "{}", char as char)?;
            }
        }

        Ok(())
    }
}

impl Debug for ResponseBuffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "ResponseBuffer(\"{}\")", self)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ResponseBuffer {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "ResponseBuffer({=[u8]:a})", self.bytes.as_slice())
    }
}
