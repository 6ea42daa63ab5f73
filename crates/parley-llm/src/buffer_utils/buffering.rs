use anyhow::Result;
use std::collections::VecDeque;

/// Circular buffer for line-based parsing of a byte stream
pub struct CircularLineBuffer {
    buffer: VecDeque<u8>,
}

impl CircularLineBuffer {
    /// Create a new buffer with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    /// Add bytes to the buffer
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Extract next line (up to \n) from buffer, trimmed.
    /// Returns None if no complete line is available
    pub fn next_line(&mut self) -> Option<Result<String>> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
        Some(Self::decode(line_bytes))
    }

    /// Take whatever is left once the stream has ended (a final line with no
    /// trailing newline)
    pub fn take_remaining(&mut self) -> Option<Result<String>> {
        if self.buffer.is_empty() {
            return None;
        }
        let line_bytes: Vec<u8> = self.buffer.drain(..).collect();
        Some(Self::decode(line_bytes))
    }

    fn decode(line_bytes: Vec<u8>) -> Result<String> {
        match String::from_utf8(line_bytes) {
            Ok(line) => Ok(line.trim().to_string()),
            Err(e) => Err(anyhow::anyhow!("Invalid UTF-8: {}", e)),
        }
    }

    /// Current buffer size
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circular_buffer_basic() {
        let mut buffer = CircularLineBuffer::with_capacity(64);

        buffer.extend(b"line1\r\nline2\n");

        assert_eq!(buffer.next_line().unwrap().unwrap(), "line1");
        assert_eq!(buffer.next_line().unwrap().unwrap(), "line2");
        assert!(buffer.next_line().is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_partial_line() {
        let mut buffer = CircularLineBuffer::with_capacity(64);

        buffer.extend(b"partial");
        assert!(buffer.next_line().is_none());
        assert_eq!(buffer.len(), 7);

        buffer.extend(b" line\n");
        assert_eq!(buffer.next_line().unwrap().unwrap(), "partial line");
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let mut buffer = CircularLineBuffer::with_capacity(64);
        let text = "认证\n".as_bytes();

        buffer.extend(&text[..2]);
        assert!(buffer.next_line().is_none());
        buffer.extend(&text[2..]);
        assert_eq!(buffer.next_line().unwrap().unwrap(), "认证");
    }

    #[test]
    fn test_take_remaining() {
        let mut buffer = CircularLineBuffer::with_capacity(64);
        buffer.extend(b"data: [DONE]");
        assert!(buffer.next_line().is_none());
        assert_eq!(buffer.take_remaining().unwrap().unwrap(), "data: [DONE]");
        assert!(buffer.take_remaining().is_none());
    }

    #[test]
    fn test_invalid_utf8() {
        let mut buffer = CircularLineBuffer::with_capacity(64);
        buffer.extend(&[0xff, 0xfe, b'\n']);
        assert!(buffer.next_line().unwrap().is_err());
    }
}
