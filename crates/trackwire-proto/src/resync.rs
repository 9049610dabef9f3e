use crate::grammar::TERMINATOR;

/// Recovery after a malformed record: discard through the next terminator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResyncPolicy;

impl ResyncPolicy {
    /// Bytes to discard so that the buffer starts just after the next
    /// terminator, or `None` if no terminator is buffered yet.
    pub fn scan(buf: &[u8]) -> Option<usize> {
        buf.iter().position(|&b| b == TERMINATOR).map(|pos| pos + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_through_terminator() {
        assert_eq!(ResyncPolicy::scan(b"01 garbage\r\n21S"), Some(12));
        assert_eq!(ResyncPolicy::scan(b"\n"), Some(1));
    }

    #[test]
    fn no_terminator_keeps_everything() {
        assert_eq!(ResyncPolicy::scan(b"01 garbage"), None);
        assert_eq!(ResyncPolicy::scan(b""), None);
    }
}
