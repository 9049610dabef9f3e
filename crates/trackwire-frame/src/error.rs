/// Errors raised while buffering bytes or parsing fields.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Appending the incoming bytes would exceed the buffer capacity.
    /// The buffer has been cleared.
    #[error("buffer overflow ({buffered} buffered + {incoming} incoming, capacity {capacity})")]
    BufferOverflow {
        buffered: usize,
        incoming: usize,
        capacity: usize,
    },

    /// A fixed-width field did not hold a valid number.
    #[error("invalid numeric field {text:?}")]
    InvalidNumber { text: String },

    /// A field extends past the end of its record.
    #[error("field at offset {offset} (width {width}) exceeds record length {len}")]
    FieldOutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },
}

pub type Result<T> = std::result::Result<T, FrameError>;
