// Field tokens.
//
// The engine produces `RawToken`s internally: plain offsets into the arena,
// so a refill loop can inspect one without holding a borrow of the buffer.
// `Token` is the public view, materialized by slicing the arena once the
// token is known to be final.

/// One delimiter-separated value plus its boundary metadata.
///
/// `data` borrows the arena and is valid until the next call that mutates
/// the engine (the borrow checker enforces this). A token with
/// `needs_more_data` set carries no data and must not be counted as a field;
/// the same field is re-produced in full after a refill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// Field bytes, post-contraction. Empty for signal tokens.
    pub data: &'a [u8],
    /// Monotonic field counter from stream start. Increments only for
    /// data-bearing tokens.
    pub sequence_index: u64,
    /// The field is the last one on its record.
    pub ends_line: bool,
    /// The byte source is exhausted and no unconsumed bytes remain.
    pub ends_stream: bool,
    /// The field could not be resolved inside the buffered bytes; refill
    /// and retry.
    pub needs_more_data: bool,
}

impl Token<'_> {
    /// True for tokens that carry field bytes (possibly zero-length).
    #[inline]
    pub fn is_field(&self) -> bool {
        !self.ends_stream && !self.needs_more_data
    }
}

/// Borrow-free token: a span into the arena plus the same flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawToken {
    pub start: usize,
    pub end: usize,
    pub sequence_index: u64,
    pub ends_line: bool,
    pub ends_stream: bool,
    pub needs_more_data: bool,
}

impl RawToken {
    pub(crate) fn field(start: usize, end: usize, seq: u64, ends_line: bool) -> Self {
        RawToken {
            start,
            end,
            sequence_index: seq,
            ends_line,
            ends_stream: false,
            needs_more_data: false,
        }
    }

    pub(crate) fn needs_more(seq: u64) -> Self {
        RawToken {
            start: 0,
            end: 0,
            sequence_index: seq,
            ends_line: false,
            ends_stream: false,
            needs_more_data: true,
        }
    }

    pub(crate) fn end_of_stream(seq: u64) -> Self {
        RawToken {
            start: 0,
            end: 0,
            sequence_index: seq,
            ends_line: false,
            ends_stream: true,
            needs_more_data: false,
        }
    }
}
