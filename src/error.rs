// Error taxonomy for the tokenizer.
//
// `needs_more_data` is NOT here: it is an in-band token flag, resolved by the
// caller's refill loop. Everything in this enum is either transient header
// feedback (`NeedsData`) or fatal for the engine instance.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Arena construction was attempted with zero capacity.
    #[error("arena capacity must be non-zero")]
    ZeroCapacity,

    /// A single token (field, quoted field, or header record) does not fit
    /// in the arena even after compaction. The caller must rebuild the
    /// engine with a larger arena; data is never truncated.
    #[error("token too large for arena")]
    TokenTooLarge,

    /// The arena does not yet hold a complete header record. Refill and
    /// retry. Terminal only when the byte source is already exhausted and
    /// the arena is empty.
    #[error("more data required to complete the header record")]
    NeedsData,

    /// `read_header` was called twice, or after field iteration began.
    #[error("header must be read once, before any field is pulled")]
    HeaderAfterFields,

    /// I/O failure reported by the byte source during a refill.
    #[error("byte source error: {0}")]
    Io(#[from] std::io::Error),
}
