// csvpull - pull-based, buffer-resident CSV tokenizer
//
// The caller owns a fixed-capacity arena and a byte source; the engine turns
// refill-fed bytes into a stream of borrowed field tokens:
//
//   Byte source -> Arena (refill protocol) -> Tokenizer -> Token stream
//
// Design points:
// - One field per `next_field` call, zero heap allocation per field; the
//   only copy anywhere is the header record, which must outlive refills.
// - `needs_more_data` suspends parsing without consuming anything, so a
//   field may straddle any number of refills (but not exceed the arena
//   itself: a token larger than the arena is a fatal capacity error).
// - Escaped quotes (`""`) are contracted in place, one left-shift rewrite
//   per escaped field.
// - Scan modes (scalar, memchr, SSE2, AVX2) differ only in how the next
//   structural byte is located and produce byte-identical token streams;
//   `tests/conformance.rs` holds the cross-mode and refill-schedule
//   equivalence suite.

mod arena;
mod engine;
mod error;
mod header;
mod reader;
mod scan;
mod token;

pub use arena::Arena;
pub use engine::{Tokenizer, DELIM_COMMA, DELIM_SEMICOLON};
pub use error::Error;
pub use header::Header;
pub use reader::CsvReader;
pub use scan::ScanMode;
pub use token::Token;
