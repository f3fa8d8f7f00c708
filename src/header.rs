// Header extraction.
//
// One-shot pass over the first record, before any field is pulled. Two
// passes: the first scans the live arena under the same quoting rules as
// field parsing, only counting columns and locating the record's end; the
// second copies that exact byte range into owned storage and splits the
// copy into per-column name spans, contracting `""` pairs per name.
//
// The copy is mandatory: slices into the live arena would dangle after the
// first subsequent refill overwrites the region.

use crate::engine::{contract_doubled_quotes, Tokenizer};
use crate::error::Error;

/// The first record of the stream, copied out of the arena so its names
/// survive any number of later refills.
#[derive(Debug)]
pub struct Header {
    storage: Box<[u8]>,
    spans: Vec<(usize, usize)>,
}

impl Header {
    #[inline]
    pub fn column_count(&self) -> usize {
        self.spans.len()
    }

    /// Name bytes of column `idx`.
    pub fn name(&self, idx: usize) -> Option<&[u8]> {
        self.spans.get(idx).map(|&(s, e)| &self.storage[s..e])
    }

    /// Ordered column names.
    pub fn names(&self) -> impl Iterator<Item = &[u8]> {
        self.spans.iter().map(move |&(s, e)| &self.storage[s..e])
    }

    /// Index of the column named `name`, if any.
    pub fn position(&self, name: &[u8]) -> Option<usize> {
        self.names().position(|n| n == name)
    }
}

impl Tokenizer {
    /// Extract the header record.
    ///
    /// Must be called once, before any `next_field` call, with the arena
    /// already primed by at least one refill. Returns `Error::NeedsData`
    /// when the record does not yet terminate inside the buffered bytes,
    /// `Error::TokenTooLarge` when it never can (the record fills the whole
    /// arena), and `Error::HeaderAfterFields` on out-of-order use.
    pub fn read_header(&mut self) -> Result<Header, Error> {
        self.start_header()?;

        let bounds = self.locate_header_record()?;
        let storage: Vec<u8> = self
            .arena()
            .slice(bounds.start, bounds.content_end)
            .to_vec();
        let header = split_names(storage, self.delimiter());

        self.arena_mut().advance_to(bounds.next_cursor);
        self.mark_header_read();
        Ok(header)
    }

    /// Pass 1: find the record's extent under quoting rules, without
    /// materializing any field.
    fn locate_header_record(&self) -> Result<RecordBounds, Error> {
        let delimiter = self.delimiter();
        let buf = self.arena().contents();
        let start = self.arena().cursor();
        let used = buf.len();
        let at_eof = self.source_exhausted();

        let mut i = start;
        let mut at_field_start = true;
        while i < used {
            let b = buf[i];
            if at_field_start && b == b'"' {
                // Quoted name: skip to its closing quote, honoring "".
                i += 1;
                loop {
                    if i >= used {
                        return self.header_overrun(at_eof, start, used);
                    }
                    if buf[i] != b'"' {
                        i += 1;
                        continue;
                    }
                    if i + 1 >= used {
                        if !at_eof {
                            // Closer or escaped pair? Cannot tell yet.
                            return Err(Error::NeedsData);
                        }
                        i = used;
                        break;
                    }
                    if buf[i + 1] == b'"' {
                        i += 2;
                    } else {
                        i += 1;
                        break;
                    }
                }
                at_field_start = false;
                continue;
            }
            if b == delimiter {
                at_field_start = true;
                i += 1;
            } else if b == b'\n' {
                return Ok(RecordBounds {
                    start,
                    content_end: i,
                    next_cursor: i + 1,
                });
            } else if b == b'\r' {
                if i + 1 >= used {
                    if !at_eof {
                        return Err(Error::NeedsData);
                    }
                    // Bare \r at end of stream is data.
                    i += 1;
                } else if buf[i + 1] == b'\n' {
                    return Ok(RecordBounds {
                        start,
                        content_end: i,
                        next_cursor: i + 2,
                    });
                } else {
                    at_field_start = false;
                    i += 1;
                }
            } else {
                at_field_start = false;
                i += 1;
            }
        }
        self.header_overrun(at_eof, start, used)
    }

    fn header_overrun(
        &self,
        at_eof: bool,
        start: usize,
        used: usize,
    ) -> Result<RecordBounds, Error> {
        if at_eof {
            if start >= used {
                // Nothing buffered and nothing coming.
                return Err(Error::NeedsData);
            }
            // Unterminated header line at end of stream.
            return Ok(RecordBounds {
                start,
                content_end: used,
                next_cursor: used,
            });
        }
        if self.arena().remaining() == self.arena().capacity() {
            return Err(Error::TokenTooLarge);
        }
        Err(Error::NeedsData)
    }
}

struct RecordBounds {
    start: usize,
    content_end: usize,
    next_cursor: usize,
}

/// Pass 2: split the copied record into name spans, contracting quoted
/// names in place inside the copy.
fn split_names(mut storage: Vec<u8>, delimiter: u8) -> Header {
    let mut spans = Vec::new();
    let len = storage.len();
    let mut pos = 0;

    loop {
        if pos > len {
            break;
        }
        if pos < len && storage[pos] == b'"' {
            // Quoted name.
            let content = pos + 1;
            let mut i = content;
            let mut saw_doubles = false;
            let close = loop {
                if i >= len {
                    break len;
                }
                if storage[i] != b'"' {
                    i += 1;
                } else if i + 1 < len && storage[i + 1] == b'"' {
                    saw_doubles = true;
                    i += 2;
                } else {
                    break i;
                }
            };
            let mut end = close;
            if saw_doubles {
                end = content + contract_doubled_quotes(&mut storage[content..close]);
            }
            spans.push((content, end));
            // Skip slack until the next delimiter.
            let mut t = close.saturating_add(1).min(len);
            while t < len && storage[t] != delimiter {
                t += 1;
            }
            if t >= len {
                break;
            }
            pos = t + 1;
        } else {
            // Unquoted name: up to the next delimiter or end of record.
            let end = memchr::memchr(delimiter, &storage[pos..])
                .map(|off| pos + off)
                .unwrap_or(len);
            spans.push((pos, end));
            if end >= len {
                break;
            }
            pos = end + 1;
        }
    }

    Header {
        storage: storage.into_boxed_slice(),
        spans,
    }
}
