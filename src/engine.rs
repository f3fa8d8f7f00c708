// Pull tokenizer.
//
// One field (or signal token) per `next_field` call. The scan restarts from
// the arena cursor on every attempt, so a field interrupted by buffer
// exhaustion is re-parsed in full after the caller refills — the cursor
// never advances on `needs_more_data`, and no bytes are lost or duplicated
// across refills.
//
// Quoted fields: a `"` as the first byte of a field opens quoted mode; `""`
// inside is an escaped literal quote; the closing `"` must be followed by
// the delimiter or a line break. Bytes between a closing quote and the next
// terminator are tolerated (skipped), counted, and logged. A quote after
// other field bytes is ordinary data.
//
// The only mutation of buffer contents is the contraction pass, which
// collapses each `""` pair in a completed field's span in place.

use crate::arena::Arena;
use crate::error::Error;
use crate::scan::ScanMode;
use crate::token::{RawToken, Token};

/// Comma delimiter.
pub const DELIM_COMMA: u8 = b',';
/// Semicolon delimiter.
pub const DELIM_SEMICOLON: u8 = b';';

/// Streaming CSV tokenizer over a caller-refilled arena.
pub struct Tokenizer {
    arena: Arena,
    delimiter: u8,
    scan: ScanMode,
    /// Next sequence index to hand out.
    seq: u64,
    /// Set once a refill reports zero new bytes.
    source_done: bool,
    /// Set by the first `next_field` call; the header must come first.
    fields_started: bool,
    header_read: bool,
    /// Completed fields whose closing quote was not directly followed by a
    /// terminator.
    malformed: u64,
}

impl Tokenizer {
    /// Build an engine over `arena` with the widest scan the CPU supports.
    pub fn new(arena: Arena, delimiter: u8) -> Self {
        Self::with_scan_mode(arena, delimiter, ScanMode::detect())
    }

    /// Build an engine with an explicit scan mode.
    pub fn with_scan_mode(arena: Arena, delimiter: u8, scan: ScanMode) -> Self {
        Tokenizer {
            arena,
            delimiter,
            scan,
            seq: 0,
            source_done: false,
            fields_started: false,
            header_read: false,
            malformed: 0,
        }
    }

    #[inline]
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    #[inline]
    pub fn scan_mode(&self) -> ScanMode {
        self.scan
    }

    #[inline]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// True once a refill has reported the byte source exhausted.
    #[inline]
    pub fn source_exhausted(&self) -> bool {
        self.source_done
    }

    /// Count of completed fields with junk between the closing quote and
    /// the terminator.
    #[inline]
    pub fn malformed_fields(&self) -> u64 {
        self.malformed
    }

    /// Refill the arena from `read` per the refill protocol. A return of
    /// `Ok(0)` marks the source exhausted: from then on, running out of
    /// buffered bytes means end of stream instead of `needs_more_data`.
    pub fn refill_with<F>(&mut self, read: F) -> Result<usize, Error>
    where
        F: FnMut(&mut [u8]) -> std::io::Result<usize>,
    {
        let appended = self.arena.refill_with(read)?;
        if appended == 0 {
            self.source_done = true;
        }
        Ok(appended)
    }

    /// Produce the next field token.
    ///
    /// The returned token borrows the arena; it is invalidated by the next
    /// call that mutates the engine. A `needs_more_data` token means the
    /// caller must refill and call again; the same field is then re-produced
    /// whole.
    pub fn next_field(&mut self) -> Token<'_> {
        let raw = self.next_raw();
        self.materialize(raw)
    }

    /// Advance past any run of LF/CRLF at the cursor without producing a
    /// token. Bare `\r` is data and stops the skip.
    pub fn skip_line_breaks(&mut self) {
        let buf = self.arena.contents();
        let mut i = self.arena.cursor();
        while i < buf.len() {
            match buf[i] {
                b'\n' => i += 1,
                b'\r' if i + 1 < buf.len() && buf[i + 1] == b'\n' => i += 2,
                _ => break,
            }
        }
        self.arena.advance_to(i);
    }

    #[inline]
    pub(crate) fn materialize(&self, raw: RawToken) -> Token<'_> {
        Token {
            data: self.arena.slice(raw.start, raw.end),
            sequence_index: raw.sequence_index,
            ends_line: raw.ends_line,
            ends_stream: raw.ends_stream,
            needs_more_data: raw.needs_more_data,
        }
    }

    pub(crate) fn next_raw(&mut self) -> RawToken {
        self.fields_started = true;
        self.arena.begin_parse();

        let cursor = self.arena.cursor();
        let used = self.arena.used();
        if cursor >= used {
            if self.source_done {
                return RawToken::end_of_stream(self.seq);
            }
            return RawToken::needs_more(self.seq);
        }

        if self.arena.contents()[cursor] == b'"' {
            return self.parse_quoted(cursor);
        }
        self.parse_unquoted(cursor)
    }

    /// Unquoted state: hunt the next structural byte and classify it.
    fn parse_unquoted(&mut self, field_start: usize) -> RawToken {
        let used = self.arena.used();
        let mut pos = field_start;

        loop {
            let buf = self.arena.contents();
            let hit = match self.scan.find_structural(&buf[pos..used], self.delimiter) {
                Some(off) => pos + off,
                None => {
                    if self.source_done {
                        // Unterminated trailing record: the final field ends
                        // the line at end of stream.
                        return self.complete(field_start, used, used, true);
                    }
                    return RawToken::needs_more(self.seq);
                }
            };

            let b = buf[hit];
            if b == self.delimiter {
                return self.complete(field_start, hit, hit + 1, false);
            }
            match b {
                b'\n' => return self.complete(field_start, hit, hit + 1, true),
                b'\r' => {
                    if hit + 1 >= used {
                        if !self.source_done {
                            return RawToken::needs_more(self.seq);
                        }
                        // Bare \r at end of stream is data.
                        pos = hit + 1;
                    } else if buf[hit + 1] == b'\n' {
                        return self.complete(field_start, hit, hit + 2, true);
                    } else {
                        // Bare \r is data.
                        pos = hit + 1;
                    }
                }
                // A quote that is not the first byte of the field is data.
                b'"' => pos = hit + 1,
                _ => unreachable!("non-structural byte from scan"),
            }
        }
    }

    /// Quoted state: content starts past the opening quote; `""` is a
    /// literal quote; the closer must be followed by a terminator.
    fn parse_quoted(&mut self, open: usize) -> RawToken {
        let used = self.arena.used();
        let content = open + 1;
        let mut pos = content;
        let mut saw_doubles = false;

        let close = loop {
            let buf = self.arena.contents();
            let q = match self.scan.find_quote(&buf[pos..used]) {
                Some(off) => pos + off,
                None => {
                    if self.source_done {
                        // Unterminated quoted field at end of stream.
                        return self.finish_quoted(content, used, used, true, saw_doubles, 0);
                    }
                    return RawToken::needs_more(self.seq);
                }
            };
            if q + 1 >= used {
                if !self.source_done {
                    // Cannot tell a closer from an escaped pair yet.
                    return RawToken::needs_more(self.seq);
                }
                // End of stream right after the quote: it closes the field.
                return self.finish_quoted(content, q, used, true, saw_doubles, 0);
            }
            if buf[q + 1] == b'"' {
                saw_doubles = true;
                pos = q + 2;
            } else {
                break q;
            }
        };

        // Terminator scan after the closing quote. Anything other than the
        // delimiter or a line break is tolerated as slack.
        let mut t = close + 1;
        let mut slack = 0u64;
        loop {
            if t >= used {
                if self.source_done {
                    return self.finish_quoted(content, close, used, true, saw_doubles, slack);
                }
                return RawToken::needs_more(self.seq);
            }
            let buf = self.arena.contents();
            let b = buf[t];
            if b == self.delimiter {
                return self.finish_quoted(content, close, t + 1, false, saw_doubles, slack);
            }
            match b {
                b'\n' => {
                    return self.finish_quoted(content, close, t + 1, true, saw_doubles, slack)
                }
                b'\r' => {
                    if t + 1 >= used {
                        if !self.source_done {
                            return RawToken::needs_more(self.seq);
                        }
                        slack += 1;
                        t += 1;
                    } else if buf[t + 1] == b'\n' {
                        return self.finish_quoted(content, close, t + 2, true, saw_doubles, slack);
                    } else {
                        slack += 1;
                        t += 1;
                    }
                }
                _ => {
                    slack += 1;
                    t += 1;
                }
            }
        }
    }

    /// Seal an unquoted field: advance the cursor and bump the counter.
    fn complete(
        &mut self,
        start: usize,
        end: usize,
        next_cursor: usize,
        ends_line: bool,
    ) -> RawToken {
        self.arena.advance_to(next_cursor);
        let seq = self.seq;
        self.seq += 1;
        RawToken::field(start, end, seq, ends_line)
    }

    /// Seal a quoted field: run the contraction pass if any `""` pairs were
    /// seen, then advance.
    fn finish_quoted(
        &mut self,
        content_start: usize,
        content_end: usize,
        next_cursor: usize,
        ends_line: bool,
        saw_doubles: bool,
        slack: u64,
    ) -> RawToken {
        let mut end = content_end;
        if saw_doubles {
            let span = self.arena.span_mut(content_start, content_end);
            end = content_start + contract_doubled_quotes(span);
        }
        if slack > 0 {
            self.malformed += 1;
            log::warn!(
                "closing quote not followed by delimiter or line break; skipped {slack} byte(s)"
            );
        }
        self.arena.advance_to(next_cursor);
        let seq = self.seq;
        self.seq += 1;
        RawToken::field(content_start, end, seq, ends_line)
    }

    pub(crate) fn start_header(&mut self) -> Result<(), Error> {
        if self.fields_started || self.header_read {
            return Err(Error::HeaderAfterFields);
        }
        Ok(())
    }

    pub(crate) fn mark_header_read(&mut self) {
        self.header_read = true;
    }

    pub(crate) fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }
}

/// Collapse each `""` pair in `span` to a single `"` by shifting left in
/// place; returns the contracted length. Lone quotes are untouched, so the
/// pass is a no-op on spans with no adjacent pairs.
pub(crate) fn contract_doubled_quotes(span: &mut [u8]) -> usize {
    let mut w = 0;
    let mut r = 0;
    while r < span.len() {
        if span[r] == b'"' && r + 1 < span.len() && span[r + 1] == b'"' {
            r += 1;
        }
        span[w] = span[r];
        w += 1;
        r += 1;
    }
    w
}
