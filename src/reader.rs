// std::io::Read adapter.
//
// The core engine never performs I/O. `CsvReader` binds it to any
// `io::Read` and runs the refill-and-retry loop, so callers see only
// completed tokens, terminal end-of-stream, or fatal errors.

use std::io::Read;

use crate::arena::Arena;
use crate::engine::Tokenizer;
use crate::error::Error;
use crate::header::Header;
use crate::token::Token;

/// A tokenizer bound to a byte source.
pub struct CsvReader<R> {
    tokenizer: Tokenizer,
    source: R,
}

impl<R: Read> CsvReader<R> {
    /// Bind an existing engine to `source`.
    pub fn new(tokenizer: Tokenizer, source: R) -> Self {
        CsvReader { tokenizer, source }
    }

    /// Convenience: allocate an arena of `capacity` bytes and bind it.
    pub fn with_capacity(capacity: usize, delimiter: u8, source: R) -> Result<Self, Error> {
        let arena = Arena::with_capacity(capacity)?;
        Ok(CsvReader {
            tokenizer: Tokenizer::new(arena, delimiter),
            source,
        })
    }

    #[inline]
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Pull the next completed field. `Ok(None)` is end of stream.
    pub fn next_field(&mut self) -> Result<Option<Token<'_>>, Error> {
        loop {
            let raw = self.tokenizer.next_raw();
            if raw.needs_more_data {
                self.refill()?;
                continue;
            }
            if raw.ends_stream {
                return Ok(None);
            }
            return Ok(Some(self.tokenizer.materialize(raw)));
        }
    }

    /// Extract the header record, refilling as needed.
    pub fn read_header(&mut self) -> Result<Header, Error> {
        loop {
            match self.tokenizer.read_header() {
                Err(Error::NeedsData) => {
                    if self.tokenizer.source_exhausted() {
                        // Empty stream: nothing buffered, nothing coming.
                        return Err(Error::NeedsData);
                    }
                    self.refill()?;
                }
                other => return other,
            }
        }
    }

    /// Skip blank lines at the cursor, refilling so a line-break run that
    /// straddles the buffer edge is skipped completely.
    pub fn skip_line_breaks(&mut self) -> Result<(), Error> {
        loop {
            self.tokenizer.skip_line_breaks();
            if self.tokenizer.source_exhausted() {
                return Ok(());
            }
            let arena = self.tokenizer.arena();
            match arena.remaining() {
                0 => {}
                // A lone \r at the buffer edge may be half a CRLF; pull more
                // bytes before deciding.
                1 if arena.slice(arena.cursor(), arena.used()) == b"\r" => {}
                _ => return Ok(()),
            }
            if self.refill()? == 0 {
                return Ok(());
            }
        }
    }

    fn refill(&mut self) -> Result<usize, Error> {
        let source = &mut self.source;
        self.tokenizer.refill_with(|buf| source.read(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DELIM_COMMA;

    /// Reader that hands out its input in fixed-size slivers, forcing many
    /// refills.
    struct Dribble<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Dribble<'_> {
        fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
            let n = self.data.len().min(self.step).min(out.len());
            out[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn collect(input: &[u8], cap: usize, step: usize) -> Vec<(Vec<u8>, bool)> {
        let mut r = CsvReader::with_capacity(
            cap,
            DELIM_COMMA,
            Dribble { data: input, step },
        )
        .unwrap();
        let mut out = Vec::new();
        while let Some(tok) = r.next_field().unwrap() {
            out.push((tok.data.to_vec(), tok.ends_line));
        }
        out
    }

    #[test]
    fn reads_across_many_refills() {
        let want = vec![
            (b"alpha".to_vec(), false),
            (b"beta,comma".to_vec(), false),
            (b"ga\"mma".to_vec(), true),
            (b"d".to_vec(), true),
        ];
        let input = b"alpha,\"beta,comma\",\"ga\"\"mma\"\nd\n";
        for step in [1, 2, 3, 7, 64] {
            assert_eq!(collect(input, 64, step), want, "step {step}");
        }
    }

    #[test]
    fn field_bigger_than_arena_errors() {
        let mut r = CsvReader::with_capacity(
            8,
            DELIM_COMMA,
            Dribble {
                data: b"0123456789abcdef,x\n",
                step: 4,
            },
        )
        .unwrap();
        let err = loop {
            match r.next_field() {
                Ok(Some(_)) => {}
                Ok(None) => panic!("expected TokenTooLarge"),
                Err(e) => break e,
            }
        };
        assert!(matches!(err, Error::TokenTooLarge));
    }

    #[test]
    fn header_then_fields() {
        let mut r = CsvReader::with_capacity(
            32,
            DELIM_COMMA,
            Dribble {
                data: b"name,age\nAlice,30\nBob,41\n",
                step: 3,
            },
        )
        .unwrap();
        let header = r.read_header().unwrap();
        assert_eq!(header.column_count(), 2);
        assert_eq!(header.name(0), Some(&b"name"[..]));
        assert_eq!(header.name(1), Some(&b"age"[..]));

        let mut rows: Vec<Vec<Vec<u8>>> = vec![Vec::new()];
        while let Some(tok) = r.next_field().unwrap() {
            let ends_line = tok.ends_line;
            rows.last_mut().unwrap().push(tok.data.to_vec());
            if ends_line {
                rows.push(Vec::new());
            }
        }
        rows.pop();
        assert_eq!(
            rows,
            vec![
                vec![b"Alice".to_vec(), b"30".to_vec()],
                vec![b"Bob".to_vec(), b"41".to_vec()],
            ]
        );
    }

    #[test]
    fn skip_line_breaks_across_refills() {
        let mut r = CsvReader::with_capacity(
            4,
            DELIM_COMMA,
            Dribble {
                data: b"\n\n\r\n\n\n\nx\n",
                step: 2,
            },
        )
        .unwrap();
        r.skip_line_breaks().unwrap();
        let tok = r.next_field().unwrap().unwrap();
        assert_eq!(tok.data, b"x");
    }

    #[test]
    fn empty_stream_header_is_needs_data() {
        let mut r = CsvReader::with_capacity(
            8,
            DELIM_COMMA,
            Dribble { data: b"", step: 1 },
        )
        .unwrap();
        assert!(matches!(r.read_header(), Err(Error::NeedsData)));
    }
}
