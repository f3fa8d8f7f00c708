// Byte arena and refill protocol.
//
// Fixed-capacity buffer the tokenizer reads from. The engine never performs
// I/O: when it reports `needs_more_data`, the caller runs `refill_with`,
// which compacts the unconsumed tail to offset 0 and appends bytes from an
// external source until the arena is full or the source has nothing more.
//
// A refill that cannot make room (the unconsumed tail already fills the
// whole arena) is the one fatal capacity condition: some token is larger
// than the buffer, and retrying can never resolve it.

use crate::error::Error;

/// Fixed-capacity byte buffer with consumption bookkeeping.
///
/// Invariant: `cursor <= used <= capacity`.
pub struct Arena {
    buf: Box<[u8]>,
    /// Bytes `[0, used)` hold valid data.
    used: usize,
    /// Bytes `[cursor, used)` are unconsumed.
    cursor: usize,
    /// Cursor value at the start of the most recent parse attempt. Used to
    /// detect attempts that made no progress.
    prior_cursor: usize,
}

impl Arena {
    /// Allocate an arena of exactly `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Result<Self, Error> {
        if capacity == 0 {
            return Err(Error::ZeroCapacity);
        }
        Ok(Arena {
            buf: vec![0u8; capacity].into_boxed_slice(),
            used: 0,
            cursor: 0,
            prior_cursor: 0,
        })
    }

    /// Wrap caller-provided storage. Errors on an empty buffer.
    pub fn from_buf(buf: Box<[u8]>) -> Result<Self, Error> {
        if buf.is_empty() {
            return Err(Error::ZeroCapacity);
        }
        Ok(Arena {
            buf,
            used: 0,
            cursor: 0,
            prior_cursor: 0,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn used(&self) -> usize {
        self.used
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Unconsumed byte count.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.used - self.cursor
    }

    /// Valid contents, consumed and unconsumed.
    #[inline]
    pub(crate) fn contents(&self) -> &[u8] {
        &self.buf[..self.used]
    }

    /// Mutable view of a span inside the used region, for the in-place
    /// quote contraction pass.
    #[inline]
    pub(crate) fn span_mut(&mut self, start: usize, end: usize) -> &mut [u8] {
        debug_assert!(start <= end && end <= self.used);
        &mut self.buf[start..end]
    }

    #[inline]
    pub(crate) fn slice(&self, start: usize, end: usize) -> &[u8] {
        &self.buf[start..end]
    }

    /// Record the cursor at the start of a parse attempt.
    #[inline]
    pub(crate) fn begin_parse(&mut self) {
        self.prior_cursor = self.cursor;
    }

    /// Consume bytes up to `pos` (exclusive end of the token just produced).
    #[inline]
    pub(crate) fn advance_to(&mut self, pos: usize) {
        debug_assert!(pos >= self.cursor && pos <= self.used);
        self.cursor = pos;
    }

    /// Compact the unconsumed tail and append bytes from `read`.
    ///
    /// `read` is called with the spare region and returns how many bytes it
    /// wrote, `0` meaning the source is exhausted; it is called repeatedly
    /// until the arena is full or the source reports `0`.
    ///
    /// Returns the number of newly appended bytes. `Ok(0)` means end of
    /// stream. Fails with `TokenTooLarge` when the unconsumed tail already
    /// fills the whole arena: the parse attempt made no progress
    /// (`cursor == prior_cursor`) and no room can be made.
    pub fn refill_with<F>(&mut self, mut read: F) -> Result<usize, Error>
    where
        F: FnMut(&mut [u8]) -> std::io::Result<usize>,
    {
        if self.remaining() == self.capacity() {
            debug_assert_eq!(self.cursor, self.prior_cursor);
            log::debug!(
                "refill stalled: unconsumed tail fills the whole arena ({} bytes)",
                self.capacity()
            );
            return Err(Error::TokenTooLarge);
        }

        // Shift the unconsumed tail to the front so the spare region is
        // maximal. When everything was consumed this degenerates to a reset.
        if self.cursor > 0 {
            self.buf.copy_within(self.cursor..self.used, 0);
            self.used -= self.cursor;
            self.cursor = 0;
            self.prior_cursor = 0;
        }

        let mut appended = 0;
        while self.used < self.buf.len() {
            let n = read(&mut self.buf[self.used..])?;
            if n == 0 {
                break;
            }
            self.used += n;
            appended += n;
        }
        Ok(appended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all<'a>(src: &'a [u8]) -> impl FnMut(&mut [u8]) -> std::io::Result<usize> + 'a {
        let mut off = 0;
        move |out: &mut [u8]| {
            let n = (src.len() - off).min(out.len());
            out[..n].copy_from_slice(&src[off..off + n]);
            off += n;
            Ok(n)
        }
    }

    #[test]
    fn zero_capacity_rejected() {
        assert!(matches!(Arena::with_capacity(0), Err(Error::ZeroCapacity)));
        assert!(matches!(
            Arena::from_buf(Vec::new().into_boxed_slice()),
            Err(Error::ZeroCapacity)
        ));
    }

    #[test]
    fn refill_fills_until_full_or_exhausted() {
        let mut arena = Arena::with_capacity(8).unwrap();
        let n = arena.refill_with(feed_all(b"abcdefghij")).unwrap();
        assert_eq!(n, 8);
        assert_eq!(arena.contents(), b"abcdefgh");

        let mut arena = Arena::with_capacity(8).unwrap();
        let n = arena.refill_with(feed_all(b"abc")).unwrap();
        assert_eq!(n, 3);
        assert_eq!(arena.contents(), b"abc");
    }

    #[test]
    fn refill_compacts_unconsumed_tail() {
        let mut arena = Arena::with_capacity(8).unwrap();
        arena.refill_with(feed_all(b"abcdefgh")).unwrap();
        arena.advance_to(5);

        let n = arena.refill_with(feed_all(b"XYZ")).unwrap();
        assert_eq!(n, 3);
        assert_eq!(arena.cursor(), 0);
        assert_eq!(arena.contents(), b"fghXYZ");
    }

    #[test]
    fn refill_reports_source_end() {
        let mut arena = Arena::with_capacity(8).unwrap();
        let n = arena.refill_with(|_| Ok(0)).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn stalled_refill_is_token_too_large() {
        let mut arena = Arena::with_capacity(4).unwrap();
        arena.refill_with(feed_all(b"abcd")).unwrap();
        arena.begin_parse();
        // Nothing consumed: the tail already fills the arena.
        let err = arena.refill_with(feed_all(b"efgh")).unwrap_err();
        assert!(matches!(err, Error::TokenTooLarge));
    }

    #[test]
    fn io_error_propagates() {
        let mut arena = Arena::with_capacity(4).unwrap();
        let err = arena
            .refill_with(|_| Err(std::io::Error::new(std::io::ErrorKind::Other, "boom")))
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
