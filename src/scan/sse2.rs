// 128-bit structural scan.
//
// SSE2 is part of the x86_64 baseline, so these run unconditionally there.
// Each 16-byte chunk is compared against splatted needles; the per-needle
// equality masks are OR-ed and collapsed to a bitmask with movemask, and the
// lowest set bit is the nearest hit.

use core::arch::x86_64::*;

const LANES: usize = 16;

pub(crate) fn find_structural(hay: &[u8], delimiter: u8) -> Option<usize> {
    let mut i = 0;
    // SAFETY: SSE2 is statically available on x86_64; loads are unaligned
    // (`loadu`) and stay within `hay` because `i + LANES <= hay.len()`.
    unsafe {
        let quote = _mm_set1_epi8(b'"' as i8);
        let delim = _mm_set1_epi8(delimiter as i8);
        let cr = _mm_set1_epi8(b'\r' as i8);
        let lf = _mm_set1_epi8(b'\n' as i8);

        while i + LANES <= hay.len() {
            let chunk = _mm_loadu_si128(hay.as_ptr().add(i) as *const __m128i);
            let hits = _mm_or_si128(
                _mm_or_si128(_mm_cmpeq_epi8(chunk, quote), _mm_cmpeq_epi8(chunk, delim)),
                _mm_or_si128(_mm_cmpeq_epi8(chunk, cr), _mm_cmpeq_epi8(chunk, lf)),
            );
            let mask = _mm_movemask_epi8(hits) as u32;
            if mask != 0 {
                return Some(i + mask.trailing_zeros() as usize);
            }
            i += LANES;
        }
    }
    super::structural_tail(hay, i, delimiter)
}

pub(crate) fn find_quote(hay: &[u8]) -> Option<usize> {
    let mut i = 0;
    // SAFETY: as in `find_structural`.
    unsafe {
        let quote = _mm_set1_epi8(b'"' as i8);
        while i + LANES <= hay.len() {
            let chunk = _mm_loadu_si128(hay.as_ptr().add(i) as *const __m128i);
            let mask = _mm_movemask_epi8(_mm_cmpeq_epi8(chunk, quote)) as u32;
            if mask != 0 {
                return Some(i + mask.trailing_zeros() as usize);
            }
            i += LANES;
        }
    }
    super::quote_tail(hay, i)
}
