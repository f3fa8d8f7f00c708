// 256-bit structural scan.
//
// Same shape as the SSE2 path with 32-byte chunks. Callers must verify AVX2
// support before dispatching here; the sub-chunk tail reuses the SSE2 scan
// so short remainders still get vector treatment.

use core::arch::x86_64::*;

const LANES: usize = 32;

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn find_structural(hay: &[u8], delimiter: u8) -> Option<usize> {
    let quote = _mm256_set1_epi8(b'"' as i8);
    let delim = _mm256_set1_epi8(delimiter as i8);
    let cr = _mm256_set1_epi8(b'\r' as i8);
    let lf = _mm256_set1_epi8(b'\n' as i8);

    let mut i = 0;
    while i + LANES <= hay.len() {
        let chunk = _mm256_loadu_si256(hay.as_ptr().add(i) as *const __m256i);
        let hits = _mm256_or_si256(
            _mm256_or_si256(
                _mm256_cmpeq_epi8(chunk, quote),
                _mm256_cmpeq_epi8(chunk, delim),
            ),
            _mm256_or_si256(_mm256_cmpeq_epi8(chunk, cr), _mm256_cmpeq_epi8(chunk, lf)),
        );
        let mask = _mm256_movemask_epi8(hits) as u32;
        if mask != 0 {
            return Some(i + mask.trailing_zeros() as usize);
        }
        i += LANES;
    }
    super::sse2::find_structural(&hay[i..], delimiter).map(|p| i + p)
}

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn find_quote(hay: &[u8]) -> Option<usize> {
    let quote = _mm256_set1_epi8(b'"' as i8);

    let mut i = 0;
    while i + LANES <= hay.len() {
        let chunk = _mm256_loadu_si256(hay.as_ptr().add(i) as *const __m256i);
        let mask = _mm256_movemask_epi8(_mm256_cmpeq_epi8(chunk, quote)) as u32;
        if mask != 0 {
            return Some(i + mask.trailing_zeros() as usize);
        }
        i += LANES;
    }
    super::sse2::find_quote(&hay[i..]).map(|p| i + p)
}
