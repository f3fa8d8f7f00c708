// Scan-mode primitives.
//
// The tokenizer state machine is shared; modes differ only in how they find
// the next structurally significant byte. Two primitives cover every state:
//
// - `find_structural`: first occurrence of delimiter, quote, `\r` or `\n`
//   (the unquoted-state hunt);
// - `find_quote`: first `"` (the quoted-state hunt).
//
// Because every mode answers "where is the nearest interesting byte" and the
// machine interprets that byte identically, token streams are byte-identical
// across modes by construction. The SIMD paths compare 16 or 32 bytes at a
// time against splatted needles and take the lowest set bit of the combined
// movemask, with a scalar sweep over the sub-chunk tail.

#[cfg(target_arch = "x86_64")]
mod avx2;
#[cfg(target_arch = "x86_64")]
mod sse2;

/// How the engine locates structural bytes.
///
/// `Sse2` and `Avx2` resolve to the portable `Memchr` path on non-x86_64
/// targets; `Avx2` additionally falls back to `Sse2` when the CPU lacks the
/// feature, so every variant is safe to use anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Reference byte-at-a-time scan.
    Scalar,
    /// Portable accelerated scan via `memchr`.
    Memchr,
    /// 128-bit chunked compare-and-mask.
    Sse2,
    /// 256-bit chunked compare-and-mask.
    Avx2,
}

impl ScanMode {
    /// Pick the widest scan the running CPU supports.
    pub fn detect() -> ScanMode {
        #[cfg(target_arch = "x86_64")]
        {
            if std::arch::is_x86_feature_detected!("avx2") {
                return ScanMode::Avx2;
            }
            ScanMode::Sse2
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            ScanMode::Memchr
        }
    }

    /// Every mode that runs natively on this machine. Useful for
    /// conformance tests and benchmarks that sweep all variants.
    pub fn all_supported() -> Vec<ScanMode> {
        let mut modes = vec![ScanMode::Scalar, ScanMode::Memchr];
        #[cfg(target_arch = "x86_64")]
        {
            modes.push(ScanMode::Sse2);
            if std::arch::is_x86_feature_detected!("avx2") {
                modes.push(ScanMode::Avx2);
            }
        }
        modes
    }

    /// Offset of the first delimiter, `"`, `\r` or `\n` in `hay`.
    #[inline]
    pub(crate) fn find_structural(self, hay: &[u8], delimiter: u8) -> Option<usize> {
        match self {
            ScanMode::Scalar => scalar_structural(hay, delimiter),
            ScanMode::Memchr => memchr_structural(hay, delimiter),
            ScanMode::Sse2 => {
                #[cfg(target_arch = "x86_64")]
                {
                    sse2::find_structural(hay, delimiter)
                }
                #[cfg(not(target_arch = "x86_64"))]
                {
                    memchr_structural(hay, delimiter)
                }
            }
            ScanMode::Avx2 => {
                #[cfg(target_arch = "x86_64")]
                {
                    if std::arch::is_x86_feature_detected!("avx2") {
                        // SAFETY: feature presence checked above.
                        unsafe { avx2::find_structural(hay, delimiter) }
                    } else {
                        sse2::find_structural(hay, delimiter)
                    }
                }
                #[cfg(not(target_arch = "x86_64"))]
                {
                    memchr_structural(hay, delimiter)
                }
            }
        }
    }

    /// Offset of the first `"` in `hay`.
    #[inline]
    pub(crate) fn find_quote(self, hay: &[u8]) -> Option<usize> {
        match self {
            ScanMode::Scalar => hay.iter().position(|&b| b == b'"'),
            ScanMode::Memchr => memchr::memchr(b'"', hay),
            ScanMode::Sse2 => {
                #[cfg(target_arch = "x86_64")]
                {
                    sse2::find_quote(hay)
                }
                #[cfg(not(target_arch = "x86_64"))]
                {
                    memchr::memchr(b'"', hay)
                }
            }
            ScanMode::Avx2 => {
                #[cfg(target_arch = "x86_64")]
                {
                    if std::arch::is_x86_feature_detected!("avx2") {
                        // SAFETY: feature presence checked above.
                        unsafe { avx2::find_quote(hay) }
                    } else {
                        sse2::find_quote(hay)
                    }
                }
                #[cfg(not(target_arch = "x86_64"))]
                {
                    memchr::memchr(b'"', hay)
                }
            }
        }
    }
}

#[inline]
fn is_structural(b: u8, delimiter: u8) -> bool {
    b == delimiter || b == b'"' || b == b'\r' || b == b'\n'
}

fn scalar_structural(hay: &[u8], delimiter: u8) -> Option<usize> {
    hay.iter().position(|&b| is_structural(b, delimiter))
}

fn memchr_structural(hay: &[u8], delimiter: u8) -> Option<usize> {
    let term = memchr::memchr3(delimiter, b'\r', b'\n', hay);
    let quote = memchr::memchr(b'"', hay);
    match (term, quote) {
        (Some(t), Some(q)) => Some(t.min(q)),
        (a, b) => a.or(b),
    }
}

/// Scalar sweep for the bytes left after the last full SIMD chunk.
#[cfg(target_arch = "x86_64")]
#[inline]
fn structural_tail(hay: &[u8], start: usize, delimiter: u8) -> Option<usize> {
    hay[start..]
        .iter()
        .position(|&b| is_structural(b, delimiter))
        .map(|p| start + p)
}

#[cfg(target_arch = "x86_64")]
#[inline]
fn quote_tail(hay: &[u8], start: usize) -> Option<usize> {
    hay[start..].iter().position(|&b| b == b'"').map(|p| start + p)
}
