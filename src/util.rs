//! Small byte-level helpers shared by the primitives.

/// XORs `src` into `dst` element-wise.
///
/// Both slices must have the same length.
#[inline]
pub fn memxor(dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

/// Splits a 64-bit word into its low and high 32-bit halves.
#[inline]
pub fn lo_hi32(word: u64) -> (u32, u32) {
    (word as u32, (word >> 32) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memxor_is_an_involution() {
        let mut data = *b"stream of bytes";
        let mask = [0x5a; 15];
        memxor(&mut data, &mask);
        assert_ne!(&data, b"stream of bytes");
        memxor(&mut data, &mask);
        assert_eq!(&data, b"stream of bytes");
    }

    #[test]
    fn lo_hi32_splits() {
        assert_eq!(lo_hi32(0x0123_4567_89ab_cdef), (0x89ab_cdef, 0x0123_4567));
    }
}
