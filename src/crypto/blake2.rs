//! BLAKE2b and BLAKE2s (RFC 7693), with keyed mode and a runtime output
//! length.
//!
//! The variable output length is what Argon2's H′ construction needs, so it
//! is a constructor parameter here rather than a type-level constant. A block
//! is only compressed once more input (or `finalize`) arrives, because the
//! last block must be flagged in the compression call.

const SIGMA: [[usize; 16]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [14, 10, 4, 8, 9, 15, 13, 6, 1, 12, 0, 2, 11, 7, 5, 3],
    [11, 8, 12, 0, 5, 2, 15, 13, 10, 14, 3, 6, 7, 1, 9, 4],
    [7, 9, 3, 1, 13, 12, 11, 14, 2, 6, 5, 10, 4, 0, 15, 8],
    [9, 0, 5, 7, 2, 4, 10, 15, 14, 1, 11, 12, 6, 8, 3, 13],
    [2, 12, 6, 10, 0, 11, 8, 3, 4, 13, 7, 5, 15, 14, 1, 9],
    [12, 5, 1, 15, 14, 13, 4, 10, 0, 7, 6, 3, 9, 2, 8, 11],
    [13, 11, 7, 14, 12, 1, 3, 9, 5, 0, 15, 4, 8, 6, 2, 10],
    [6, 15, 14, 9, 11, 3, 0, 8, 12, 2, 13, 7, 1, 4, 10, 5],
    [10, 2, 8, 4, 7, 6, 1, 5, 15, 11, 9, 14, 3, 12, 13, 0],
];

const IV_B: [u64; 8] = [
    0x6a09e667f3bcc908, 0xbb67ae8584caa73b, 0x3c6ef372fe94f82b, 0xa54ff53a5f1d36f1,
    0x510e527fade682d1, 0x9b05688c2b3e6c1f, 0x1f83d9abfb41bd6b, 0x5be0cd19137e2179,
];

const IV_S: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

/// BLAKE2b: 128-byte blocks, 64-bit words, output length 1..=64, key up to
/// 64 bytes.
#[derive(Clone)]
pub struct Blake2b {
    h: [u64; 8],
    buf: [u8; 128],
    buf_len: usize,
    total: u128,
    out_len: usize,
}

impl Blake2b {
    pub const BLOCK_SIZE: usize = 128;
    pub const MAX_OUTPUT_SIZE: usize = 64;

    /// Unkeyed hash with `out_len` output bytes.
    pub fn new(out_len: usize) -> Self {
        Self::new_keyed(&[], out_len)
    }

    /// Keyed hash (MAC mode). An empty key is plain hashing.
    pub fn new_keyed(key: &[u8], out_len: usize) -> Self {
        debug_assert!((1..=Self::MAX_OUTPUT_SIZE).contains(&out_len));
        debug_assert!(key.len() <= 64);

        let mut h = IV_B;
        h[0] ^= 0x0101_0000 ^ ((key.len() as u64) << 8) ^ out_len as u64;

        let mut state = Self { h, buf: [0; 128], buf_len: 0, total: 0, out_len };
        if !key.is_empty() {
            // The key occupies a whole first block, zero padded.
            state.buf[..key.len()].copy_from_slice(key);
            state.buf_len = Self::BLOCK_SIZE;
        }
        state
    }

    pub fn update(&mut self, mut input: &[u8]) {
        while !input.is_empty() {
            if self.buf_len == Self::BLOCK_SIZE {
                self.total += Self::BLOCK_SIZE as u128;
                self.compress(false);
                self.buf_len = 0;
            }

            let take = (Self::BLOCK_SIZE - self.buf_len).min(input.len());
            self.buf[self.buf_len..self.buf_len + take].copy_from_slice(&input[..take]);
            self.buf_len += take;
            input = &input[take..];
        }
    }

    /// Writes the configured number of output bytes into `out`.
    pub fn finalize(mut self, out: &mut [u8]) {
        self.total += self.buf_len as u128;
        self.buf[self.buf_len..].fill(0);
        self.compress(true);

        let mut full = [0u8; 64];
        for (i, word) in self.h.iter().enumerate() {
            full[8 * i..8 * i + 8].copy_from_slice(&word.to_le_bytes());
        }
        out[..self.out_len].copy_from_slice(&full[..self.out_len]);
    }

    /// One-shot hash; the output length is `out.len()`.
    pub fn digest(input: &[u8], out: &mut [u8]) {
        let mut hasher = Self::new(out.len());
        hasher.update(input);
        hasher.finalize(out);
    }

    fn compress(&mut self, last: bool) {
        let mut v = [0u64; 16];
        v[..8].copy_from_slice(&self.h);
        v[8..].copy_from_slice(&IV_B);
        v[12] ^= self.total as u64;
        v[13] ^= (self.total >> 64) as u64;
        if last {
            v[14] = !v[14];
        }

        let mut m = [0u64; 16];
        for (i, chunk) in self.buf.chunks_exact(8).enumerate() {
            m[i] = u64::from_le_bytes(chunk.try_into().unwrap());
        }

        for round in 0..12 {
            let s = &SIGMA[round % 10];
            g64(&mut v, 0, 4, 8, 12, m[s[0]], m[s[1]]);
            g64(&mut v, 1, 5, 9, 13, m[s[2]], m[s[3]]);
            g64(&mut v, 2, 6, 10, 14, m[s[4]], m[s[5]]);
            g64(&mut v, 3, 7, 11, 15, m[s[6]], m[s[7]]);
            g64(&mut v, 0, 5, 10, 15, m[s[8]], m[s[9]]);
            g64(&mut v, 1, 6, 11, 12, m[s[10]], m[s[11]]);
            g64(&mut v, 2, 7, 8, 13, m[s[12]], m[s[13]]);
            g64(&mut v, 3, 4, 9, 14, m[s[14]], m[s[15]]);
        }

        for i in 0..8 {
            self.h[i] ^= v[i] ^ v[i + 8];
        }
    }
}

fn g64(v: &mut [u64; 16], a: usize, b: usize, c: usize, d: usize, x: u64, y: u64) {
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(x);
    v[d] = (v[d] ^ v[a]).rotate_right(32);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(24);
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(y);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(63);
}

/// BLAKE2s: 64-byte blocks, 32-bit words, output length 1..=32, key up to
/// 32 bytes.
#[derive(Clone)]
pub struct Blake2s {
    h: [u32; 8],
    buf: [u8; 64],
    buf_len: usize,
    total: u64,
    out_len: usize,
}

impl Blake2s {
    pub const BLOCK_SIZE: usize = 64;
    pub const MAX_OUTPUT_SIZE: usize = 32;

    pub fn new(out_len: usize) -> Self {
        Self::new_keyed(&[], out_len)
    }

    pub fn new_keyed(key: &[u8], out_len: usize) -> Self {
        debug_assert!((1..=Self::MAX_OUTPUT_SIZE).contains(&out_len));
        debug_assert!(key.len() <= 32);

        let mut h = IV_S;
        h[0] ^= 0x0101_0000 ^ ((key.len() as u32) << 8) ^ out_len as u32;

        let mut state = Self { h, buf: [0; 64], buf_len: 0, total: 0, out_len };
        if !key.is_empty() {
            state.buf[..key.len()].copy_from_slice(key);
            state.buf_len = Self::BLOCK_SIZE;
        }
        state
    }

    pub fn update(&mut self, mut input: &[u8]) {
        while !input.is_empty() {
            if self.buf_len == Self::BLOCK_SIZE {
                self.total += Self::BLOCK_SIZE as u64;
                self.compress(false);
                self.buf_len = 0;
            }

            let take = (Self::BLOCK_SIZE - self.buf_len).min(input.len());
            self.buf[self.buf_len..self.buf_len + take].copy_from_slice(&input[..take]);
            self.buf_len += take;
            input = &input[take..];
        }
    }

    pub fn finalize(mut self, out: &mut [u8]) {
        self.total += self.buf_len as u64;
        self.buf[self.buf_len..].fill(0);
        self.compress(true);

        let mut full = [0u8; 32];
        for (i, word) in self.h.iter().enumerate() {
            full[4 * i..4 * i + 4].copy_from_slice(&word.to_le_bytes());
        }
        out[..self.out_len].copy_from_slice(&full[..self.out_len]);
    }

    pub fn digest(input: &[u8], out: &mut [u8]) {
        let mut hasher = Self::new(out.len());
        hasher.update(input);
        hasher.finalize(out);
    }

    fn compress(&mut self, last: bool) {
        let mut v = [0u32; 16];
        v[..8].copy_from_slice(&self.h);
        v[8..].copy_from_slice(&IV_S);
        v[12] ^= self.total as u32;
        v[13] ^= (self.total >> 32) as u32;
        if last {
            v[14] = !v[14];
        }

        let mut m = [0u32; 16];
        for (i, chunk) in self.buf.chunks_exact(4).enumerate() {
            m[i] = u32::from_le_bytes(chunk.try_into().unwrap());
        }

        for round in 0..10 {
            let s = &SIGMA[round];
            g32(&mut v, 0, 4, 8, 12, m[s[0]], m[s[1]]);
            g32(&mut v, 1, 5, 9, 13, m[s[2]], m[s[3]]);
            g32(&mut v, 2, 6, 10, 14, m[s[4]], m[s[5]]);
            g32(&mut v, 3, 7, 11, 15, m[s[6]], m[s[7]]);
            g32(&mut v, 0, 5, 10, 15, m[s[8]], m[s[9]]);
            g32(&mut v, 1, 6, 11, 12, m[s[10]], m[s[11]]);
            g32(&mut v, 2, 7, 8, 13, m[s[12]], m[s[13]]);
            g32(&mut v, 3, 4, 9, 14, m[s[14]], m[s[15]]);
        }

        for i in 0..8 {
            self.h[i] ^= v[i] ^ v[i + 8];
        }
    }
}

fn g32(v: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize, x: u32, y: u32) {
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(x);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(12);
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(y);
    v[d] = (v[d] ^ v[a]).rotate_right(8);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(7);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_rfc_vector() {
        // RFC 7693 appendix A.
        let mut out = [0u8; 64];
        Blake2b::digest(b"abc", &mut out);
        assert_eq!(
            hex::encode(out),
            "ba80a53f981c4d0d6a2797b69f12f6e94c212f14685ac4b74b12bb6fdbffa2d1\
             7d87c5392aab792dc252d5de4533cc9518d38aa8dbf1925ab92386edd4009923"
        );
    }

    #[test]
    fn blake2s_rfc_vector() {
        // RFC 7693 appendix B.
        let mut out = [0u8; 32];
        Blake2s::digest(b"abc", &mut out);
        assert_eq!(
            hex::encode(out),
            "508c5e8c327c14e2e1a72ba34eeb452f37458b209ed63a294d999b4c86675982"
        );
    }

    #[test]
    fn blake2b_keyed_kat_first_entry() {
        // Official BLAKE2b KAT: empty input, 64-byte key 00..3f.
        let key: Vec<u8> = (0u8..64).collect();
        let mut mac = Blake2b::new_keyed(&key, 64);
        mac.update(b"");
        let mut out = [0u8; 64];
        mac.finalize(&mut out);
        assert_eq!(
            hex::encode(out),
            "10ebb67700b1868efb4417987acf4690ae9d972fb7a590c2f02871799aaa4786\
             b5e996e8f0f4eb981fc214b005f42d2ff4233499391653df7aefcbc13fc51568"
        );
    }

    #[test]
    fn blake2s_keyed_kat_first_entry() {
        // Official BLAKE2s KAT: empty input, 32-byte key 00..1f.
        let key: Vec<u8> = (0u8..32).collect();
        let mac = Blake2s::new_keyed(&key, 32);
        let mut out = [0u8; 32];
        mac.finalize(&mut out);
        assert_eq!(
            hex::encode(out),
            "48a8997da407876b3d79c0d92325ad3b89cbb754d86ab71aee047ad345fd2c49"
        );
    }

    #[test]
    fn truncated_output_is_a_prefix_parameter_not_a_cut() {
        // Changing the output length changes the whole digest, not just its
        // length.
        let mut short = [0u8; 32];
        Blake2b::digest(b"abc", &mut short);
        let mut long = [0u8; 64];
        Blake2b::digest(b"abc", &mut long);
        assert_ne!(short, long[..32]);
    }

    #[test]
    fn streaming_matches_one_shot() {
        let data = vec![7u8; 300];
        let mut split = Blake2b::new(64);
        split.update(&data[..129]);
        split.update(&data[129..]);
        let mut a = [0u8; 64];
        split.finalize(&mut a);

        let mut b = [0u8; 64];
        Blake2b::digest(&data, &mut b);
        assert_eq!(a, b);
    }
}
