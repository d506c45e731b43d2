//! SHA-1 (FIPS 180-4).
//!
//! Kept for HMAC-SHA1 compatibility with existing streams; not a choice for
//! new deployments.

use crate::crypto::Digest;

const IV: [u32; 5] = [0x6745_2301, 0xefcd_ab89, 0x98ba_dcfe, 0x1032_5476, 0xc3d2_e1f0];

#[derive(Clone)]
pub struct Sha1 {
    h: [u32; 5],
    buf: [u8; 64],
    buf_len: usize,
    total: u64,
}

impl Digest for Sha1 {
    const BLOCK_SIZE: usize = 64;
    const OUTPUT_SIZE: usize = 20;

    fn new() -> Self {
        Self { h: IV, buf: [0; 64], buf_len: 0, total: 0 }
    }

    fn update(&mut self, mut input: &[u8]) {
        self.total = self.total.wrapping_add(input.len() as u64);

        while !input.is_empty() {
            let take = (Self::BLOCK_SIZE - self.buf_len).min(input.len());
            self.buf[self.buf_len..self.buf_len + take].copy_from_slice(&input[..take]);
            self.buf_len += take;
            input = &input[take..];

            if self.buf_len == Self::BLOCK_SIZE {
                self.compress();
                self.buf_len = 0;
            }
        }
    }

    fn finalize(mut self, out: &mut [u8]) {
        let bits = self.total.wrapping_mul(8);

        self.buf[self.buf_len] = 0x80;
        self.buf_len += 1;
        if self.buf_len + 8 > Self::BLOCK_SIZE {
            self.buf[self.buf_len..].fill(0);
            self.compress();
            self.buf_len = 0;
        }
        self.buf[self.buf_len..56].fill(0);
        self.buf[56..].copy_from_slice(&bits.to_be_bytes());
        self.compress();

        for (i, word) in self.h.iter().enumerate() {
            out[4 * i..4 * i + 4].copy_from_slice(&word.to_be_bytes());
        }
    }
}

impl Sha1 {
    fn compress(&mut self) {
        let mut w = [0u32; 80];
        for (t, chunk) in self.buf.chunks_exact(4).enumerate() {
            w[t] = u32::from_be_bytes(chunk.try_into().unwrap());
        }
        for t in 16..80 {
            w[t] = (w[t - 3] ^ w[t - 8] ^ w[t - 14] ^ w[t - 16]).rotate_left(1);
        }

        let [mut a, mut b, mut c, mut d, mut e] = self.h;

        for (t, &word) in w.iter().enumerate() {
            let (f, k) = match t {
                0..=19 => ((b & c) ^ (!b & d), 0x5a82_7999),
                20..=39 => (b ^ c ^ d, 0x6ed9_eba1),
                40..=59 => ((b & c) ^ (b & d) ^ (c & d), 0x8f1b_bcdc),
                _ => (b ^ c ^ d, 0xca62_c1d6),
            };
            let temp = a
                .rotate_left(5)
                .wrapping_add(f)
                .wrapping_add(e)
                .wrapping_add(k)
                .wrapping_add(word);
            e = d;
            d = c;
            c = b.rotate_left(30);
            b = a;
            a = temp;
        }

        self.h[0] = self.h[0].wrapping_add(a);
        self.h[1] = self.h[1].wrapping_add(b);
        self.h[2] = self.h[2].wrapping_add(c);
        self.h[3] = self.h[3].wrapping_add(d);
        self.h[4] = self.h[4].wrapping_add(e);
    }
}
