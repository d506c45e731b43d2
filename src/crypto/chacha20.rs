//! ChaCha20 stream cipher.
//!
//! This is the RFC 8439 core with a different counter/nonce split: a 64-bit
//! little-endian block counter in state words 12..13 and a 64-bit nonce in
//! words 14..15 (the original DJB layout). Streams produced with the common
//! 32-bit-counter/96-bit-nonce variant are not interchangeable with this one.

use crate::util::memxor;

pub const KEY_SIZE: usize = 32;
pub const COUNTER_SIZE: usize = 8;
pub const NONCE_SIZE: usize = 8;
pub const BLOCK_SIZE: usize = 64;

// "expand 32-byte k"
const CONSTANTS: [u32; 4] = [0x6170_7865, 0x3320_646e, 0x7962_2d32, 0x6b20_6574];

#[derive(Clone)]
pub struct ChaCha20 {
    state: [u32; 16],
}

impl ChaCha20 {
    pub fn new(key: &[u8; KEY_SIZE], counter: u64, nonce: &[u8; NONCE_SIZE]) -> Self {
        let mut state = [0u32; 16];
        state[..4].copy_from_slice(&CONSTANTS);
        for (i, chunk) in key.chunks_exact(4).enumerate() {
            state[4 + i] = u32::from_le_bytes(chunk.try_into().unwrap());
        }
        let mut cipher = Self { state };
        cipher.set_counter(counter);
        cipher.set_nonce(nonce);
        cipher
    }

    /// Loads a 64-bit block counter into state words 12..13.
    pub fn set_counter(&mut self, counter: u64) {
        self.state[12] = counter as u32;
        self.state[13] = (counter >> 32) as u32;
    }

    pub fn set_nonce(&mut self, nonce: &[u8; NONCE_SIZE]) {
        self.state[14] = u32::from_le_bytes(nonce[..4].try_into().unwrap());
        self.state[15] = u32::from_le_bytes(nonce[4..].try_into().unwrap());
    }

    /// Encrypts (or decrypts) up to one 64-byte block in place and advances
    /// the counter.
    pub fn apply_block(&mut self, data: &mut [u8]) {
        debug_assert!(data.len() <= BLOCK_SIZE);

        let keystream = self.keystream_block();
        self.increment();
        memxor(data, &keystream[..data.len()]);
    }

    fn keystream_block(&self) -> [u8; BLOCK_SIZE] {
        let mut working = self.state;
        for _ in 0..10 {
            // Column round.
            quarter_round(&mut working, 0, 4, 8, 12);
            quarter_round(&mut working, 1, 5, 9, 13);
            quarter_round(&mut working, 2, 6, 10, 14);
            quarter_round(&mut working, 3, 7, 11, 15);
            // Diagonal round.
            quarter_round(&mut working, 0, 5, 10, 15);
            quarter_round(&mut working, 1, 6, 11, 12);
            quarter_round(&mut working, 2, 7, 8, 13);
            quarter_round(&mut working, 3, 4, 9, 14);
        }

        let mut out = [0u8; BLOCK_SIZE];
        for (i, (word, initial)) in working.iter().zip(&self.state).enumerate() {
            out[4 * i..4 * i + 4].copy_from_slice(&word.wrapping_add(*initial).to_le_bytes());
        }
        out
    }

    fn increment(&mut self) {
        self.state[12] = self.state[12].wrapping_add(1);
        if self.state[12] == 0 {
            self.state[13] = self.state[13].wrapping_add(1);
        }
    }
}

fn quarter_round(state: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize) {
    state[a] = state[a].wrapping_add(state[b]);
    state[d] = (state[d] ^ state[a]).rotate_left(16);

    state[c] = state[c].wrapping_add(state[d]);
    state[b] = (state[b] ^ state[c]).rotate_left(12);

    state[a] = state[a].wrapping_add(state[b]);
    state[d] = (state[d] ^ state[a]).rotate_left(8);

    state[c] = state[c].wrapping_add(state[d]);
    state[b] = (state[b] ^ state[c]).rotate_left(7);
}
