//! CTR mode over AES (SP 800-38A), with a big-endian counter block.
//!
//! Each keystream block is the encryption of the current counter; the counter
//! then increments with carry from the lowest byte upward. A short final
//! block XORs only a prefix of the keystream, the surplus is discarded.

use crate::crypto::aes::{self, Aes};
use crate::util::memxor;

#[derive(Clone)]
pub struct AesCtr {
    cipher: Aes,
    counter: [u8; aes::BLOCK_SIZE],
}

impl AesCtr {
    pub const BLOCK_SIZE: usize = aes::BLOCK_SIZE;

    pub fn new(cipher: Aes, counter: [u8; aes::BLOCK_SIZE]) -> Self {
        Self { cipher, counter }
    }

    /// Replaces the active counter block.
    pub fn set_counter_block(&mut self, counter: [u8; aes::BLOCK_SIZE]) {
        self.counter = counter;
    }

    /// Encrypts (or equivalently decrypts) up to one block in place and
    /// advances the counter.
    pub fn apply_block(&mut self, data: &mut [u8]) {
        debug_assert!(data.len() <= Self::BLOCK_SIZE);

        let mut keystream = self.counter;
        self.cipher.encrypt_block(&mut keystream);
        self.increment();
        memxor(data, &keystream[..data.len()]);
    }

    fn increment(&mut self) {
        let last = Self::BLOCK_SIZE - 1;
        self.counter[last] = self.counter[last].wrapping_add(1);
        let mut i = last;
        while self.counter[i] == 0 && i > 0 {
            self.counter[i - 1] = self.counter[i - 1].wrapping_add(1);
            i -= 1;
        }
    }
}
