//! Stream cipher facade.
//!
//! Every supported cipher behaves as a seekable keystream: the composite key
//! carries the raw key material plus the initial counter/nonce, and
//! `set_counter` repositions the keystream at an absolute block offset. That
//! is what lets pipeline workers encrypt chunks out of order.

use strum::{Display, EnumString};

use crate::crypto::aes::Aes;
use crate::crypto::chacha20::ChaCha20;
use crate::crypto::ctr::AesCtr;
use crate::crypto::{chacha20, ctr};
use crate::error::{Error, Result};

/// Cipher identifiers as they appear on the command line.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, EnumString)]
pub enum CipherAlgorithm {
    #[strum(serialize = "aes-128-ctr")]
    Aes128Ctr,
    #[strum(serialize = "aes-192-ctr")]
    Aes192Ctr,
    #[strum(serialize = "aes-256-ctr")]
    Aes256Ctr,
    #[strum(serialize = "chacha20")]
    ChaCha20,
}

impl CipherAlgorithm {
    /// Composite key size: raw key plus the initial counter (AES-CTR) or
    /// counter + nonce (ChaCha20).
    pub fn key_size(self) -> usize {
        match self {
            Self::Aes128Ctr => 16 + 16,
            Self::Aes192Ctr => 24 + 16,
            Self::Aes256Ctr => 32 + 16,
            Self::ChaCha20 => chacha20::KEY_SIZE + chacha20::COUNTER_SIZE + chacha20::NONCE_SIZE,
        }
    }

    pub fn block_size(self) -> usize {
        match self {
            Self::Aes128Ctr | Self::Aes192Ctr | Self::Aes256Ctr => ctr::AesCtr::BLOCK_SIZE,
            Self::ChaCha20 => chacha20::BLOCK_SIZE,
        }
    }
}

/// An initialized, seekable stream cipher.
///
/// Clones share the key and initial counter but advance independently; two
/// clones set to the same counter produce the same keystream.
#[derive(Clone)]
pub enum StreamCipher {
    AesCtr {
        cipher: AesCtr,
        /// Counter from the composite key, before any seek.
        initial_counter: u128,
    },
    ChaCha20 {
        cipher: ChaCha20,
        initial_counter: u64,
    },
}

impl StreamCipher {
    /// Builds a cipher from its composite key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the key length does not match
    /// the algorithm.
    pub fn new(algorithm: CipherAlgorithm, key: &[u8]) -> Result<Self> {
        if key.len() != algorithm.key_size() {
            return Err(Error::InvalidArgument(format!(
                "{algorithm} needs a {}-byte key, got {}",
                algorithm.key_size(),
                key.len()
            )));
        }

        match algorithm {
            CipherAlgorithm::Aes128Ctr | CipherAlgorithm::Aes192Ctr | CipherAlgorithm::Aes256Ctr => {
                let (raw_key, counter_bytes) = key.split_at(key.len() - 16);
                let counter: [u8; 16] = counter_bytes.try_into().expect("split length");
                Ok(Self::AesCtr {
                    cipher: AesCtr::new(Aes::new(raw_key), counter),
                    initial_counter: u128::from_be_bytes(counter),
                })
            }
            CipherAlgorithm::ChaCha20 => {
                let raw_key: [u8; 32] = key[..32].try_into().expect("split length");
                let counter =
                    u64::from_le_bytes(key[32..40].try_into().expect("split length"));
                let nonce: [u8; 8] = key[40..48].try_into().expect("split length");
                Ok(Self::ChaCha20 {
                    cipher: ChaCha20::new(&raw_key, counter, &nonce),
                    initial_counter: counter,
                })
            }
        }
    }

    pub fn block_size(&self) -> usize {
        match self {
            Self::AesCtr { .. } => AesCtr::BLOCK_SIZE,
            Self::ChaCha20 { .. } => chacha20::BLOCK_SIZE,
        }
    }

    /// Seeks the keystream to `initial counter + block_offset`.
    ///
    /// The offset is absolute: seeking to the same offset twice replays the
    /// same keystream.
    pub fn set_counter(&mut self, block_offset: u64) {
        match self {
            Self::AesCtr { cipher, initial_counter } => {
                let counter = initial_counter.wrapping_add(u128::from(block_offset));
                cipher.set_counter_block(counter.to_be_bytes());
            }
            Self::ChaCha20 { cipher, initial_counter } => {
                cipher.set_counter(initial_counter.wrapping_add(block_offset));
            }
        }
    }

    /// Encrypts (or decrypts) `data` in place, block by block. Only the last
    /// block may be short.
    pub fn apply(&mut self, data: &mut [u8]) {
        match self {
            Self::AesCtr { cipher, .. } => {
                for block in data.chunks_mut(AesCtr::BLOCK_SIZE) {
                    cipher.apply_block(block);
                }
            }
            Self::ChaCha20 { cipher, .. } => {
                for block in data.chunks_mut(chacha20::BLOCK_SIZE) {
                    cipher.apply_block(block);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for name in ["aes-128-ctr", "aes-192-ctr", "aes-256-ctr", "chacha20"] {
            let algorithm: CipherAlgorithm = name.parse().unwrap();
            assert_eq!(algorithm.to_string(), name);
        }
        assert!("aes-512-ctr".parse::<CipherAlgorithm>().is_err());
    }

    #[test]
    fn key_sizes() {
        assert_eq!(CipherAlgorithm::Aes128Ctr.key_size(), 32);
        assert_eq!(CipherAlgorithm::Aes192Ctr.key_size(), 40);
        assert_eq!(CipherAlgorithm::Aes256Ctr.key_size(), 48);
        assert_eq!(CipherAlgorithm::ChaCha20.key_size(), 48);
    }

    #[test]
    fn wrong_key_length_is_rejected() {
        assert!(matches!(
            StreamCipher::new(CipherAlgorithm::ChaCha20, &[0u8; 47]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn seek_replays_the_keystream() {
        for algorithm in [
            CipherAlgorithm::Aes128Ctr,
            CipherAlgorithm::Aes192Ctr,
            CipherAlgorithm::Aes256Ctr,
            CipherAlgorithm::ChaCha20,
        ] {
            let key: Vec<u8> = (0..algorithm.key_size() as u8).collect();
            let block = algorithm.block_size();

            // Encrypt 4 blocks in order.
            let mut sequential = StreamCipher::new(algorithm, &key).unwrap();
            sequential.set_counter(0);
            let mut ordered = vec![0u8; 4 * block];
            sequential.apply(&mut ordered);

            // Encrypt block 2 alone via a clone of the prototype.
            let mut seeked = StreamCipher::new(algorithm, &key).unwrap();
            seeked.set_counter(2);
            let mut third = vec![0u8; block];
            seeked.apply(&mut third);

            assert_eq!(third, ordered[2 * block..3 * block], "{algorithm}");
        }
    }

    #[test]
    fn set_counter_offsets_the_stored_initial_counter() {
        // A key whose embedded counter is 5: seeking to block k must land on
        // absolute counter 5 + k, not k.
        let mut key = vec![0u8; 48];
        key[32] = 5; // little-endian counter for chacha20

        let mut from_five = StreamCipher::new(CipherAlgorithm::ChaCha20, &key).unwrap();
        from_five.set_counter(2);
        let mut a = vec![0u8; 64];
        from_five.apply(&mut a);

        let key_zero = vec![0u8; 48];
        let mut from_zero = StreamCipher::new(CipherAlgorithm::ChaCha20, &key_zero).unwrap();
        from_zero.set_counter(7);
        let mut b = vec![0u8; 64];
        from_zero.apply(&mut b);

        assert_eq!(a, b);
    }

    #[test]
    fn clones_are_independent() {
        let key: Vec<u8> = (0..48).collect();
        let mut original = StreamCipher::new(CipherAlgorithm::ChaCha20, &key).unwrap();
        let mut clone = original.clone();

        let mut a = vec![1u8; 64];
        let mut b = vec![1u8; 64];
        original.set_counter(0);
        original.apply(&mut a);
        clone.set_counter(0);
        clone.apply(&mut b);
        assert_eq!(a, b);
    }
}
