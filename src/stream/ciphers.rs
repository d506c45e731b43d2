//! The ordered cipher list applied to each chunk.
//!
//! A chain owns one state per configured cipher. Workers clone the initialized
//! prototype, then every `encrypt` call seeks each cipher to the chunk's
//! absolute block offset before applying it, so any worker can process any
//! chunk and produce identical bytes.

use crate::algo::{CipherAlgorithm, StreamCipher};
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct CipherChain {
    ciphers: Vec<StreamCipher>,
}

impl CipherChain {
    /// Total composite key size for `algorithms`.
    pub fn key_size(algorithms: &[CipherAlgorithm]) -> usize {
        algorithms.iter().map(|a| a.key_size()).sum()
    }

    /// Builds the chain, splitting `key` across the ciphers in list order.
    pub fn new(algorithms: &[CipherAlgorithm], key: &[u8]) -> Result<Self> {
        debug_assert_eq!(key.len(), Self::key_size(algorithms));

        let mut ciphers = Vec::with_capacity(algorithms.len());
        let mut offset = 0;
        for &algorithm in algorithms {
            let take = algorithm.key_size();
            ciphers.push(StreamCipher::new(algorithm, &key[offset..offset + take])?);
            offset += take;
        }
        Ok(Self { ciphers })
    }

    /// Applies every cipher in order to `data`, which starts at stream byte
    /// `position`.
    ///
    /// # Errors
    ///
    /// [`Error::Internal`] when `position` is not block aligned for one of
    /// the ciphers. Chunking keeps positions at multiples of the chunk size,
    /// which is a multiple of every supported block size.
    pub fn encrypt(&mut self, data: &mut [u8], position: u64) -> Result<()> {
        for cipher in &mut self.ciphers {
            let block_size = cipher.block_size() as u64;
            if position % block_size != 0 {
                return Err(Error::Internal("chunk position not block aligned"));
            }
            cipher.set_counter(position / block_size);
            cipher.apply(data);
        }
        Ok(())
    }
}
