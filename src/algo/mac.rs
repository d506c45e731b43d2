//! Message authentication facade.
//!
//! All MAC variants take a 32-byte key regardless of the underlying
//! construction, so key-schedule layout stays uniform when MACs are composed.
//! HMAC wraps a hash through the pad construction; BLAKE2b/s use their native
//! keyed mode at full output length.

use strum::{Display, EnumString};

use crate::crypto::blake2::{Blake2b, Blake2s};
use crate::crypto::hmac::Hmac;
use crate::crypto::poly1305::Poly1305;
use crate::crypto::sha1::Sha1;
use crate::crypto::sha2::{Sha256, Sha512};
use crate::error::{Error, Result};

/// MAC identifiers as they appear on the command line.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, EnumString)]
pub enum MacAlgorithm {
    #[strum(serialize = "hmac-sha1")]
    HmacSha1,
    #[strum(serialize = "hmac-sha256")]
    HmacSha256,
    #[strum(serialize = "hmac-sha512")]
    HmacSha512,
    #[strum(serialize = "poly1305")]
    Poly1305,
    #[strum(serialize = "blake2b")]
    Blake2b,
    #[strum(serialize = "blake2s")]
    Blake2s,
}

impl MacAlgorithm {
    /// Key size is 32 bytes for every variant.
    pub const KEY_SIZE: usize = 32;

    pub fn output_size(self) -> usize {
        match self {
            Self::HmacSha1 => 20,
            Self::HmacSha256 => 32,
            Self::HmacSha512 => 64,
            Self::Poly1305 => Poly1305::OUTPUT_SIZE,
            Self::Blake2b => Blake2b::MAX_OUTPUT_SIZE,
            Self::Blake2s => Blake2s::MAX_OUTPUT_SIZE,
        }
    }
}

/// An initialized MAC. `finalize` consumes the state; a tag is emitted at
/// most once.
pub enum Mac {
    HmacSha1(Hmac<Sha1>),
    HmacSha256(Hmac<Sha256>),
    HmacSha512(Hmac<Sha512>),
    Poly1305(Poly1305),
    Blake2b(Blake2b),
    Blake2s(Blake2s),
}

impl Mac {
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when `key` is not 32 bytes.
    pub fn new(algorithm: MacAlgorithm, key: &[u8]) -> Result<Self> {
        if key.len() != MacAlgorithm::KEY_SIZE {
            return Err(Error::InvalidArgument(format!(
                "{algorithm} needs a {}-byte key, got {}",
                MacAlgorithm::KEY_SIZE,
                key.len()
            )));
        }

        Ok(match algorithm {
            MacAlgorithm::HmacSha1 => Self::HmacSha1(Hmac::new(key)),
            MacAlgorithm::HmacSha256 => Self::HmacSha256(Hmac::new(key)),
            MacAlgorithm::HmacSha512 => Self::HmacSha512(Hmac::new(key)),
            MacAlgorithm::Poly1305 => {
                Self::Poly1305(Poly1305::new(key.try_into().expect("length checked")))
            }
            MacAlgorithm::Blake2b => {
                Self::Blake2b(Blake2b::new_keyed(key, Blake2b::MAX_OUTPUT_SIZE))
            }
            MacAlgorithm::Blake2s => {
                Self::Blake2s(Blake2s::new_keyed(key, Blake2s::MAX_OUTPUT_SIZE))
            }
        })
    }

    pub fn algorithm(&self) -> MacAlgorithm {
        match self {
            Self::HmacSha1(_) => MacAlgorithm::HmacSha1,
            Self::HmacSha256(_) => MacAlgorithm::HmacSha256,
            Self::HmacSha512(_) => MacAlgorithm::HmacSha512,
            Self::Poly1305(_) => MacAlgorithm::Poly1305,
            Self::Blake2b(_) => MacAlgorithm::Blake2b,
            Self::Blake2s(_) => MacAlgorithm::Blake2s,
        }
    }

    pub fn output_size(&self) -> usize {
        self.algorithm().output_size()
    }

    pub fn update(&mut self, input: &[u8]) {
        match self {
            Self::HmacSha1(mac) => mac.update(input),
            Self::HmacSha256(mac) => mac.update(input),
            Self::HmacSha512(mac) => mac.update(input),
            Self::Poly1305(mac) => mac.update(input),
            Self::Blake2b(mac) => mac.update(input),
            Self::Blake2s(mac) => mac.update(input),
        }
    }

    /// Writes `output_size()` tag bytes into `out`.
    pub fn finalize(self, out: &mut [u8]) {
        match self {
            Self::HmacSha1(mac) => mac.finalize(out),
            Self::HmacSha256(mac) => mac.finalize(out),
            Self::HmacSha512(mac) => mac.finalize(out),
            Self::Poly1305(mac) => mac.finalize(out),
            Self::Blake2b(mac) => mac.finalize(out),
            Self::Blake2s(mac) => mac.finalize(out),
        }
    }
}
