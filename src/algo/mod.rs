//! Runtime-selected algorithm facades.
//!
//! The CLI picks ciphers, MACs, and the KDF by name; these modules wrap the
//! primitives behind small tagged enums so the stream engine never needs to
//! know which algorithm is running. Dispatch is per chunk, not per byte.

pub mod cipher;
pub mod kdf;
pub mod mac;

pub use cipher::{CipherAlgorithm, StreamCipher};
pub use kdf::{KdfAlgorithm, KdfParams, derive_key};
pub use mac::{Mac, MacAlgorithm};
