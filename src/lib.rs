//! lockstream - password-based stream encryption.
//!
//! A stream is encrypted as `[salt?] || ciphertext || tag(s)`: keys come from
//! Argon2 over a password (plus optional secret and salt), the payload goes
//! through one or two seekable stream ciphers in order, and one or two MACs
//! authenticate the ciphertext. A pool of workers processes 1 MiB chunks in
//! parallel while preserving exact stream order for counters, MAC updates,
//! and output bytes, so the result is byte-identical for any worker count.
//!
//! All primitives are implemented in this crate and checked against their
//! published test vectors; see [`crypto`].

pub mod algo;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod stream;
pub mod util;

pub use error::{Error, Result};
