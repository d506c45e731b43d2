//! Error type shared by the library.
//!
//! Every fallible operation in the crate surfaces one of these kinds. The
//! binary wraps them in `anyhow` at the host boundary; tests match on the
//! variant directly.

use std::fmt::{Display, Formatter};
use std::io;

/// Errors produced by key derivation, the algorithm facades, and the stream
/// engine.
#[derive(Debug)]
pub enum Error {
    /// A caller-supplied value is out of range or unknown: bad algorithm
    /// name, empty or oversized cipher/MAC list, Argon2 costs outside the
    /// accepted bounds, zero worker count.
    InvalidArgument(String),

    /// The input source or output sink failed.
    Io(io::Error),

    /// Decryption input ended before a full authentication tag was read.
    ShortInput,

    /// The recomputed tag does not match the trailing tag bytes.
    ///
    /// Plaintext already written before detection is not rolled back; the
    /// caller must discard it.
    AuthenticationFailure,

    /// A state the primitives cannot reach unless the crate itself is wrong.
    Internal(&'static str),

    /// Another worker failed first; this worker only observed the abort flag.
    /// Filtered out when workers are reaped, never reported on its own.
    Aborted,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Io(err) => write!(f, "i/o error: {err}"),
            Self::ShortInput => f.write_str("input shorter than the authentication tag"),
            Self::AuthenticationFailure => f.write_str("authentication failure: tag mismatch"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
            Self::Aborted => f.write_str("aborted by a concurrent failure"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// Library-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
