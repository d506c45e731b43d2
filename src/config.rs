//! Constants shared across the crate.
//!
//! These fix the on-stream format and the CLI defaults, so they are the
//! single source of truth for compatibility between encrypt and decrypt.

/// Length of the salt written at (or read from) the head of the stream when
/// the caller does not supply one.
pub const SALT_SIZE: usize = 32;

/// Bytes pulled per `sync_read`.
///
/// 1 MiB is a multiple of every supported cipher block size (16 for AES-CTR,
/// 64 for ChaCha20), so only the final chunk of a stream can be short.
pub const CHUNK_SIZE: usize = 1 << 20;

/// Default KDF spec: algorithm, time cost, memory cost (KiB), parallelism.
pub const DEFAULT_KDF: &str = "argon2id,1,2097152,4";

/// Default cipher list.
pub const DEFAULT_CIPHER: &str = "chacha20";

/// Default MAC list.
pub const DEFAULT_MAC: &str = "poly1305";

/// Default worker count for the stream pipeline.
pub const DEFAULT_THREADS: usize = 4;
