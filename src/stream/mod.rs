//! The multi-worker stream engine.
//!
//! Output layout: `[salt?] || ciphertext || tag(s)`. The salt prefix is
//! written (encrypt) or consumed (decrypt) only when the caller did not
//! supply a salt; the tags are the configured MACs' outputs, concatenated in
//! list order.
//!
//! Workers pull 1 MiB chunks under an input lock that also hands out the
//! chunk's absolute position. Ciphering is embarrassingly parallel because
//! every cipher is seeked to the chunk's block offset; MAC updates and output
//! writes are serialized by position through condition variables. Any failure
//! sets a shared abort flag and wakes all waiters; workers are always joined
//! before the first real error is reported.
//!
//! Decryption streams plaintext before the tag can be checked. A mismatch
//! surfaces as [`Error::AuthenticationFailure`] only at the end, so anything
//! already written must be treated as unusable; do not pipe decrypted output
//! into consumers that act on it immediately.

mod ciphers;
mod input;
mod macs;
mod output;

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use rand::RngExt;
use secrecy::zeroize::Zeroizing;
use subtle::ConstantTimeEq;
use tracing::{debug, info};

pub use ciphers::CipherChain;
pub use input::InputReader;
pub use macs::MacChain;
pub use output::OutputWriter;

use crate::algo::{CipherAlgorithm, KdfAlgorithm, KdfParams, MacAlgorithm, derive_key};
use crate::config::{CHUNK_SIZE, SALT_SIZE};
use crate::error::{Error, Result};

/// Everything one encryption or decryption run needs besides the two byte
/// streams.
#[derive(Clone, Copy)]
pub struct StreamConfig<'a> {
    pub kdf: KdfAlgorithm,
    pub password: &'a [u8],
    pub secret: &'a [u8],
    /// `None` draws (encrypt) or reads (decrypt) a 32-byte salt at the head
    /// of the output/input stream.
    pub salt: Option<&'a [u8]>,
    pub time_cost: u32,
    /// KiB blocks.
    pub memory_cost: u32,
    pub parallelism: u32,
    /// Applied in order on encrypt, same order on decrypt.
    pub ciphers: &'a [CipherAlgorithm],
    /// Tags appended in this order.
    pub macs: &'a [MacAlgorithm],
    pub threads: usize,
}

#[derive(Clone, Copy)]
enum Mode {
    Encrypt,
    Decrypt,
}

/// Encrypts `input` into `output`.
///
/// # Errors
///
/// [`Error::InvalidArgument`] for bad algorithm lists, thread counts, or KDF
/// costs; [`Error::Io`] when either stream fails.
pub fn encrypt<R, W>(config: &StreamConfig<'_>, input: R, output: W) -> Result<()>
where
    R: Read + Send,
    W: Write + Send,
{
    validate(config)?;
    info!(
        ciphers = config.ciphers.len(),
        macs = config.macs.len(),
        threads = config.threads,
        "encrypting stream"
    );

    let input = InputReader::new(input);
    let output = OutputWriter::new(output);

    let mut generated = [0u8; SALT_SIZE];
    let salt: &[u8] = match config.salt {
        Some(salt) => salt,
        None => {
            rand::rng().fill(&mut generated[..]);
            output.write_raw(&generated)?;
            debug!("wrote generated salt");
            &generated
        }
    };

    let (ciphers, macs) = init_chains(config, salt)?;
    run_workers(&input, &output, &ciphers, &macs, config.threads, Mode::Encrypt)?;

    let tag = macs.finalize()?;
    output.write_raw(&tag)?;
    output.flush()
}

/// Decrypts `input` into `output` and verifies the trailing tag.
///
/// # Errors
///
/// Everything `encrypt` can return, plus [`Error::ShortInput`] when the
/// stream is smaller than the tag and [`Error::AuthenticationFailure`] on a
/// tag mismatch (plaintext already written is not rolled back).
pub fn decrypt<R, W>(config: &StreamConfig<'_>, input: R, output: W) -> Result<()>
where
    R: Read + Send,
    W: Write + Send,
{
    validate(config)?;
    info!(
        ciphers = config.ciphers.len(),
        macs = config.macs.len(),
        threads = config.threads,
        "decrypting stream"
    );

    let input = InputReader::new(input);
    let output = OutputWriter::new(output);

    input.init_reserve(MacChain::output_size_of(config.macs))?;

    let mut leading = [0u8; SALT_SIZE];
    let salt: &[u8] = match config.salt {
        Some(salt) => salt,
        None => {
            input.read_exact_through(&mut leading)?;
            &leading
        }
    };

    let (ciphers, macs) = init_chains(config, salt)?;
    run_workers(&input, &output, &ciphers, &macs, config.threads, Mode::Decrypt)?;

    let tag = macs.finalize()?;
    let trailer = input.into_reserve();
    if !bool::from(tag.ct_eq(&trailer)) {
        return Err(Error::AuthenticationFailure);
    }

    output.flush()
}

fn validate(config: &StreamConfig<'_>) -> Result<()> {
    if config.ciphers.is_empty() || config.ciphers.len() > 2 {
        return Err(Error::InvalidArgument("cipher list must have 1 or 2 entries".into()));
    }
    if config.macs.is_empty() || config.macs.len() > 2 {
        return Err(Error::InvalidArgument("mac list must have 1 or 2 entries".into()));
    }
    if config.threads == 0 {
        return Err(Error::InvalidArgument("thread count must be at least 1".into()));
    }
    Ok(())
}

// Derives one key covering every cipher and MAC, then splits it: ciphers
// first, MACs after, each in list order.
fn init_chains(config: &StreamConfig<'_>, salt: &[u8]) -> Result<(CipherChain, MacChain)> {
    let cipher_key_size = CipherChain::key_size(config.ciphers);
    let total = cipher_key_size + MacChain::key_size(config.macs);

    let mut key = Zeroizing::new(vec![0u8; total]);
    derive_key(
        config.kdf,
        &KdfParams {
            password: config.password,
            salt,
            secret: config.secret,
            memory_cost: config.memory_cost,
            time_cost: config.time_cost,
            parallelism: config.parallelism,
        },
        &mut key,
    )?;

    let ciphers = CipherChain::new(config.ciphers, &key[..cipher_key_size])?;
    let macs = MacChain::new(config.macs, &key[cipher_key_size..])?;
    Ok((ciphers, macs))
}

fn run_workers<R, W>(
    input: &InputReader<R>,
    output: &OutputWriter<W>,
    prototype: &CipherChain,
    macs: &MacChain,
    threads: usize,
    mode: Mode,
) -> Result<()>
where
    R: Read + Send,
    W: Write + Send,
{
    let aborted = AtomicBool::new(false);
    let aborted = &aborted;

    let results: Vec<Result<()>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(move || {
                    let mut ciphers = prototype.clone();
                    worker_loop(input, output, macs, &mut ciphers, aborted, mode)
                })
            })
            .collect();

        handles.into_iter().map(|handle| handle.join().expect("worker panicked")).collect()
    });

    reap(results)
}

fn worker_loop<R, W>(
    input: &InputReader<R>,
    output: &OutputWriter<W>,
    macs: &MacChain,
    ciphers: &mut CipherChain,
    aborted: &AtomicBool,
    mode: Mode,
) -> Result<()>
where
    R: Read + Send,
    W: Write + Send,
{
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        if aborted.load(Ordering::Relaxed) {
            return Err(Error::Aborted);
        }

        let (len, position) = match input.sync_read(&mut buf) {
            Ok(read) => read,
            Err(err) => return trip(err, aborted, macs, output),
        };
        if len == 0 {
            return Ok(());
        }
        let chunk = &mut buf[..len];

        // Encrypt ciphers first so the MAC covers ciphertext; decrypt MACs
        // first for the same reason.
        let transformed = match mode {
            Mode::Encrypt => ciphers
                .encrypt(chunk, position)
                .and_then(|()| macs.sync_update(chunk, position)),
            Mode::Decrypt => macs
                .sync_update(chunk, position)
                .and_then(|()| ciphers.encrypt(chunk, position)),
        };
        if let Err(err) = transformed {
            return trip(err, aborted, macs, output);
        }

        if let Err(err) = output.sync_write(chunk, position) {
            return trip(err, aborted, macs, output);
        }
    }
}

// Marks the run failed and wakes every blocked peer, then hands the error
// back for this worker's own result slot.
fn trip<W: Write>(
    err: Error,
    aborted: &AtomicBool,
    macs: &MacChain,
    output: &OutputWriter<W>,
) -> Result<()> {
    aborted.store(true, Ordering::Relaxed);
    macs.abort();
    output.abort();
    Err(err)
}

// The first real failure wins; `Aborted` results are only echoes of it.
fn reap(results: Vec<Result<()>>) -> Result<()> {
    let mut echo = None;
    for result in results {
        match result {
            Ok(()) => {}
            Err(Error::Aborted) => echo = Some(Error::Aborted),
            Err(err) => return Err(err),
        }
    }
    match echo {
        None => Ok(()),
        Some(err) => Err(err),
    }
}
