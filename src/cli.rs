//! CLI commands and argument parsing.
//!
//! The binary is a thin host: it opens the streams, reads the password and
//! secret files, and hands everything to the stream engine. Passwords and
//! secrets live in [`SecretBox`]es so they are wiped when dropped.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use secrecy::{ExposeSecret, SecretBox};

use crate::algo::{CipherAlgorithm, KdfAlgorithm, MacAlgorithm};
use crate::config::{DEFAULT_CIPHER, DEFAULT_KDF, DEFAULT_MAC, DEFAULT_THREADS};
use crate::stream::{self, StreamConfig};

/// lockstream - password-based stream encryption.
#[derive(Parser)]
#[command(name = "lockstream", version)]
#[command(
    about = "Encrypt or decrypt a byte stream with an Argon2-derived key, \
             one or two stream ciphers, and one or two MACs."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt stdin (or a file) to stdout (or a file).
    Encrypt(StreamArgs),

    /// Decrypt stdin (or a file) to stdout (or a file).
    ///
    /// Avoid piping the output into anything that acts on it immediately:
    /// plaintext streams out before the authentication tag can be verified.
    Decrypt(StreamArgs),
}

#[derive(Args)]
struct StreamArgs {
    /// KDF spec: algorithm,time-cost,memory-cost,parallelism.
    #[arg(short = 'k', long = "kdf", default_value = DEFAULT_KDF)]
    kdf: KdfSpec,

    /// Cipher list, comma separated, applied in order (1 or 2 entries).
    #[arg(short = 'c', long = "cipher", default_value = DEFAULT_CIPHER)]
    ciphers: CipherList,

    /// MAC list, comma separated, tags appended in order (1 or 2 entries).
    #[arg(short = 'm', long = "mac", default_value = DEFAULT_MAC)]
    macs: MacList,

    /// File whose raw contents are the password (default: empty password).
    #[arg(short = 'p', long = "password-file")]
    password_file: Option<PathBuf>,

    /// File whose raw contents are the Argon2 secret (default: empty).
    #[arg(short = 's', long = "secret-file")]
    secret_file: Option<PathBuf>,

    /// Worker thread count.
    #[arg(short = 't', long = "threads", default_value_t = DEFAULT_THREADS)]
    threads: usize,

    /// Input file (default: stdin).
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
}

/// Parsed `-k` value.
#[derive(Clone)]
struct KdfSpec {
    algorithm: KdfAlgorithm,
    time_cost: u32,
    memory_cost: u32,
    parallelism: u32,
}

impl FromStr for KdfSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        let [algorithm, time_cost, memory_cost, parallelism] = parts.as_slice() else {
            return Err(format!("expected algorithm,time,memory,parallelism, got \"{s}\""));
        };
        Ok(Self {
            algorithm: algorithm
                .parse()
                .map_err(|_| format!("unknown KDF algorithm \"{algorithm}\""))?,
            time_cost: parse_u32("time cost", time_cost)?,
            memory_cost: parse_u32("memory cost", memory_cost)?,
            parallelism: parse_u32("parallelism", parallelism)?,
        })
    }
}

fn parse_u32(what: &str, value: &str) -> Result<u32, String> {
    value.parse().map_err(|_| format!("invalid {what} \"{value}\""))
}

#[derive(Clone)]
struct CipherList(Vec<CipherAlgorithm>);

impl FromStr for CipherList {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(|name| name.parse().map_err(|_| format!("unknown cipher \"{name}\"")))
            .collect::<Result<_, _>>()
            .map(Self)
    }
}

#[derive(Clone)]
struct MacList(Vec<MacAlgorithm>);

impl FromStr for MacList {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(|name| name.parse().map_err(|_| format!("unknown MAC \"{name}\"")))
            .collect::<Result<_, _>>()
            .map(Self)
    }
}

impl Cli {
    pub fn init() -> Self {
        Self::parse()
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Encrypt(args) => run(&args, true),
            Commands::Decrypt(args) => run(&args, false),
        }
    }
}

fn run(args: &StreamArgs, encrypting: bool) -> Result<()> {
    let password = read_secret_file(args.password_file.as_deref())
        .context("failed to read password file")?;
    let secret =
        read_secret_file(args.secret_file.as_deref()).context("failed to read secret file")?;

    let config = StreamConfig {
        kdf: args.kdf.algorithm,
        password: password.expose_secret(),
        secret: secret.expose_secret(),
        salt: None,
        time_cost: args.kdf.time_cost,
        memory_cost: args.kdf.memory_cost,
        parallelism: args.kdf.parallelism,
        ciphers: &args.ciphers.0,
        macs: &args.macs.0,
        threads: args.threads,
    };

    let input = open_input(args.input.as_deref()).context("failed to open input")?;
    let output = open_output(args.output.as_deref()).context("failed to open output")?;

    if encrypting {
        stream::encrypt(&config, input, output).context("encryption failed")
    } else {
        stream::decrypt(&config, input, output).context("decryption failed")
    }
}

// Raw file bytes; a missing flag means an empty value, per the defaults.
fn read_secret_file(path: Option<&Path>) -> Result<SecretBox<Vec<u8>>> {
    let bytes = match path {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?
        }
        None => Vec::new(),
    };
    Ok(SecretBox::new(Box::new(bytes)))
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn Read + Send>> {
    Ok(match path {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(io::stdin()),
    })
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write + Send>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout()),
    })
}
