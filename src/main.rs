use std::process;

use mimalloc::MiMalloc;
use tracing_subscriber::EnvFilter;

use lockstream::cli::Cli;

// The worker pool allocates and frees large chunk buffers across threads;
// mimalloc keeps that cheap.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// # Exit codes
/// * 0 - Success
/// * 1 - Error (message printed to stderr)
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = Cli::init().execute() {
        eprintln!("Error: {e:?}");
        process::exit(1);
    }
}
