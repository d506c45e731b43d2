//! Shared output side of the pipeline.
//!
//! Workers finish chunks out of order; `sync_write` restores stream order by
//! blocking each writer until the output cursor reaches its chunk's position.
//! The condition variable is broadcast after every write and on abort, so a
//! failure can never strand a waiting worker.

use std::io::Write;
use std::sync::{Condvar, Mutex};

use crate::error::{Error, Result};

pub struct OutputWriter<W> {
    state: Mutex<OutputState<W>>,
    ready: Condvar,
}

struct OutputState<W> {
    sink: W,
    position: u64,
    aborted: bool,
}

impl<W: Write> OutputWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            state: Mutex::new(OutputState { sink, position: 0, aborted: false }),
            ready: Condvar::new(),
        }
    }

    /// Writes without position accounting. Used for the salt prefix and the
    /// trailing tag, outside the worker phase.
    pub fn write_raw(&self, data: &[u8]) -> Result<()> {
        let mut state = self.state.lock().expect("output lock");
        state.sink.write_all(data).map_err(Error::from)
    }

    /// Writes `data` at stream offset `position`, blocking until every byte
    /// before it has been written.
    ///
    /// # Errors
    ///
    /// [`Error::Aborted`] when another worker failed while this one waited;
    /// [`Error::Io`] when the sink itself fails (which also aborts peers).
    pub fn sync_write(&self, data: &[u8], position: u64) -> Result<()> {
        let mut state = self.state.lock().expect("output lock");
        while state.position != position && !state.aborted {
            state = self.ready.wait(state).expect("output lock");
        }
        if state.aborted {
            return Err(Error::Aborted);
        }

        if let Err(err) = state.sink.write_all(data) {
            state.aborted = true;
            self.ready.notify_all();
            return Err(err.into());
        }

        state.position += data.len() as u64;
        drop(state);
        self.ready.notify_all();
        Ok(())
    }

    /// Wakes every waiting worker into the aborted state.
    pub fn abort(&self) {
        self.state.lock().expect("output lock").aborted = true;
        self.ready.notify_all();
    }

    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.lock().expect("output lock");
        state.sink.flush().map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn out_of_order_writes_come_out_ordered() {
        let writer = Arc::new(OutputWriter::new(Vec::new()));

        // Spawn writers for positions 4, 2, 0 in reverse order; each chunk is
        // 2 bytes, so they gate on one another.
        thread::scope(|scope| {
            for (position, byte) in [(4u64, b'c'), (2, b'b'), (0, b'a')] {
                let writer = Arc::clone(&writer);
                scope.spawn(move || writer.sync_write(&[byte; 2], position).unwrap());
            }
        });

        let state = Arc::into_inner(writer).unwrap().state.into_inner().unwrap();
        assert_eq!(state.sink, b"aabbcc");
        assert_eq!(state.position, 6);
    }

    #[test]
    fn abort_wakes_waiters() {
        let writer = Arc::new(OutputWriter::new(Vec::new()));

        thread::scope(|scope| {
            let waiting = Arc::clone(&writer);
            // Position 8 can never be reached; only abort releases it.
            let handle = scope.spawn(move || waiting.sync_write(b"x", 8));
            writer.abort();
            assert!(matches!(handle.join().unwrap(), Err(Error::Aborted)));
        });
    }

    #[test]
    fn raw_writes_skip_the_cursor() {
        let writer = OutputWriter::new(Vec::new());
        writer.write_raw(b"salt").unwrap();
        writer.sync_write(b"body", 0).unwrap();

        let state = writer.state.into_inner().unwrap();
        assert_eq!(state.sink, b"saltbody");
        assert_eq!(state.position, 4);
    }
}
