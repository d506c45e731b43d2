//! The ordered MAC list, updated in strict stream order.
//!
//! There is exactly one MAC state per algorithm, shared by all workers. A
//! `sync_update` blocks until the MAC cursor reaches the caller's position,
//! applies every MAC in list order, advances, and broadcasts. The tag is
//! therefore always computed over bytes in stream order, whatever the worker
//! interleaving was.

use std::sync::{Condvar, Mutex};

use crate::algo::{Mac, MacAlgorithm};
use crate::error::{Error, Result};

pub struct MacChain {
    state: Mutex<MacState>,
    ready: Condvar,
    output_size: usize,
}

struct MacState {
    macs: Vec<Mac>,
    position: u64,
    aborted: bool,
}

impl MacChain {
    /// Total key size for `algorithms` (32 bytes each).
    pub fn key_size(algorithms: &[MacAlgorithm]) -> usize {
        algorithms.len() * MacAlgorithm::KEY_SIZE
    }

    /// Total tag size for `algorithms`.
    pub fn output_size_of(algorithms: &[MacAlgorithm]) -> usize {
        algorithms.iter().map(|a| a.output_size()).sum()
    }

    /// Builds the chain, splitting `key` across the MACs in list order.
    pub fn new(algorithms: &[MacAlgorithm], key: &[u8]) -> Result<Self> {
        debug_assert_eq!(key.len(), Self::key_size(algorithms));

        let mut macs = Vec::with_capacity(algorithms.len());
        for (i, &algorithm) in algorithms.iter().enumerate() {
            let start = i * MacAlgorithm::KEY_SIZE;
            macs.push(Mac::new(algorithm, &key[start..start + MacAlgorithm::KEY_SIZE])?);
        }

        Ok(Self {
            state: Mutex::new(MacState { macs, position: 0, aborted: false }),
            ready: Condvar::new(),
            output_size: Self::output_size_of(algorithms),
        })
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// Feeds `data` (stream offset `position`) to every MAC, in stream order.
    ///
    /// # Errors
    ///
    /// [`Error::Aborted`] when the chain was aborted while waiting.
    pub fn sync_update(&self, data: &[u8], position: u64) -> Result<()> {
        let mut state = self.state.lock().expect("mac lock");
        while state.position != position && !state.aborted {
            state = self.ready.wait(state).expect("mac lock");
        }
        if state.aborted {
            return Err(Error::Aborted);
        }

        for mac in &mut state.macs {
            mac.update(data);
        }

        state.position += data.len() as u64;
        drop(state);
        self.ready.notify_all();
        Ok(())
    }

    /// Wakes every waiting worker into the aborted state.
    pub fn abort(&self) {
        self.state.lock().expect("mac lock").aborted = true;
        self.ready.notify_all();
    }

    /// Concatenated tags in list order. Call once, after every worker joined.
    pub fn finalize(self) -> Result<Vec<u8>> {
        let state = self.state.into_inner().expect("mac lock");
        if state.aborted {
            return Err(Error::Aborted);
        }

        let mut tag = vec![0u8; self.output_size];
        let mut offset = 0;
        for mac in state.macs {
            let len = mac.output_size();
            mac.finalize(&mut tag[offset..offset + len]);
            offset += len;
        }
        Ok(tag)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn chain(algorithms: &[MacAlgorithm]) -> MacChain {
        let key = vec![0x0bu8; MacChain::key_size(algorithms)];
        MacChain::new(algorithms, &key).unwrap()
    }

    #[test]
    fn out_of_order_updates_produce_the_stream_order_tag() {
        let algorithms = [MacAlgorithm::HmacSha256, MacAlgorithm::Poly1305];

        let ordered = chain(&algorithms);
        ordered.sync_update(b"hello ", 0).unwrap();
        ordered.sync_update(b"world", 6).unwrap();
        let expected = ordered.finalize().unwrap();

        let racy = chain(&algorithms);
        thread::scope(|scope| {
            let second = scope.spawn(|| racy.sync_update(b"world", 6).unwrap());
            let first = scope.spawn(|| racy.sync_update(b"hello ", 0).unwrap());
            first.join().unwrap();
            second.join().unwrap();
        });
        assert_eq!(racy.finalize().unwrap(), expected);
    }

    #[test]
    fn composed_tag_concatenates_in_list_order() {
        let algorithms = [MacAlgorithm::HmacSha256, MacAlgorithm::Poly1305];
        let combined = chain(&algorithms);
        combined.sync_update(b"payload", 0).unwrap();
        let tag = combined.finalize().unwrap();
        assert_eq!(tag.len(), 32 + 16);

        let first_only = chain(&[MacAlgorithm::HmacSha256]);
        first_only.sync_update(b"payload", 0).unwrap();
        assert_eq!(tag[..32], first_only.finalize().unwrap()[..]);
    }

    #[test]
    fn abort_wakes_waiters_and_poisons_finalize() {
        let blocked = chain(&[MacAlgorithm::Poly1305]);
        thread::scope(|scope| {
            let handle = scope.spawn(|| blocked.sync_update(b"late", 100));
            blocked.abort();
            assert!(matches!(handle.join().unwrap(), Err(Error::Aborted)));
        });
        assert!(matches!(blocked.finalize(), Err(Error::Aborted)));
    }
}
