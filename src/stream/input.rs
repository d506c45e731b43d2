//! Shared input side of the pipeline.
//!
//! One reader is shared by every worker. A `sync_read` hands out the next
//! chunk together with its absolute byte position; the mutex makes the
//! read-and-advance atomic, so chunks never overlap and positions never skip.
//!
//! For decryption the reader also maintains a reserve: the newest
//! `reserve_len` bytes are always withheld from callers, so when the stream
//! ends the reserve holds exactly the trailing authentication tag.

use std::io::Read;
use std::sync::Mutex;

use crate::error::{Error, Result};

pub struct InputReader<R> {
    state: Mutex<InputState<R>>,
}

struct InputState<R> {
    source: R,
    position: u64,
    reserve: Vec<u8>,
    scratch: Vec<u8>,
}

impl<R: Read> InputReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            state: Mutex::new(InputState {
                source,
                position: 0,
                reserve: Vec::new(),
                scratch: Vec::new(),
            }),
        }
    }

    /// Pre-fills the reserve with `len` bytes.
    ///
    /// # Errors
    ///
    /// [`Error::ShortInput`] when the stream ends first.
    pub fn init_reserve(&self, len: usize) -> Result<()> {
        let mut state = self.state.lock().expect("input lock");
        debug_assert!(state.reserve.is_empty());

        let mut reserve = vec![0u8; len];
        if read_full(&mut state.source, &mut reserve)? != len {
            return Err(Error::ShortInput);
        }
        state.reserve = reserve;
        Ok(())
    }

    /// Reads exactly `buf.len()` bytes through the reserve, without touching
    /// the position cursor. Used for the leading salt.
    ///
    /// # Errors
    ///
    /// [`Error::ShortInput`] when the stream ends first.
    pub fn read_exact_through(&self, buf: &mut [u8]) -> Result<()> {
        let mut state = self.state.lock().expect("input lock");
        if state.read_through(buf)? != buf.len() {
            return Err(Error::ShortInput);
        }
        Ok(())
    }

    /// Reads up to `buf.len()` bytes and returns `(length, position)`, where
    /// `position` is the stream offset of the first byte returned. A length
    /// of zero means end of stream.
    pub fn sync_read(&self, buf: &mut [u8]) -> Result<(usize, u64)> {
        let mut state = self.state.lock().expect("input lock");
        let len = state.read_through(buf)?;
        let position = state.position;
        state.position += len as u64;
        Ok((len, position))
    }

    /// Hands back the reserve (the trailing tag bytes at end of stream).
    pub fn into_reserve(self) -> Vec<u8> {
        self.state.into_inner().expect("input lock").reserve
    }
}

impl<R: Read> InputState<R> {
    // Shifts fresh bytes through the reserve: callers receive the oldest
    // bytes, the reserve keeps the newest.
    fn read_through(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.reserve.is_empty() {
            return read_full(&mut self.source, buf);
        }

        let reserve_len = self.reserve.len();
        self.scratch.clear();
        self.scratch.extend_from_slice(&self.reserve);
        self.scratch.resize(reserve_len + buf.len(), 0);

        let fresh = read_full(&mut self.source, &mut self.scratch[reserve_len..])?;
        buf[..fresh].copy_from_slice(&self.scratch[..fresh]);
        self.reserve.copy_from_slice(&self.scratch[fresh..fresh + reserve_len]);
        Ok(fresh)
    }
}

// Reads until `buf` is full or the stream ends; returns the bytes read.
fn read_full<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn positions_are_contiguous() {
        let reader = InputReader::new(Cursor::new(vec![0xabu8; 10]));
        let mut buf = [0u8; 4];

        assert_eq!(reader.sync_read(&mut buf).unwrap(), (4, 0));
        assert_eq!(reader.sync_read(&mut buf).unwrap(), (4, 4));
        assert_eq!(reader.sync_read(&mut buf).unwrap(), (2, 8));
        assert_eq!(reader.sync_read(&mut buf).unwrap(), (0, 10));
    }

    #[test]
    fn reserve_retains_the_tail() {
        let data: Vec<u8> = (0u8..20).collect();
        let reader = InputReader::new(Cursor::new(data));
        reader.init_reserve(4).unwrap();

        let mut buf = [0u8; 7];
        let (n, pos) = reader.sync_read(&mut buf).unwrap();
        assert_eq!((n, pos), (7, 0));
        assert_eq!(buf, [0, 1, 2, 3, 4, 5, 6]);

        let mut rest = [0u8; 32];
        let (n, pos) = reader.sync_read(&mut rest).unwrap();
        assert_eq!((n, pos), (9, 7));
        assert_eq!(&rest[..9], &[7, 8, 9, 10, 11, 12, 13, 14, 15]);

        let (n, _) = reader.sync_read(&mut rest).unwrap();
        assert_eq!(n, 0);
        assert_eq!(reader.into_reserve(), vec![16, 17, 18, 19]);
    }

    #[test]
    fn short_stream_fails_reserve_init() {
        let reader = InputReader::new(Cursor::new(vec![1u8; 3]));
        assert!(matches!(reader.init_reserve(4), Err(Error::ShortInput)));
    }

    #[test]
    fn salt_read_goes_through_the_reserve() {
        // 4 bytes of tag at the end, 4 bytes of salt at the front.
        let data: Vec<u8> = (0u8..12).collect();
        let reader = InputReader::new(Cursor::new(data));
        reader.init_reserve(4).unwrap();

        let mut salt = [0u8; 4];
        reader.read_exact_through(&mut salt).unwrap();
        assert_eq!(salt, [0, 1, 2, 3]);

        let mut body = [0u8; 16];
        let (n, pos) = reader.sync_read(&mut body).unwrap();
        assert_eq!((n, pos), (4, 0));
        assert_eq!(&body[..4], &[4, 5, 6, 7]);
        assert_eq!(reader.into_reserve(), vec![8, 9, 10, 11]);
    }
}
