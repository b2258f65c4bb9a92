//! Fixed-size chunk iteration over a response body.

use std::io::{ErrorKind, Read};

use crate::error::{FetchError, FetchResult};

/// Pull-based iterator yielding a body in chunks of `chunk_size` bytes.
///
/// Every chunk is full except possibly the last; an empty body yields no
/// chunks. A read error is yielded once and ends the iteration.
pub struct ResponseChunks<R> {
    reader: R,
    url: String,
    chunk_size: usize,
    done: bool,
}

impl<R: Read> ResponseChunks<R> {
    /// Wrap `reader`. `url` only labels read errors.
    pub fn new(reader: R, url: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            reader,
            url: url.into(),
            chunk_size: chunk_size.max(1),
            done: false,
        }
    }

    /// Fill a buffer up to `chunk_size`, stopping early only at end of body.
    fn fill(&mut self) -> std::io::Result<Vec<u8>> {
        let mut chunk = vec![0u8; self.chunk_size];
        let mut filled = 0;

        while filled < chunk.len() {
            match self.reader.read(&mut chunk[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        chunk.truncate(filled);
        Ok(chunk)
    }
}

impl<R: Read> Iterator for ResponseChunks<R> {
    type Item = FetchResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.fill() {
            Ok(chunk) if chunk.is_empty() => {
                self.done = true;
                None
            }
            Ok(chunk) => {
                if chunk.len() < self.chunk_size {
                    self.done = true;
                }
                Some(Ok(chunk))
            }
            Err(e) => {
                self.done = true;
                Some(Err(FetchError::Read {
                    url: self.url.clone(),
                    source: e,
                }))
            }
        }
    }
}
