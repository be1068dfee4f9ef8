//! Streams a byte source through MD5 and SHA-1 in bounded chunks.

use std::{
    io::Read,
    time::{Duration, Instant},
};

use md5::{Digest, Md5};
use sha1::Sha1;
use thiserror::Error;

use crate::{Error as CrateError, Md5Digest, Sha1Digest};

/// Files are read in fixed chunks of this many bytes (64 MiB).
///
/// Both hash states are advanced with the same chunk before the next chunk is
/// read, so peak memory for hashing is one chunk regardless of file size.
pub const CHUNK_SIZE: usize = 1 << 26;

/// Reported to the chunk observer after each chunk has been hashed.
#[derive(Clone, Copy, Debug)]
pub struct ChunkUpdate {
    /// 1-based index of the chunk that was just hashed.
    pub index: u64,

    /// Total number of chunks expected for the stream, derived from its
    /// declared size. Zero for an empty stream.
    pub count: u64,

    /// Number of bytes actually read into this chunk.
    pub len: usize,

    /// Wall time spent reading and hashing this chunk.
    pub elapsed: Duration,
}

/// Returned by a chunk observer to stop hashing before the stream is consumed.
///
/// The partial digest state is discarded; the hash operation reports this as
/// [`Error::Interrupted`](crate::Error::Interrupted).
#[derive(Error, Clone, Copy, PartialEq, Eq, Debug)]
#[error("hashing interrupted by the chunk observer")]
pub struct Interrupted;

/// Chunked dual-digest hasher.
///
/// Owns the single chunk buffer, which is allocated on first use and reused
/// for every subsequent file hashed through the same instance.
#[derive(Default)]
pub struct Hasher {
    buf: Vec<u8>,
}

impl Hasher {
    /// Create a hasher. The chunk buffer is not allocated until the first
    /// non-empty stream is hashed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash `stream`, which is declared to hold `size` bytes.
    ///
    /// The stream is consumed in `ceil(size / CHUNK_SIZE)` chunks; an empty
    /// stream reads no chunks and produces the empty-input digests. After
    /// each chunk both digests have been updated and `observe` is invoked
    /// with the chunk accounting; returning [`Interrupted`] from the observer
    /// aborts the operation.
    ///
    /// If the source yields fewer bytes than declared (for example the file
    /// was truncated mid-scan), hashing ends at the actual end of stream.
    pub fn hash<R: Read>(
        &mut self,
        stream: &mut R,
        size: u64,
        mut observe: impl FnMut(ChunkUpdate) -> Result<(), Interrupted>,
    ) -> Result<(Md5Digest, Sha1Digest), CrateError> {
        let mut md5 = Md5::new();
        let mut sha1 = Sha1::new();

        let count = chunk_count(size);
        if count > 0 && self.buf.len() < CHUNK_SIZE {
            self.buf.resize(CHUNK_SIZE, 0);
        }

        for index in 1..=count {
            let start = Instant::now();

            let n = fill_chunk(stream, &mut self.buf)?;
            md5.update(&self.buf[..n]);
            sha1.update(&self.buf[..n]);

            observe(ChunkUpdate {
                index,
                count,
                len: n,
                elapsed: start.elapsed(),
            })?;

            if n < CHUNK_SIZE {
                // End of stream; the declared size overshot.
                break;
            }
        }

        let md5 = Md5Digest::from(<[u8; Md5Digest::LEN]>::from(md5.finalize()));
        let sha1 = Sha1Digest::from(<[u8; Sha1Digest::LEN]>::from(sha1.finalize()));
        Ok((md5, sha1))
    }
}

fn chunk_count(size: u64) -> u64 {
    let chunk = CHUNK_SIZE as u64;
    (size + chunk - 1) / chunk
}

/// Read from `stream` until `buf` is full or the stream ends.
/// Returns the number of bytes read.
fn fill_chunk<R: Read>(stream: &mut R, buf: &mut [u8]) -> Result<usize, std::io::Error> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
