//! Locates container signatures inside opaque files.
//!
//! The scan is purely byte-level: a signature that happens to occur inside unrelated data is
//! reported like any other match and left for the engine to reject when it tries to open it.

use std::{
    fs::File,
    io::{ErrorKind, Read, Result as IoResult, Seek, SeekFrom},
    path::Path,
};
use tracing::debug;

/// Number of bytes read per step when scanning a file.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

const SIGNATURE_LEN: usize = 4;

/// Returns every offset in the file at `path` where `signature` begins, in ascending order.
///
/// Files shorter than the signature yield an empty list.
///
/// # Errors
/// Returns an error if the file cannot be opened or read.
pub fn scan(path: &Path, signature: [u8; SIGNATURE_LEN]) -> IoResult<Vec<u64>> {
    let offsets = File::open(path)
        .and_then(|file| scan_reader(file, signature, DEFAULT_CHUNK_SIZE))?;

    debug!(path = %path.display(), matches = offsets.len(), "scanned for signature");
    Ok(offsets)
}

/// Scans any seekable source in chunks of `chunk_size` bytes.
///
/// After each full chunk the cursor is moved back by three bytes, so a match split across two
/// chunks is still found exactly once.
///
/// # Errors
/// Returns an error if reading or seeking fails.
pub fn scan_reader<R: Read + Seek>(
    mut reader: R,
    signature: [u8; SIGNATURE_LEN],
    chunk_size: usize,
) -> IoResult<Vec<u64>> {
    let overlap = SIGNATURE_LEN - 1;
    let mut buf = vec![0; chunk_size.max(SIGNATURE_LEN)];
    let mut chunk_start = 0u64;
    let mut offsets = Vec::new();

    loop {
        let filled = fill(&mut reader, &mut buf)?;

        offsets.extend(
            buf[..filled]
                .windows(SIGNATURE_LEN)
                .zip(0u64..)
                .filter(|(window, _)| *window == signature)
                .map(|(_, index)| chunk_start + index),
        );

        // a short read means the end of the file was reached
        if filled < buf.len() {
            break;
        }

        let _ = reader.seek(SeekFrom::Current(-(overlap as i64)))?;
        chunk_start += (filled - overlap) as u64;
    }

    Ok(offsets)
}

fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> IoResult<usize> {
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    Ok(filled)
}
