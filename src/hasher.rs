//! Computes a partial hash (first K bytes) and a full hash (whole file),
//! reusing the partial hash's streaming state when extending to full so
//! the observable full digest always equals a single-pass hash of the
//! file. Built on `blake3`; the 256-bit digest is truncated to a 64-bit
//! `partial_hash`/`full_hash` pair (see DESIGN.md).

use crate::cancel::CancellationToken;
use crate::error::{EngineError, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Compile-time partial-hash size.
pub const PARTIAL_HASH_SIZE: usize = 4096;
pub const MIN_CHUNK_SIZE: usize = 4096;
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;
/// Cancellation-poll interval, in chunks read.
const CHECK_MINIMUM: usize = 256;

fn truncate_to_u64(hash: blake3::Hash) -> u64 {
    let bytes = hash.as_bytes();
    u64::from_le_bytes(bytes[..8].try_into().unwrap())
}

/// Auto-tune the I/O chunk size to roughly half the L1 data-cache size,
/// clamped to `[MIN_CHUNK_SIZE, MAX_CHUNK_SIZE]` and rounded up to a
/// 4 KiB multiple, unless `override_size` was supplied.
pub fn auto_chunk_size(override_size: Option<usize>) -> usize {
    if let Some(size) = override_size {
        return size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE);
    }
    let guess = l1_data_cache_size().map(|l1| l1 / 2).unwrap_or(DEFAULT_CHUNK_SIZE);
    let rounded = (guess + 4095) & !4095;
    rounded.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
}

#[cfg(target_os = "linux")]
fn l1_data_cache_size() -> Option<usize> {
    let raw = std::fs::read_to_string("/sys/devices/system/cpu/cpu0/cache/index0/size").ok()?;
    let raw = raw.trim();
    let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<usize>().ok().map(|kib| kib * 1024)
}

#[cfg(not(target_os = "linux"))]
fn l1_data_cache_size() -> Option<usize> {
    None
}

/// The state produced by hashing the first K bytes: the digest itself,
/// plus the streaming hasher state needed to extend to a full hash
/// without re-reading those bytes.
pub struct PartialHash {
    pub digest: u64,
    pub(crate) state: blake3::Hasher,
    /// Number of bytes actually covered (< K for files smaller than K).
    pub(crate) covered: u64,
}

/// Compute the partial hash of `path`: the first `PARTIAL_HASH_SIZE` bytes,
/// or the whole file if it is smaller.
pub fn hash_partial(path: &Path, chunk_size: usize, cancel: &CancellationToken) -> Result<PartialHash> {
    let mut file = File::open(path).map_err(|e| EngineError::from_io(path, e))?;
    let mut state = blake3::Hasher::new();
    let mut remaining = PARTIAL_HASH_SIZE as u64;
    let mut covered = 0u64;
    let mut buf = vec![0u8; chunk_size.min(PARTIAL_HASH_SIZE)];
    let mut chunks_since_checkpoint = 0usize;

    while remaining > 0 {
        if cancel.is_set() {
            return Err(EngineError::Aborted);
        }
        let want = remaining.min(buf.len() as u64) as usize;
        let n = file.read(&mut buf[..want]).map_err(|e| EngineError::from_io(path, e))?;
        if n == 0 {
            break;
        }
        state.update(&buf[..n]);
        covered += n as u64;
        remaining -= n as u64;

        chunks_since_checkpoint += 1;
        if chunks_since_checkpoint >= CHECK_MINIMUM {
            chunks_since_checkpoint = 0;
            if cancel.is_set() {
                return Err(EngineError::Aborted);
            }
        }
    }

    let digest = truncate_to_u64(state.finalize());
    Ok(PartialHash { digest, state, covered })
}

/// Compute the full hash of `path`, continuing from a previously computed
/// partial hash's streaming state so the result equals a one-pass digest
/// of the whole file.
pub fn hash_full(
    path: &Path,
    partial: &PartialHash,
    chunk_size: usize,
    cancel: &CancellationToken,
) -> Result<u64> {
    let mut state = partial.state.clone();
    let mut file = File::open(path).map_err(|e| EngineError::from_io(path, e))?;
    file.seek(SeekFrom::Start(partial.covered)).map_err(|e| EngineError::from_io(path, e))?;

    let mut buf = vec![0u8; chunk_size];
    let mut chunks_since_checkpoint = 0usize;
    loop {
        if cancel.is_set() {
            return Err(EngineError::Aborted);
        }
        let n = file.read(&mut buf).map_err(|e| EngineError::from_io(path, e))?;
        if n == 0 {
            break;
        }
        state.update(&buf[..n]);

        chunks_since_checkpoint += 1;
        if chunks_since_checkpoint >= CHECK_MINIMUM {
            chunks_since_checkpoint = 0;
            if cancel.is_set() {
                return Err(EngineError::Aborted);
            }
        }
    }
    Ok(truncate_to_u64(state.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use std::io::Write;

    #[test]
    fn partial_equals_whole_for_small_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small");
        std::fs::write(&path, b"hello world").unwrap();
        let cancel = CancellationToken::new();

        let partial = hash_partial(&path, DEFAULT_CHUNK_SIZE, &cancel).unwrap();
        assert_eq!(partial.covered, 11);

        let expected = truncate_to_u64(blake3::hash(b"hello world"));
        assert_eq!(partial.digest, expected);
    }

    #[test]
    fn full_hash_matches_one_pass_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big");
        let mut f = std::fs::File::create(&path).unwrap();
        let content = vec![0x42u8; PARTIAL_HASH_SIZE * 3 + 17];
        f.write_all(&content).unwrap();
        drop(f);

        let cancel = CancellationToken::new();
        let partial = hash_partial(&path, DEFAULT_CHUNK_SIZE, &cancel).unwrap();
        assert_eq!(partial.covered, PARTIAL_HASH_SIZE as u64);
        let full = hash_full(&path, &partial, DEFAULT_CHUNK_SIZE, &cancel).unwrap();

        let expected = truncate_to_u64(blake3::hash(&content));
        assert_eq!(full, expected);
    }

    #[test]
    fn chunk_size_is_clamped_and_rounded() {
        assert_eq!(auto_chunk_size(Some(100)), MIN_CHUNK_SIZE);
        assert_eq!(auto_chunk_size(Some(usize::MAX)), MAX_CHUNK_SIZE);
        assert_eq!(auto_chunk_size(Some(5000)), 8192);
    }
}
