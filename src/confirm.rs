//! Byte-for-byte confirmation of a hash match.
//!
//! A hash match is treated as provisional until every byte has been
//! compared, unless the run configuration explicitly waives that (`-Q`,
//! `-T`, or an already-proven hardlink). jdupes.c does the equivalent in
//! `confirmmatch()`, reading both files in lockstep chunks.

use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::error::{EngineError, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const COMPARE_CHUNK: usize = 64 * 1024;
const CHECK_MINIMUM: usize = 256;

/// Whether two files that already matched on hash should still be read
/// back byte-for-byte.
pub fn should_confirm(cfg: &Config, already_same_identity: bool) -> bool {
    if already_same_identity {
        return false;
    }
    if cfg.quick || cfg.partial_only {
        return false;
    }
    true
}

/// Compare `a` and `b` byte-for-byte. Returns `Ok(true)` only if every byte
/// matches and both files end at the same length.
pub fn confirm(a: &Path, b: &Path, cancel: &CancellationToken) -> Result<bool> {
    let mut fa = File::open(a).map_err(|e| EngineError::from_io(a, e))?;
    let mut fb = File::open(b).map_err(|e| EngineError::from_io(b, e))?;

    let mut buf_a = vec![0u8; COMPARE_CHUNK];
    let mut buf_b = vec![0u8; COMPARE_CHUNK];
    let mut chunks_since_checkpoint = 0usize;

    loop {
        if cancel.is_set() {
            return Err(EngineError::Aborted);
        }
        let na = fill(&mut fa, &mut buf_a, a)?;
        let nb = fill(&mut fb, &mut buf_b, b)?;
        if na != nb {
            return Ok(false);
        }
        if na == 0 {
            return Ok(true);
        }
        if buf_a[..na] != buf_b[..nb] {
            return Ok(false);
        }

        chunks_since_checkpoint += 1;
        if chunks_since_checkpoint >= CHECK_MINIMUM {
            chunks_since_checkpoint = 0;
            if cancel.is_set() {
                return Err(EngineError::Aborted);
            }
        }
    }
}

/// Read up to `buf.len()` bytes, looping past short reads so a partial
/// read at a pipe or network mount doesn't masquerade as EOF.
fn fill(file: &mut File, buf: &mut [u8], path: &Path) -> Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = file.read(&mut buf[total..]).map_err(|e| EngineError::from_io(path, e))?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_files_confirm() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, vec![0x7au8; COMPARE_CHUNK * 2 + 13]).unwrap();
        std::fs::write(&b, vec![0x7au8; COMPARE_CHUNK * 2 + 13]).unwrap();
        let cancel = CancellationToken::new();
        assert!(confirm(&a, &b, &cancel).unwrap());
    }

    #[test]
    fn differing_tail_rejects() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, vec![0x01u8; 10]).unwrap();
        let mut tail = vec![0x01u8; 10];
        tail[9] = 0x02;
        std::fs::write(&b, tail).unwrap();
        let cancel = CancellationToken::new();
        assert!(!confirm(&a, &b, &cancel).unwrap());
    }

    #[test]
    fn differing_length_rejects() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, vec![0x01u8; 10]).unwrap();
        std::fs::write(&b, vec![0x01u8; 11]).unwrap();
        let cancel = CancellationToken::new();
        assert!(!confirm(&a, &b, &cancel).unwrap());
    }

    #[test]
    fn quick_mode_skips_confirmation() {
        let mut cfg = Config::default();
        cfg.quick = true;
        assert!(!should_confirm(&cfg, false));
        assert!(!should_confirm(&Config::default(), true));
    }
}
