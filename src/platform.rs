//! Platform-specific knobs consulted by the core.

/// The hard-link-count ceiling a destination filesystem imposes, if any.
///
/// jdupes.c hard-codes 1024 for Windows (NTFS's documented hard link
/// limit). Unix filesystems in common use (ext4, xfs, btrfs) have link
/// counts wide enough that this is not worth enforcing.
#[cfg(windows)]
pub fn hardlink_limit() -> Option<u64> {
    Some(1024)
}

#[cfg(not(windows))]
pub fn hardlink_limit() -> Option<u64> {
    None
}
