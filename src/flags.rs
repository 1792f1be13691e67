//! Per-`FileRec` status flags.

bitflags::bitflags! {
    /// Status bits carried by a [`crate::file::FileRec`].
    ///
    /// `HASH_FULL` implies `HASH_PARTIAL`; `HAS_DUPES` is only ever set on
    /// the head of a duplicate chain (see [`crate::group`]).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FileFlags: u8 {
        /// `stat`/`lstat` succeeded and the metadata fields are populated.
        const VALID_STAT   = 1 << 0;
        /// `partial_hash` holds the digest of the first K bytes.
        const HASH_PARTIAL = 1 << 1;
        /// `full_hash` holds the one-pass digest of the whole file.
        const HASH_FULL    = 1 << 2;
        /// The path is a symlink (determined by a non-dereferencing stat).
        const IS_SYMLINK   = 1 << 3;
        /// This record is the head of a duplicate chain with >= 2 members.
        const HAS_DUPES    = 1 << 4;
    }
}
