use std::borrow::Cow;
use std::fmt;

/// Kind of an archive entry, as far as comparison is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file (including contiguous and sparse files)
    File,
    /// Directory, symlink, hard link, device, fifo or any other entry type
    Other,
}

/// A single entry listed by an archive, in archive order
///
/// `path` holds the raw name bytes; names are not required to be UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: Vec<u8>,
    pub kind: EntryKind,
}

impl ArchiveEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn display_path(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.path)
    }
}

/// Kind of a reported difference between two archives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Present in the right archive only
    Added,
    /// Present in the left archive only
    Deleted,
    /// Present in both with different content
    Modified,
}

impl ChangeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ChangeKind::Added => "Added",
            ChangeKind::Deleted => "Deleted",
            ChangeKind::Modified => "Modified",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Pass through so width/alignment flags apply to the label
        f.pad(self.label())
    }
}

/// BLAKE3 hash value (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Blake3Hash(pub [u8; 32]);

impl Blake3Hash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<blake3::Hash> for Blake3Hash {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}
