use crate::archive::TarArchive;
use crate::root::{normalize, RootedTree};
use tardiff_common::{Blake3Hash, ChangeKind, CompareConfig, TarDiffError};
use std::collections::{BTreeSet, HashSet};
use std::io::Read;
use tracing::{debug, info};

/// Outcome of diffing two relative-path sets
///
/// Each set iterates in lexicographic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathDiff {
    pub added: BTreeSet<Vec<u8>>,
    pub deleted: BTreeSet<Vec<u8>>,
    pub common: BTreeSet<Vec<u8>>,
}

/// Splits two path sets into added (`right - left`), deleted (`left - right`)
/// and common (`left & right`) paths
pub fn diff_paths(left: &HashSet<Vec<u8>>, right: &HashSet<Vec<u8>>) -> PathDiff {
    PathDiff {
        added: right.difference(left).cloned().collect(),
        deleted: left.difference(right).cloned().collect(),
        common: left.intersection(right).cloned().collect(),
    }
}

/// Receives differences in report order; `path` is the raw relative name
pub trait ChangeSink {
    fn record(&mut self, kind: ChangeKind, path: &[u8]) -> Result<(), TarDiffError>;
}

/// Collected result of a comparison run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonResult {
    pub added: BTreeSet<Vec<u8>>,
    pub deleted: BTreeSet<Vec<u8>>,
    pub modified: BTreeSet<Vec<u8>>,
}

impl ComparisonResult {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty() && self.modified.is_empty()
    }
}

impl ChangeSink for ComparisonResult {
    fn record(&mut self, kind: ChangeKind, path: &[u8]) -> Result<(), TarDiffError> {
        let set = match kind {
            ChangeKind::Added => &mut self.added,
            ChangeKind::Deleted => &mut self.deleted,
            ChangeKind::Modified => &mut self.modified,
        };
        set.insert(path.to_vec());
        Ok(())
    }
}

/// Decides content equality of members by their BLAKE3 digests
pub struct ContentComparator {
    buffer_size: usize,
}

impl ContentComparator {
    pub fn new(config: &CompareConfig) -> Self {
        Self {
            buffer_size: config.buffer_size,
        }
    }

    /// Compares `relative` as stored under each tree's root
    pub fn same_content(
        &self,
        left: (&TarArchive, &RootedTree),
        right: (&TarArchive, &RootedTree),
        relative: &[u8],
    ) -> Result<bool, TarDiffError> {
        let left_hash = self.hash_member(left.0, &left.1.member_path(relative))?;
        let right_hash = self.hash_member(right.0, &right.1.member_path(relative))?;

        debug!(
            "{}: {} vs {}",
            String::from_utf8_lossy(relative),
            left_hash.to_hex(),
            right_hash.to_hex()
        );
        Ok(left_hash == right_hash)
    }

    fn hash_member(&self, archive: &TarArchive, member: &[u8]) -> Result<Blake3Hash, TarDiffError> {
        let reader = archive.open_member(member)?;
        self.hash_reader(reader)
    }

    /// Streams a reader through BLAKE3 in fixed-size chunks
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> Result<Blake3Hash, TarDiffError> {
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0; self.buffer_size];

        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(hasher.finalize().into())
    }
}

/// Compares two opened archives sharing the single-root layout
pub struct ComparisonEngine<'a> {
    left: &'a TarArchive,
    right: &'a TarArchive,
    left_tree: RootedTree,
    right_tree: RootedTree,
    comparator: ContentComparator,
}

impl<'a> ComparisonEngine<'a> {
    /// Normalizes both archives; fails before anything is reported if either
    /// does not have exactly one root directory
    pub fn new(
        left: &'a TarArchive,
        right: &'a TarArchive,
        config: &CompareConfig,
    ) -> Result<Self, TarDiffError> {
        let left_tree = normalize(left.label(), left.file_paths())?;
        let right_tree = normalize(right.label(), right.file_paths())?;
        info!(
            "Comparing {} ({} files under {}) with {} ({} files under {})",
            left.label(),
            left_tree.relative_paths.len(),
            left_tree.display_root(),
            right.label(),
            right_tree.relative_paths.len(),
            right_tree.display_root()
        );

        Ok(Self {
            left,
            right,
            left_tree,
            right_tree,
            comparator: ContentComparator::new(config),
        })
    }

    pub fn left_root(&self) -> &[u8] {
        &self.left_tree.root
    }

    pub fn right_root(&self) -> &[u8] {
        &self.right_tree.root
    }

    /// Feeds added, deleted, then modified paths into `sink`, each group
    /// sorted; stops at the first error
    pub fn run<S: ChangeSink + ?Sized>(&self, sink: &mut S) -> Result<(), TarDiffError> {
        let diff = diff_paths(&self.left_tree.relative_paths, &self.right_tree.relative_paths);

        for path in &diff.added {
            sink.record(ChangeKind::Added, path)?;
        }
        for path in &diff.deleted {
            sink.record(ChangeKind::Deleted, path)?;
        }

        let mut modified = 0;
        for path in &diff.common {
            let same = self.comparator.same_content(
                (self.left, &self.left_tree),
                (self.right, &self.right_tree),
                path,
            )?;
            if !same {
                modified += 1;
                sink.record(ChangeKind::Modified, path)?;
            }
        }

        info!(
            "{} added, {} deleted, {} modified, {} unchanged",
            diff.added.len(),
            diff.deleted.len(),
            modified,
            diff.common.len() - modified
        );
        Ok(())
    }

    /// Runs the comparison and collects every difference
    pub fn collect(&self) -> Result<ComparisonResult, TarDiffError> {
        let mut result = ComparisonResult::default();
        self.run(&mut result)?;
        Ok(result)
    }
}
