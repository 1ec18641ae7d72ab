use tardiff_common::TarDiffError;
use std::collections::{BTreeSet, HashSet};

/// File paths of one archive, stripped of their shared top-level directory
///
/// Paths are raw name bytes, so names that differ only in non-UTF-8 bytes
/// stay distinct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootedTree {
    pub root: Vec<u8>,
    pub relative_paths: HashSet<Vec<u8>>,
}

impl RootedTree {
    /// Full member path of a relative path inside this tree
    pub fn member_path(&self, relative: &[u8]) -> Vec<u8> {
        let mut path = Vec::with_capacity(self.root.len() + 1 + relative.len());
        path.extend_from_slice(&self.root);
        path.push(b'/');
        path.extend_from_slice(relative);
        path
    }

    pub fn display_root(&self) -> String {
        String::from_utf8_lossy(&self.root).into_owned()
    }
}

fn split_root(path: &[u8]) -> Option<(&[u8], &[u8])> {
    let slash = path.iter().position(|&b| b == b'/')?;
    Some((&path[..slash], &path[slash + 1..]))
}

/// Derives the single root directory of an archive and strips it from every
/// file path.
///
/// Every path must start with `<root>/` for one and the same `<root>`; an
/// archive with no file entries has no root and is rejected too.
pub fn normalize<'a, I>(archive: &str, file_paths: I) -> Result<RootedTree, TarDiffError>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut roots = BTreeSet::new();
    let mut relative_paths = HashSet::new();

    for path in file_paths {
        match split_root(path) {
            Some((root, rest)) => {
                roots.insert(root);
                relative_paths.insert(rest.to_vec());
            }
            None => {
                return Err(TarDiffError::invalid_structure(
                    archive,
                    format!(
                        "file `{}` is not inside a top-level directory",
                        String::from_utf8_lossy(path)
                    ),
                ));
            }
        }
    }

    let root = match roots.len() {
        1 => roots.into_iter().next().unwrap_or_default().to_vec(),
        0 => {
            return Err(TarDiffError::invalid_structure(
                archive,
                "expected exactly one top-level directory, found none",
            ));
        }
        n => {
            let names: Vec<String> = roots
                .into_iter()
                .map(|root| String::from_utf8_lossy(root).into_owned())
                .collect();
            return Err(TarDiffError::invalid_structure(
                archive,
                format!(
                    "expected exactly one top-level directory, found {} ({})",
                    n,
                    names.join(", ")
                ),
            ));
        }
    };

    Ok(RootedTree {
        root,
        relative_paths,
    })
}
