use flate2::read::MultiGzDecoder;
use bzip2::read::MultiBzDecoder;
use xz2::read::XzDecoder;
use tardiff_common::{ArchiveEntry, EntryKind, TarDiffError};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, info};

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const BZIP2_MAGIC: &[u8] = b"BZh";
const XZ_MAGIC: &[u8] = &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00];

/// Compression wrapped around a tar stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
}

impl Compression {
    /// Detect compression from the leading bytes of a file
    pub fn from_magic(bytes: &[u8]) -> Self {
        if bytes.starts_with(GZIP_MAGIC) {
            Compression::Gzip
        } else if bytes.starts_with(BZIP2_MAGIC) {
            Compression::Bzip2
        } else if bytes.starts_with(XZ_MAGIC) {
            Compression::Xz
        } else {
            Compression::None
        }
    }

    fn decoder<'a, R: Read + 'a>(&self, reader: R) -> Box<dyn Read + 'a> {
        match self {
            Compression::None => Box::new(reader),
            Compression::Gzip => Box::new(MultiGzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(MultiBzDecoder::new(reader)),
            Compression::Xz => Box::new(XzDecoder::new_multi_decoder(reader)),
        }
    }
}

/// Where a member's data lives inside the uncompressed tar stream
#[derive(Debug, Clone, Copy)]
struct MemberLocation {
    /// Position of the entry in archive order
    ordinal: usize,
    kind: EntryKind,
    sparse: bool,
    offset: u64,
    size: u64,
}

type MemberIndex = HashMap<Vec<u8>, MemberLocation>;

/// Uncompressed tar data with its listing
struct Loaded {
    data: File,
    entries: Vec<ArchiveEntry>,
    index: MemberIndex,
}

/// A tar archive opened read-only, with its entry list and a name index
///
/// Compressed archives are decompressed once into an anonymous temp file so
/// members can be re-opened by seeking instead of re-reading the stream.
/// Names are kept as raw bytes.
pub struct TarArchive {
    label: String,
    compression: Compression,
    data: File,
    entries: Vec<ArchiveEntry>,
    index: MemberIndex,
}

impl TarArchive {
    pub fn open(archive_path: &Path) -> Result<Self, TarDiffError> {
        let label = archive_path.display().to_string();
        let open_err = |reason: &dyn ToString| TarDiffError::archive_open(label.clone(), reason.to_string());

        let mut file = File::open(archive_path).map_err(|e| open_err(&e))?;
        let len = file.metadata().map_err(|e| open_err(&e))?.len();
        if len == 0 {
            return Err(open_err(&"empty file"));
        }

        let detected = sniff_compression(&mut file).map_err(|e| open_err(&e))?;
        let (compression, loaded) = if detected == Compression::None {
            let loaded = load_plain(file).map_err(|e| open_err(&e))?;
            (Compression::None, loaded)
        } else {
            // Magic bytes can also start a plain member name ("BZh..."), so a
            // failed decode falls back to reading the file as-is
            let raw = file.try_clone().map_err(|e| open_err(&e))?;
            match load_compressed(detected, file) {
                Ok(loaded) => (detected, loaded),
                Err(decode_err) => {
                    debug!(
                        "{} is not readable as {:?} ({}), trying plain tar",
                        label, detected, decode_err
                    );
                    let loaded = load_plain(raw).map_err(|_| {
                        open_err(&format!("failed to decompress ({:?}): {}", detected, decode_err))
                    })?;
                    (Compression::None, loaded)
                }
            }
        };

        info!(
            "Opened archive {} ({} entries, compression: {:?})",
            label,
            loaded.entries.len(),
            compression
        );

        Ok(Self {
            label,
            compression,
            data: loaded.data,
            entries: loaded.entries,
            index: loaded.index,
        })
    }

    /// Display name of the archive (its path as given)
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// All entries in archive order, duplicates included
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Paths of the regular-file entries, in archive order
    pub fn file_paths(&self) -> impl Iterator<Item = &[u8]> {
        self.entries
            .iter()
            .filter(|entry| entry.is_file())
            .map(|entry| entry.path.as_slice())
    }

    /// Opens the data stream of the member stored under `path`
    ///
    /// When a name occurs several times the last occurrence is used, and it
    /// must be a regular file.
    pub fn open_member(&self, path: &[u8]) -> Result<Box<dyn Read + '_>, TarDiffError> {
        let location = match self.index.get(path) {
            Some(location) if location.kind == EntryKind::File => *location,
            _ => return Err(member_not_found(path)),
        };

        if location.sparse {
            debug!(
                "Reading sparse member {} through the tar layer",
                String::from_utf8_lossy(path)
            );
            return Ok(Box::new(Cursor::new(self.read_sparse(path, location.ordinal)?)));
        }

        let mut data = &self.data;
        data.seek(SeekFrom::Start(location.offset))?;
        Ok(Box::new(data.take(location.size)))
    }

    fn read_sparse(&self, path: &[u8], ordinal: usize) -> Result<Vec<u8>, TarDiffError> {
        let mut data = &self.data;
        data.seek(SeekFrom::Start(0))?;

        let mut archive = tar::Archive::new(data);
        if let Some(entry) = archive.entries()?.nth(ordinal) {
            let mut entry = entry?;
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents)?;
            return Ok(contents);
        }

        Err(member_not_found(path))
    }
}

fn member_not_found(path: &[u8]) -> TarDiffError {
    let path = String::from_utf8_lossy(path);
    let (root, rest) = path.split_once('/').unwrap_or(("", &path));
    TarDiffError::MemberNotFound {
        root: root.to_string(),
        path: rest.to_string(),
    }
}

fn sniff_compression(file: &mut File) -> io::Result<Compression> {
    let mut magic = Vec::with_capacity(XZ_MAGIC.len());
    file.by_ref().take(XZ_MAGIC.len() as u64).read_to_end(&mut magic)?;
    file.seek(SeekFrom::Start(0))?;
    Ok(Compression::from_magic(&magic))
}

fn load_plain(data: File) -> io::Result<Loaded> {
    let (entries, index) = read_index(&data)?;
    Ok(Loaded {
        data,
        entries,
        index,
    })
}

fn load_compressed(compression: Compression, file: File) -> io::Result<Loaded> {
    let spool = spool_decompressed(compression, file)?;
    load_plain(spool)
}

fn spool_decompressed(compression: Compression, file: File) -> io::Result<File> {
    let mut spool = tempfile::tempfile()?;
    let mut decoder = compression.decoder(file);
    let written = io::copy(&mut decoder, &mut spool)?;
    if written == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no data after decompression"));
    }
    spool.seek(SeekFrom::Start(0))?;
    debug!("Decompressed {:?} archive into {} bytes", compression, written);
    Ok(spool)
}

fn read_index(data: &File) -> io::Result<(Vec<ArchiveEntry>, MemberIndex)> {
    let mut reader = data;
    reader.seek(SeekFrom::Start(0))?;

    let mut archive = tar::Archive::new(reader);
    let mut entries = Vec::new();
    let mut index = HashMap::new();

    for (ordinal, entry) in archive.entries()?.enumerate() {
        let entry = entry?;
        let entry_type = entry.header().entry_type();
        let path = entry.path_bytes().into_owned();
        let kind = entry_kind(entry_type, &path);

        index.insert(
            path.clone(),
            MemberLocation {
                ordinal,
                kind,
                sparse: entry_type.is_gnu_sparse(),
                offset: entry.raw_file_position(),
                size: entry.size(),
            },
        );
        entries.push(ArchiveEntry { path, kind });
    }

    if entries.len() != index.len() {
        debug!(
            "{} duplicate member names, last occurrence wins",
            entries.len() - index.len()
        );
    }

    Ok((entries, index))
}

fn entry_kind(entry_type: tar::EntryType, path: &[u8]) -> EntryKind {
    match entry_type {
        // Old V7 archives mark directories as regular entries with a trailing slash
        tar::EntryType::Regular if path.ends_with(b"/") => EntryKind::Other,
        tar::EntryType::Regular | tar::EntryType::Continuous | tar::EntryType::GNUSparse => {
            EntryKind::File
        }
        _ => EntryKind::Other,
    }
}
