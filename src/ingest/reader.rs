use crate::error::IngestError;
use anyhow::{Context, Result, anyhow};
use flate2::read::GzDecoder;
use sevenz_rust::{Password, SevenZReader};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    Tar,
    SevenZip,
}

impl ArchiveKind {
    /// Recognise an archive by its (case-insensitive) file name suffix.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar") || name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::Tar)
        } else if name.ends_with(".7z") {
            Some(Self::SevenZip)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar => "tar",
            Self::SevenZip => "7z",
        }
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    /// Regular file as opposed to a directory, link or device.
    pub is_file: bool,
}

/// Read access to one archive container, independent of its format.
pub trait ArchiveReader {
    fn kind(&self) -> ArchiveKind;

    fn path(&self) -> &Path;

    /// Every entry in container order.
    fn list_entries(&mut self) -> Result<Vec<ArchiveEntry>>;

    /// Read `names` ahead of `open_entry` for formats without random access.
    /// Once called, only the prefetched names can be opened.
    fn prefetch(&mut self, _names: &[&str]) -> Result<()> {
        Ok(())
    }

    /// Open a byte stream over one entry, looked up by its listed name.
    fn open_entry(&mut self, name: &str) -> Result<Box<dyn Read + '_>>;
}

pub fn open_archive(path: &Path) -> Result<Box<dyn ArchiveReader>> {
    let Some(kind) = ArchiveKind::from_path(path) else {
        return Err(IngestError::UnsupportedArchive(path.display().to_string()).into());
    };
    Ok(match kind {
        ArchiveKind::Zip => Box::new(ZipReader::open(path)?),
        ArchiveKind::Tar => Box::new(TarReader::open(path)?),
        ArchiveKind::SevenZip => Box::new(SevenZipReader::open(path)?),
    })
}

pub struct ZipReader {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
}

impl ZipReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let archive = ZipArchive::new(BufReader::new(file))
            .with_context(|| format!("failed to read zip directory of {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }
}

impl ArchiveReader for ZipReader {
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::Zip
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn list_entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        let mut out = Vec::with_capacity(self.archive.len());
        for idx in 0..self.archive.len() {
            let file = self
                .archive
                .by_index_raw(idx)
                .with_context(|| format!("failed to read zip entry #{idx}"))?;
            out.push(ArchiveEntry {
                name: file.name().to_string(),
                is_file: !file.is_dir(),
            });
        }
        Ok(out)
    }

    fn open_entry(&mut self, name: &str) -> Result<Box<dyn Read + '_>> {
        let file = self
            .archive
            .by_name(name)
            .with_context(|| format!("failed to open zip entry {name}"))?;
        Ok(Box::new(file))
    }
}

/// Member bytes keyed by entry name. A member that was found but could not be
/// read keeps its error text; a name that was never reached is absent.
pub type MemberBatch = BTreeMap<String, std::result::Result<Vec<u8>, String>>;

fn take_from_batch(
    batch: &mut MemberBatch,
    archive: &Path,
    name: &str,
) -> Result<Box<dyn Read + 'static>> {
    match batch.remove(name) {
        Some(Ok(bytes)) => Ok(Box::new(Cursor::new(bytes))),
        Some(Err(err)) => Err(anyhow!("failed to extract entry {name}: {err}")),
        None => Err(IngestError::MemberMissing {
            archive: archive.display().to_string(),
            member: name.to_string(),
        }
        .into()),
    }
}

/// Tar entries can only be reached by scanning the stream. Members are read
/// in one forward pass by `prefetch` and served from memory afterwards.
pub struct TarReader {
    path: PathBuf,
    gzipped: bool,
    prefetched: Option<MemberBatch>,
}

impl TarReader {
    pub fn open(path: &Path) -> Result<Self> {
        let mut file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let mut magic = [0u8; 2];
        let gzipped = match file.read_exact(&mut magic) {
            Ok(()) => magic == GZIP_MAGIC,
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => false,
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            gzipped,
            prefetched: None,
        })
    }

    pub fn is_gzipped(&self) -> bool {
        self.gzipped
    }

    fn stream(&self) -> Result<tar::Archive<Box<dyn Read>>> {
        let file = File::open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let reader: Box<dyn Read> = if self.gzipped {
            Box::new(GzDecoder::new(BufReader::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(tar::Archive::new(reader))
    }

    /// Read the requested members in one pass. The first entry with a given
    /// name wins.
    pub fn read_batch(&self, names: &[&str]) -> Result<MemberBatch> {
        let wanted: BTreeSet<&str> = names.iter().copied().collect();
        let mut out = MemberBatch::new();
        let mut archive = self.stream()?;
        let entries = archive
            .entries()
            .with_context(|| format!("failed to read tar entries of {}", self.path.display()))?;
        for entry in entries {
            // a corrupt header ends the stream; names not reached stay absent
            let Ok(mut entry) = entry else {
                break;
            };
            let Ok(path) = entry.path() else {
                continue;
            };
            let name = path.to_string_lossy().into_owned();
            if !wanted.contains(name.as_str()) || out.contains_key(&name) {
                continue;
            }
            let mut bytes = Vec::new();
            let result = entry
                .read_to_end(&mut bytes)
                .map(|_| bytes)
                .map_err(|err| err.to_string());
            out.insert(name, result);
            if out.len() == wanted.len() {
                break;
            }
        }
        Ok(out)
    }
}

impl ArchiveReader for TarReader {
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::Tar
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn list_entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        let mut archive = self.stream()?;
        let mut out = Vec::new();
        let entries = archive
            .entries()
            .with_context(|| format!("failed to read tar entries of {}", self.path.display()))?;
        for entry in entries {
            let entry = entry
                .with_context(|| format!("failed to read tar header in {}", self.path.display()))?;
            out.push(ArchiveEntry {
                name: entry.path()?.to_string_lossy().into_owned(),
                is_file: entry.header().entry_type().is_file(),
            });
        }
        Ok(out)
    }

    fn prefetch(&mut self, names: &[&str]) -> Result<()> {
        self.prefetched = Some(self.read_batch(names)?);
        Ok(())
    }

    fn open_entry(&mut self, name: &str) -> Result<Box<dyn Read + '_>> {
        if let Some(batch) = self.prefetched.as_mut() {
            return take_from_batch(batch, &self.path, name);
        }
        let mut batch = self.read_batch(&[name])?;
        take_from_batch(&mut batch, &self.path, name)
    }
}

/// 7z folders are solid streams, so members are decoded in one pass as for
/// tar.
pub struct SevenZipReader {
    path: PathBuf,
    prefetched: Option<MemberBatch>,
}

impl SevenZipReader {
    pub fn open(path: &Path) -> Result<Self> {
        SevenZReader::open(path, Password::empty())
            .with_context(|| format!("failed to read 7z header of {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            prefetched: None,
        })
    }

    pub fn read_batch(&self, names: &[&str]) -> Result<MemberBatch> {
        let wanted: BTreeSet<&str> = names.iter().copied().collect();
        let mut out = MemberBatch::new();
        let mut archive = SevenZReader::open(&self.path, Password::empty())
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        archive
            .for_each_entries(|entry, reader| {
                if entry.is_directory()
                    || !wanted.contains(entry.name())
                    || out.contains_key(entry.name())
                {
                    // a broken stream here means later members are unreadable too
                    return Ok(io::copy(reader, &mut io::sink()).is_ok());
                }
                let mut bytes = Vec::new();
                let result = reader
                    .read_to_end(&mut bytes)
                    .map(|_| bytes)
                    .map_err(|err| err.to_string());
                out.insert(entry.name().to_string(), result);
                Ok(true)
            })
            .with_context(|| format!("failed to decode {}", self.path.display()))?;
        Ok(out)
    }
}

impl ArchiveReader for SevenZipReader {
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::SevenZip
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn list_entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        let archive = SevenZReader::open(&self.path, Password::empty())
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        Ok(archive
            .archive()
            .files
            .iter()
            .map(|entry| ArchiveEntry {
                name: entry.name().to_string(),
                is_file: !entry.is_directory(),
            })
            .collect())
    }

    fn prefetch(&mut self, names: &[&str]) -> Result<()> {
        self.prefetched = Some(self.read_batch(names)?);
        Ok(())
    }

    fn open_entry(&mut self, name: &str) -> Result<Box<dyn Read + '_>> {
        if let Some(batch) = self.prefetched.as_mut() {
            return take_from_batch(batch, &self.path, name);
        }
        let mut batch = self.read_batch(&[name])?;
        take_from_batch(&mut batch, &self.path, name)
    }
}

#[cfg(test)]
mod tests {
    use super::{ArchiveKind, ArchiveReader, SevenZipReader, TarReader};
    use crate::error::IngestError;
    use std::fs::{self, File};
    use std::io::Read;
    use std::path::Path;
    use tempfile::tempdir;

    const FIRST: &str = "first_station_results.csv";
    const SECOND: &str = "second_station_results.csv";

    fn write_plain_tar(path: &Path, members: &[(&str, &str)]) {
        let mut builder = tar::Builder::new(File::create(path).expect("create tar"));
        for (name, body) in members {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, body.as_bytes())
                .expect("append");
        }
        builder.finish().expect("finish tar");
    }

    fn read_all(reader: &mut dyn ArchiveReader, name: &str) -> String {
        let mut out = String::new();
        reader
            .open_entry(name)
            .expect("open entry")
            .read_to_string(&mut out)
            .expect("read entry");
        out
    }

    fn is_member_missing(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<IngestError>(),
            Some(IngestError::MemberMissing { .. })
        )
    }

    #[test]
    fn kinds_are_recognised_case_insensitively() {
        assert_eq!(ArchiveKind::from_path(Path::new("a.ZIP")), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::from_path(Path::new("a.tar")), Some(ArchiveKind::Tar));
        assert_eq!(ArchiveKind::from_path(Path::new("a.Tar.Gz")), Some(ArchiveKind::Tar));
        assert_eq!(ArchiveKind::from_path(Path::new("a.tgz")), Some(ArchiveKind::Tar));
        assert_eq!(ArchiveKind::from_path(Path::new("a.7z")), Some(ArchiveKind::SevenZip));
        assert_eq!(ArchiveKind::from_path(Path::new("a.rar")), None);
        assert_eq!(ArchiveKind::from_path(Path::new("a.gz")), None);
    }

    #[test]
    fn tar_compression_follows_content_not_suffix() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("plain_2024-02-02.tgz");
        write_plain_tar(&path, &[(FIRST, "1,2,3\n")]);

        let mut reader = TarReader::open(&path).expect("open");
        assert!(!reader.is_gzipped());
        assert_eq!(read_all(&mut reader, FIRST), "1,2,3\n");
    }

    #[test]
    fn tar_prefetch_serves_members_from_one_pass() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("rig.tar");
        write_plain_tar(&path, &[(FIRST, "a\n"), ("skipped.txt", "x\n"), (SECOND, "b\n")]);

        let mut reader = TarReader::open(&path).expect("open");
        reader
            .prefetch(&[FIRST, SECOND, "absent_station_results.csv"])
            .expect("prefetch");
        // the archive is no longer consulted once members are buffered
        fs::remove_file(&path).expect("remove tar");

        assert_eq!(read_all(&mut reader, FIRST), "a\n");
        assert_eq!(read_all(&mut reader, SECOND), "b\n");
        let err = reader
            .open_entry("absent_station_results.csv")
            .err()
            .expect("absent member fails");
        assert!(is_member_missing(&err));
    }

    #[test]
    fn seven_zip_batch_omits_names_it_never_reached() {
        let tmp = tempdir().expect("tempdir");
        let staging = tmp.path().join("staging");
        fs::create_dir_all(&staging).expect("mkdir staging");
        fs::write(staging.join(FIRST), "1,2,3\n").expect("write member");
        let path = tmp.path().join("rig.7z");
        sevenz_rust::compress_to_path(&staging, &path).expect("compress");

        let mut reader = SevenZipReader::open(&path).expect("open");
        let batch = reader
            .read_batch(&["absent.csv", FIRST])
            .expect("read batch");
        assert_eq!(batch.keys().map(String::as_str).collect::<Vec<_>>(), vec![FIRST]);

        reader.prefetch(&["absent.csv", FIRST]).expect("prefetch");
        assert_eq!(read_all(&mut reader, FIRST), "1,2,3\n");
        let err = reader
            .open_entry("absent.csv")
            .err()
            .expect("absent member fails");
        assert!(is_member_missing(&err));
    }
}
