//! Read-only byte sources shared by all workers.

use std::fs::File;
use std::io;
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use crate::error::{Error, Result};

/// A finite, randomly accessible, read-only run of bytes.
///
/// Workers share one source by reference, so implementations must be safe to
/// read from several threads at once.
pub trait ByteSource: Sync {
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads up to `buf.len()` bytes starting at `offset`. Returns 0 at the end.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// The whole source, when it is resident in memory.
    fn as_slice(&self) -> Option<&[u8]> {
        None
    }
}

impl ByteSource for [u8] {
    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        read_from_slice(self, offset, buf)
    }

    fn as_slice(&self) -> Option<&[u8]> {
        Some(self)
    }
}

fn read_from_slice(data: &[u8], offset: u64, buf: &mut [u8]) -> io::Result<usize> {
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
    let n = buf.len().min(data.len() - start);
    buf[..n].copy_from_slice(&data[start..start + n]);
    Ok(n)
}

/// Read-only memory map of a file. Workers scan it in place.
#[derive(Debug)]
pub struct MappedFile {
    // Zero-length files are not mapped.
    map: Option<Mmap>,
}

impl MappedFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = open_file(path)?;
        let len = file_len(&file, path)?;
        if len == 0 {
            return Ok(Self { map: None });
        }
        // The file must not be truncated while mapped.
        let map = unsafe { Mmap::map(&file) }.map_err(|source| Error::Map {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), len, "mapped input");
        Ok(Self { map: Some(map) })
    }

    fn bytes(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }
}

impl ByteSource for MappedFile {
    fn len(&self) -> u64 {
        self.bytes().len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        read_from_slice(self.bytes(), offset, buf)
    }

    fn as_slice(&self) -> Option<&[u8]> {
        Some(self.bytes())
    }
}

/// A file read with positional reads. There is no shared cursor, so one
/// handle serves every worker.
#[derive(Debug)]
pub struct ReadAtFile {
    file: File,
    len: u64,
}

impl ReadAtFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = open_file(path)?;
        let len = file_len(&file, path)?;
        debug!(path = %path.display(), len, "opened input for positional reads");
        Ok(Self { file, len })
    }
}

impl ByteSource for ReadAtFile {
    fn len(&self) -> u64 {
        self.len
    }

    #[cfg(unix)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(&self.file, buf, offset)
    }

    #[cfg(windows)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_read(&self.file, buf, offset)
    }
}

/// How an input path is turned into a [`ByteSource`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceMode {
    #[default]
    Mmap,
    ReadAt,
}

pub fn open(path: &Path, mode: SourceMode) -> Result<Box<dyn ByteSource>> {
    let source: Box<dyn ByteSource> = match mode {
        SourceMode::Mmap => Box::new(MappedFile::open(path)?),
        SourceMode::ReadAt => Box::new(ReadAtFile::open(path)?),
    };
    Ok(source)
}

/// Fills `buf` from `offset`, retrying short reads. Running out of bytes
/// before `buf` is full is an error.
pub(crate) fn read_exact_at<S: ByteSource + ?Sized>(
    source: &S,
    mut offset: u64,
    mut buf: &mut [u8],
) -> Result<()> {
    while !buf.is_empty() {
        match source.read_at(offset, buf) {
            Ok(0) => {
                return Err(Error::Read {
                    offset,
                    source: io::ErrorKind::UnexpectedEof.into(),
                })
            }
            Ok(n) => {
                offset += n as u64;
                let rest = buf;
                buf = &mut rest[n..];
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(source) => return Err(Error::Read { offset, source }),
        }
    }
    Ok(())
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn file_len(file: &File, path: &Path) -> Result<u64> {
    file.metadata()
        .map(|m| m.len())
        .map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })
}
