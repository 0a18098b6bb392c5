//! Positioned-read sources backing the media detector.
//!
//! The detector and parser never touch files directly; they pull bytes
//! through the [`ReadAt`] seam so the backing store can be a file, a memory
//! buffer, or anything else that answers positioned reads.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Positioned read over an opaque byte source, POSIX `pread` style.
///
/// Implementations attempt to fill `buf` starting at absolute byte `pos` and
/// return the number of bytes actually read. A short count means the source
/// ended early; callers treat that the same as an error for the read in
/// question, never as a fatal condition.
pub trait ReadAt {
    fn read_at(&mut self, buf: &mut [u8], pos: u64) -> io::Result<usize>;
}

impl ReadAt for [u8] {
    fn read_at(&mut self, buf: &mut [u8], pos: u64) -> io::Result<usize> {
        let pos = pos.min(self.len() as u64) as usize;
        let n = buf.len().min(self.len() - pos);
        buf[..n].copy_from_slice(&self[pos..pos + n]);
        Ok(n)
    }
}

impl ReadAt for Vec<u8> {
    fn read_at(&mut self, buf: &mut [u8], pos: u64) -> io::Result<usize> {
        self.as_mut_slice().read_at(buf, pos)
    }
}

impl<R: ReadAt + ?Sized> ReadAt for &mut R {
    fn read_at(&mut self, buf: &mut [u8], pos: u64) -> io::Result<usize> {
        (**self).read_at(buf, pos)
    }
}

/// File-backed image source with buffered access.
pub struct FileSource {
    file: BufReader<File>,
    len: u64,
}

impl FileSource {
    /// Open a disc image file and record its total length.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file: BufReader::new(file),
            len,
        })
    }

    /// Total byte length of the underlying file.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl ReadAt for FileSource {
    fn read_at(&mut self, buf: &mut [u8], pos: u64) -> io::Result<usize> {
        self.file.seek(SeekFrom::Start(pos))?;
        let mut total = 0;
        while total < buf.len() {
            let n = self.file.read(&mut buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }
}
