//! ECMA-119 directory-tree walking.
//!
//! Directory records lay out as:
//!
//! ```text
//!   bytes  field    endian
//!     1    record length
//!     1    extended attribute length
//!     4    start    le
//!     4    start    be
//!     4    len      le
//!     4    len      be
//!     ...
//!     1    type           (byte 25)
//!     1    name length    (byte 32)
//!     n    name           (byte 33..)
//! ```
//!
//! The redundant LE/BE pairs are cross-checked; a mismatch means the
//! structure cannot be trusted and the whole traversal stops.

use std::collections::VecDeque;

use thiserror::Error;

use crate::endian::EndianInt;

use super::entry::{DirEntry, EntryKind};
use super::reader::{SectorSource, SECTOR_SIZE};

/// Upper bound on a single directory's claimed byte length. Anything larger
/// indicates a corrupt length field rather than a real listing.
pub const MAX_DIRECTORY_LEN: u64 = 0x80000;

/// Default recursion depth cap for full-filesystem walks. Guards against
/// directory cycles in pathological images.
pub const MAX_SCAN_DEPTH: u32 = 256;

/// Errors from directory parsing. Any of these aborts the traversal that
/// produced it.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("sector read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("directory at sector {sector} claims {len} bytes, refusing to parse")]
    DirectoryTooLarge { sector: u64, len: u64 },

    #[error("record at sector {sector} offset {offset} has mismatched LE/BE fields")]
    FieldMismatch { sector: u64, offset: u64 },

    #[error("record at sector {sector} offset {offset} has zero length")]
    ZeroRecordLength { sector: u64, offset: u64 },

    #[error("no usable root directory sector")]
    RootNotFound,
}

/// A record decoded out of the scratch buffer, owned so the buffer can be
/// reused for subdirectories.
struct DecodedEntry {
    start_sector: u64,
    len: u64,
    kind: EntryKind,
    name: Vec<u8>,
}

/// Walks directory trees of one disc image, reporting entries through a
/// callback.
///
/// One instance owns its scratch buffer and file-index counter; concurrent
/// traversals need separate instances.
pub struct DirParser<S> {
    src: S,
    next_file_index: u32,
    scratch: Vec<u8>,
}

impl<S: SectorSource> DirParser<S> {
    pub fn new(src: S) -> Self {
        Self {
            src,
            next_file_index: 0,
            scratch: Vec::new(),
        }
    }

    /// Entries emitted so far across this parser's traversals.
    pub fn file_index(&self) -> u32 {
        self.next_file_index
    }

    pub fn into_inner(self) -> S {
        self.src
    }

    /// Locate the root directory through the Primary Volume Descriptor at
    /// sector 16.
    ///
    /// Returns `None` when the PVD sector is unreadable or names sector 0,
    /// which can never hold a root directory.
    pub fn find_root_sector(&mut self) -> Option<u64> {
        let mut pvd = [0u8; SECTOR_SIZE as usize];
        if self.src.read_sector_data(&mut pvd, 16, 0).is_err() {
            log::error!("invalid image: PVD block expected at sector 16");
            return None;
        }

        let sector = u32::load_be(&pvd[0xA2..]) as u64;
        if sector == 0 {
            None
        } else {
            Some(sector)
        }
    }

    /// Decode one directory listing and report each entry.
    ///
    /// The listing is decoded in full before the first callback fires, so a
    /// structurally corrupt directory delivers no entries at all.
    pub fn read_directory<F>(
        &mut self,
        add_entry: &mut F,
        sector: u64,
        dir_len: u64,
    ) -> Result<(), ParseError>
    where
        F: FnMut(&DirEntry<'_>),
    {
        let entries = self.decode_directory(sector, dir_len)?;
        self.emit(&entries, sector, add_entry);
        Ok(())
    }

    /// Decode a directory and descend into its subdirectories, bounded by
    /// `max_depth`.
    ///
    /// Subdirectories discovered at one level are queued and scanned
    /// first-in-first-out after the whole level is decoded, so emission is
    /// breadth-first within each directory. Any failure below aborts the
    /// entire traversal.
    pub fn read_directory_recursive<F>(
        &mut self,
        add_entry: &mut F,
        sector: u64,
        dir_len: u64,
        cur_depth: u32,
        max_depth: u32,
    ) -> Result<(), ParseError>
    where
        F: FnMut(&DirEntry<'_>),
    {
        if cur_depth + 1 >= max_depth {
            // Depth budget exhausted, stop descending.
            return self.read_directory(add_entry, sector, dir_len);
        }

        let entries = self.decode_directory(sector, dir_len)?;

        let mut pending: VecDeque<(u64, u64)> = entries
            .iter()
            .filter(|e| e.kind == EntryKind::Directory)
            .map(|e| (e.start_sector, e.len))
            .collect();

        self.emit(&entries, sector, add_entry);

        // Subdirectories are scanned only after the current listing is
        // fully decoded, which is what makes the scratch buffer reusable
        // across levels.
        while let Some((sub_sector, sub_len)) = pending.pop_front() {
            self.read_directory_recursive(add_entry, sub_sector, sub_len, cur_depth + 1, max_depth)?;
        }
        Ok(())
    }

    /// Enumerate the root directory only, without recursing.
    ///
    /// `root_sector` overrides PVD lookup when given and nonzero. A valid
    /// root record is limited to a single sector.
    pub fn read_root_directory<F>(
        &mut self,
        add_entry: &mut F,
        root_sector: Option<u64>,
    ) -> Result<(), ParseError>
    where
        F: FnMut(&DirEntry<'_>),
    {
        let sector = match root_sector {
            Some(s) if s != 0 => s,
            _ => self.find_root_sector().ok_or(ParseError::RootNotFound)?,
        };

        self.read_directory_recursive(add_entry, sector, SECTOR_SIZE - 1, 0, 1)
    }

    /// Enumerate the entire filesystem starting from the PVD's root
    /// directory.
    pub fn read_filesystem<F>(&mut self, add_entry: &mut F, max_depth: u32) -> Result<(), ParseError>
    where
        F: FnMut(&DirEntry<'_>),
    {
        let sector = self.find_root_sector().ok_or(ParseError::RootNotFound)?;
        self.read_directory_recursive(add_entry, sector, SECTOR_SIZE - 1, 0, max_depth)
    }

    fn emit<F>(&mut self, entries: &[DecodedEntry], parent: u64, add_entry: &mut F)
    where
        F: FnMut(&DirEntry<'_>),
    {
        for entry in entries {
            self.next_file_index += 1;
            add_entry(&DirEntry {
                start_sector: entry.start_sector,
                len: entry.len,
                kind: entry.kind,
                name: &entry.name,
                parent_sector: parent,
            });
        }
    }

    fn decode_directory(&mut self, sector: u64, dir_len: u64) -> Result<Vec<DecodedEntry>, ParseError> {
        log::debug!("parse directory sector={sector} len={dir_len}");

        if dir_len > MAX_DIRECTORY_LEN {
            log::error!("unexpectedly huge directory length {dir_len} at sector {sector}");
            return Err(ParseError::DirectoryTooLarge {
                sector,
                len: dir_len,
            });
        }

        const SECTOR: usize = SECTOR_SIZE as usize;
        // Record headers near the tail may extend past dir_len; keeping a
        // zeroed slack region lets them decode without special casing.
        const SLACK: usize = 0x1000;

        let len = dir_len as usize;
        if self.scratch.len() < len + SLACK {
            self.scratch.resize(len + SLACK, 0);
        }
        self.scratch[len..len + SLACK].fill(0);

        self.src.read_sector_data(&mut self.scratch[..len], sector, 0)?;

        let buf = &self.scratch;
        let mut entries = Vec::new();
        let mut item_count: u32 = 0; // items 0 and 1 are '.' and '..'
        let mut offset = 0usize;

        while offset < len {
            // Records never straddle a sector boundary: when the entry just
            // before the boundary doesn't account for the padding after it,
            // the scan lands on NUL fill. Either way, realign to the next
            // sector and keep going.
            let in_sector = offset % SECTOR;
            if in_sector > SECTOR - 32 || u32::load_le(&buf[offset..]) == 0 {
                offset += SECTOR - in_sector;
                debug_assert_eq!(offset % SECTOR, 0);
                continue;
            }

            let hdr = &buf[offset..];
            let record_len = hdr[0] as usize;
            if record_len == 0 {
                // Not sector padding, and a zero advance would never
                // terminate the scan.
                return Err(ParseError::ZeroRecordLength {
                    sector,
                    offset: offset as u64,
                });
            }

            let start_le = u32::load_le(&hdr[2..]);
            let start_be = u32::load_be(&hdr[6..]);
            let len_le = u32::load_le(&hdr[10..]);
            let len_be = u32::load_be(&hdr[14..]);

            if start_le != start_be || len_le != len_be {
                log::error!("mismatched LE/BE record fields at sector {sector} offset {offset}");
                return Err(ParseError::FieldMismatch {
                    sector,
                    offset: offset as u64,
                });
            }

            let kind = match hdr[25] {
                0 => EntryKind::File,
                2 => EntryKind::Directory,
                _ => EntryKind::Unknown,
            };

            let name_len = hdr[32] as usize;
            let name = &hdr[33..33 + name_len];

            // The first two entries of a well-formed directory are the '.'
            // and '..' references, named with single binary bytes 0 and 1.
            // Conformant ones are validated and dropped; anything else is
            // reported like a normal entry.
            let mut add_it = true;
            if item_count < 2 {
                if name_len != 1 || name[0] != item_count as u8 {
                    log::warn!(
                        "non-conformant entry at sector {sector} offset {offset}, expected '.' or '..', found {:?}",
                        String::from_utf8_lossy(name)
                    );
                } else {
                    add_it = false;
                }
            }

            if add_it {
                entries.push(DecodedEntry {
                    start_sector: start_le as u64,
                    len: len_le as u64,
                    kind,
                    name: name.to_vec(),
                });
            }

            item_count += 1;
            offset += record_len;
        }

        Ok(entries)
    }
}
