//! Sector-level access on top of a detected media descriptor.

use std::io;

use crate::io::ReadAt;
use crate::media::MediaSourceDescriptor;

/// Logical sector payload size for data tracks.
pub const SECTOR_SIZE: u64 = 2048;

/// Reads 2048-byte logical sector payloads.
///
/// This is the seam between the media detector's output and the directory
/// parser's input: implementations already know the image's sector size and
/// header offset and translate (sector, offset, length) into byte positions.
pub trait SectorSource {
    /// Fill `dest` with payload bytes starting `offset` bytes into `sector`.
    ///
    /// Reads may span any number of sectors. A short or failed underlying
    /// read fails the whole call.
    fn read_sector_data(&mut self, dest: &mut [u8], sector: u64, offset: u64) -> io::Result<()>;
}

impl<S: SectorSource + ?Sized> SectorSource for &mut S {
    fn read_sector_data(&mut self, dest: &mut [u8], sector: u64, offset: u64) -> io::Result<()> {
        (**self).read_sector_data(dest, sector, offset)
    }
}

/// Adapts a positioned-read source into logical sector payloads using the
/// geometry of a detected [`MediaSourceDescriptor`].
pub struct DescriptorSource<R> {
    desc: MediaSourceDescriptor,
    src: R,
}

impl<R: ReadAt> DescriptorSource<R> {
    pub fn new(desc: MediaSourceDescriptor, src: R) -> Self {
        Self { desc, src }
    }

    pub fn descriptor(&self) -> &MediaSourceDescriptor {
        &self.desc
    }

    pub fn into_inner(self) -> R {
        self.src
    }

    fn payload_pos(&self, sector: u64, in_sector: u64) -> u64 {
        sector * self.desc.sector_size
            + self.desc.offset_file_header
            + self.desc.offset_sector_leadin
            + in_sector
    }

    fn read_exact_at(&mut self, dest: &mut [u8], pos: u64) -> io::Result<()> {
        let n = self.src.read_at(dest, pos)?;
        if n < dest.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short sector read at byte {pos}"),
            ));
        }
        Ok(())
    }
}

impl<R: ReadAt> SectorSource for DescriptorSource<R> {
    fn read_sector_data(&mut self, dest: &mut [u8], sector: u64, offset: u64) -> io::Result<()> {
        // Plain images keep payloads contiguous, so a spanning read is one
        // positioned read.
        if self.desc.sector_size == SECTOR_SIZE {
            let pos = self.payload_pos(sector, offset);
            return self.read_exact_at(dest, pos);
        }

        // Raw images interleave sync/header/error bytes around each
        // 2048-byte payload, so the read goes sector by sector.
        let total = dest.len() as u64;
        let mut done = 0u64;
        while done < total {
            let lba = sector + (offset + done) / SECTOR_SIZE;
            let in_sector = (offset + done) % SECTOR_SIZE;
            let chunk = (SECTOR_SIZE - in_sector).min(total - done);
            let pos = self.payload_pos(lba, in_sector);
            self.read_exact_at(
                // chunk is at most dest.len() - done
                &mut dest[done as usize..(done + chunk) as usize],
                pos,
            )?;
            done += chunk;
        }
        Ok(())
    }
}
