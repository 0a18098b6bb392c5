//! Media geometry detection for CD/DVD disc image files.
//!
//! Disc images carry no self-describing container, so sector size, file
//! header offset and layer break are inferred by probing byte patterns.
//! The probes assume the incoming data is *some* kind of CD/DVD image;
//! running them against arbitrary binary data can report false positives.

use thiserror::Error;

use crate::endian::EndianInt;
use crate::io::ReadAt;

// CD-XA sector layouts within a BIN/ISO file:
//                       (sync)  (address)  (mode)  (subheader)  (data)   (error)
// Yellowbook Mode 1   :   12        3        1         8         2048    4+276
// Yellowbook Mode 2   :   12        3        1         8         2336    4
// CD-XA Mode 2, Form 1:   12        3        1         8         2048    4+276
// CD-XA Mode 2, Form 2:   12        3        1         8         2324    4
// CDDA                :                                          2352
//
// DVD-ROM raw sector (2064 bytes): 4 id + 8 other + 4 error + 2048 data.
//
// A valid image for emulator use is 2352/2368 (CD-ROM) or 2048/2064 (DVD),
// with a uniform sector size throughout. No other size is considered valid.

/// Plain user data sectors.
pub const SECTOR_SIZE_2048: u64 = 2048;
/// Raw DVD data (id + error info around the payload).
pub const SECTOR_SIZE_2064: u64 = 2048 + 16;
/// User data plus error correction.
pub const SECTOR_SIZE_2328: u64 = 2048 + 280;
/// Sync, header and user data.
pub const SECTOR_SIZE_2340: u64 = 2340;
/// Full raw CD frames (also CDDA).
pub const SECTOR_SIZE_2352: u64 = 2352;
/// Raw CD frames plus subchannel Q.
pub const SECTOR_SIZE_2368: u64 = 2368;

/// Whether `size` is one of the sector sizes this library accepts in an
/// image file.
pub fn is_valid_sector_size(size: u64) -> bool {
    matches!(
        size,
        SECTOR_SIZE_2048
            | SECTOR_SIZE_2064
            | SECTOR_SIZE_2328
            | SECTOR_SIZE_2340
            | SECTOR_SIZE_2352
            | SECTOR_SIZE_2368
    )
}

/// Errors from media description detection.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("image size is zero, nothing to probe")]
    EmptyImage,

    #[error("unable to detect disc image format")]
    UnknownFormat,

    #[error("2352-byte image has an unrecognized layout")]
    AmbiguousLayout,
}

/// Detected geometry of one disc image.
///
/// Callers construct it with the image's byte length, hand it to
/// [`detect_media_description`] to populate the rest, and treat it as
/// read-only afterward. On detection failure the contents are undefined.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaSourceDescriptor {
    /// Total sector count, derived from `image_size` during detection.
    pub num_sectors: u64,
    /// Uniform sector size of the image.
    pub sector_size: u64,
    /// Total byte length of the underlying source.
    pub image_size: u64,
    /// Sector where a dual-layer DVD switches layers; 0 when single-layer
    /// or not applicable.
    pub dvd_layer_break_sector: u64,
    /// Byte offset within a sector where user data begins (varies by CD
    /// mode).
    pub offset_sector_leadin: u64,
    /// Byte offset within the file before sector 0 begins.
    pub offset_file_header: u64,
    /// Whether UDF filesystem markers were found.
    pub has_udf_fs: bool,
}

impl MediaSourceDescriptor {
    pub fn new(image_size: u64) -> Self {
        Self {
            image_size,
            ..Self::default()
        }
    }
}

/// Check for the CD001 signature at sector 16 of a guessed geometry.
fn has_cd001<R: ReadAt + ?Sized>(src: &mut R, sector_size_guess: u64, offset_guess: u64) -> bool {
    let offset = sector_size_guess * 16 + offset_guess;

    // Byte 0 is the volume descriptor type; the signature follows it.
    let mut buf = [0u8; 6];
    match src.read_at(&mut buf, offset) {
        Ok(6) => &buf[1..] == b"CD001",
        Ok(n) => {
            log::debug!("short probe read at offset {offset} ({n} of 6 bytes), image truncated?");
            false
        }
        Err(err) => {
            log::debug!("probe read at offset {offset} failed: {err}");
            false
        }
    }
}

/// Read one raw sector's worth of `dest` honoring the detected geometry.
fn read_sector_raw<R: ReadAt + ?Sized>(
    desc: &MediaSourceDescriptor,
    src: &mut R,
    dest: &mut [u8],
    sector: u64,
) -> bool {
    let pos = sector * desc.sector_size + desc.offset_file_header;
    matches!(src.read_at(dest, pos), Ok(n) if n == dest.len())
}

/// Probe a readable source and populate `desc` with its geometry.
///
/// Probes run in priority order: 2352-byte sectors with a mode-2 style
/// lead-in, 2352-byte sectors with a mode-1 lead-in, then plain 2048-byte
/// data sectors. The first signature hit wins. 2048-byte images are then
/// checked for a DVD layer break.
pub fn detect_media_description<R: ReadAt + ?Sized>(
    desc: &mut MediaSourceDescriptor,
    src: &mut R,
) -> Result<(), MediaError> {
    if desc.image_size == 0 {
        return Err(MediaError::EmptyImage);
    }

    if has_cd001(src, SECTOR_SIZE_2352, 16 + 8) {
        desc.sector_size = SECTOR_SIZE_2352;

        if desc.image_size % SECTOR_SIZE_2352 == 0 {
            desc.offset_file_header = 0;
            desc.offset_sector_leadin = 24; // mode 2
        } else if desc.image_size >= 16 && (desc.image_size - 16) % SECTOR_SIZE_2352 == 0 {
            desc.offset_file_header = 16;
            desc.offset_sector_leadin = 8; // mode 1
        } else {
            log::warn!("unknown 2352 image layout, assuming CD-ROM mode 2 with no file header");
            desc.offset_file_header = 0;
            desc.offset_sector_leadin = 24;
            return Err(MediaError::AmbiguousLayout);
        }
    } else if has_cd001(src, SECTOR_SIZE_2352, 8) {
        desc.sector_size = SECTOR_SIZE_2352;
        desc.offset_file_header = 0;
        desc.offset_sector_leadin = 8; // mode 1
    } else if has_cd001(src, SECTOR_SIZE_2048, 0) {
        desc.sector_size = SECTOR_SIZE_2048;
        desc.offset_file_header = 0;
        desc.offset_sector_leadin = 0;
    } else {
        log::error!("unable to detect disc image format");
        return Err(MediaError::UnknownFormat);
    }

    if (desc.image_size - desc.offset_file_header) % desc.sector_size != 0 {
        // Some tools append tag metadata to the end of BIN/ISO files, and
        // without a real container there is no sector count to trust. Being
        // off by one sector here mostly doesn't matter.
        log::info!("image size is not a multiple of the detected sector size, trailing metadata?");
    }

    desc.num_sectors = (desc.image_size - desc.offset_file_header) / desc.sector_size;

    // 2064 is reserved for raw DVD images, which the probes above never
    // produce yet.
    if desc.sector_size == SECTOR_SIZE_2048 || desc.sector_size == SECTOR_SIZE_2064 {
        detect_layer_break(desc, src);
    }

    Ok(())
}

/// Look for a DVD layer break on a 2048-byte-sector image.
///
/// Sector 33 is scanned for a `UDF` marker (only UDF supports layer breaks);
/// when present, the candidate break sector is the big-endian u32 at 0x54 of
/// sector 16. Candidates below 34 or past the end of the image are clamped
/// to 0 (single-layer). Returns true when UDF markers were found and sector
/// 16 was readable, regardless of clamping.
pub fn detect_layer_break<R: ReadAt + ?Sized>(
    desc: &mut MediaSourceDescriptor,
    src: &mut R,
) -> bool {
    // Layer breaks are a DVD feature, and DVD images always carry
    // 2048-byte sectors.
    if desc.sector_size != SECTOR_SIZE_2048 {
        return false;
    }

    let mut buf = [0u8; SECTOR_SIZE_2048 as usize];
    if !read_sector_raw(desc, src, &mut buf, 33) {
        return false;
    }
    if !buf.windows(3).any(|w| w == b"UDF") {
        return false;
    }
    desc.has_udf_fs = true;

    if !read_sector_raw(desc, src, &mut buf, 16) {
        return false;
    }

    desc.dvd_layer_break_sector = u32::load_be(&buf[0x54..]) as u64;
    log::info!("UDF layer break sector: {}", desc.dvd_layer_break_sector);

    if desc.dvd_layer_break_sector < 34 {
        log::info!("assuming single-layer image because layer break < 34");
        desc.dvd_layer_break_sector = 0;
    }

    if desc.dvd_layer_break_sector > desc.num_sectors {
        log::warn!("layer break is past the end of the image, data may be corrupt; assuming single-layer");
        desc.dvd_layer_break_sector = 0;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_cd001(img: &mut [u8], sector_size: u64, offset: u64) {
        let pos = (sector_size * 16 + offset) as usize;
        img[pos] = 1; // volume descriptor type
        img[pos + 1..pos + 6].copy_from_slice(b"CD001");
    }

    fn detect(img: &mut Vec<u8>) -> (MediaSourceDescriptor, Result<(), MediaError>) {
        let mut desc = MediaSourceDescriptor::new(img.len() as u64);
        let result = detect_media_description(&mut desc, img);
        (desc, result)
    }

    #[test]
    fn test_probe_precedence() {
        // Signature present at every probe location; the 2352 mode-2 probe
        // must win.
        let mut img = vec![0u8; 2352 * 40];
        put_cd001(&mut img, 2352, 24);
        put_cd001(&mut img, 2352, 8);
        put_cd001(&mut img, 2048, 0);

        let (desc, result) = detect(&mut img);
        result.unwrap();
        assert_eq!(desc.sector_size, 2352);
        assert_eq!(desc.offset_file_header, 0);
        assert_eq!(desc.offset_sector_leadin, 24);
    }

    #[test]
    fn test_2352_mode1_with_file_header() {
        let mut img = vec![0u8; 2352 * 40 + 16];
        put_cd001(&mut img, 2352, 24);

        let (desc, result) = detect(&mut img);
        result.unwrap();
        assert_eq!(desc.sector_size, 2352);
        assert_eq!(desc.offset_file_header, 16);
        assert_eq!(desc.offset_sector_leadin, 8);
        assert_eq!(desc.num_sectors, 40);
    }

    #[test]
    fn test_2352_ambiguous_layout_fails() {
        let mut img = vec![0u8; 2352 * 40 + 5];
        put_cd001(&mut img, 2352, 24);

        let (_, result) = detect(&mut img);
        assert!(matches!(result, Err(MediaError::AmbiguousLayout)));
    }

    #[test]
    fn test_2352_mode1_headerless() {
        let mut img = vec![0u8; 2352 * 30];
        put_cd001(&mut img, 2352, 8);

        let (desc, result) = detect(&mut img);
        result.unwrap();
        assert_eq!(desc.sector_size, 2352);
        assert_eq!(desc.offset_file_header, 0);
        assert_eq!(desc.offset_sector_leadin, 8);
    }

    #[test]
    fn test_plain_2048_image() {
        let mut img = vec![0u8; 2048 * 40];
        put_cd001(&mut img, 2048, 0);

        let (desc, result) = detect(&mut img);
        result.unwrap();
        assert_eq!(desc.sector_size, 2048);
        assert_eq!(desc.offset_sector_leadin, 0);
        assert_eq!(desc.num_sectors, 40);
        assert_eq!(
            desc.num_sectors * desc.sector_size + desc.offset_file_header,
            desc.image_size
        );
    }

    #[test]
    fn test_trailing_metadata_tolerated() {
        // Tag data appended past the last sector must not fail detection.
        let mut img = vec![0u8; 2048 * 40 + 100];
        put_cd001(&mut img, 2048, 0);

        let (desc, result) = detect(&mut img);
        result.unwrap();
        assert_eq!(desc.num_sectors, 40);
    }

    #[test]
    fn test_no_signature_fails() {
        let mut img = vec![0u8; 2048 * 40];
        let (_, result) = detect(&mut img);
        assert!(matches!(result, Err(MediaError::UnknownFormat)));
    }

    #[test]
    fn test_empty_image_fails() {
        let mut img = Vec::new();
        let (_, result) = detect(&mut img);
        assert!(matches!(result, Err(MediaError::EmptyImage)));
    }

    fn dvd_image(num_sectors: u64, layer_break: u32) -> Vec<u8> {
        let mut img = vec![0u8; (2048 * num_sectors) as usize];
        put_cd001(&mut img, 2048, 0);
        // UDF marker somewhere inside sector 33.
        let udf_pos = 2048 * 33 + 500;
        img[udf_pos..udf_pos + 3].copy_from_slice(b"UDF");
        // Layer break candidate at 0x54 of sector 16, big-endian.
        let lb_pos = 2048 * 16 + 0x54;
        img[lb_pos..lb_pos + 4].copy_from_slice(&layer_break.to_be_bytes());
        img
    }

    #[test]
    fn test_layer_break_accepted() {
        let mut img = dvd_image(40, 34);
        let (desc, result) = detect(&mut img);
        result.unwrap();
        assert!(desc.has_udf_fs);
        assert_eq!(desc.dvd_layer_break_sector, 34);
    }

    #[test]
    fn test_layer_break_below_first_data_sector_clamped() {
        let mut img = dvd_image(40, 10);
        let (desc, result) = detect(&mut img);
        result.unwrap();
        assert!(desc.has_udf_fs);
        assert_eq!(desc.dvd_layer_break_sector, 0);
    }

    #[test]
    fn test_layer_break_past_image_end_clamped() {
        let mut img = dvd_image(40, 100);
        let (desc, result) = detect(&mut img);
        result.unwrap();
        assert_eq!(desc.dvd_layer_break_sector, 0);
    }

    #[test]
    fn test_no_udf_marker_means_no_layer_break() {
        let mut img = vec![0u8; 2048 * 40];
        put_cd001(&mut img, 2048, 0);
        let lb_pos = 2048 * 16 + 0x54;
        img[lb_pos..lb_pos + 4].copy_from_slice(&100u32.to_be_bytes());

        let (mut desc, result) = detect(&mut img);
        result.unwrap();
        assert!(!desc.has_udf_fs);
        assert_eq!(desc.dvd_layer_break_sector, 0);
        assert!(!detect_layer_break(&mut desc, &mut img));
    }

    #[test]
    fn test_layer_break_skipped_for_raw_cd() {
        let mut desc = MediaSourceDescriptor::new(2352 * 40);
        desc.sector_size = 2352;
        let mut img = vec![0u8; 2352 * 40];
        assert!(!detect_layer_break(&mut desc, &mut img));
    }

    #[test]
    fn test_valid_sector_sizes() {
        for size in [2048, 2064, 2328, 2340, 2352, 2368] {
            assert!(is_valid_sector_size(size));
        }
        assert!(!is_valid_sector_size(512));
        assert!(!is_valid_sector_size(2336));
    }
}
