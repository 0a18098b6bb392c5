//! discwalk
//!
//! Geometry detection and ISO 9660/ECMA-119 directory walking for CD/DVD
//! disc images as used by emulators. The crate never does I/O of its own;
//! callers supply a positioned-read source ([`io::ReadAt`]), the detector
//! fills in a [`media::MediaSourceDescriptor`], and the parser walks the
//! directory tree through a sector-read adapter built from that geometry.

pub mod browse;
pub mod endian;
pub mod io;
pub mod media;

pub use browse::{DescriptorSource, DirEntry, DirParser, EntryKind, ParseError};
pub use io::{FileSource, ReadAt};
pub use media::{detect_media_description, MediaError, MediaSourceDescriptor};
