//! Directory-tree browsing for detected disc images.
//!
//! Wires a detected [`crate::media::MediaSourceDescriptor`] into logical
//! sector reads and walks the ECMA-119 directory structure, reporting each
//! discovered entry through a caller callback.

pub mod entry;
pub mod parser;
pub mod reader;

pub use entry::{DirEntry, EntryKind};
pub use parser::{DirParser, ParseError, MAX_DIRECTORY_LEN, MAX_SCAN_DEPTH};
pub use reader::{DescriptorSource, SectorSource, SECTOR_SIZE};
