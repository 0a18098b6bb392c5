//! Entry types reported by the directory parser.

/// Kind of a directory entry, mapped from the file-type byte of its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Unknown,
    Directory,
    File,
}

/// One discovered filesystem entry, handed to the add-entry callback.
///
/// The name is the raw on-disc identifier: not null-terminated and not
/// guaranteed to be valid UTF-8.
#[derive(Debug, Clone, Copy)]
pub struct DirEntry<'a> {
    /// First sector of the entry's data.
    pub start_sector: u64,
    /// Byte length of the entry's data.
    pub len: u64,
    pub kind: EntryKind,
    /// Raw on-disc name bytes.
    pub name: &'a [u8],
    /// Sector of the directory listing that contained this entry.
    pub parent_sector: u64,
}

impl DirEntry<'_> {
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Name as a lossy UTF-8 string with the ISO `;N` version suffix
    /// removed.
    pub fn display_name(&self) -> String {
        let name = String::from_utf8_lossy(self.name);
        match name.rfind(';') {
            Some(idx) => name[..idx].to_string(),
            None => name.into_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_strips_version() {
        let entry = DirEntry {
            start_sector: 100,
            len: 10,
            kind: EntryKind::File,
            name: b"README.TXT;1",
            parent_sector: 20,
        };
        assert_eq!(entry.display_name(), "README.TXT");
        assert!(entry.is_file());
    }

    #[test]
    fn test_display_name_without_version() {
        let entry = DirEntry {
            start_sector: 100,
            len: 0,
            kind: EntryKind::Directory,
            name: b"DATA",
            parent_sector: 20,
        };
        assert_eq!(entry.display_name(), "DATA");
        assert!(entry.is_directory());
    }
}
