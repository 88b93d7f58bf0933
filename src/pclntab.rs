//! Decoding source file paths out of Go's pcln table.
//!
//! The `.gopclntab` section maps program counters to source positions. Its
//! header identifies the layout revision, instruction quantum, pointer size
//! and byte order; the file-name table inside it lists every source path
//! compiled into the binary, which is all this analysis needs.
//!
//! ```text
//! bytes 0..4   magic, revision-specific, in the table's own byte order
//! bytes 4..6   zero
//! byte  6      instruction quantum (1, 2 or 4)
//! byte  7      pointer size (4 or 8)
//! bytes 8..    revision-specific header slots, then table regions
//! ```

use memchr::memchr;
use tracing::debug;

use crate::error::{GoBinaryError, Result};
use crate::types::{Endianness, PtrReader};

const MAGIC_GO12: u32 = 0xFFFF_FFFB;
const MAGIC_GO116: u32 = 0xFFFF_FFFA;
const MAGIC_GO118: u32 = 0xFFFF_FFF0;
const MAGIC_GO120: u32 = 0xFFFF_FFF1;

/// Layout revisions of the pcln table across Go releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Go12,
    Go116,
    Go118,
    Go120,
}

impl Layout {
    fn from_magic(magic: u32) -> Option<Self> {
        match magic {
            MAGIC_GO12 => Some(Layout::Go12),
            MAGIC_GO116 => Some(Layout::Go116),
            MAGIC_GO118 => Some(Layout::Go118),
            MAGIC_GO120 => Some(Layout::Go120),
            _ => None,
        }
    }
}

/// A validated view over raw `.gopclntab` bytes.
pub struct LineTable<'a> {
    data: &'a [u8],
    reader: PtrReader,
    layout: Layout,
}

impl<'a> LineTable<'a> {
    /// Validate the table header and identify its layout revision.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.len() < 16 {
            return Err(GoBinaryError::MalformedPclnTab(
                "table shorter than header".to_string(),
            ));
        }
        if data[4] != 0 || data[5] != 0 {
            return Err(GoBinaryError::MalformedPclnTab(
                "nonzero header padding".to_string(),
            ));
        }
        let quantum = data[6];
        if !matches!(quantum, 1 | 2 | 4) {
            return Err(GoBinaryError::MalformedPclnTab(format!(
                "unsupported instruction quantum {quantum}"
            )));
        }
        let ptr_size = data[7] as usize;
        if ptr_size != 4 && ptr_size != 8 {
            return Err(GoBinaryError::MalformedPclnTab(format!(
                "unsupported pointer size {ptr_size}"
            )));
        }

        let word = [data[0], data[1], data[2], data[3]];
        let le = u32::from_le_bytes(word);
        let be = u32::from_be_bytes(word);
        let (endian, layout) = if let Some(layout) = Layout::from_magic(le) {
            (Endianness::Little, layout)
        } else if let Some(layout) = Layout::from_magic(be) {
            (Endianness::Big, layout)
        } else {
            return Err(GoBinaryError::MalformedPclnTab(
                "unrecognized magic".to_string(),
            ));
        };
        debug!(?layout, ptr_size, "recognized pclntab header");

        Ok(Self {
            data,
            reader: PtrReader::new(endian, ptr_size),
            layout,
        })
    }

    /// Enumerate the source file paths referenced by the table, preserving
    /// table order.
    pub fn files(&self) -> Result<Vec<String>> {
        match self.layout {
            Layout::Go12 => self.files_go12(),
            Layout::Go116 | Layout::Go118 | Layout::Go120 => self.files_go116(),
        }
    }

    fn ptr_size(&self) -> usize {
        self.reader.ptr_size
    }

    /// Pointer-sized header slot `index`, counted from byte 8.
    fn header_slot(&self, index: usize) -> Result<u64> {
        self.reader
            .read_ptr(self.data, 8 + index * self.ptr_size())
            .ok_or_else(|| {
                GoBinaryError::MalformedPclnTab(format!("header slot {index} out of bounds"))
            })
    }

    /// NUL-terminated string at `offset` into the table data.
    fn cstring_at(&self, offset: usize) -> Result<(String, usize)> {
        let tail = self.data.get(offset..).ok_or_else(|| {
            GoBinaryError::MalformedPclnTab(format!("string offset {offset} out of bounds"))
        })?;
        let end = memchr(0, tail).ok_or_else(|| {
            GoBinaryError::MalformedPclnTab(format!("unterminated string at offset {offset}"))
        })?;
        Ok((String::from_utf8_lossy(&tail[..end]).into_owned(), end))
    }

    /// go1.2 layout: a 4-byte file-offset table follows the function table;
    /// each entry indexes a NUL-terminated path inside the table data. Entry
    /// zero is reserved ("no file").
    fn files_go12(&self) -> Result<Vec<String>> {
        let nfunctab = self.header_slot(0)? as usize;
        let functab_start = 8 + self.ptr_size();
        let functab_size = (nfunctab * 2 + 1) * self.ptr_size();

        let fileoff = self
            .reader
            .read_u32(self.data, functab_start + functab_size)
            .ok_or_else(|| {
                GoBinaryError::MalformedPclnTab("file table offset out of bounds".to_string())
            })? as usize;

        let nfiletab = self.reader.read_u32(self.data, fileoff).ok_or_else(|| {
            GoBinaryError::MalformedPclnTab("file table count out of bounds".to_string())
        })? as usize;

        // The count is untrusted input, so no pre-allocation from it.
        let mut files = Vec::new();
        for i in 1..nfiletab {
            let entry = self
                .reader
                .read_u32(self.data, fileoff + 4 * i)
                .ok_or_else(|| {
                    GoBinaryError::MalformedPclnTab(format!("file entry {i} out of bounds"))
                })? as usize;
            let (path, _) = self.cstring_at(entry)?;
            files.push(path);
        }
        Ok(files)
    }

    /// go1.16+ layouts: the header carries region offsets; the file table is
    /// `nfiletab` consecutive NUL-terminated paths. go1.18 inserted a text
    /// start slot ahead of the region offsets.
    fn files_go116(&self) -> Result<Vec<String>> {
        let nfiletab = self.header_slot(1)? as usize;
        let filetab_slot = match self.layout {
            Layout::Go116 => 4,
            _ => 5,
        };
        let filetab = self.header_slot(filetab_slot)? as usize;

        let mut files = Vec::new();
        let mut offset = filetab;
        for _ in 0..nfiletab {
            let (path, len) = self.cstring_at(offset)?;
            files.push(path);
            offset += len + 1;
        }
        Ok(files)
    }
}
