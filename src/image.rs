//! Resolved view over a parsed ELF object.
//!
//! The analysis pipeline never touches goblin types directly; it works
//! against this flattened image of named sections and loadable program
//! segments, each carrying its virtual address and raw file bytes. Virtual
//! addresses are resolved back to bytes by scanning the segment table.

use goblin::elf::program_header::{PF_W, PT_LOAD};
use goblin::elf::section_header::SHT_NOBITS;
use goblin::elf::Elf;

use crate::error::Result;

/// A named ELF section with its virtual address and file bytes.
#[derive(Debug, Clone)]
pub struct Section<'a> {
    pub name: String,
    pub addr: u64,
    pub data: &'a [u8],
}

/// A program segment as loaded at runtime.
#[derive(Debug, Clone)]
pub struct Segment<'a> {
    pub is_load: bool,
    pub vaddr: u64,
    pub filesz: u64,
    pub writable: bool,
    pub data: &'a [u8],
}

/// Sections plus program segments of one ELF image, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ElfImage<'a> {
    pub sections: Vec<Section<'a>>,
    pub segments: Vec<Segment<'a>>,
}

impl<'a> ElfImage<'a> {
    /// Parse raw ELF bytes into a resolved image.
    ///
    /// Sections without file backing (`SHT_NOBITS`) and headers whose ranges
    /// fall outside the file are carried with empty data rather than
    /// rejected; a Go binary's interesting sections are always file-backed.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let elf = Elf::parse(data)?;
        Ok(Self::from_elf(&elf, data))
    }

    /// Build the image from an already-parsed goblin object.
    pub fn from_elf(elf: &Elf, data: &'a [u8]) -> Self {
        let sections = elf
            .section_headers
            .iter()
            .map(|sh| {
                let name = elf
                    .shdr_strtab
                    .get_at(sh.sh_name)
                    .unwrap_or("")
                    .to_string();
                let bytes = if sh.sh_type == SHT_NOBITS {
                    &[][..]
                } else {
                    slice_file(data, sh.sh_offset, sh.sh_size)
                };
                Section {
                    name,
                    addr: sh.sh_addr,
                    data: bytes,
                }
            })
            .collect();

        let segments = elf
            .program_headers
            .iter()
            .map(|ph| Segment {
                is_load: ph.p_type == PT_LOAD,
                vaddr: ph.p_vaddr,
                filesz: ph.p_filesz,
                writable: ph.p_flags & PF_W != 0,
                data: slice_file(data, ph.p_offset, ph.p_filesz),
            })
            .collect();

        Self { sections, segments }
    }

    /// Look up a section by name.
    pub fn section(&self, name: &str) -> Option<&Section<'a>> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Resolve a virtual address to bytes via the segment table.
    ///
    /// Scans segments in declared order and returns the bytes of the first
    /// one whose `[vaddr, vaddr + filesz)` window covers `addr`, capped at
    /// `size`. A covered address near the end of a segment yields fewer
    /// bytes than requested; callers treat short reads as failure. Returns
    /// `None` when no segment covers `addr`.
    pub fn segment_read(&self, addr: u64, size: usize) -> Option<&'a [u8]> {
        for seg in &self.segments {
            let end = seg.vaddr.saturating_add(seg.filesz);
            if addr >= seg.vaddr && addr < end {
                let offset = (addr - seg.vaddr) as usize;
                let available = seg.data.len().saturating_sub(offset);
                let take = available.min(size);
                return Some(&seg.data[offset..offset + take]);
            }
        }
        None
    }
}

/// Slice `[offset, offset + size)` out of the file, clamped to its bounds.
fn slice_file(data: &[u8], offset: u64, size: u64) -> &[u8] {
    let start = (offset as usize).min(data.len());
    let end = start.saturating_add(size as usize).min(data.len());
    &data[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(vaddr: u64, data: &[u8]) -> Segment<'_> {
        Segment {
            is_load: true,
            vaddr,
            filesz: data.len() as u64,
            writable: false,
            data,
        }
    }

    #[test]
    fn test_segment_read_in_range() {
        let bytes = [0u8, 1, 2, 3, 4, 5, 6, 7];
        let image = ElfImage {
            sections: vec![],
            segments: vec![segment(0x1000, &bytes)],
        };

        assert_eq!(image.segment_read(0x1000, 4), Some(&bytes[0..4]));
        assert_eq!(image.segment_read(0x1002, 2), Some(&bytes[2..4]));
    }

    #[test]
    fn test_segment_read_short_at_tail() {
        let bytes = [9u8; 8];
        let image = ElfImage {
            sections: vec![],
            segments: vec![segment(0x1000, &bytes)],
        };

        // Address covered but only 2 bytes remain in the segment.
        let got = image.segment_read(0x1006, 16).unwrap();
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn test_segment_read_uncovered() {
        let bytes = [0u8; 8];
        let image = ElfImage {
            sections: vec![],
            segments: vec![segment(0x1000, &bytes)],
        };

        assert!(image.segment_read(0x0fff, 1).is_none());
        assert!(image.segment_read(0x1008, 1).is_none());
        assert!(image.segment_read(0x9000, 1).is_none());
    }

    #[test]
    fn test_segment_read_first_match_wins() {
        let first = [1u8; 8];
        let second = [2u8; 8];
        let image = ElfImage {
            sections: vec![],
            segments: vec![segment(0x1000, &first), segment(0x1000, &second)],
        };

        assert_eq!(image.segment_read(0x1000, 1), Some(&first[0..1]));
    }

    #[test]
    fn test_section_lookup() {
        let bytes = [0u8; 4];
        let image = ElfImage {
            sections: vec![Section {
                name: ".gopclntab".to_string(),
                addr: 0x2000,
                data: &bytes,
            }],
            segments: vec![],
        };

        assert!(image.section(".gopclntab").is_some());
        assert!(image.section(".go.buildinfo").is_none());
    }

    #[test]
    fn test_slice_file_clamps() {
        let data = [0u8; 10];
        assert_eq!(slice_file(&data, 4, 4).len(), 4);
        assert_eq!(slice_file(&data, 8, 100).len(), 2);
        assert_eq!(slice_file(&data, 100, 4).len(), 0);
    }
}
