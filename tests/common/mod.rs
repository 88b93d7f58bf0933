//! Shared fixtures: synthetic ELF images with hand-assembled build-info
//! blobs and pcln tables.
#![allow(dead_code)]

use gobindeps::{ElfImage, Section, Segment};

pub const BUILD_INFO_MAGIC: &[u8] = b"\xff Go buildinf:";
pub const BUILD_ADDR: u64 = 0x400000;
pub const PCLN_ADDR: u64 = 0x500000;

const PCLN_MAGIC_GO12: u32 = 0xFFFF_FFFB;

/// Owns the byte buffers an [`ElfImage`] borrows from.
pub struct Fixture {
    pub buildinfo: Vec<u8>,
    pub pclntab: Vec<u8>,
    pub include_pclntab: bool,
}

impl Fixture {
    pub fn new(buildinfo: Vec<u8>, files: &[&str]) -> Self {
        Self {
            buildinfo,
            pclntab: build_go12_pclntab(files),
            include_pclntab: true,
        }
    }

    pub fn without_pclntab(mut self) -> Self {
        self.include_pclntab = false;
        self
    }

    pub fn image(&self) -> ElfImage<'_> {
        let mut sections = vec![Section {
            name: ".go.buildinfo".to_string(),
            addr: BUILD_ADDR,
            data: &self.buildinfo,
        }];
        if self.include_pclntab {
            sections.push(Section {
                name: ".gopclntab".to_string(),
                addr: PCLN_ADDR,
                data: &self.pclntab,
            });
        }
        ElfImage {
            sections,
            segments: vec![Segment {
                is_load: true,
                vaddr: BUILD_ADDR,
                filesz: self.buildinfo.len() as u64,
                writable: true,
                data: &self.buildinfo,
            }],
        }
    }
}

fn put_uvarint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Pointer-mode build info: the header's two virtual addresses chase
/// (data, length) string headers placed later in the same data segment.
/// The module-info payload is wrapped in the 16-byte sentinel markers.
pub fn pointer_mode_buildinfo(version: &str, mod_info: &str) -> Vec<u8> {
    let wrapped: Vec<u8> = {
        let mut w = vec![0xAB; 16];
        w.extend(mod_info.as_bytes());
        w.extend([0xCD; 16]);
        w
    };

    let ver_addr = BUILD_ADDR + 128;
    let mod_addr = ver_addr + version.len() as u64;

    let mut d = vec![0u8; 128 + version.len() + wrapped.len()];
    d[..BUILD_INFO_MAGIC.len()].copy_from_slice(BUILD_INFO_MAGIC);
    d[14] = 8; // pointer size
    d[15] = 0; // little-endian, pointer-indirected strings
    d[16..24].copy_from_slice(&(BUILD_ADDR + 64).to_le_bytes());
    d[24..32].copy_from_slice(&(BUILD_ADDR + 80).to_le_bytes());

    // String headers at +64 (version) and +80 (module info).
    d[64..72].copy_from_slice(&ver_addr.to_le_bytes());
    d[72..80].copy_from_slice(&(version.len() as u64).to_le_bytes());
    d[80..88].copy_from_slice(&mod_addr.to_le_bytes());
    d[88..96].copy_from_slice(&(wrapped.len() as u64).to_le_bytes());

    d[128..128 + version.len()].copy_from_slice(version.as_bytes());
    d[128 + version.len()..].copy_from_slice(&wrapped);
    d
}

/// Inline-mode build info: the two strings follow the header directly as
/// varint-length-prefixed payloads, without sentinel wrapping.
pub fn inline_mode_buildinfo(version: &str, mod_info: &str) -> Vec<u8> {
    let mut d = Vec::new();
    d.extend(BUILD_INFO_MAGIC);
    d.push(8); // pointer size, unused inline
    d.push(0x2); // inline-strings flag
    d.resize(32, 0);
    put_uvarint(&mut d, version.len() as u64);
    d.extend(version.as_bytes());
    put_uvarint(&mut d, mod_info.len() as u64);
    d.extend(mod_info.as_bytes());
    d
}

/// A go1.2-layout pcln table with no functions and the given file list.
pub fn build_go12_pclntab(files: &[&str]) -> Vec<u8> {
    let mut d = Vec::new();
    d.extend(PCLN_MAGIC_GO12.to_le_bytes());
    d.extend([0, 0, 1, 8]); // pad, pad, quantum, ptr size
    d.extend(0u64.to_le_bytes()); // nfunctab
    d.extend(0u64.to_le_bytes()); // functab

    let fileoff_pos = d.len();
    d.extend(0u32.to_le_bytes());
    let fileoff = d.len() as u32;
    d[fileoff_pos..fileoff_pos + 4].copy_from_slice(&fileoff.to_le_bytes());

    let nfiletab = files.len() as u32 + 1;
    d.extend(nfiletab.to_le_bytes());
    let entries_pos = d.len();
    for _ in files {
        d.extend(0u32.to_le_bytes());
    }
    for (i, file) in files.iter().enumerate() {
        let here = d.len() as u32;
        d[entries_pos + 4 * i..entries_pos + 4 * i + 4].copy_from_slice(&here.to_le_bytes());
        d.extend(file.as_bytes());
        d.push(0);
    }
    d
}
