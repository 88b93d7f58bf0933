//! Locating and decoding Go's build-info blob.
//!
//! Module-aware Go binaries embed a fixed-layout structure carrying the
//! toolchain version and the module graph. The blob starts with a 14-byte
//! magic on a 16-byte boundary inside the initial data region:
//!
//! ```text
//! bytes 0..14   magic "\xff Go buildinf:"
//! byte  14      pointer size (4 or 8)
//! byte  15      flags: bit 0 = big-endian, bit 1 = inline strings
//! bytes 16..32  in pointer mode, two pointer-sized virtual addresses of
//!               (data ptr, length) string headers: version, module info
//! ```
//!
//! With the inline flag set (go1.18+), the two strings follow the 32-byte
//! header directly as varint-length-prefixed payloads instead.

use memchr::memmem;
use tracing::debug;

use crate::error::{GoBinaryError, Result};
use crate::image::ElfImage;
use crate::types::{Endianness, PtrReader};

pub(crate) const BUILD_INFO_MAGIC: &[u8] = b"\xff Go buildinf:";

const BUILD_INFO_ALIGN: usize = 16;
const BUILD_INFO_HEADER_SIZE: usize = 32;
/// How far into the data region the magic is searched for.
const BUILD_INFO_SCAN_LIMIT: usize = 64 * 1024;

const FLAG_BIG_ENDIAN: u8 = 0x1;
const FLAG_INLINE_STRINGS: u8 = 0x2;

/// Decoded build-info strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    /// Toolchain version, e.g. `go1.18.5`
    pub go_version: String,
    /// Newline/tab-separated module records, sentinels already stripped
    pub mod_info: String,
}

/// Find the build-info header inside the image's data region.
///
/// The returned slice starts at the magic and carries at least the full
/// 32-byte header. Matches not on a 16-byte boundary are skipped; the scan
/// continues from the next aligned offset.
pub fn locate<'a>(image: &ElfImage<'a>) -> Result<&'a [u8]> {
    let start = data_start_addr(image);
    let buf = image
        .segment_read(start, BUILD_INFO_SCAN_LIMIT)
        .unwrap_or(&[]);

    for pos in memmem::find_iter(buf, BUILD_INFO_MAGIC) {
        if pos % BUILD_INFO_ALIGN != 0 {
            continue;
        }
        if buf.len() - pos < BUILD_INFO_HEADER_SIZE {
            break;
        }
        debug!(addr = start + pos as u64, "found build info header");
        return Ok(&buf[pos..]);
    }

    Err(GoBinaryError::NotGoExecutable)
}

/// Where the data region begins: the `.go.buildinfo` section when present,
/// else the first writable loadable segment, else address zero.
fn data_start_addr(image: &ElfImage) -> u64 {
    if let Some(section) = image.section(".go.buildinfo") {
        return section.addr;
    }
    image
        .segments
        .iter()
        .find(|s| s.is_load && s.writable)
        .map(|s| s.vaddr)
        .unwrap_or(0)
}

/// Decode the version and module-info strings out of a located header.
///
/// `blob` is the slice returned by [`locate`]; the image is needed to chase
/// virtual addresses in pointer mode.
pub fn decode(image: &ElfImage, blob: &[u8]) -> Result<BuildInfo> {
    if blob.len() < BUILD_INFO_HEADER_SIZE {
        return Err(GoBinaryError::NotGoExecutable);
    }
    let flags = blob[15];

    if flags & FLAG_INLINE_STRINGS != 0 {
        let rest = blob.get(BUILD_INFO_HEADER_SIZE..).unwrap_or(&[]);
        let (version, rest) = decode_varint_string(rest);
        let (mod_info, _) = decode_varint_string(rest);
        return Ok(BuildInfo {
            go_version: String::from_utf8_lossy(version).into_owned(),
            mod_info: String::from_utf8_lossy(mod_info).into_owned(),
        });
    }

    let ptr_size = blob[14] as usize;
    if ptr_size != 4 && ptr_size != 8 {
        return Err(GoBinaryError::NotGoExecutable);
    }
    let endian = if flags & FLAG_BIG_ENDIAN != 0 {
        Endianness::Big
    } else {
        Endianness::Little
    };
    let reader = PtrReader::new(endian, ptr_size);

    let version = read_indirect_string(image, reader, blob, 16);
    if version.is_empty() {
        return Err(GoBinaryError::NoVersion);
    }

    let raw_mod = read_indirect_string(image, reader, blob, 16 + ptr_size);
    let mod_info = strip_sentinels(&raw_mod).ok_or(GoBinaryError::NoModuleSupport)?;

    Ok(BuildInfo {
        go_version: String::from_utf8_lossy(&version).into_owned(),
        mod_info: String::from_utf8_lossy(mod_info).into_owned(),
    })
}

/// Chase a pointer-mode string: header offset → string header address →
/// (data address, length) → bytes. Any short read yields the empty string.
fn read_indirect_string(
    image: &ElfImage,
    reader: PtrReader,
    blob: &[u8],
    offset: usize,
) -> Vec<u8> {
    let header_addr = match reader.read_ptr(blob, offset) {
        Some(addr) => addr,
        None => return Vec::new(),
    };

    let header = match image.segment_read(header_addr, 2 * reader.ptr_size) {
        Some(bytes) if bytes.len() >= 2 * reader.ptr_size => bytes,
        _ => return Vec::new(),
    };
    let data_addr = match reader.read_ptr(header, 0) {
        Some(addr) => addr,
        None => return Vec::new(),
    };
    let len = match reader.read_ptr(header, reader.ptr_size) {
        Some(len) => len as usize,
        None => return Vec::new(),
    };

    match image.segment_read(data_addr, len) {
        Some(bytes) if bytes.len() == len => bytes.to_vec(),
        _ => Vec::new(),
    }
}

/// In pointer mode the module info is wrapped in 16-byte magic markers; the
/// byte 17 from the end must be the blob's trailing newline. Returns the
/// payload between the markers, or `None` when the shape doesn't hold.
fn strip_sentinels(raw: &[u8]) -> Option<&[u8]> {
    if raw.len() >= 33 && raw[raw.len() - 17] == b'\n' {
        Some(&raw[16..raw.len() - 16])
    } else {
        None
    }
}

/// Decode one varint-length-prefixed string, returning the payload and the
/// remainder of the slice. A truncated varint or a length running past the
/// slice yields an empty payload and an empty remainder.
fn decode_varint_string(data: &[u8]) -> (&[u8], &[u8]) {
    let (len, consumed) = match read_uvarint(data) {
        Some(decoded) => decoded,
        None => return (&[], &[]),
    };
    let start = consumed;
    let end = match start.checked_add(len as usize) {
        Some(end) if end <= data.len() => end,
        _ => return (&[], &[]),
    };
    (&data[start..end], &data[end..])
}

/// Decode a base-128 LEB128 varint: 7 data bits per byte, MSB continuation,
/// little-endian groups. Returns the value and the byte count consumed, or
/// `None` on truncation or u64 overflow.
pub(crate) fn read_uvarint(data: &[u8]) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    for (i, &byte) in data.iter().enumerate() {
        if i == 10 {
            return None;
        }
        if byte < 0x80 {
            if i == 9 && byte > 1 {
                return None;
            }
            return Some((value | (u64::from(byte) << shift), i + 1));
        }
        value |= u64::from(byte & 0x7f) << shift;
        shift += 7;
    }
    None
}
