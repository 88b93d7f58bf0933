//! Core types for Go binary dependency extraction.
//!
//! This module defines the fundamental data structures shared across the
//! analysis pipeline: module identities, the analyzed-binary aggregate, and
//! the endianness/pointer-size reader used to decode runtime structures.

use serde::Serialize;

/// A Go module identity: import-path-like name plus semantic version.
///
/// The package set is populated once, during path classification, and is
/// insertion-ordered and duplicate-free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    /// Import path of the module (e.g. `github.com/x/y`)
    pub name: String,
    /// Module version (e.g. `v1.2.3`); never contains `@`
    pub version: String,
    /// Package paths owned by this module, in discovery order
    pub packages: Vec<String>,
}

impl Module {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            packages: Vec::new(),
        }
    }

    /// The `name@version` form used in module-cache paths and graph node ids.
    pub fn full_name(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Record a package under this module, keeping the set unique.
    pub(crate) fn add_package(&mut self, package: String) {
        if !self.packages.contains(&package) {
            self.packages.push(package);
        }
    }
}

/// The analyzed Go binary: its name plus every module compiled into it.
///
/// `name` is the main module path or, for a binary shipped with the Go
/// distribution itself, `go-distribution@<path directive>`. The `@` embedding
/// cannot collide with a real module name since `@` is not a valid module
/// name character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoBinary {
    pub name: String,
    /// Toolchain version recorded in the build info (e.g. `go1.18.5`)
    pub go_version: String,
    pub modules: Vec<Module>,
}

impl GoBinary {
    /// The main module, when the binary has one (distribution binaries don't).
    pub fn main_module(&self) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == self.name)
    }
}

/// Byte order of multi-byte integers inside the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    Little,
    Big,
}

/// Reads pointer-sized integers out of raw bytes.
///
/// Chosen once at header-parse time from the pointer-size and endianness
/// bytes, then dispatched inline everywhere a runtime structure is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtrReader {
    pub endian: Endianness,
    pub ptr_size: usize,
}

impl PtrReader {
    pub fn new(endian: Endianness, ptr_size: usize) -> Self {
        Self { endian, ptr_size }
    }

    /// Read one pointer-sized unsigned integer at `offset`, widened to u64.
    ///
    /// Returns `None` when the slice is too short or the pointer size is not
    /// 4 or 8.
    pub fn read_ptr(&self, data: &[u8], offset: usize) -> Option<u64> {
        match (self.ptr_size, self.endian) {
            (4, Endianness::Little) => read_u32_le(data, offset).map(u64::from),
            (4, Endianness::Big) => read_u32_be(data, offset).map(u64::from),
            (8, Endianness::Little) => read_u64_le(data, offset),
            (8, Endianness::Big) => read_u64_be(data, offset),
            _ => None,
        }
    }

    /// Read a u32 at `offset` in this reader's byte order.
    pub fn read_u32(&self, data: &[u8], offset: usize) -> Option<u32> {
        match self.endian {
            Endianness::Little => read_u32_le(data, offset),
            Endianness::Big => read_u32_be(data, offset),
        }
    }
}

/// Safely read a u64 in little-endian from a slice at a given offset.
///
/// Returns `None` if there aren't enough bytes available.
#[inline]
fn read_u64_le(data: &[u8], offset: usize) -> Option<u64> {
    data.get(offset..offset + 8)?
        .try_into()
        .ok()
        .map(u64::from_le_bytes)
}

/// Safely read a u64 in big-endian from a slice at a given offset.
#[inline]
fn read_u64_be(data: &[u8], offset: usize) -> Option<u64> {
    data.get(offset..offset + 8)?
        .try_into()
        .ok()
        .map(u64::from_be_bytes)
}

/// Safely read a u32 in little-endian from a slice at a given offset.
#[inline]
fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset + 4)?
        .try_into()
        .ok()
        .map(u32::from_le_bytes)
}

/// Safely read a u32 in big-endian from a slice at a given offset.
#[inline]
fn read_u32_be(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset + 4)?
        .try_into()
        .ok()
        .map(u32::from_be_bytes)
}
