//! # gobindeps - dependency extraction from compiled Go binaries
//!
//! This library reconstructs module and package dependency information from
//! a Go ELF executable without any source or build context: which main
//! module the binary was built from, the transitive module list with
//! versions, and the set of source packages compiled in, emitted as a
//! dependency graph keyed by `package@version`.
//!
//! ## Background
//!
//! The Go linker embeds two structures this analysis relies on:
//!
//! - the **build-info blob**, a fixed-layout structure in the data region
//!   carrying the toolchain version and the textual module graph, and
//! - the **pcln table** (`.gopclntab`), the runtime's program-counter line
//!   table, whose file-name table lists every source path compiled in.
//!
//! Modules come from the first; packages are recovered by attributing the
//! second's file paths back onto the module list, inferring along the way
//! whether the binary was built from the module cache, from a `vendor/`
//! tree, or with `-trimpath`.
//!
//! ## Usage
//!
//! ```no_run
//! let data = std::fs::read("my_go_binary").unwrap();
//! let graph = gobindeps::analyze(&data).unwrap();
//!
//! for node in &graph.nodes {
//!     println!("{}", node.node_id);
//! }
//! ```

mod buildinfo;
mod classify;
mod depgraph;
mod error;
mod image;
mod modinfo;
mod pclntab;
mod types;

pub use depgraph::{
    emit_dep_graph, DepGraph, DepGraphBuilder, GraphNode, PkgInfo, GOMODULES_PKG_MANAGER,
    ROOT_NODE_ID,
};
pub use error::{GoBinaryError, Result};
pub use image::{ElfImage, Section, Segment};
pub use pclntab::LineTable;
pub use types::{Endianness, GoBinary, Module, PtrReader};

pub use goblin;

use tracing::debug;

const PCLNTAB_SECTION: &str = ".gopclntab";
const BUILD_INFO_SECTION: &str = ".go.buildinfo";

/// Check whether raw bytes look like a Go ELF binary, by presence of the
/// Go-specific sections.
pub fn is_go_binary(data: &[u8]) -> bool {
    match goblin::elf::Elf::parse(data) {
        Ok(elf) => elf.section_headers.iter().any(|sh| {
            let name = elf.shdr_strtab.get_at(sh.sh_name).unwrap_or("");
            name == PCLNTAB_SECTION || name == BUILD_INFO_SECTION
        }),
        Err(_) => false,
    }
}

/// Analyze raw ELF bytes into the binary's module and package structure.
pub fn parse_go_binary(data: &[u8]) -> Result<GoBinary> {
    let image = ElfImage::parse(data)?;
    analyze_image(&image)
}

/// Analyze raw ELF bytes and emit the dependency graph.
pub fn analyze(data: &[u8]) -> Result<DepGraph> {
    let binary = parse_go_binary(data)?;
    Ok(emit_dep_graph(&binary))
}

/// The source file paths recorded in the binary's pcln table, in table
/// order.
pub fn go_source_files(data: &[u8]) -> Result<Vec<String>> {
    let image = ElfImage::parse(data)?;
    let section = image
        .section(PCLNTAB_SECTION)
        .ok_or(GoBinaryError::NoPclnTab)?;
    LineTable::new(section.data)?.files()
}

/// Run the full analysis pipeline over an already-resolved ELF image.
///
/// A binary with a stripped pcln table is rejected up front; there is no
/// modules-only fallback.
pub fn analyze_image(image: &ElfImage) -> Result<GoBinary> {
    let pcln_section = image
        .section(PCLNTAB_SECTION)
        .ok_or(GoBinaryError::NoPclnTab)?;

    let header = buildinfo::locate(image)?;
    let info = buildinfo::decode(image, header)?;
    if info.mod_info.is_empty() {
        return Err(GoBinaryError::EmptyModuleInfo);
    }
    debug!(go_version = %info.go_version, "decoded build info");

    let (name, mut modules) = modinfo::parse(&info.mod_info);

    let files = LineTable::new(pcln_section.data)?.files()?;
    debug!(files = files.len(), "extracted pcln file table");

    classify::attribute_packages(&mut modules, &files)?;

    Ok(GoBinary {
        name,
        go_version: info.go_version,
        modules,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_go_binary_rejects_garbage() {
        assert!(!is_go_binary(&[]));
        assert!(!is_go_binary(b"not a valid binary format"));
    }

    #[test]
    fn test_analyze_image_requires_pclntab() {
        let image = ElfImage::default();
        assert!(matches!(
            analyze_image(&image),
            Err(GoBinaryError::NoPclnTab)
        ));
    }
}
