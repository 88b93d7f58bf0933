//! Error taxonomy for Go binary analysis.
//!
//! Every failure mode of the pipeline is a distinct variant; analyses either
//! run to completion or fail with one of these. There is no partial success.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GoBinaryError {
    /// No aligned build-info magic within the scanned data region.
    #[error("not a Go executable")]
    NotGoExecutable,

    /// The decoder produced an empty module-info blob.
    #[error("no module info found in Go binary")]
    EmptyModuleInfo,

    /// The Go version string read empty in pointer mode.
    #[error("no version found")]
    NoVersion,

    /// The module-info blob failed its 16-byte sentinel check.
    #[error("binary is not built with go module support")]
    NoModuleSupport,

    /// The binary carries no `.gopclntab` section.
    #[error("no pcln table present in Go binary")]
    NoPclnTab,

    /// A source file path split against a module key with a non-empty
    /// leading component, meaning the path layout is inconsistent with the
    /// module list.
    #[error("file {file:?} does not lie cleanly under module {module:?}")]
    FileNameClassification { file: String, module: String },

    /// The pcln table header or one of its internal offsets is invalid.
    #[error("malformed pclntab: {0}")]
    MalformedPclnTab(String),

    /// The input could not be parsed as an ELF object.
    #[error(transparent)]
    Elf(#[from] goblin::error::Error),
}

pub type Result<T> = std::result::Result<T, GoBinaryError>;
