//! Attributing source file paths back to their modules.
//!
//! The pcln table yields every source path compiled into the binary, but
//! which module a path belongs to depends on how the binary was built:
//!
//! - **module cache**: absolute paths embedding `name@version`
//!   (`/root/go/pkg/mod/example.com/b@v2.1.0/x/y.go`)
//! - **vendored**: absolute paths under the main module's `vendor/` subtree
//!   (`/app/vendor/example.com/b/x/y.go`)
//! - **trimpath**: relative paths with the filesystem roots erased
//!   (`example.com/b@v2.1.0/x/y.go`)
//!
//! The build mode is inferred from the path shapes, then each file is
//! stripped of its build prefix and matched against the module list.

use tracing::debug;

use crate::error::GoBinaryError;
use crate::types::Module;

const AUTOGENERATED: &str = "<autogenerated>";

/// Which module key a stripped path is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKey {
    /// Bare module name; vendored paths carry no version.
    Name,
    /// `name@version`; module-cache and trimpath paths embed the version.
    FullName,
}

/// Populate each module's package set from the binary's source file list.
pub fn attribute_packages(
    modules: &mut [Module],
    files: &[String],
) -> Result<(), GoBinaryError> {
    let trimmed = is_trimmed(files);
    let (vendor, cache) = if trimmed {
        (None, None)
    } else {
        (vendor_prefix(modules, files), module_cache_prefix(modules, files))
    };
    debug!(trimmed, ?vendor, ?cache, "derived build prefixes");

    for file in files {
        if file == AUTOGENERATED {
            continue;
        }
        if !file.ends_with(".go") {
            continue;
        }
        let Some((stripped, key)) =
            strip_build_prefix(file, vendor.as_deref(), cache.as_deref())
        else {
            // Outside every known prefix: Go standard library source.
            continue;
        };
        attribute_file(modules, stripped, key, file)?;
    }
    Ok(())
}

/// A build is path-trimmed iff every file path is relative.
fn is_trimmed(files: &[String]) -> bool {
    files.iter().all(|f| !f.starts_with('/'))
}

/// The shared directory the module cache lives under, derived from the
/// first file embedding some module's `/name@version`.
fn module_cache_prefix(modules: &[Module], files: &[String]) -> Option<String> {
    for module in modules {
        let needle = format!("/{}", module.full_name());
        for file in files {
            if let Some(idx) = file.find(&needle) {
                return Some(file[..idx + 1].to_string());
            }
        }
    }
    None
}

/// The main module's `vendor/` directory, derived from a file lying under
/// `vendor/<module name>/` and confirmed by a sibling file sharing the same
/// root but living outside that vendor subtree.
fn vendor_prefix(modules: &[Module], files: &[String]) -> Option<String> {
    for module in modules {
        let needle = format!("vendor/{}/", module.name);
        for file in files {
            let Some(idx) = file.find(&needle) else {
                continue;
            };
            let root = &file[..idx];
            let subtree = format!("{root}{needle}");
            let confirmed = files.iter().any(|other| {
                other != file && other.starts_with(root) && !other.starts_with(&subtree)
            });
            if confirmed {
                return Some(format!("{root}vendor/"));
            }
        }
    }
    None
}

/// Strip the applicable build prefix off a file path and pick the key kind
/// it should be matched with. `None` means the file is claimed by no known
/// root and is skipped.
fn strip_build_prefix<'f>(
    file: &'f str,
    vendor: Option<&str>,
    cache: Option<&str>,
) -> Option<(&'f str, MatchKey)> {
    if let Some(vendor) = vendor {
        if let Some(rest) = file.strip_prefix(vendor) {
            return Some((rest, MatchKey::Name));
        }
    }
    if let Some(cache) = cache {
        if let Some(rest) = file.strip_prefix(cache) {
            return Some((rest, MatchKey::FullName));
        }
    }
    if vendor.is_none() && cache.is_none() {
        // Trimpath build: paths are already module-relative.
        return Some((file, MatchKey::FullName));
    }
    None
}

/// Match a stripped path against the module list and record the package.
///
/// When several module keys prefix the path the longest one wins, so a
/// package lands under the most specific module. A matched path must split
/// as exactly `"" + key + relative`; anything else means the path layout
/// contradicts the module list and the analysis aborts.
fn attribute_file(
    modules: &mut [Module],
    stripped: &str,
    key: MatchKey,
    original: &str,
) -> Result<(), GoBinaryError> {
    let mut best: Option<(usize, String)> = None;
    for (idx, module) in modules.iter().enumerate() {
        let candidate = match key {
            MatchKey::Name => module.name.clone(),
            MatchKey::FullName => module.full_name(),
        };
        if !stripped.starts_with(&candidate) {
            continue;
        }
        if best
            .as_ref()
            .map_or(true, |(_, k)| candidate.len() > k.len())
        {
            best = Some((idx, candidate));
        }
    }
    let Some((idx, matched_key)) = best else {
        return Ok(());
    };

    let parts: Vec<&str> = stripped.split(matched_key.as_str()).collect();
    if parts.len() != 2 || !parts[0].is_empty() {
        return Err(GoBinaryError::FileNameClassification {
            file: original.to_string(),
            module: modules[idx].name.clone(),
        });
    }

    let package = format!("{}{}", modules[idx].name, parent_dir(parts[1]));
    modules[idx].add_package(package);
    Ok(())
}

/// Parent directory of a module-relative path; a bare file at the module
/// root yields the empty string.
fn parent_dir(relative: &str) -> &str {
    match relative.rfind('/') {
        None | Some(0) => "",
        Some(idx) => &relative[..idx],
    }
}
