//! Parsing the textual module-info blob.
//!
//! The blob is newline-separated records of tab-separated fields:
//!
//! ```text
//! path<TAB>cmd/x
//! mod<TAB>example.com/a<TAB>v1.0.0<TAB>h1:...
//! dep<TAB>example.com/b<TAB>v2.1.0<TAB>h1:...
//! =><TAB>example.com/b-fork<TAB>v2.1.1<TAB>h1:...
//! ```
//!
//! Binaries built from the Go distribution itself (cmd/vet, gofmt, ...)
//! carry no `mod` record; their name is synthesized from the `path`
//! directive instead.

use tracing::debug;

use crate::types::Module;

const DIRECTIVE_MOD: &str = "mod";
const GO_DISTRIBUTION_PREFIX: &str = "go-distribution@";

/// Split the module-info blob into the binary name and its module list.
///
/// The main module, when present, is the first entry of the returned list.
/// Dependency and replacement records both contribute name/version pairs;
/// records missing either field are skipped.
pub fn parse(mod_info: &str) -> (String, Vec<Module>) {
    let lines: Vec<&str> = mod_info.split('\n').collect();

    let path_directive = field(&lines, 0, 1);
    let mut modules = Vec::new();

    let name = if field(&lines, 1, 0) == DIRECTIVE_MOD {
        let main_name = field(&lines, 1, 1);
        modules.push(Module::new(main_name, field(&lines, 1, 2)));
        main_name.to_string()
    } else {
        // No main module record: a binary from the Go distribution itself.
        format!("{GO_DISTRIBUTION_PREFIX}{path_directive}")
    };

    for line in lines.iter().skip(2) {
        let mut fields = line.split('\t');
        let _directive = fields.next();
        let dep_name = fields.next().unwrap_or("");
        let dep_version = fields.next().unwrap_or("");
        if dep_name.is_empty() || dep_version.is_empty() {
            continue;
        }
        modules.push(Module::new(dep_name, dep_version));
    }

    debug!(name = %name, modules = modules.len(), "parsed module info");
    (name, modules)
}

/// Field `index` of line `line`, or `""` when either is absent.
fn field<'a>(lines: &[&'a str], line: usize, index: usize) -> &'a str {
    lines
        .get(line)
        .and_then(|l| l.split('\t').nth(index))
        .unwrap_or("")
}
