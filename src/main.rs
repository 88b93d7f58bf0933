//! gobindeps - Go binary dependency extraction CLI
//!
//! Recover modules, packages and a dependency graph from a compiled Go ELF
//! binary.

use anyhow::Result;
use clap::Parser;
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gobindeps")]
#[command(
    author,
    version,
    about = "Extract module and package dependencies from Go binaries"
)]
#[command(long_about = "
gobindeps reads the build-info blob and the pcln table out of a compiled
Go ELF binary and reconstructs the modules and packages compiled into it,
without needing go.mod, sources, or the Go toolchain.

EXAMPLES:
    gobindeps ./server               # modules and their packages
    gobindeps --modules ./server     # module list only
    gobindeps --json ./server        # dependency graph as JSON
    gobindeps --files ./server       # raw pcln source file list
")]
struct Cli {
    /// Target Go binary to analyze
    #[arg(required = true)]
    target: String,

    /// Output the dependency graph as JSON
    #[arg(long)]
    json: bool,

    /// List modules only, without per-package detail
    #[arg(long)]
    modules: bool,

    /// Dump the source file paths from the pcln table and exit
    #[arg(long)]
    files: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let path = Path::new(&cli.target);
    if !path.exists() {
        anyhow::bail!("File does not exist: {}", cli.target);
    }

    let data = fs::read(path)?;

    if cli.files {
        for file in gobindeps::go_source_files(&data)? {
            println!("{}", file);
        }
        return Ok(());
    }

    let binary = gobindeps::parse_go_binary(&data)?;

    if cli.json {
        let graph = gobindeps::emit_dep_graph(&binary);
        println!("{}", serde_json::to_string_pretty(&graph)?);
        return Ok(());
    }

    println!("{} ({})", binary.name, binary.go_version);
    for module in &binary.modules {
        println!("  {}", module.full_name());
        if cli.modules {
            continue;
        }
        for package in &module.packages {
            println!("    {}", package);
        }
    }

    Ok(())
}
