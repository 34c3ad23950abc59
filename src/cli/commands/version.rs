//! Version command implementation.

use crate::error::Result;
use crate::launcher::find_chroma_cli_binary;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct VersionOutput<'a> {
    version: &'a str,
    build: &'a str,
    local_embeddings: bool,
    chroma_cli: Option<PathBuf>,
}

/// Execute the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    let build = if cfg!(debug_assertions) {
        "dev"
    } else {
        "release"
    };
    let local_embeddings = cfg!(feature = "local");
    let chroma_cli = find_chroma_cli_binary();

    if json {
        let output = VersionOutput {
            version,
            build,
            local_embeddings,
            chroma_cli,
        };
        let payload = serde_json::to_string(&output)?;
        println!("{payload}");
        return Ok(());
    }

    println!("chroma-embed version {version} ({build})");
    if !local_embeddings {
        println!("  local embeddings: not compiled (rebuild with --features local)");
    }
    match chroma_cli {
        Some(path) => println!("  chroma CLI: {}", path.display()),
        None => println!("  chroma CLI: not installed"),
    }
    Ok(())
}
