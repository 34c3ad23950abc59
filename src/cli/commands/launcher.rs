//! `locate` and `install` command implementations.

use crate::error::{Error, Result};
use crate::launcher::{BinaryLocator, Installer, Platform, ScriptInstaller};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct LocateOutput {
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
    searched: Vec<PathBuf>,
}

#[derive(Serialize)]
struct InstallOutput {
    installed: bool,
    path: PathBuf,
}

/// Print where the Chroma CLI is installed.
///
/// # Errors
///
/// Returns [`Error::BinaryNotFound`] when no candidate exists.
pub fn execute_locate(json: bool) -> Result<()> {
    let locator = BinaryLocator::from_env();
    let path = locator.find();

    if json {
        let output = LocateOutput {
            found: path.is_some(),
            path: path.clone(),
            searched: locator.candidates().to_vec(),
        };
        println!("{}", serde_json::to_string(&output)?);
    }

    match path {
        Some(path) => {
            if !json {
                println!("{}", path.display());
            }
            Ok(())
        }
        None => Err(Error::BinaryNotFound {
            searched: locator.candidates().to_vec(),
        }),
    }
}

/// Install the Chroma CLI.
///
/// Does nothing if a binary is already present unless `force` is set.
///
/// # Errors
///
/// Returns the installer's error, or [`Error::BinaryNotFound`] if the
/// script succeeded but no binary appeared.
pub fn execute_install(url: Option<String>, force: bool, json: bool) -> Result<()> {
    let locator = BinaryLocator::from_env();

    if !force {
        if let Some(path) = locator.find() {
            return report_install(false, path, json);
        }
    }

    let mut installer = ScriptInstaller::new(Platform::current());
    if let Some(url) = url {
        installer = installer.with_url(url);
    }

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))?;
    rt.block_on(installer.install())?;

    let path = locator.find().ok_or_else(|| Error::BinaryNotFound {
        searched: locator.candidates().to_vec(),
    })?;
    report_install(true, path, json)
}

fn report_install(installed: bool, path: PathBuf, json: bool) -> Result<()> {
    if json {
        let output = InstallOutput { installed, path };
        println!("{}", serde_json::to_string(&output)?);
    } else if installed {
        println!("{} Installed Chroma CLI at {}", "✓".green(), path.display());
    } else {
        println!("Chroma CLI already installed at {}", path.display());
        println!("Use --force to reinstall.");
    }
    Ok(())
}
