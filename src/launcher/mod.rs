//! Chroma CLI launcher.
//!
//! The `chroma` binary shipped by this crate is a shim: it finds the native
//! Chroma CLI on disk, installs it with the official install script when it
//! is missing, then runs it with the shim's arguments and forwards its exit
//! code.
//!
//! ```text
//! search ──found──▶ exec
//!   │
//!   └─missing──▶ install ──▶ search ──found──▶ exec
//!                              │
//!                              └─missing──▶ BinaryNotFound
//! ```

pub mod exec;
pub mod install;

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};

pub use exec::{exec_binary, ExitOutcome, INTERRUPTED_EXIT_CODE};
pub use install::{Installer, ScriptInstaller, INSTALL_SCRIPT_URL_POSIX, INSTALL_SCRIPT_URL_WINDOWS};

/// Environment variable naming an explicit CLI binary; searched first.
pub const CLI_PATH_ENV: &str = "CHROMA_CLI_PATH";

/// Install layout family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Posix,
    Windows,
}

impl Platform {
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(windows) { Self::Windows } else { Self::Posix }
    }

    #[must_use]
    pub const fn binary_name(self) -> &'static str {
        match self {
            Self::Posix => "chroma",
            Self::Windows => "chroma.exe",
        }
    }

    #[must_use]
    pub const fn install_script_url(self) -> &'static str {
        match self {
            Self::Posix => INSTALL_SCRIPT_URL_POSIX,
            Self::Windows => INSTALL_SCRIPT_URL_WINDOWS,
        }
    }

    #[must_use]
    pub const fn script_extension(self) -> &'static str {
        match self {
            Self::Posix => "sh",
            Self::Windows => "ps1",
        }
    }
}

/// Ordered list of places the CLI binary may live.
#[derive(Debug, Clone, Default)]
pub struct BinaryLocator {
    candidates: Vec<PathBuf>,
    /// Never resolve to this path (the running shim).
    skip: Option<PathBuf>,
}

impl BinaryLocator {
    pub fn new(candidates: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            candidates: candidates.into_iter().collect(),
            skip: None,
        }
    }

    /// Well-known install locations for this platform, `CHROMA_CLI_PATH`
    /// first, excluding the running executable.
    #[must_use]
    pub fn from_env() -> Self {
        let locator = Self::for_platform(Platform::current(), |name| std::env::var_os(name));
        match std::env::current_exe() {
            Ok(exe) => locator.with_skip(exe),
            Err(_) => locator,
        }
    }

    /// Well-known install locations with an injectable environment lookup.
    pub fn for_platform(platform: Platform, env: impl Fn(&str) -> Option<OsString>) -> Self {
        let var = |name: &str| env(name).filter(|v| !v.is_empty()).map(PathBuf::from);
        let binary = platform.binary_name();

        let mut candidates = Vec::new();
        if let Some(explicit) = var(CLI_PATH_ENV) {
            candidates.push(explicit);
        }

        match platform {
            Platform::Posix => {
                candidates.push(Path::new("/usr/local/bin").join(binary));
                let home = var("HOME")
                    .or_else(|| directories::BaseDirs::new().map(|b| b.home_dir().to_path_buf()));
                if let Some(home) = home {
                    candidates.push(home.join(".local").join("bin").join(binary));
                }
            }
            Platform::Windows => {
                if let Some(program_files) = var("ProgramFiles") {
                    candidates.push(program_files.join("Chroma").join(binary));
                }
                if let Some(profile) = var("USERPROFILE") {
                    candidates.push(profile.join("bin").join(binary));
                }
            }
        }

        Self::new(candidates)
    }

    #[must_use]
    pub fn with_skip(mut self, path: impl Into<PathBuf>) -> Self {
        self.skip = Some(path.into());
        self
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// First candidate that exists as a file.
    pub fn find(&self) -> Option<PathBuf> {
        let skip = self.skip.as_deref().and_then(|p| p.canonicalize().ok());

        self.candidates.iter().find_map(|candidate| {
            if !candidate.is_file() {
                return None;
            }
            if skip.is_some() && candidate.canonicalize().ok() == skip {
                debug!(path = %candidate.display(), "Skipping launcher's own executable");
                return None;
            }
            Some(candidate.clone())
        })
    }
}

/// Find an installed Chroma CLI binary in the standard locations.
#[must_use]
pub fn find_chroma_cli_binary() -> Option<PathBuf> {
    BinaryLocator::from_env().find()
}

/// Locate-or-install, then run.
pub struct Launcher<I> {
    locator: BinaryLocator,
    installer: I,
}

impl<I: Installer> Launcher<I> {
    pub const fn new(locator: BinaryLocator, installer: I) -> Self {
        Self { locator, installer }
    }

    pub const fn locator(&self) -> &BinaryLocator {
        &self.locator
    }

    /// Path of the CLI binary, installing it first if necessary.
    ///
    /// # Errors
    ///
    /// Returns the installer's error, or [`Error::BinaryNotFound`] if the
    /// binary is still missing after a successful install.
    pub async fn resolve(&self) -> Result<PathBuf> {
        if let Some(path) = self.locator.find() {
            debug!(path = %path.display(), "Found Chroma CLI");
            return Ok(path);
        }

        info!("Chroma CLI not found; installing");
        self.installer.install().await?;

        self.locator.find().ok_or_else(|| Error::BinaryNotFound {
            searched: self.locator.candidates.clone(),
        })
    }

    /// Resolve the binary and run it with `args`.
    ///
    /// # Errors
    ///
    /// See [`Launcher::resolve`] and [`exec_binary`].
    pub async fn run<S: AsRef<OsStr>>(&self, args: impl IntoIterator<Item = S>) -> Result<ExitOutcome> {
        let path = self.resolve().await?;
        exec_binary(&path, args).await
    }
}
