//! `chroma` launcher shim.
//!
//! Finds (or installs) the native Chroma CLI and runs it with this process's
//! arguments, exiting with the child's exit code.

use chroma::launcher::{BinaryLocator, Launcher, Platform, ScriptInstaller};
use colored::Colorize;

fn main() {
    // Stay silent unless asked: stdout and stderr belong to the child.
    if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .without_time()
            .init();
    }

    let args: Vec<_> = std::env::args_os().skip(1).collect();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{} failed to create async runtime: {e}", "error:".red().bold());
            std::process::exit(1);
        }
    };

    let launcher = Launcher::new(
        BinaryLocator::from_env(),
        ScriptInstaller::new(Platform::current()),
    );

    match runtime.block_on(launcher.run(args)) {
        Ok(outcome) => std::process::exit(outcome.exit_code()),
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            if let Some(hint) = e.hint() {
                eprintln!("  {hint}");
            }
            std::process::exit(1);
        }
    }
}
