//! Chroma CLI installation.

use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};

use super::Platform;

pub const INSTALL_SCRIPT_URL_POSIX: &str =
    "https://raw.githubusercontent.com/chroma-core/chroma/main/rust/cli/install/install.sh";
pub const INSTALL_SCRIPT_URL_WINDOWS: &str =
    "https://raw.githubusercontent.com/chroma-core/chroma/main/rust/cli/install/install.ps1";

/// Installs the Chroma CLI binary.
pub trait Installer: Send + Sync {
    fn install(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Downloads the official install script and runs it with inherited stdio.
#[derive(Debug, Clone)]
pub struct ScriptInstaller {
    platform: Platform,
    url: String,
}

impl ScriptInstaller {
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            url: platform.install_script_url().to_string(),
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn download(&self) -> Result<String> {
        debug!(url = %self.url, "Downloading install script");

        let client = reqwest::Client::builder()
            .user_agent(concat!("chroma-rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::InstallFailed(format!("could not create HTTP client: {e}")))?;

        let response = client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::InstallFailed(format!("could not download {}: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::InstallFailed(format!(
                "could not download {}: HTTP {status}",
                self.url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::InstallFailed(format!("could not read install script: {e}")))
    }

    fn command(&self, script: &Path) -> Command {
        let mut cmd = match self.platform {
            Platform::Posix => {
                let mut cmd = Command::new("bash");
                cmd.arg(script);
                cmd
            }
            Platform::Windows => {
                let mut cmd = Command::new("powershell");
                cmd.args(["-NoProfile", "-ExecutionPolicy", "Bypass", "-File"]).arg(script);
                cmd
            }
        };
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        cmd
    }
}

impl Installer for ScriptInstaller {
    async fn install(&self) -> Result<()> {
        info!(url = %self.url, "Installing Chroma CLI");
        let script = self.download().await?;

        let path = std::env::temp_dir().join(format!(
            "chroma-install-{}.{}",
            Uuid::new_v4(),
            self.platform.script_extension()
        ));
        tokio::fs::write(&path, script).await?;

        let status = self.command(&path).status().await;

        if let Err(e) = tokio::fs::remove_file(&path).await {
            debug!(path = %path.display(), error = %e, "Could not remove install script");
        }

        let status = status.map_err(|e| Error::InstallFailed(format!("could not run installer: {e}")))?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::InstallFailed(format!("installer exited with {status}")))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn serve_script(server: &MockServer, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path("/install.sh"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .expect(1)
            .mount(server)
            .await;
    }

    fn installer(server: &MockServer) -> ScriptInstaller {
        ScriptInstaller::new(Platform::Posix).with_url(format!("{}/install.sh", server.uri()))
    }

    #[tokio::test]
    async fn test_successful_script() {
        let server = MockServer::start().await;
        serve_script(&server, 200, "exit 0\n").await;
        installer(&server).install().await.unwrap();
    }

    #[tokio::test]
    async fn test_failing_script() {
        let server = MockServer::start().await;
        serve_script(&server, 200, "exit 3\n").await;
        let err = installer(&server).install().await.unwrap_err();
        assert!(matches!(err, Error::InstallFailed(_)));
        assert_eq!(err.exit_code(), 5);
    }

    #[tokio::test]
    async fn test_download_failure() {
        let server = MockServer::start().await;
        serve_script(&server, 404, "not found").await;
        let err = installer(&server).install().await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_default_urls() {
        assert!(ScriptInstaller::new(Platform::Posix).url().ends_with("install.sh"));
        assert!(ScriptInstaller::new(Platform::Windows).url().ends_with("install.ps1"));
    }
}
