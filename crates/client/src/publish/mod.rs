//! Mirror & publish via the external rclone sync tool.
//!
//! Two subprocess invocations per publish: stream the bytes into
//! `rclone rcat <remote>:<folder>/<filename>`, then mint a shareable
//! URL with `rclone link` for the same destination. Bytes are piped
//! straight into rclone's stdin; nothing touches local disk.

use std::process::Stdio;

use linkmirror_core::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Publishes a captured resource and mints a public link for it.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    /// Upload `bytes` under `filename` and return the public link.
    async fn publish(&self, filename: &str, bytes: Vec<u8>) -> Result<String, Error>;
}

/// rclone-backed publisher.
///
/// The remote must already be configured in rclone; this code only
/// addresses it as `<remote>:<folder>/<filename>`.
#[derive(Debug, Clone)]
pub struct RclonePublisher {
    remote: String,
    folder: String,
}

impl RclonePublisher {
    pub fn new(remote: impl Into<String>, folder: impl Into<String>) -> Self {
        let folder = folder.into().trim_end_matches('/').to_string();
        Self { remote: remote.into(), folder }
    }

    /// Destination path in rclone's `remote:folder/filename` syntax.
    fn destination(&self, filename: &str) -> String {
        format!("{}:{}/{}", self.remote, self.folder, filename)
    }
}

#[async_trait::async_trait]
impl Publisher for RclonePublisher {
    async fn publish(&self, filename: &str, bytes: Vec<u8>) -> Result<String, Error> {
        let destination = self.destination(filename);

        tracing::info!(%destination, size = bytes.len(), "streaming resource to remote");

        let mut child = Command::new("rclone")
            .args(["rcat", &destination])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Publish(format!("failed to spawn rclone rcat: {e}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Publish("rclone rcat stdin unavailable".into()))?;
        stdin
            .write_all(&bytes)
            .await
            .map_err(|e| Error::Publish(format!("failed to stream bytes to rclone: {e}")))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Error::Publish(format!("rclone rcat did not complete: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Publish(format!("rclone rcat failed: {}", stderr.trim())));
        }

        let output = Command::new("rclone")
            .args(["link", &destination])
            .output()
            .await
            .map_err(|e| Error::Publish(format!("failed to spawn rclone link: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Publish(format!("rclone link failed: {}", stderr.trim())));
        }

        let link = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if link.is_empty() {
            return Err(Error::Publish("rclone link produced no output".into()));
        }

        tracing::info!(%destination, %link, "resource published");
        Ok(link)
    }
}
