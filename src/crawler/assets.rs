//! Asset handoff
//!
//! The writer hands every asset URL of a committed card to an `AssetStore`.
//! `FsAssetStore` downloads them into `<dir>/<card id>/<role>.<ext>`.

use crate::card::AssetRole;
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while storing an asset
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for card art referenced by a record
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Stores one asset
    ///
    /// # Arguments
    ///
    /// * `card_id` - Identifier of the card the asset belongs to
    /// * `role` - What the image is (background, character, ...)
    /// * `url` - Absolute URL of the image
    async fn store_asset(&self, card_id: &str, role: AssetRole, url: &str)
        -> Result<(), AssetError>;
}

/// Downloads assets onto the local filesystem
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    client: Client,
    root: PathBuf,
}

impl FsAssetStore {
    pub fn new(client: Client, root: impl Into<PathBuf>) -> Self {
        Self {
            client,
            root: root.into(),
        }
    }

    /// Target path of an asset: `<root>/<card id>/<role>.<ext>`
    pub fn asset_path(&self, card_id: &str, role: AssetRole, url: &str) -> PathBuf {
        self.root
            .join(card_id)
            .join(format!("{}.{}", role.as_str(), extension(url)))
    }
}

/// File extension of the URL's last path segment, `png` when it has none
fn extension(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next().unwrap_or(path);
    match Path::new(file).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() && ext.len() <= 5 => ext.to_ascii_lowercase(),
        _ => "png".to_string(),
    }
}

async fn is_present(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

#[async_trait]
impl AssetStore for FsAssetStore {
    async fn store_asset(
        &self,
        card_id: &str,
        role: AssetRole,
        url: &str,
    ) -> Result<(), AssetError> {
        let target = self.asset_path(card_id, role, url);
        if is_present(&target).await {
            tracing::debug!("Asset {} already present", target.display());
            return Ok(());
        }

        let download_error = |reason: String| AssetError::Download {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| download_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(download_error(format!("HTTP {}", response.status())));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_error(e.to_string()))?;
        if bytes.is_empty() {
            return Err(download_error("empty body".to_string()));
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Written under a temporary name so a partial download never counts as present
        let partial = target.with_extension("part");
        tokio::fs::write(&partial, &bytes).await?;
        tokio::fs::rename(&partial, &target).await?;

        tracing::debug!("Stored {} for card {}", role, card_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_extension() {
        assert_eq!(extension("https://x/card_1_bg.PNG"), "png");
        assert_eq!(extension("https://x/a/b.webp?v=3"), "webp");
        assert_eq!(extension("https://x/a/noext"), "png");
    }

    #[tokio::test]
    async fn test_store_and_skip_existing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/card_1_character.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = FsAssetStore::new(Client::new(), dir.path());
        let url = format!("{}/card_1_character.png", server.uri());

        store.store_asset("1", AssetRole::Character, &url).await.unwrap();
        let target = dir.path().join("1").join("character.png");
        assert_eq!(std::fs::read(&target).unwrap(), vec![1u8, 2, 3]);

        // Second call finds the file and does not download again
        store.store_asset("1", AssetRole::Character, &url).await.unwrap();
    }

    #[tokio::test]
    async fn test_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = FsAssetStore::new(Client::new(), dir.path());
        let err = store
            .store_asset("1", AssetRole::Background, &format!("{}/bg.png", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, AssetError::Download { .. }));
        assert!(!dir.path().join("1").join("background.png").exists());
    }
}
