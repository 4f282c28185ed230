//! JSON artifacts: the collected URL list, the product feed and run stats.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::models::{CollectedUrlSet, ProductRecord};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("URL list not found at {0}; run `storefeed collect` first")]
    UrlListMissing(PathBuf),

    #[error("URL list at {path} is not a JSON array of strings: {reason}")]
    UrlListInvalid { path: PathBuf, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

async fn write_text(path: &Path, contents: &str) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(io_error(parent))?;
    }
    tokio::fs::write(path, contents).await.map_err(io_error(path))
}

/// Write the URL set as a sorted, 2-space indented JSON array.
pub async fn write_url_list(path: &Path, urls: &CollectedUrlSet) -> Result<(), StorageError> {
    write_text(path, &urls.to_json_pretty()?).await?;
    info!("Wrote {} URLs to {}", urls.len(), path.display());
    Ok(())
}

/// Read the URL list written by the collector.
pub async fn read_url_list(path: &Path) -> Result<Vec<String>, StorageError> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StorageError::UrlListMissing(path.to_path_buf()))
        }
        Err(e) => return Err(io_error(path)(e)),
    };

    serde_json::from_str::<Vec<String>>(&contents).map_err(|e| StorageError::UrlListInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Overwrite the feed with `records`. An empty feed is not written.
///
/// Returns whether the file was written.
pub async fn write_feed(path: &Path, records: &[ProductRecord]) -> Result<bool, StorageError> {
    if records.is_empty() {
        info!("No products extracted; leaving {} untouched", path.display());
        return Ok(false);
    }
    write_json(path, &records).await?;
    info!("Wrote {} products to {}", records.len(), path.display());
    Ok(true)
}

/// Write any serializable value as pretty JSON.
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    write_text(path, &serde_json::to_string_pretty(value)?).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn url_list_round_trip_creates_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("product_data").join("product_links.json");
        let urls: CollectedUrlSet = ["https://b/x-p-2", "https://a/đèn-p-1", "https://b/x-p-2"]
            .into_iter()
            .map(String::from)
            .collect();

        write_url_list(&path, &urls).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "[\n  \"https://a/đèn-p-1\",\n  \"https://b/x-p-2\"\n]");
        assert_eq!(
            read_url_list(&path).await.unwrap(),
            vec!["https://a/đèn-p-1", "https://b/x-p-2"]
        );
    }

    #[tokio::test]
    async fn missing_url_list_is_reported() {
        let dir = tempdir().unwrap();
        let err = read_url_list(&dir.path().join("nope.json")).await.unwrap_err();
        assert!(matches!(err, StorageError::UrlListMissing(_)));
    }

    #[tokio::test]
    async fn url_list_must_be_array_of_strings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("links.json");

        for bad in ["{\"a\": 1}", "[1, 2]", "not json"] {
            std::fs::write(&path, bad).unwrap();
            let err = read_url_list(&path).await.unwrap_err();
            assert!(matches!(err, StorageError::UrlListInvalid { .. }), "{}", bad);
        }
    }

    #[tokio::test]
    async fn empty_feed_is_not_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("products.json");
        assert!(!write_feed(&path, &[]).await.unwrap());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn feed_is_overwritten_and_keeps_unicode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("products.json");
        std::fs::write(&path, "stale").unwrap();

        let record = ProductRecord {
            name: Some("Phích nước".to_string()),
            sku: Some("PN-1".to_string()),
            ..Default::default()
        };
        assert!(write_feed(&path, &[record]).await.unwrap());

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Phích nước"));
        let parsed: Vec<ProductRecord> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed[0].sku.as_deref(), Some("PN-1"));
    }
}
