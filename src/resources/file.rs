//! File resources backed by the data directory.
//!
//! `file://data` reads as a JSON listing of the directory; `file://data/<path>`
//! reads a single file below it. Paths are percent-decoded and may not leave
//! the data directory.

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::mcp::handler::ResourceProvider;
use crate::mcp::protocol::{Resource, ResourceContents};
use crate::tools::file_operation::{describe_entry, safe_join, MAX_FILE_SIZE};

/// Root URI of the provider.
pub const ROOT_URI: &str = "file://data";

/// Decode the relative path of a `file://data/...` URI.
///
/// Returns `None` for URIs outside the provider's namespace, and an empty
/// string for the root itself.
fn decode_relative(uri: &str) -> Option<String> {
    let rest = uri.strip_prefix(ROOT_URI)?;
    if rest.is_empty() {
        return Some(String::new());
    }
    let rest = rest.strip_prefix('/')?;
    Some(percent_decode_str(rest).decode_utf8_lossy().into_owned())
}

/// Guess the MIME type of a file from its extension.
fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "json" => "application/json",
        "yaml" | "yml" => "text/yaml",
        "toml" => "text/x-toml",
        "md" => "text/markdown",
        "html" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "xml" => "application/xml",
        "rs" => "text/x-rust",
        "py" => "text/x-python",
        "js" => "text/javascript",
        _ => "text/plain",
    }
}

/// Resource provider for the data directory.
pub struct FileResourceProvider {
    base: PathBuf,
}

impl FileResourceProvider {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    async fn read_listing(&self) -> Result<ResourceContents> {
        tokio::fs::create_dir_all(&self.base).await?;

        let mut files = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.base).await?;
        while let Some(entry) = dir.next_entry().await? {
            files.push(describe_entry(&entry).await);
        }
        files.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));

        let listing = json!({
            "uri": ROOT_URI,
            "name": "File System Resources",
            "basePath": self.base.display().to_string(),
            "totalFiles": files.len(),
            "files": files,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        Ok(ResourceContents {
            uri: ROOT_URI.to_string(),
            mime_type: Some("application/json".to_string()),
            text: serde_json::to_string_pretty(&listing)?,
        })
    }

    async fn read_file(&self, uri: &str, relative: &str) -> Result<ResourceContents> {
        let path = safe_join(&self.base, relative)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|_| Error::ResourceNotFound(uri.to_string()))?;
        if !meta.is_file() {
            return Err(Error::ResourceNotFound(uri.to_string()));
        }
        if meta.len() > MAX_FILE_SIZE {
            return Err(Error::FileTooLarge {
                path: relative.to_string(),
                size: meta.len(),
            });
        }

        Ok(ResourceContents {
            uri: uri.to_string(),
            mime_type: Some(guess_mime_type(&path).to_string()),
            text: tokio::fs::read_to_string(&path).await?,
        })
    }
}

#[async_trait]
impl ResourceProvider for FileResourceProvider {
    fn list(&self) -> Vec<Resource> {
        vec![Resource {
            uri: ROOT_URI.to_string(),
            name: "File System Resources".to_string(),
            description: Some("Access to files and directories in the data directory".to_string()),
            mime_type: Some("application/json".to_string()),
        }]
    }

    fn can_handle(&self, uri: &str) -> bool {
        decode_relative(uri).is_some()
    }

    async fn read(&self, uri: &str) -> Result<Vec<ResourceContents>> {
        let relative =
            decode_relative(uri).ok_or_else(|| Error::ResourceNotFound(uri.to_string()))?;

        tracing::debug!("Reading file resource: {}", uri);
        let contents = if relative.is_empty() {
            self.read_listing().await?
        } else {
            self.read_file(uri, &relative).await?
        };
        Ok(vec![contents])
    }
}
