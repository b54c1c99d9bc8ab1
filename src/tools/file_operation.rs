//! File operations restricted to the data directory.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};
use crate::mcp::handler::{get_optional_string_arg, get_string_arg, json_content, ToolHandler};
use crate::mcp::protocol::{Arguments, ContentBlock, Tool};

/// Maximum file size returned by a read (1MB).
pub const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Join `relative` onto `base`, rejecting anything that could leave `base`.
pub fn safe_join(base: &Path, relative: &str) -> Result<PathBuf> {
    let mut joined = base.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::InvalidPath(format!(
                    "Path traversal attempt detected: {}",
                    relative
                )));
            }
        }
    }
    Ok(joined)
}

/// File operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOp {
    Read,
    Write,
    List,
    Exists,
    Delete,
}

impl FileOp {
    fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "list" => Ok(Self::List),
            "exists" => Ok(Self::Exists),
            "delete" => Ok(Self::Delete),
            _ => Err(Error::InvalidToolArguments(format!(
                "Unsupported operation: {}",
                s
            ))),
        }
    }
}

/// File operation tool.
pub struct FileOperationTool {
    base: PathBuf,
}

impl FileOperationTool {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    async fn read(&self, rel: &str, path: &Path) -> Result<Value> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|_| Error::FileNotFound(rel.to_string()))?;
        if !meta.is_file() {
            return Err(Error::InvalidPath(format!("Path is not a regular file: {}", rel)));
        }
        if meta.len() > MAX_FILE_SIZE {
            return Err(Error::FileTooLarge {
                path: rel.to_string(),
                size: meta.len(),
            });
        }

        let content = tokio::fs::read_to_string(path).await?;
        Ok(json!({
            "operation": "read",
            "path": rel,
            "size": meta.len(),
            "content": content,
        }))
    }

    async fn write(&self, rel: &str, path: &Path, content: &str) -> Result<Value> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await?;
        Ok(json!({
            "operation": "write",
            "path": rel,
            "size": content.len(),
            "success": true,
        }))
    }

    async fn list(&self, rel: &str, path: &Path) -> Result<Value> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|_| Error::FileNotFound(rel.to_string()))?;
        if !meta.is_dir() {
            return Err(Error::InvalidPath(format!("Path is not a directory: {}", rel)));
        }

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(path).await?;
        while let Some(entry) = dir.next_entry().await? {
            entries.push(describe_entry(&entry).await);
        }
        entries.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));

        Ok(json!({
            "operation": "list",
            "path": rel,
            "entries": entries,
        }))
    }

    async fn exists(&self, rel: &str, path: &Path) -> Result<Value> {
        let meta = tokio::fs::metadata(path).await.ok();
        Ok(json!({
            "operation": "exists",
            "path": rel,
            "exists": meta.is_some(),
            "isDirectory": meta.as_ref().is_some_and(|m| m.is_dir()),
            "isFile": meta.as_ref().is_some_and(|m| m.is_file()),
        }))
    }

    async fn delete(&self, rel: &str, path: &Path) -> Result<Value> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|_| Error::FileNotFound(rel.to_string()))?;
        if path == self.base {
            return Err(Error::InvalidPath("Refusing to delete the data directory".to_string()));
        }

        if meta.is_dir() {
            tokio::fs::remove_dir(path).await?;
        } else {
            tokio::fs::remove_file(path).await?;
        }
        Ok(json!({
            "operation": "delete",
            "path": rel,
            "deleted": true,
        }))
    }
}

/// Directory entry summary shared with the file resource listing.
pub(crate) async fn describe_entry(entry: &tokio::fs::DirEntry) -> Value {
    let meta = entry.metadata().await.ok();
    let is_dir = meta.as_ref().is_some_and(|m| m.is_dir());
    let size = match &meta {
        Some(m) if !m.is_dir() => m.len() as i64,
        Some(_) => 0,
        None => -1,
    };
    let modified = meta
        .and_then(|m| m.modified().ok())
        .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string());

    json!({
        "name": entry.file_name().to_string_lossy(),
        "type": if is_dir { "directory" } else { "file" },
        "size": size,
        "lastModified": modified,
    })
}

#[async_trait]
impl ToolHandler for FileOperationTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "file_operation".to_string(),
            description: "Perform file operations: read, write, list directory contents (restricted to data directory)".to_string(),
            input_schema: crate::tool_schema!(
                required: ["operation", "path"],
                "operation": {
                    "type": "string",
                    "description": "File operation to perform",
                    "enum": ["read", "write", "list", "exists", "delete"]
                },
                "path": {
                    "type": "string",
                    "description": "File or directory path relative to data directory"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write (for write operation)"
                }
            ),
        }
    }

    async fn execute(&self, args: Arguments) -> Result<Vec<ContentBlock>> {
        let op = FileOp::parse(&get_string_arg(&args, "operation")?)?;
        let rel = get_string_arg(&args, "path")?;
        let content = get_optional_string_arg(&args, "content").unwrap_or_default();

        let path = safe_join(&self.base, &rel)?;
        tokio::fs::create_dir_all(&self.base).await?;
        tracing::info!("File operation: {:?} on path: {}", op, path.display());

        let result = match op {
            FileOp::Read => self.read(&rel, &path).await?,
            FileOp::Write => self.write(&rel, &path, &content).await?,
            FileOp::List => self.list(&rel, &path).await?,
            FileOp::Exists => self.exists(&rel, &path).await?,
            FileOp::Delete => self.delete(&rel, &path).await?,
        };

        Ok(vec![json_content(&result)?])
    }
}
