//! Filesystem tools confined to a workspace root.
//!
//! `readFile`, `writeFile`, `listDirectory`, `deleteFile` and
//! `createDirectory`. Relative paths resolve against the root; any path
//! that resolves outside it, or contains a `..` component, is refused.

use async_trait::async_trait;
use reagent_core::error::ToolError;
use reagent_core::tool::{Tool, ToolSet};
use serde_json::{Value, json};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// The filesystem family rooted at `root`. Fails if `root` does not exist.
pub fn filesystem_tools(root: impl AsRef<Path>) -> std::io::Result<ToolSet> {
    let workspace = Arc::new(Workspace::new(root)?);
    Ok(ToolSet::new()
        .with(ReadFileTool(Arc::clone(&workspace)))
        .with(WriteFileTool(Arc::clone(&workspace)))
        .with(ListDirectoryTool(Arc::clone(&workspace)))
        .with(DeleteFileTool(Arc::clone(&workspace)))
        .with(CreateDirectoryTool(workspace)))
}

/// A canonical directory every file operation must stay inside.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self {
            root: root.as_ref().canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `raw` to an absolute path inside the root.
    ///
    /// The longest existing prefix is canonicalized so symlinks cannot
    /// point outside; the missing tail is appended unchanged.
    pub fn resolve(&self, tool: &str, raw: &str) -> Result<PathBuf, ToolError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ToolError::invalid_arguments(tool, "path must not be empty"));
        }
        let input = Path::new(raw);
        if input.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(ToolError::execution(tool, format!("Path traversal detected in '{raw}'")));
        }

        let joined = if input.is_absolute() {
            input.to_path_buf()
        } else {
            self.root.join(input)
        };

        let mut existing = joined.as_path();
        let mut tail = Vec::new();
        while !existing.exists() {
            match (existing.file_name(), existing.parent()) {
                (Some(name), Some(parent)) => {
                    tail.push(name.to_owned());
                    existing = parent;
                }
                _ => break,
            }
        }

        let mut resolved = existing.canonicalize().map_err(|e| {
            ToolError::execution(tool, format!("Failed to resolve '{raw}': {e}"))
        })?;
        for name in tail.into_iter().rev() {
            resolved.push(name);
        }

        if !resolved.starts_with(&self.root) {
            return Err(ToolError::execution(
                tool,
                format!("Path '{raw}' is outside the workspace"),
            ));
        }
        debug!(tool, path = %resolved.display(), "Resolved workspace path");
        Ok(resolved)
    }
}

fn string_arg<'a>(tool: &str, arguments: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    arguments[key]
        .as_str()
        .ok_or_else(|| ToolError::invalid_arguments(tool, format!("Missing '{key}' argument")))
}

fn path_schema(key: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            key: { "type": "string", "description": description }
        },
        "required": [key]
    })
}

pub struct ReadFileTool(Arc<Workspace>);

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "readFile"
    }

    fn description(&self) -> &str {
        "Read the contents of a text file."
    }

    fn parameters_schema(&self) -> Value {
        path_schema("filePath", "Path of the file to read")
    }

    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let raw = string_arg(self.name(), &arguments, "filePath")?;
        let path = self.0.resolve(self.name(), raw)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::execution(self.name(), format!("Failed to read file: {e}")))?;
        Ok(format!("File content:\n{content}"))
    }
}

pub struct WriteFileTool(Arc<Workspace>);

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "writeFile"
    }

    fn description(&self) -> &str {
        "Write text to a file, creating it or replacing its contents."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filePath": { "type": "string", "description": "Path of the file to write" },
                "content": { "type": "string", "description": "Text to write" }
            },
            "required": ["filePath", "content"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let raw = string_arg(self.name(), &arguments, "filePath")?;
        let content = string_arg(self.name(), &arguments, "content")?;
        let path = self.0.resolve(self.name(), raw)?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| ToolError::execution(self.name(), format!("Failed to write file: {e}")))?;
        Ok(format!("File written: {raw}"))
    }
}

pub struct ListDirectoryTool(Arc<Workspace>);

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "listDirectory"
    }

    fn description(&self) -> &str {
        "List the entries of a directory."
    }

    fn parameters_schema(&self) -> Value {
        path_schema("directoryPath", "Path of the directory to list")
    }

    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let raw = string_arg(self.name(), &arguments, "directoryPath")?;
        let path = self.0.resolve(self.name(), raw)?;
        let read_failed =
            |e: std::io::Error| ToolError::execution("listDirectory", format!("Failed to read directory: {e}"));

        let mut dir = tokio::fs::read_dir(&path).await.map_err(read_failed)?;
        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(read_failed)? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(format!("Directory contents:\n{}", names.join("\n")))
    }
}

pub struct DeleteFileTool(Arc<Workspace>);

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &str {
        "deleteFile"
    }

    fn description(&self) -> &str {
        "Delete a file."
    }

    fn parameters_schema(&self) -> Value {
        path_schema("filePath", "Path of the file to delete")
    }

    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let raw = string_arg(self.name(), &arguments, "filePath")?;
        let path = self.0.resolve(self.name(), raw)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| ToolError::execution(self.name(), format!("Failed to delete file: {e}")))?;
        Ok(format!("File deleted: {raw}"))
    }
}

pub struct CreateDirectoryTool(Arc<Workspace>);

#[async_trait]
impl Tool for CreateDirectoryTool {
    fn name(&self) -> &str {
        "createDirectory"
    }

    fn description(&self) -> &str {
        "Create a directory, including missing parents."
    }

    fn parameters_schema(&self) -> Value {
        path_schema("directoryPath", "Path of the directory to create")
    }

    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let raw = string_arg(self.name(), &arguments, "directoryPath")?;
        let path = self.0.resolve(self.name(), raw)?;
        tokio::fs::create_dir_all(&path).await.map_err(|e| {
            ToolError::execution(self.name(), format!("Failed to create directory: {e}"))
        })?;
        Ok(format!("Directory created: {raw}"))
    }
}
