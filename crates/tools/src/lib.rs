//! Reference tool providers for reagent.
//!
//! Two families back the ReAct loop out of the box: arithmetic
//! ([`math_tools`]) and workspace-confined file access
//! ([`filesystem_tools`]).

pub mod filesystem;
pub mod math;

use reagent_config::ToolsConfig;
use reagent_core::error::{Error, Result};
use reagent_core::tool::{ToolDispatch, ToolProvider};
use std::sync::Arc;

pub use filesystem::{Workspace, filesystem_tools};
pub use math::math_tools;

/// Build the dispatch with every built-in provider.
///
/// Fails when the workspace root does not exist.
pub fn default_dispatch(config: &ToolsConfig) -> Result<ToolDispatch> {
    let filesystem = filesystem_tools(&config.workspace_root).map_err(|e| Error::Config {
        message: format!(
            "Workspace root '{}' is not usable: {e}",
            config.workspace_root.display()
        ),
    })?;

    let providers: Vec<Arc<dyn ToolProvider>> = vec![Arc::new(math_tools()), Arc::new(filesystem)];
    Ok(ToolDispatch::new(providers, config.max_response_length)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(root: &std::path::Path) -> ToolsConfig {
        ToolsConfig {
            max_response_length: 6000,
            workspace_root: root.to_path_buf(),
        }
    }

    #[test]
    fn default_dispatch_registers_both_families() {
        let dir = TempDir::new().unwrap();
        let dispatch = default_dispatch(&config(dir.path())).unwrap();
        let names = dispatch.names();
        assert_eq!(names.len(), 10);
        assert!(names.contains(&"add"));
        assert!(names.contains(&"createDirectory"));
    }

    #[tokio::test]
    async fn long_file_content_is_truncated() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("big.txt"), "x".repeat(10_000)).unwrap();

        let mut cfg = config(dir.path());
        cfg.max_response_length = 100;
        let dispatch = default_dispatch(&cfg).unwrap();

        let out = dispatch
            .execute("readFile", serde_json::json!({"filePath": "big.txt"}))
            .await
            .unwrap();
        assert!(out.contains("[content truncated,"));
        assert!(out.chars().count() < 200);
    }

    #[test]
    fn missing_workspace_is_a_config_error() {
        let err = default_dispatch(&config(std::path::Path::new("/no/such/workspace"))).err().unwrap();
        assert!(matches!(err, Error::Config { .. }));
    }
}
