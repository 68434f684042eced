//! Policy fragments: standalone IAM policy JSON files attached inline to the role.

use std::path::Path;

use log::{debug, trace};
use serde::Serialize;

use crate::error::{BootstrapError, BootstrapResult};

/// Fixed name of the ad-hoc fragment passed with `--policy-file`
pub const CUSTOM_POLICY_NAME: &str = "CustomPolicy";

/// One inline policy: its source file name and parsed document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyFragment {
    pub name: String,
    pub document: serde_json::Value,
}

impl PolicyFragment {
    /// Read and parse a single policy file under the given name.
    pub fn load(name: impl Into<String>, path: &Path) -> BootstrapResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BootstrapError::file_system("read policy fragment", path, e))?;
        let document = serde_json::from_str(&text).map_err(|e| BootstrapError::json(path, e))?;
        Ok(Self {
            name: name.into(),
            document,
        })
    }
}

/// Load every `*.json` file in `dir`, sorted by file name. Other entries are ignored.
pub fn load_policy_fragments(dir: &Path) -> BootstrapResult<Vec<PolicyFragment>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| BootstrapError::file_system("read policies directory", dir, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| BootstrapError::file_system("read directory entry", dir, e))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        } else {
            trace!("Skipping non-policy entry {}", path.display());
        }
    }

    // read_dir order is platform dependent
    paths.sort();

    let mut fragments = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        fragments.push(PolicyFragment::load(name, &path)?);
    }

    debug!(
        "Loaded {} policy fragments from {}",
        fragments.len(),
        dir.display()
    );
    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_loads_only_json_files_sorted() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("s3-read.json"), r#"{"Version": "2012-10-17"}"#).unwrap();
        std::fs::write(dir.path().join("logs-write.json"), r#"{"Statement": []}"#).unwrap();
        std::fs::write(dir.path().join("README.md"), "# policies").unwrap();
        std::fs::create_dir(dir.path().join("nested.json")).unwrap();

        let fragments = load_policy_fragments(dir.path()).unwrap();
        let names: Vec<_> = fragments.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["logs-write.json", "s3-read.json"]);
        assert_eq!(fragments[1].document, json!({"Version": "2012-10-17"}));
    }

    #[test]
    fn test_missing_directory_is_file_system_error() {
        let dir = TempDir::new().unwrap();
        let error = load_policy_fragments(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(error, BootstrapError::FileSystem { .. }));
    }

    #[test]
    fn test_invalid_json_reports_path() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        let error = load_policy_fragments(dir.path()).unwrap_err();
        assert!(matches!(error, BootstrapError::Json { .. }));
        assert!(error.to_string().contains("broken.json"));
    }

    #[test]
    fn test_empty_directory_yields_no_fragments() {
        let dir = TempDir::new().unwrap();
        assert!(load_policy_fragments(dir.path()).unwrap().is_empty());
    }
}
