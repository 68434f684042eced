//! Indented YAML blocks for embedding JSON documents in a YAML template.

use crate::error::{BootstrapError, BootstrapResult};

const DOCUMENT_START: &str = "---\n";

/// Serialize `value` as block-style YAML, drop the document-start marker, and
/// prefix every non-blank line with `indent` spaces. Key order is preserved.
pub fn to_nice_yaml_block(value: &serde_json::Value, indent: usize) -> BootstrapResult<String> {
    let yaml = serde_yaml::to_string(value).map_err(|e| BootstrapError::yaml(e.to_string()))?;
    let yaml = yaml.replace(DOCUMENT_START, "");
    let pad = " ".repeat(indent);

    Ok(yaml
        .split_inclusive('\n')
        .map(|line| {
            if line.trim().is_empty() {
                line.to_string()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect())
}
