use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{NodeError, NodeResult};

/// Process-level knobs the file-writing nodes consult.
///
/// Every field has a default, so a partial JSON document (or `{}`) is a valid configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeSettings {
    /// Root directory image-save nodes write into.
    pub output_dir: PathBuf,
    /// Skip PNG text chunks and companion JSON files.
    pub disable_metadata: bool,
    /// JPEG quality for decoded frames, 1..=100.
    pub jpeg_quality: u8,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            disable_metadata: false,
            jpeg_quality: 95,
        }
    }
}

impl NodeSettings {
    pub fn from_json_str(s: &str) -> NodeResult<Self> {
        let settings: Self = serde_json::from_str(s)
            .map_err(|e| NodeError::serde(format!("parse node settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file(path: &Path) -> NodeResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read node settings '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> NodeResult<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(NodeError::validation(format!(
                "jpeg_quality must be in 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(NodeError::validation("output_dir must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
