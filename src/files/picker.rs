use std::path::{Path, PathBuf};

use anyhow::Context as _;
use rand::seq::SliceRandom;

use crate::foundation::error::{NodeError, NodeResult};
use crate::foundation::rng::SeedSource;
use crate::node::schema::{
    CATEGORY, InputDescriptor, Node, NodeDescriptor, OutputDescriptor, ParamKind,
};

#[derive(Clone, Debug)]
pub struct FilePickerInput {
    pub folder: PathBuf,
}

/// Pick one regular file from a folder at random.
///
/// Candidates are sorted by name before drawing, so a fixed seed picks the same file for the
/// same folder contents regardless of directory iteration order.
#[derive(Clone, Copy, Debug, Default)]
pub struct FilePicker {
    pub seed: SeedSource,
}

static DESCRIPTOR: NodeDescriptor = NodeDescriptor {
    name: "Filepicker",
    display_name: "File Picker",
    category: CATEGORY,
    inputs: &[InputDescriptor {
        name: "folder",
        kind: ParamKind::String { default: None },
    }],
    hidden_inputs: &[],
    outputs: &[OutputDescriptor {
        name: "path",
        kind: ParamKind::String { default: None },
    }],
    output_node: false,
};

impl Node for FilePicker {
    type Input = FilePickerInput;
    type Output = PathBuf;

    fn descriptor() -> &'static NodeDescriptor {
        &DESCRIPTOR
    }

    #[tracing::instrument(skip_all, fields(folder = %input.folder.display()))]
    fn run(&self, input: FilePickerInput) -> NodeResult<PathBuf> {
        let files = list_files(&input.folder)?;
        let mut rng = self.seed.rng();
        let picked = files.choose(&mut rng).cloned().ok_or_else(|| {
            NodeError::precondition(format!(
                "folder '{}' contains no files",
                input.folder.display()
            ))
        })?;
        tracing::debug!(candidates = files.len(), picked = %picked.display(), "picked file");
        Ok(picked)
    }
}

/// Regular files directly inside `folder`, sorted by path.
pub(crate) fn list_files(folder: &Path) -> NodeResult<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(NodeError::validation(format!(
            "folder '{}' does not exist or is not a directory",
            folder.display()
        )));
    }
    let entries = std::fs::read_dir(folder)
        .with_context(|| format!("list folder '{}'", folder.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("list folder '{}'", folder.display()))?
            .path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
#[path = "../../tests/unit/files/picker.rs"]
mod tests;
