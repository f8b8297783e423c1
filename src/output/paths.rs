use std::path::{Component, Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{NodeError, NodeResult};

/// Where a batch of numbered images goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveTarget {
    /// Directory files are written into, already created.
    pub folder: PathBuf,
    /// File name stem: the prefix after its last `/`.
    pub name: String,
    /// The prefix before its last `/`, relative to the output root (empty when none).
    pub subfolder: String,
    /// First counter value free for `name` in `folder`.
    pub counter: u32,
}

/// Resolve `prefix` (optionally `sub/dir/name`) under `output_dir`, create the folder and pick
/// the next free counter.
///
/// `%width%` and `%height%` in the prefix are replaced with the image size.
pub fn resolve_save_target(
    output_dir: &Path,
    prefix: &str,
    width: usize,
    height: usize,
) -> NodeResult<SaveTarget> {
    let prefix = prefix
        .replace("%width%", &width.to_string())
        .replace("%height%", &height.to_string());
    let (subfolder, name) = match prefix.rsplit_once('/') {
        Some((sub, name)) => (sub.to_owned(), name.to_owned()),
        None => (String::new(), prefix),
    };
    if name.is_empty() {
        return Err(NodeError::validation("filename prefix must end in a file name"));
    }
    let sub = Path::new(&subfolder);
    if !sub
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(NodeError::validation(format!(
            "saving to '{subfolder}' would leave the output folder '{}'",
            output_dir.display()
        )));
    }

    let folder = output_dir.join(sub);
    std::fs::create_dir_all(&folder)
        .with_context(|| format!("create output folder '{}'", folder.display()))?;
    let counter = next_counter(&folder, &name)?;
    tracing::debug!(folder = %folder.display(), name = %name, counter, "resolved save target");

    Ok(SaveTarget {
        folder,
        name,
        subfolder,
        counter,
    })
}

/// One past the highest `N` among files named `{name}_{N}_...` in `folder`, or 1.
fn next_counter(folder: &Path, name: &str) -> NodeResult<u32> {
    let stem = format!("{name}_");
    let mut highest = 0u32;
    let entries = std::fs::read_dir(folder)
        .with_context(|| format!("list output folder '{}'", folder.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("list output folder '{}'", folder.display()))?;
        let file_name = entry.file_name();
        let Some(rest) = file_name.to_str().and_then(|f| f.strip_prefix(&stem)) else {
            continue;
        };
        let Some((digits, _)) = rest.split_once('_') else {
            continue;
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if let Ok(n) = digits.parse::<u32>() {
            highest = highest.max(n);
        }
    }
    Ok(highest.saturating_add(1))
}

/// Local wall-clock time as `YYYYmmdd-HHMMSS`.
pub fn timestamp_string() -> String {
    chrono::Local::now().format("%Y%m%d-%H%M%S").to_string()
}

#[cfg(test)]
#[path = "../../tests/unit/output/paths.rs"]
mod tests;
