use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{NodeError, NodeResult};
use crate::foundation::tensor::Tensor;

/// Magic bytes opening every exploration state file.
pub const STATE_MAGIC: [u8; 4] = *b"EXST";
/// Format version written by [`ExplorationState::save`] and required by `load`.
pub const STATE_VERSION: u8 = 1;

// magic(4) + version(1) + checksum(8)
const MIN_FILE_LEN: usize = 13;

/// The persisted seed embedding that exploration sampling perturbs.
///
/// One embedding per state, no history. The file on disk has no locking: concurrent writers
/// against the same path race and the last rename wins.
///
/// File layout:
/// - header: [`STATE_MAGIC`], [`STATE_VERSION`] (u8)
/// - body: bincode-serialized record holding dtype, shape and values of `sample_embed`
/// - footer: xxhash64 of all preceding bytes, little endian
#[derive(Clone, Debug, PartialEq)]
pub struct ExplorationState {
    sample_embed: Tensor,
}

#[derive(serde::Serialize, serde::Deserialize)]
enum StoredDType {
    F32,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct StoredTensor {
    dtype: StoredDType,
    shape: Vec<u64>,
    data: Vec<f32>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct StateRecord {
    sample_embed: StoredTensor,
}

impl ExplorationState {
    pub fn new(sample_embed: Tensor) -> Self {
        Self { sample_embed }
    }

    pub fn sample_embed(&self) -> &Tensor {
        &self.sample_embed
    }

    pub fn into_sample_embed(self) -> Tensor {
        self.sample_embed
    }

    pub fn to_bytes(&self) -> NodeResult<Vec<u8>> {
        let record = StateRecord {
            sample_embed: StoredTensor {
                dtype: StoredDType::F32,
                shape: self.sample_embed.shape().iter().map(|&d| d as u64).collect(),
                data: self.sample_embed.data().to_vec(),
            },
        };

        let mut out = Vec::with_capacity(MIN_FILE_LEN + self.sample_embed.numel() * 4 + 32);
        out.extend_from_slice(&STATE_MAGIC);
        out.push(STATE_VERSION);
        let body = bincode::serialize(&record)
            .map_err(|e| NodeError::serde(format!("encode exploration state: {e}")))?;
        out.extend_from_slice(&body);

        let checksum = xxhash_rust::xxh64::xxh64(&out, 0);
        out.extend_from_slice(&checksum.to_le_bytes());
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> NodeResult<Self> {
        if bytes.len() < MIN_FILE_LEN {
            return Err(NodeError::state(format!(
                "file too small ({} bytes)",
                bytes.len()
            )));
        }
        if bytes[0..4] != STATE_MAGIC {
            return Err(NodeError::state("not an exploration state file (bad magic)"));
        }
        // Version mismatch takes precedence over checksum errors.
        let version = bytes[4];
        if version != STATE_VERSION {
            return Err(NodeError::IncompatibleState {
                found: version,
                expected: STATE_VERSION,
            });
        }

        let checksum_offset = bytes.len() - 8;
        let mut stored = [0u8; 8];
        stored.copy_from_slice(&bytes[checksum_offset..]);
        let stored = u64::from_le_bytes(stored);
        let computed = xxhash_rust::xxh64::xxh64(&bytes[..checksum_offset], 0);
        if stored != computed {
            return Err(NodeError::state(format!(
                "checksum mismatch: stored={stored:#x}, computed={computed:#x}"
            )));
        }

        let record: StateRecord = bincode::deserialize(&bytes[5..checksum_offset])
            .map_err(|e| NodeError::serde(format!("decode exploration state: {e}")))?;
        let StoredTensor { dtype, shape, data } = record.sample_embed;
        let StoredDType::F32 = dtype;
        let shape = shape
            .into_iter()
            .map(usize::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| NodeError::state("stored shape does not fit this platform"))?;
        let sample_embed = Tensor::new(shape, data)
            .map_err(|e| NodeError::state(format!("stored embedding is inconsistent: {e}")))?;
        Ok(Self { sample_embed })
    }

    /// Write the state to `path`, replacing whatever is there.
    pub fn save(&self, path: impl AsRef<Path>) -> NodeResult<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create state directory '{}'", parent.display()))?;
        }
        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = std::path::PathBuf::from(temp_name);
        std::fs::write(&temp_path, &bytes)
            .with_context(|| format!("write exploration state '{}'", temp_path.display()))?;
        if let Err(e) = std::fs::rename(&temp_path, path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(anyhow::Error::new(e)
                .context(format!("replace exploration state '{}'", path.display()))
                .into());
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> NodeResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("read exploration state '{}'", path.display()))?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/exploration/state.rs"]
mod tests;
