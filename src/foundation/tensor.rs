use crate::foundation::error::{NodeError, NodeResult};

/// Dense row-major `f32` array with an arbitrary number of dimensions.
///
/// Embeddings, latents and image batches all travel between nodes as tensors. Axis 0 is the
/// batch axis wherever a node talks about batches.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "TensorRepr", into = "TensorRepr")]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct TensorRepr {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl TryFrom<TensorRepr> for Tensor {
    type Error = NodeError;

    fn try_from(r: TensorRepr) -> Result<Self, Self::Error> {
        Tensor::new(r.shape, r.data)
    }
}

impl From<Tensor> for TensorRepr {
    fn from(t: Tensor) -> Self {
        Self {
            shape: t.shape,
            data: t.data,
        }
    }
}

fn numel_of(shape: &[usize]) -> NodeResult<usize> {
    shape.iter().try_fold(1usize, |acc, &d| {
        acc.checked_mul(d)
            .ok_or_else(|| NodeError::validation(format!("tensor shape {shape:?} overflows")))
    })
}

impl Tensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> NodeResult<Self> {
        let expected = numel_of(&shape)?;
        if data.len() != expected {
            return Err(NodeError::validation(format!(
                "tensor shape {shape:?} needs {expected} values, got {}",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn zeros(shape: Vec<usize>) -> NodeResult<Self> {
        let n = numel_of(&shape)?;
        Ok(Self {
            shape,
            data: vec![0.0; n],
        })
    }

    pub fn from_vec1(data: Vec<f32>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Size of the innermost axis, `None` for rank-0 tensors.
    pub fn last_dim(&self) -> Option<usize> {
        self.shape.last().copied()
    }

    /// Size of the leading (batch) axis.
    pub fn batch_len(&self) -> NodeResult<usize> {
        self.shape
            .first()
            .copied()
            .ok_or_else(|| NodeError::validation("rank-0 tensor has no batch axis"))
    }

    pub fn reshape(self, shape: Vec<usize>) -> NodeResult<Self> {
        Self::new(shape, self.data)
    }

    /// Item `index` along axis 0, keeping a leading axis of size 1.
    pub fn batch_item(&self, index: usize) -> NodeResult<Self> {
        let batch = self.batch_len()?;
        if index >= batch {
            return Err(NodeError::validation(format!(
                "batch index {index} out of range for batch of {batch}"
            )));
        }
        let stride = self.data.len() / batch.max(1);
        let mut shape = self.shape.clone();
        shape[0] = 1;
        Ok(Self {
            shape,
            data: self.data[index * stride..(index + 1) * stride].to_vec(),
        })
    }

    /// Stack equally-shaped tensors along a new leading axis.
    pub fn stack(items: &[Tensor]) -> NodeResult<Self> {
        let first = items
            .first()
            .ok_or_else(|| NodeError::validation("cannot stack an empty list of tensors"))?;
        let mut data = Vec::with_capacity(first.numel() * items.len());
        for t in items {
            if t.shape != first.shape {
                return Err(NodeError::validation(format!(
                    "cannot stack tensors of shape {:?} and {:?}",
                    first.shape, t.shape
                )));
            }
            data.extend_from_slice(&t.data);
        }
        let mut shape = Vec::with_capacity(first.rank() + 1);
        shape.push(items.len());
        shape.extend_from_slice(&first.shape);
        Ok(Self { shape, data })
    }

    /// Tile the whole tensor `times` times along axis 0.
    pub fn repeat_batch(&self, times: usize) -> NodeResult<Self> {
        let batch = self.batch_len()?;
        let mut shape = self.shape.clone();
        shape[0] = batch
            .checked_mul(times)
            .ok_or_else(|| NodeError::validation("repeated batch size overflows"))?;
        let mut data = Vec::with_capacity(self.data.len() * times);
        for _ in 0..times {
            data.extend_from_slice(&self.data);
        }
        Ok(Self { shape, data })
    }

    /// Largest value, ignoring NaN. `None` when empty.
    pub fn max_value(&self) -> Option<f32> {
        self.data
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .reduce(f32::max)
    }

    pub fn map(&self, f: impl FnMut(f32) -> f32) -> Self {
        Self {
            shape: self.shape.clone(),
            data: self.data.iter().copied().map(f).collect(),
        }
    }
}

/// Batch-first latent container, the value the host calls `LATENT`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Latent {
    pub samples: Tensor,
}

impl Latent {
    pub fn new(samples: Tensor) -> Self {
        Self { samples }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/tensor.rs"]
mod tests;
