use crate::foundation::error::{NodeError, NodeResult};
use crate::foundation::tensor::Tensor;

/// Dimensions of an image batch laid out as `[batch, height, width, channels]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageDims {
    pub batch: usize,
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl ImageDims {
    pub fn of(image: &Tensor) -> NodeResult<Self> {
        match *image.shape() {
            [batch, height, width, channels] => Ok(Self {
                batch,
                height,
                width,
                channels,
            }),
            _ => Err(NodeError::validation(format!(
                "image batch must be [batch, height, width, channels], got {:?}",
                image.shape()
            ))),
        }
    }

    /// Like [`ImageDims::of`], but rejects batches with any zero-sized dimension.
    pub fn non_empty(image: &Tensor) -> NodeResult<Self> {
        let dims = Self::of(image)?;
        if dims.batch == 0 || dims.height == 0 || dims.width == 0 || dims.channels == 0 {
            return Err(NodeError::validation(format!(
                "image batch must not be empty, got {:?}",
                image.shape()
            )));
        }
        Ok(dims)
    }

    pub fn index(&self, b: usize, y: usize, x: usize, c: usize) -> usize {
        ((b * self.height + y) * self.width + x) * self.channels + c
    }

    pub fn frame_len(&self) -> usize {
        self.height * self.width * self.channels
    }
}

/// Which edge of an image a pad or crop applies to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Bottom,
    Top,
    Left,
    Right,
}

impl Side {
    pub const NAMES: &'static [&'static str] = &["bottom", "top", "left", "right"];

    pub fn parse(s: &str) -> NodeResult<Self> {
        match s {
            "bottom" => Ok(Self::Bottom),
            "top" => Ok(Self::Top),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(NodeError::validation(format!(
                "unknown location '{other}' (expected one of {:?})",
                Self::NAMES
            ))),
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Self::Bottom | Self::Top)
    }
}

/// Copy the `rows` × `cols` window of every image in the batch.
pub(crate) fn crop(
    image: &Tensor,
    dims: ImageDims,
    rows: std::ops::Range<usize>,
    cols: std::ops::Range<usize>,
) -> NodeResult<Tensor> {
    let src = image.data();
    let row_len = cols.len() * dims.channels;
    let mut out = Vec::with_capacity(dims.batch * rows.len() * row_len);
    for b in 0..dims.batch {
        for y in rows.clone() {
            let start = dims.index(b, y, cols.start, 0);
            out.extend_from_slice(&src[start..start + row_len]);
        }
    }
    Tensor::new(vec![dims.batch, rows.len(), cols.len(), dims.channels], out)
}

/// 8-bit quantisation used by every image writer: `clip(255·v, 0, 255)`, truncated.
pub fn quantize_u8(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    (v * 255.0).clamp(0.0, 255.0) as u8
}

/// Quantised bytes of image `index` of the batch, row-major, channels interleaved.
pub fn frame_bytes(image: &Tensor, dims: ImageDims, index: usize) -> NodeResult<Vec<u8>> {
    if index >= dims.batch {
        return Err(NodeError::validation(format!(
            "image index {index} out of range for batch of {}",
            dims.batch
        )));
    }
    let len = dims.frame_len();
    let start = index * len;
    Ok(image.data()[start..start + len]
        .iter()
        .copied()
        .map(quantize_u8)
        .collect())
}

#[cfg(test)]
#[path = "../../tests/unit/imaging/layout.rs"]
mod tests;
