use crate::foundation::error::{NodeError, NodeResult};
use crate::foundation::tensor::Tensor;
use crate::imaging::layout::{ImageDims, Side, crop};
use crate::node::schema::{
    CATEGORY, InputDescriptor, Node, NodeDescriptor, OutputDescriptor, ParamKind,
};

/// Depth in pixels of the edge strip whose mean colours a pad border.
pub const EDGE_MEAN_DEPTH: usize = 4;

#[derive(Clone, Debug)]
pub struct PadInput {
    pub image: Tensor,
    /// Border thickness as a fraction of the image height (top/bottom) or width (left/right).
    pub pad_fraction: f64,
    pub pad_location: Side,
}

/// Grow an image batch on one side with a flat border matching the edge's mean colour.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImagePadder;

static PADDER_DESCRIPTOR: NodeDescriptor = NodeDescriptor {
    name: "IMG_padder",
    display_name: "Image Padder",
    category: CATEGORY,
    inputs: &[
        InputDescriptor {
            name: "image",
            kind: ParamKind::Image,
        },
        InputDescriptor {
            name: "pad_fraction",
            kind: ParamKind::Float {
                default: 0.0,
                min: 0.0,
                max: 1.0,
                step: 0.01,
            },
        },
        InputDescriptor {
            name: "pad_location",
            kind: ParamKind::Choice {
                options: Side::NAMES,
            },
        },
    ],
    hidden_inputs: &[],
    outputs: &[OutputDescriptor {
        name: "image",
        kind: ParamKind::Image,
    }],
    output_node: false,
};

impl Node for ImagePadder {
    type Input = PadInput;
    type Output = Tensor;

    fn descriptor() -> &'static NodeDescriptor {
        &PADDER_DESCRIPTOR
    }

    #[tracing::instrument(skip_all, fields(fraction = input.pad_fraction, side = ?input.pad_location))]
    fn run(&self, input: PadInput) -> NodeResult<Tensor> {
        let PadInput {
            image,
            pad_fraction,
            pad_location,
        } = input;
        check_fraction("pad_fraction", pad_fraction)?;
        let dims = ImageDims::non_empty(&image)?;

        let span = if pad_location.is_vertical() {
            dims.height
        } else {
            dims.width
        };
        let thickness = (span as f64 * pad_fraction).floor() as usize;
        let fill = edge_mean(&image, dims, pad_location);
        tracing::debug!(thickness, fill, "padding");

        pad_with(&image, dims, pad_location, thickness, fill)
    }
}

fn check_fraction(name: &str, f: f64) -> NodeResult<()> {
    if !(0.0..=1.0).contains(&f) {
        return Err(NodeError::validation(format!(
            "{name} must be within [0, 1], got {f}"
        )));
    }
    Ok(())
}

/// Mean over all images and channels of the `EDGE_MEAN_DEPTH`-deep strip along `side`.
fn edge_mean(image: &Tensor, dims: ImageDims, side: Side) -> f32 {
    let (rows, cols) = match side {
        Side::Top => (0..EDGE_MEAN_DEPTH.min(dims.height), 0..dims.width),
        Side::Bottom => (
            dims.height.saturating_sub(EDGE_MEAN_DEPTH)..dims.height,
            0..dims.width,
        ),
        Side::Left => (0..dims.height, 0..EDGE_MEAN_DEPTH.min(dims.width)),
        Side::Right => (
            0..dims.height,
            dims.width.saturating_sub(EDGE_MEAN_DEPTH)..dims.width,
        ),
    };

    let src = image.data();
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for b in 0..dims.batch {
        for y in rows.clone() {
            let start = dims.index(b, y, cols.start, 0);
            let end = start + cols.len() * dims.channels;
            sum += src[start..end].iter().map(|&v| f64::from(v)).sum::<f64>();
            count += end - start;
        }
    }
    (sum / count.max(1) as f64) as f32
}

fn pad_with(
    image: &Tensor,
    dims: ImageDims,
    side: Side,
    thickness: usize,
    fill: f32,
) -> NodeResult<Tensor> {
    let src = image.data();
    let row_len = dims.width * dims.channels;

    if side.is_vertical() {
        let border = vec![fill; thickness * row_len];
        let mut out = Vec::with_capacity(dims.batch * (dims.height + thickness) * row_len);
        for frame in src.chunks_exact(dims.frame_len()) {
            if side == Side::Top {
                out.extend_from_slice(&border);
                out.extend_from_slice(frame);
            } else {
                out.extend_from_slice(frame);
                out.extend_from_slice(&border);
            }
        }
        return Tensor::new(
            vec![dims.batch, dims.height + thickness, dims.width, dims.channels],
            out,
        );
    }

    let border = vec![fill; thickness * dims.channels];
    let mut out = Vec::with_capacity(dims.batch * dims.height * (row_len + border.len()));
    for row in src.chunks_exact(row_len) {
        if side == Side::Left {
            out.extend_from_slice(&border);
            out.extend_from_slice(row);
        } else {
            out.extend_from_slice(row);
            out.extend_from_slice(&border);
        }
    }
    Tensor::new(
        vec![dims.batch, dims.height, dims.width + thickness, dims.channels],
        out,
    )
}

#[derive(Clone, Debug)]
pub struct UnpadInput {
    pub image: Tensor,
    pub unpad_fraction: f64,
    pub unpad_location: Side,
}

/// Cut a fraction off one side of an image batch, then trim height and width down to
/// multiples of 4.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageUnpadder;

static UNPADDER_DESCRIPTOR: NodeDescriptor = NodeDescriptor {
    name: "IMG_unpadder",
    display_name: "Image Unpadder",
    category: CATEGORY,
    inputs: &[
        InputDescriptor {
            name: "image",
            kind: ParamKind::Image,
        },
        InputDescriptor {
            name: "unpad_fraction",
            kind: ParamKind::Float {
                default: 0.0,
                min: 0.0,
                max: 1.0,
                step: 0.01,
            },
        },
        InputDescriptor {
            name: "unpad_location",
            kind: ParamKind::Choice {
                options: Side::NAMES,
            },
        },
    ],
    hidden_inputs: &[],
    outputs: &[OutputDescriptor {
        name: "image",
        kind: ParamKind::Image,
    }],
    output_node: false,
};

impl Node for ImageUnpadder {
    type Input = UnpadInput;
    type Output = Tensor;

    fn descriptor() -> &'static NodeDescriptor {
        &UNPADDER_DESCRIPTOR
    }

    #[tracing::instrument(skip_all, fields(fraction = input.unpad_fraction, side = ?input.unpad_location))]
    fn run(&self, input: UnpadInput) -> NodeResult<Tensor> {
        let UnpadInput {
            image,
            unpad_fraction: f,
            unpad_location,
        } = input;
        check_fraction("unpad_fraction", f)?;
        let dims = ImageDims::of(&image)?;
        let (h, w) = (dims.height, dims.width);
        let cut = |n: usize, frac: f64| ((n as f64 * frac).floor() as usize).min(n);

        let (rows, cols) = match unpad_location {
            Side::Bottom => (0..cut(h, 1.0 - f), 0..w),
            Side::Top => (cut(h, f)..h, 0..w),
            Side::Left => (0..h, cut(w, f)..w),
            Side::Right => (0..h, 0..cut(w, 1.0 - f)),
        };

        let rows = rows.start..rows.start + (rows.len() - rows.len() % 4);
        let cols = cols.start..cols.start + (cols.len() - cols.len() % 4);
        crop(&image, dims, rows, cols)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/imaging/pad.rs"]
mod tests;
