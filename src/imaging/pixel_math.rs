use crate::expression::program::PixelExpr;
use crate::foundation::error::NodeResult;
use crate::foundation::tensor::Tensor;
use crate::imaging::layout::ImageDims;
use crate::node::schema::{
    CATEGORY, InputDescriptor, Node, NodeDescriptor, OutputDescriptor, ParamKind,
};

#[derive(Clone, Debug)]
pub struct PixelMathInput {
    pub image: Tensor,
    /// Expression in `x`, applied to every channel value independently.
    pub math_string: String,
}

/// Apply a user expression to every value of an image batch.
///
/// Images whose maximum exceeds 1 are treated as 0..255 data: they are divided by 255 before
/// evaluation and multiplied back afterwards. Results are clamped to `[0, 1]` before any
/// rescaling, and NaN results become 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct PixelMath;

static DESCRIPTOR: NodeDescriptor = NodeDescriptor {
    name: "IMG_scaler",
    display_name: "Image Pixel Math",
    category: CATEGORY,
    inputs: &[
        InputDescriptor {
            name: "image",
            kind: ParamKind::Image,
        },
        InputDescriptor {
            name: "math_string",
            kind: ParamKind::String { default: None },
        },
    ],
    hidden_inputs: &[],
    outputs: &[OutputDescriptor {
        name: "image",
        kind: ParamKind::Image,
    }],
    output_node: false,
};

impl Node for PixelMath {
    type Input = PixelMathInput;
    type Output = Tensor;

    fn descriptor() -> &'static NodeDescriptor {
        &DESCRIPTOR
    }

    #[tracing::instrument(skip_all, fields(expr = %input.math_string))]
    fn run(&self, input: PixelMathInput) -> NodeResult<Tensor> {
        ImageDims::of(&input.image)?;
        let program = PixelExpr::compile(&input.math_string)?;

        let rescaled = input.image.max_value().is_some_and(|m| m > 1.0);
        let scale = if rescaled { 255.0 } else { 1.0 };
        tracing::debug!(rescaled, "applying pixel math");

        let mut stack = Vec::new();
        Ok(input.image.map(|v| {
            let y = program.eval_with_stack(f64::from(v) / scale, &mut stack);
            let y = if y.is_nan() { 0.0 } else { y.clamp(0.0, 1.0) };
            (y * scale) as f32
        }))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/imaging/pixel_math.rs"]
mod tests;
