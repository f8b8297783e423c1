use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use image::ImageEncoder as _;
use image::codecs::jpeg::JpegEncoder;

use crate::foundation::config::NodeSettings;
use crate::foundation::error::{NodeError, NodeResult};
use crate::foundation::tensor::{Latent, Tensor};
use crate::imaging::layout::{ImageDims, frame_bytes};
use crate::node::schema::{
    CATEGORY, InputDescriptor, Node, NodeDescriptor, OutputDescriptor, ParamKind,
};
use crate::output::paths::timestamp_string;

/// The host's VAE: turns one latent into one image.
pub trait LatentDecoder: Send + Sync {
    /// `sample` has a leading batch axis of 1. The result is `[1, H, W, C]` or `[H, W, C]`
    /// with values in `[0, 1]`.
    fn decode(&self, sample: &Tensor) -> NodeResult<Tensor>;
}

#[derive(Clone)]
pub struct DecodeToFolderInput {
    pub samples: Latent,
    pub vae: Arc<dyn LatentDecoder>,
    pub prefix: String,
    pub output_folder: PathBuf,
}

impl DecodeToFolderInput {
    pub fn new(samples: Latent, vae: Arc<dyn LatentDecoder>) -> Self {
        Self {
            samples,
            vae,
            prefix: "test".to_owned(),
            output_folder: PathBuf::from("output/frames"),
        }
    }
}

/// Decode every latent of a batch on its own and write the frames as numbered JPEGs into a
/// fresh timestamped folder.
#[derive(Clone, Debug, Default)]
pub struct DecodeToFolder {
    pub settings: NodeSettings,
}

static DESCRIPTOR: NodeDescriptor = NodeDescriptor {
    name: "VAEDecode_to_folder",
    display_name: "VAE Decode to Folder",
    category: CATEGORY,
    inputs: &[
        InputDescriptor {
            name: "samples",
            kind: ParamKind::Latent,
        },
        InputDescriptor {
            name: "vae",
            kind: ParamKind::Vae,
        },
        InputDescriptor {
            name: "prefix",
            kind: ParamKind::String {
                default: Some("test"),
            },
        },
        InputDescriptor {
            name: "output_folder",
            kind: ParamKind::String {
                default: Some("output/frames"),
            },
        },
    ],
    hidden_inputs: &[],
    outputs: &[OutputDescriptor {
        name: "folder",
        kind: ParamKind::String { default: None },
    }],
    output_node: true,
};

impl Node for DecodeToFolder {
    type Input = DecodeToFolderInput;
    type Output = PathBuf;

    fn descriptor() -> &'static NodeDescriptor {
        &DESCRIPTOR
    }

    #[tracing::instrument(skip_all, fields(prefix = %input.prefix))]
    fn run(&self, input: DecodeToFolderInput) -> NodeResult<PathBuf> {
        let samples = &input.samples.samples;
        let count = samples.batch_len()?;
        let folder = input
            .output_folder
            .join(format!("{}_{}", input.prefix, timestamp_string()));
        std::fs::create_dir_all(&folder)
            .with_context(|| format!("create frame folder '{}'", folder.display()))?;

        for i in 0..count {
            let image = single_image(input.vae.decode(&samples.batch_item(i)?)?)?;
            let path = folder.join(format!("{i:06}.jpg"));
            write_jpeg(&path, &image, self.settings.jpeg_quality)?;
            tracing::debug!(frame = i, file = %path.display(), "wrote frame");
        }
        tracing::info!(frames = count, folder = %folder.display(), "decoded latents to folder");
        Ok(folder)
    }
}

fn single_image(image: Tensor) -> NodeResult<Tensor> {
    let image = match *image.shape() {
        [h, w, c] => image.reshape(vec![1, h, w, c])?,
        _ => image,
    };
    let dims = ImageDims::non_empty(&image)?;
    if dims.batch != 1 {
        return Err(NodeError::validation(format!(
            "decoder returned {} images for one latent",
            dims.batch
        )));
    }
    Ok(image)
}

/// JPEG has no alpha: RGBA drops to RGB and gray+alpha to gray.
fn write_jpeg(path: &Path, image: &Tensor, quality: u8) -> NodeResult<()> {
    let dims = ImageDims::non_empty(image)?;
    let bytes = frame_bytes(image, dims, 0)?;
    let (kept, color) = match dims.channels {
        1 | 2 => (1, image::ExtendedColorType::L8),
        3 | 4 => (3, image::ExtendedColorType::Rgb8),
        n => {
            return Err(NodeError::validation(format!(
                "cannot save an image with {n} channels as JPEG"
            )));
        }
    };
    let pixels: Vec<u8> = if kept == dims.channels {
        bytes
    } else {
        bytes
            .chunks_exact(dims.channels)
            .flat_map(|px| px[..kept].iter().copied())
            .collect()
    };
    let width = u32::try_from(dims.width)
        .map_err(|_| NodeError::validation(format!("image width {} too large", dims.width)))?;
    let height = u32::try_from(dims.height)
        .map_err(|_| NodeError::validation(format!("image height {} too large", dims.height)))?;

    let file =
        File::create(path).with_context(|| format!("create frame file '{}'", path.display()))?;
    JpegEncoder::new_with_quality(BufWriter::new(file), quality)
        .write_image(&pixels, width, height, color)
        .with_context(|| format!("encode frame '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/output/decode_folder.rs"]
mod tests;
