use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::Context as _;
use serde_json::{Map, Value};

use crate::foundation::config::NodeSettings;
use crate::foundation::error::{NodeError, NodeResult};
use crate::foundation::tensor::Tensor;
use crate::imaging::layout::{ImageDims, frame_bytes};
use crate::node::schema::{CATEGORY, InputDescriptor, Node, NodeDescriptor, ParamKind};
use crate::output::paths::{resolve_save_target, timestamp_string};

#[derive(Clone, Debug)]
pub struct SaveImageInput {
    pub images: Tensor,
    pub filename_prefix: String,
    pub add_timestamp: bool,
    /// Also write each image's metadata to a sibling `.json` file.
    pub save_metadata_json: bool,
    /// Host prompt graph, embedded under the `prompt` key.
    pub prompt: Option<Value>,
    /// Extra workflow metadata, one PNG text chunk per key.
    pub extra_pnginfo: Option<Map<String, Value>>,
}

impl SaveImageInput {
    pub fn new(images: Tensor) -> Self {
        Self {
            images,
            filename_prefix: "ComfyUI".to_owned(),
            add_timestamp: true,
            save_metadata_json: true,
            prompt: None,
            extra_pnginfo: None,
        }
    }
}

/// One written file, as the host UI lists it.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SavedImage {
    pub filename: String,
    pub subfolder: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct SavedImages {
    pub images: Vec<SavedImage>,
}

/// Serialises as `{"ui": {"images": [...]}}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct SaveImageOutput {
    pub ui: SavedImages,
}

/// Write an image batch as numbered PNG files with embedded workflow metadata.
#[derive(Clone, Debug, Default)]
pub struct SaveImageAdvanced {
    pub settings: NodeSettings,
}

static DESCRIPTOR: NodeDescriptor = NodeDescriptor {
    name: "SaveImageAdvanced",
    display_name: "Save Image Advanced",
    category: CATEGORY,
    inputs: &[
        InputDescriptor {
            name: "images",
            kind: ParamKind::Image,
        },
        InputDescriptor {
            name: "filename_prefix",
            kind: ParamKind::String {
                default: Some("ComfyUI"),
            },
        },
        InputDescriptor {
            name: "add_timestamp",
            kind: ParamKind::Boolean { default: true },
        },
        InputDescriptor {
            name: "save_metadata_json",
            kind: ParamKind::Boolean { default: true },
        },
    ],
    hidden_inputs: &[
        InputDescriptor {
            name: "prompt",
            kind: ParamKind::Prompt,
        },
        InputDescriptor {
            name: "extra_pnginfo",
            kind: ParamKind::ExtraPngInfo,
        },
    ],
    outputs: &[],
    output_node: true,
};

impl Node for SaveImageAdvanced {
    type Input = SaveImageInput;
    type Output = SaveImageOutput;

    fn descriptor() -> &'static NodeDescriptor {
        &DESCRIPTOR
    }

    #[tracing::instrument(skip_all, fields(prefix = %input.filename_prefix))]
    fn run(&self, input: SaveImageInput) -> NodeResult<SaveImageOutput> {
        let dims = ImageDims::non_empty(&input.images)?;
        let target = resolve_save_target(
            &self.settings.output_dir,
            &input.filename_prefix,
            dims.width,
            dims.height,
        )?;
        let timestamp = timestamp_string();

        let metadata = (!self.settings.disable_metadata)
            .then(|| collect_metadata(input.prompt.as_ref(), input.extra_pnginfo.as_ref()));
        let text_chunks = metadata
            .as_ref()
            .map(|m| {
                m.iter()
                    .map(|(k, v)| Ok((k.clone(), serde_json::to_string(v)?)))
                    .collect::<Result<Vec<_>, serde_json::Error>>()
            })
            .transpose()
            .map_err(|e| NodeError::serde(format!("encode image metadata: {e}")))?
            .unwrap_or_default();

        let mut out = SaveImageOutput::default();
        let mut counter = target.counter;
        for index in 0..dims.batch {
            let filename = if input.add_timestamp {
                format!("{}_{timestamp}_{counter:05}.png", target.name)
            } else {
                format!("{}_{counter:05}_.png", target.name)
            };
            let path = target.folder.join(&filename);
            let bytes = frame_bytes(&input.images, dims, index)?;
            write_png(&path, &bytes, dims, &text_chunks)?;

            if let Some(metadata) = metadata.as_ref().filter(|_| input.save_metadata_json) {
                write_metadata_json(&path.with_extension("json"), metadata)?;
            }
            tracing::info!(file = %path.display(), "saved image");

            out.ui.images.push(SavedImage {
                filename,
                subfolder: target.subfolder.clone(),
                kind: "output".to_owned(),
            });
            counter += 1;
        }
        Ok(out)
    }
}

fn collect_metadata(prompt: Option<&Value>, extra: Option<&Map<String, Value>>) -> Map<String, Value> {
    let mut m = Map::new();
    if let Some(prompt) = prompt {
        m.insert("prompt".to_owned(), prompt.clone());
    }
    for (k, v) in extra.into_iter().flatten() {
        m.insert(k.clone(), v.clone());
    }
    m
}

fn is_latin1(s: &str) -> bool {
    s.chars().all(|c| u32::from(c) <= 0xFF)
}

fn png_color(channels: usize) -> NodeResult<png::ColorType> {
    Ok(match channels {
        1 => png::ColorType::Grayscale,
        2 => png::ColorType::GrayscaleAlpha,
        3 => png::ColorType::Rgb,
        4 => png::ColorType::Rgba,
        n => {
            return Err(NodeError::validation(format!(
                "cannot save an image with {n} channels as PNG"
            )));
        }
    })
}

fn write_png(
    path: &Path,
    bytes: &[u8],
    dims: ImageDims,
    text_chunks: &[(String, String)],
) -> NodeResult<()> {
    let width = u32::try_from(dims.width)
        .map_err(|_| NodeError::validation(format!("image width {} too large", dims.width)))?;
    let height = u32::try_from(dims.height)
        .map_err(|_| NodeError::validation(format!("image height {} too large", dims.height)))?;
    let color = png_color(dims.channels)?;

    let file =
        File::create(path).with_context(|| format!("create image file '{}'", path.display()))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(color);
    encoder.set_depth(png::BitDepth::Eight);
    for (key, text) in text_chunks {
        let added = if is_latin1(text) {
            encoder.add_text_chunk(key.clone(), text.clone())
        } else {
            encoder.add_itxt_chunk(key.clone(), text.clone())
        };
        added.with_context(|| format!("add PNG text chunk '{key}'"))?;
    }

    let mut writer = encoder
        .write_header()
        .with_context(|| format!("write PNG header '{}'", path.display()))?;
    writer
        .write_image_data(bytes)
        .with_context(|| format!("write PNG data '{}'", path.display()))?;
    writer
        .finish()
        .with_context(|| format!("finish PNG '{}'", path.display()))?;
    Ok(())
}

fn write_metadata_json(path: &Path, metadata: &Map<String, Value>) -> NodeResult<()> {
    use serde::Serialize as _;

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    metadata
        .serialize(&mut ser)
        .map_err(|e| NodeError::serde(format!("encode metadata json: {e}")))?;
    std::fs::write(path, buf)
        .with_context(|| format!("write metadata json '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/output/save_image.rs"]
mod tests;
