//! Eden nodes: latent-space exploration and image utility nodes for node-graph image
//! generation hosts.
//!
//! The crate is host-agnostic. Each node is a plain Rust value implementing [`Node`]: a typed
//! input record goes in, a typed output record comes out, and a static [`NodeDescriptor`]
//! declares the interface a host needs to wire and draw it. [`catalog`] lists every node.
//!
//! # Exploration
//!
//! [`RandomRotateEmbeds`] turns one seed embedding into a batch of nearby variants by applying
//! small random near-orthogonal rotations, and pairs them with copies of a single latent.
//! [`SaveExplorationStateNode`] persists a chosen embedding so the next run explores around it.
//! The state file is a versioned, checksummed envelope; see [`ExplorationState`].
//!
//! # Images
//!
//! Image batches are `[batch, height, width, channels]` tensors with values in `[0, 1]`.
//! [`ImagePadder`], [`ImageUnpadder`] and [`PixelMath`] transform them; [`SaveImageAdvanced`]
//! and [`DecodeToFolder`] write them to disk.
//!
//! # Logging
//!
//! Nodes emit `tracing` spans and events. The crate never installs a subscriber.
#![forbid(unsafe_code)]

mod exploration;
mod expression;
mod files;
mod foundation;
mod imaging;
mod node;
mod output;

pub use exploration::nodes::{
    DEFAULT_STATE_FILENAME, RandomRotateEmbeds, RandomRotateInput, RandomRotateOutput,
    SaveExplorationStateNode, SaveStateInput,
};
pub use exploration::rotate::{random_rotate_embeds, small_random_rotation};
pub use exploration::state::{ExplorationState, STATE_MAGIC, STATE_VERSION};
pub use expression::program::PixelExpr;
pub use files::picker::{FilePicker, FilePickerInput};
pub use foundation::config::NodeSettings;
pub use foundation::error::{NodeError, NodeResult};
pub use foundation::rng::SeedSource;
pub use foundation::tensor::{Latent, Tensor};
pub use imaging::layout::{ImageDims, Side, quantize_u8};
pub use imaging::pad::{EDGE_MEAN_DEPTH, ImagePadder, ImageUnpadder, PadInput, UnpadInput};
pub use imaging::pixel_math::{PixelMath, PixelMathInput};
pub use node::registry::{catalog, describe};
pub use node::schema::{
    CATEGORY, InputDescriptor, Node, NodeDescriptor, OutputDescriptor, ParamKind,
};
pub use output::decode_folder::{DecodeToFolder, DecodeToFolderInput, LatentDecoder};
pub use output::paths::{SaveTarget, resolve_save_target, timestamp_string};
pub use output::save_image::{
    SaveImageAdvanced, SaveImageInput, SaveImageOutput, SavedImage, SavedImages,
};
