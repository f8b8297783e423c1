use crate::exploration::nodes::{RandomRotateEmbeds, SaveExplorationStateNode};
use crate::files::picker::FilePicker;
use crate::imaging::pad::{ImagePadder, ImageUnpadder};
use crate::imaging::pixel_math::PixelMath;
use crate::node::schema::{Node, NodeDescriptor};
use crate::output::decode_folder::DecodeToFolder;
use crate::output::save_image::SaveImageAdvanced;

/// Every node this crate exports, in registration order.
pub fn catalog() -> Vec<&'static NodeDescriptor> {
    vec![
        RandomRotateEmbeds::descriptor(),
        SaveExplorationStateNode::descriptor(),
        ImagePadder::descriptor(),
        ImageUnpadder::descriptor(),
        PixelMath::descriptor(),
        FilePicker::descriptor(),
        SaveImageAdvanced::descriptor(),
        DecodeToFolder::descriptor(),
    ]
}

/// Look a node up by its host-facing name.
pub fn describe(name: &str) -> Option<&'static NodeDescriptor> {
    catalog().into_iter().find(|d| d.name == name)
}

#[cfg(test)]
#[path = "../../tests/unit/node/registry.rs"]
mod tests;
