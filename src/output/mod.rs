pub mod decode_folder;
pub mod paths;
pub mod save_image;
