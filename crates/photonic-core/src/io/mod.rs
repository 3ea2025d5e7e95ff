pub mod image_io;

pub use image_io::{is_image_file, is_raw_file, list_images, load_image, save_image};
