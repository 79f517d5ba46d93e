pub mod download_image;

pub use download_image::download_image;
