//! Decode, encode and format services around the segmentation engine

pub mod format;
pub mod io;

pub use format::OutputFormatHandler;
pub use io::ImageIOService;
