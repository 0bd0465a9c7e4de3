#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]
#![allow(clippy::cast_possible_truncation)]

//! # White Background Removal Library
//!
//! Segments near-white backgrounds out of RGBA images and synthesizes an alpha
//! channel for them. No models are involved: every pixel is classified by color,
//! then two independent passes vote on which background pixels really are
//! background.
//!
//! - **Density pass**: an interior background pixel is removed when more than
//!   60% of its in-bounds 8-neighbors are background. Border pixels always vote.
//! - **Connectivity pass**: a 4-connected flood fill seeded from every
//!   background pixel on the image border.
//!
//! A pixel becomes transparent if either pass votes for it. Only the alpha
//! channel is ever written; RGB bytes are left untouched.
//!
//! ## Quick Start
//!
//! ```rust
//! use whitebg_remove::{segment_and_make_transparent, PixelBuffer};
//!
//! // 3x3 white image with a black center
//! let mut buffer = PixelBuffer::filled(3, 3, [255, 255, 255, 255]);
//! buffer.data[16..19].copy_from_slice(&[0, 0, 0]);
//!
//! let output = segment_and_make_transparent(buffer)?;
//! assert_eq!(output.alpha_at(4), 255);
//! assert_eq!(output.alpha_at(0), 0);
//! # Ok::<(), whitebg_remove::RemovalError>(())
//! ```
//!
//! ## Encoded images
//!
//! ```rust,no_run
//! use whitebg_remove::{remove_background_from_reader, OutputFormat, RemovalConfig};
//! use tokio::fs::File;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = RemovalConfig::builder()
//!     .output_format(OutputFormat::Png)
//!     .build()?;
//!
//! let file = File::open("product.jpg").await?;
//! let mut result = remove_background_from_reader(file, &config).await?;
//! result.save("product_bg_removed.png", config.output_format)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `parallel` (default): run both passes concurrently and shard the density pass with rayon
//! - `cli` (default): command-line interface and progress reporting
//! - `webp-support` (default): WebP output
//! - `tracing-json`: JSON log output for the CLI
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! whitebg-remove = { version = "0.1", default-features = false, features = ["parallel"] }
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod flatten;
pub mod processor;
pub mod segmentation;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

use tokio::io::AsyncRead;

pub use config::{OutputFormat, RemovalConfig, RemovalMode, SegmentationConfig};
pub use error::{RemovalError, Result};
pub use flatten::flatten_white_to_transparent;
pub use processor::BackgroundRemovalProcessor;
pub use segmentation::{segment_and_make_transparent, Segmenter};
pub use services::{ImageIOService, OutputFormatHandler};
pub use types::{
    MaskStatistics, PixelBuffer, PixelDecision, ProcessingTimings, RemovalResult,
    SegmentationMask,
};

#[cfg(feature = "cli")]
pub use tracing_config::{events, init_cli_tracing, spans, TracingConfig, TracingFormat};

/// Remove the background from an image provided as encoded bytes
///
/// Accepts anything the `image` crate can decode (JPEG, PNG, WebP, BMP, TIFF).
/// Images without an alpha channel are expanded to RGBA with full opacity first.
///
/// # Examples
/// ```rust,no_run
/// use whitebg_remove::{remove_background_from_bytes, OutputFormat, RemovalConfig};
///
/// # async fn example(upload_bytes: Vec<u8>) -> anyhow::Result<()> {
/// let config = RemovalConfig::default();
/// let result = remove_background_from_bytes(&upload_bytes, &config).await?;
/// let png = result.to_bytes(OutputFormat::Png)?;
/// # Ok(())
/// # }
/// ```
pub async fn remove_background_from_bytes(
    image_bytes: &[u8],
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    let processor = BackgroundRemovalProcessor::new(config.clone())?;
    processor.process_bytes(image_bytes)
}

/// Remove the background from a decoded `DynamicImage`
///
/// # Examples
/// ```rust,no_run
/// use whitebg_remove::{remove_background_from_image, RemovalConfig};
///
/// # async fn example(img: image::DynamicImage) -> anyhow::Result<()> {
/// let result = remove_background_from_image(&img, &RemovalConfig::default()).await?;
/// let output = result.into_image()?;
/// # Ok(())
/// # }
/// ```
pub async fn remove_background_from_image(
    image: &image::DynamicImage,
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    let processor = BackgroundRemovalProcessor::new(config.clone())?;
    processor.process_image(image)
}

/// Remove the background from an async reader stream
///
/// The stream is read to the end before decoding.
///
/// # Examples
/// ```rust,no_run
/// use whitebg_remove::{remove_background_from_reader, RemovalConfig};
/// use tokio::fs::File;
///
/// # async fn example() -> anyhow::Result<()> {
/// let file = File::open("large_image.jpg").await?;
/// let result = remove_background_from_reader(file, &RemovalConfig::default()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn remove_background_from_reader<R: AsyncRead + Unpin>(
    mut reader: R,
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    let mut buffer = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut buffer)
        .await
        .map_err(|e| RemovalError::processing(format!("Failed to read from stream: {}", e)))?;

    remove_background_from_bytes(&buffer, config).await
}
