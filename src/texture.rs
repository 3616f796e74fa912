use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use thiserror::Error;

/// Default asset sampled by the pyramid.
pub const DEFAULT_TEXTURE: &str = "brick.jpg";

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to load texture {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("unsupported texture format: image has {channels} channel(s), expected 3 or 4")]
    UnsupportedChannels { channels: u8 },
    #[error("texture is {width}x{height}, the GPU accepts at most {max} pixels per side")]
    TooLarge { width: u32, height: u32, max: u32 },
}

/// Decoded texture pixels, always widened to RGBA8 for upload.
///
/// Only 3- and 4-channel sources are accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    width: u32,
    height: u32,
    source_channels: u8,
    rgba: RgbaImage,
}

impl TextureImage {
    /// Reads and decodes the image at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|source| TextureError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_image(image)
    }

    pub fn from_image(image: DynamicImage) -> Result<Self, TextureError> {
        let channels = image.color().channel_count();
        if !matches!(channels, 3 | 4) {
            return Err(TextureError::UnsupportedChannels { channels });
        }
        let rgba = image.into_rgba8();
        Ok(Self {
            width: rgba.width(),
            height: rgba.height(),
            source_channels: channels,
            rgba,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channel count of the decoded source before widening.
    pub fn source_channels(&self) -> u8 {
        self.source_channels
    }

    /// Fails when either side exceeds `max_dimension`.
    pub fn ensure_fits(&self, max_dimension: u32) -> Result<(), TextureError> {
        if self.width > max_dimension || self.height > max_dimension {
            return Err(TextureError::TooLarge {
                width: self.width,
                height: self.height,
                max: max_dimension,
            });
        }
        Ok(())
    }

    /// Levels in a full mip chain down to 1x1.
    pub fn mip_level_count(&self) -> u32 {
        u32::BITS - self.width.max(self.height).leading_zeros()
    }

    /// The full image followed by successive half-size levels, each filtered
    /// from the one before it, ending at 1x1.
    pub fn mip_levels(&self) -> Vec<RgbaImage> {
        std::iter::successors(Some(self.rgba.clone()), |level| {
            (level.width() > 1 || level.height() > 1).then(|| {
                imageops::resize(
                    level,
                    (level.width() / 2).max(1),
                    (level.height() / 2).max(1),
                    FilterType::Triangle,
                )
            })
        })
        .collect()
    }
}
