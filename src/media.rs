use std::path::{Path, PathBuf};

use crate::constants::{MEDIA_URL, RECIPE_IMAGE_DIR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
    Bmp,
}

impl ImageFormat {
    /// Identifies an image by its leading magic bytes.
    pub fn detect(data: &[u8]) -> Option<Self> {
        match data {
            [0xFF, 0xD8, 0xFF, ..] => Some(ImageFormat::Jpeg),
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(ImageFormat::Png),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(ImageFormat::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => {
                Some(ImageFormat::Webp)
            }
            [b'B', b'M', ..] if data.len() > 26 => Some(ImageFormat::Bmp),
            _ => None,
        }
    }

    /// Identifies an image and decodes it completely, so truncated or
    /// corrupted files with a valid header are refused.
    pub fn verify(data: &[u8]) -> Option<Self> {
        let format = Self::detect(data)?;

        match image::load_from_memory_with_format(data, format.decoder()) {
            Ok(_) => Some(format),
            Err(e) => {
                log::trace!("> Rejected {format:?} upload: {e}");
                None
            }
        }
    }

    fn decoder(&self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Gif => image::ImageFormat::Gif,
            ImageFormat::Webp => image::ImageFormat::WebP,
            ImageFormat::Bmp => image::ImageFormat::Bmp,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
            ImageFormat::Bmp => "bmp",
        }
    }

    fn accepts_extension(&self, extension: &str) -> bool {
        match self {
            ImageFormat::Jpeg => matches!(extension, "jpg" | "jpeg" | "jpe" | "jfif"),
            _ => extension == self.extension(),
        }
    }
}

/// File extension for the stored image: the uploaded name's extension when
/// it agrees with the detected format, otherwise the format's own.
pub fn image_extension(format: ImageFormat, filename: Option<&str>) -> String {
    filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_ascii_lowercase())
        .filter(|extension| format.accepts_extension(extension))
        .unwrap_or_else(|| format.extension().to_string())
}

/// Public URL of a stored media path.
pub fn media_url(path: &str) -> String {
    format!("{MEDIA_URL}{path}")
}

/// Writes uploads below a root directory which is also served under `/media/`.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores a recipe image under a fresh name, returning its path relative to the root.
    pub async fn save_recipe_image(&self, data: &[u8], extension: &str) -> std::io::Result<String> {
        let relative = format!("{RECIPE_IMAGE_DIR}/{}.{extension}", uuid::Uuid::new_v4());
        let path = self.root.join(&relative);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;

        log::trace!("> Stored {} bytes at {}", data.len(), path.display());

        Ok(relative)
    }
}
