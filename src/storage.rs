//! Filesystem areas for received uploads and generated images.
//!
//! Filenames carry a timestamp plus a random suffix, so no two sessions ever
//! write the same path and no locking is needed around media files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::Rng;

const RECEIVED_DIR: &str = "received";
const GENERATED_DIR: &str = "generated";

/// Root of the local media areas (`<root>/received`, `<root>/generated`).
#[derive(Clone, Debug)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Persist a user upload and return its path.
    pub fn save_received(&self, bytes: &[u8], extension: &str) -> Result<PathBuf> {
        self.save(RECEIVED_DIR, bytes, extension)
    }

    /// Persist a generated image and return its name and path.
    pub fn save_generated(&self, bytes: &[u8], extension: &str) -> Result<(String, PathBuf)> {
        let path = self.save(GENERATED_DIR, bytes, extension)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok((file_name, path))
    }

    fn save(&self, area: &str, bytes: &[u8], extension: &str) -> Result<PathBuf> {
        let dir = self.root.join(area);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create media directory {}", dir.display()))?;

        let path = dir.join(unique_file_name(extension));
        fs::write(&path, bytes)
            .with_context(|| format!("failed to write media file {}", path.display()))?;
        Ok(path)
    }
}

fn unique_file_name(extension: &str) -> String {
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S%3f");
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{stamp}_{suffix:06}.{extension}")
}

/// File extension for image bytes, sniffed from the content. Defaults to
/// `jpg` when the format is not recognized (Telegram photos are JPEG).
pub fn sniff_extension(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) => "png",
        Ok(image::ImageFormat::WebP) => "webp",
        Ok(image::ImageFormat::Gif) => "gif",
        _ => "jpg",
    }
}

/// Mime type for an image file on disk, from its extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_extension() {
        // Minimal magic numbers are enough for format sniffing
        assert_eq!(sniff_extension(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]), "png");
        assert_eq!(sniff_extension(&[0xFF, 0xD8, 0xFF, 0xE0]), "jpg");
        assert_eq!(sniff_extension(b"not an image"), "jpg");
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("a/b.png")), "image/png");
        assert_eq!(mime_for_path(Path::new("a/b.JPG")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("no-extension")), "image/jpeg");
    }

    #[test]
    fn test_unique_file_names_differ() {
        let first = unique_file_name("png");
        let second = unique_file_name("png");
        assert!(first.ends_with(".png"));
        assert_ne!(first, second);
    }
}
