//! Process-wide cache of decoded pattern and marker images.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use lazy_static::lazy_static;
use log::debug;
use parking_lot::Mutex;
use quick_cache::unsync::Cache;
use thiserror::Error;

use crate::raster::Surface;

/// Number of images kept by the global cache.
pub const DEFAULT_CAPACITY: usize = 256;

/// Error loading an external resource.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResourceError {
    /// The file doesn't exist or can't be read.
    #[error("resource not found: {0}")]
    NotFound(String),
    /// The file is not a valid image.
    #[error("failed to decode {path}: {message}")]
    Decode {
        /// Path of the file.
        path: String,
        /// Decoder error.
        message: String,
    },
    /// Image decoding is not compiled in.
    #[error("cannot load {0}: image support is disabled")]
    Unsupported(String),
}

type CacheKey = (PathBuf, Option<SystemTime>);

/// LRU cache of decoded images keyed by absolute path and modification time, so that a file
/// changed on disk is loaded again.
pub struct ImageCache {
    capacity: usize,
    images: Mutex<Cache<CacheKey, Arc<Surface>>>,
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

lazy_static! {
    static ref GLOBAL_CACHE: ImageCache = ImageCache::new(DEFAULT_CAPACITY);
}

impl ImageCache {
    /// Creates a cache holding up to `capacity` images.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            images: Mutex::new(Cache::new(capacity.max(1))),
        }
    }

    /// Cache shared by all renders in the process.
    pub fn global() -> &'static ImageCache {
        &GLOBAL_CACHE
    }

    /// Number of cached images.
    pub fn len(&self) -> usize {
        self.images.lock().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all cached images.
    pub fn clear(&mut self) {
        *self.images.get_mut() = Cache::new(self.capacity);
    }

    /// Returns the decoded image at the path, loading it if it's not cached.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Arc<Surface>, ResourceError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let absolute =
            std::fs::canonicalize(path).map_err(|_| ResourceError::NotFound(display.clone()))?;
        let modified = std::fs::metadata(&absolute)
            .map_err(|_| ResourceError::NotFound(display.clone()))?
            .modified()
            .ok();
        let key = (absolute, modified);

        if let Some(image) = self.images.lock().get(&key) {
            return Ok(image.clone());
        }

        let bytes = std::fs::read(&key.0).map_err(|_| ResourceError::NotFound(display.clone()))?;
        let image = Arc::new(decode_image(&bytes).map_err(|err| match err {
            ResourceError::Decode { message, .. } => ResourceError::Decode {
                path: display.clone(),
                message,
            },
            ResourceError::Unsupported(_) => ResourceError::Unsupported(display.clone()),
            other => other,
        })?);
        debug!(
            "Loaded image {display} ({}x{})",
            image.width(),
            image.height()
        );

        self.images.lock().insert(key, image.clone());
        Ok(image)
    }
}

/// Decodes PNG, JPEG or TIFF bytes into a premultiplied surface.
#[cfg(feature = "image")]
pub fn decode_image(bytes: &[u8]) -> Result<Surface, ResourceError> {
    use image::GenericImageView;

    let decode_error = |message: String| ResourceError::Decode {
        path: String::new(),
        message,
    };
    let decoded = image::load_from_memory(bytes).map_err(|err| decode_error(err.to_string()))?;
    let (width, height) = decoded.dimensions();
    Surface::from_straight_rgba(width, height, &decoded.to_rgba8())
        .map_err(|err| decode_error(err.to_string()))
}

/// Decodes PNG, JPEG or TIFF bytes into a premultiplied surface.
#[cfg(not(feature = "image"))]
pub fn decode_image(_bytes: &[u8]) -> Result<Surface, ResourceError> {
    Err(ResourceError::Unsupported(String::new()))
}

#[cfg(all(test, feature = "image"))]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn write_png(name: &str, color: [u8; 4]) -> PathBuf {
        let dir = std::env::temp_dir().join("cartela-image-cache-tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let image = image::RgbaImage::from_pixel(3, 2, image::Rgba(color));
        image.save(&path).unwrap();
        path
    }

    #[test]
    fn loads_and_caches_images() {
        let path = write_png("red.png", [255, 0, 0, 255]);
        let cache = ImageCache::new(4);
        let first = cache.load(&path).unwrap();
        assert_eq!((first.width(), first.height()), (3, 2));
        assert_eq!(first.pixel(1, 1), [255, 0, 0, 255]);

        let second = cache.load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn images_are_premultiplied() {
        let path = write_png("half.png", [200, 100, 0, 128]);
        let image = ImageCache::new(4).load(&path).unwrap();
        let pixel = image.pixel(0, 0);
        assert_eq!(pixel[3], 128);
        assert!(pixel[0] >= 100 && pixel[0] <= 101);
    }

    #[test]
    fn errors() {
        let cache = ImageCache::new(4);
        assert_matches!(
            cache.load("/definitely/not/here.png"),
            Err(ResourceError::NotFound(_))
        );

        let dir = std::env::temp_dir().join("cartela-image-cache-tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert_matches!(cache.load(&path), Err(ResourceError::Decode { .. }));
    }
}
