use super::source::ImageSource;
use super::srcset::Viewport;
use crate::error::LoadError;
use futures::future::{BoxFuture, FutureExt};
use image::{DynamicImage, GenericImageView, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A successfully loaded and decoded image.
///
/// Cloning is cheap; clones share the decoded pixels.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    current_src: String,
    image: Arc<DynamicImage>,
}

impl LoadedImage {
    pub fn new(current_src: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            current_src: current_src.into(),
            image: Arc::new(image),
        }
    }

    /// The candidate address that was actually loaded.
    pub fn current_src(&self) -> &str {
        &self.current_src
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Performs a single load of an [`ImageSource`].
///
/// Each call is one independent attempt: no caching, no deduplication, no
/// retries and no timeout.
pub trait ImageLoader: Send + Sync + 'static {
    fn load(&self, source: ImageSource) -> BoxFuture<'static, Result<LoadedImage, LoadError>>;
}

impl<L: ImageLoader + ?Sized> ImageLoader for Arc<L> {
    fn load(&self, source: ImageSource) -> BoxFuture<'static, Result<LoadedImage, LoadError>> {
        (**self).load(source)
    }
}

impl<L: ImageLoader + ?Sized> ImageLoader for Box<L> {
    fn load(&self, source: ImageSource) -> BoxFuture<'static, Result<LoadedImage, LoadError>> {
        (**self).load(source)
    }
}

/// Loads images from the local filesystem.
///
/// The candidate is picked for the configured [`Viewport`], read with
/// `tokio::fs` and decoded off the async threads. Relative addresses are
/// resolved against `base_dir` when one is set, and a leading `file://` is
/// accepted.
#[derive(Debug, Clone, Default)]
pub struct FsImageLoader {
    base_dir: Option<PathBuf>,
    viewport: Viewport,
}

impl FsImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Filesystem path an address resolves to.
    pub fn resolve_path(&self, src: &str) -> PathBuf {
        let path = Path::new(src.strip_prefix("file://").unwrap_or(src));
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ImageLoader for FsImageLoader {
    fn load(&self, source: ImageSource) -> BoxFuture<'static, Result<LoadedImage, LoadError>> {
        let current_src = source.select(&self.viewport).to_string();
        let path = self.resolve_path(&current_src);

        async move {
            tracing::debug!(src = %current_src, path = %path.display(), "loading image");

            let result = read_and_decode(&path)
                .await
                .map(|image| LoadedImage::new(current_src.clone(), image))
                .map_err(|err| LoadError::new(current_src.clone(), err));

            match &result {
                Ok(loaded) => tracing::debug!(
                    src = %current_src,
                    width = loaded.width(),
                    height = loaded.height(),
                    "image loaded"
                ),
                Err(err) => {
                    tracing::warn!(src = %current_src, error = %err, "image failed to load")
                }
            }
            result
        }
        .boxed()
    }
}

async fn read_and_decode(
    path: &Path,
) -> Result<DynamicImage, Box<dyn std::error::Error + Send + Sync>> {
    let bytes = tokio::fs::read(path).await?;
    let image = tokio::task::spawn_blocking(move || decode(bytes)).await??;
    Ok(image)
}

fn decode(bytes: Vec<u8>) -> Result<DynamicImage, image::ImageError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()
}
