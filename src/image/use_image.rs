use super::loader::{FsImageLoader, ImageLoader, LoadedImage};
use super::source::ImageSource;
use crate::async_state::{use_async_state, AsyncState, AsyncStateOptions};
use crate::error::{Error, LoadError};
use crate::signal::{watch, MaybeSignal, Subscription};
use std::ops::Deref;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Options accepted by [`use_image`].
pub type UseImageOptions = AsyncStateOptions<LoadedImage, LoadError>;

/// Reactive image load returned by [`use_image`].
///
/// Derefs to the underlying [`AsyncState`]. While this handle is alive a
/// reactive source is watched and every change triggers a reload; dropping
/// it stops watching.
pub struct UseImage {
    state: AsyncState<LoadedImage, LoadError>,
    watcher: Option<Subscription>,
}

impl UseImage {
    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }
}

impl Deref for UseImage {
    type Target = AsyncState<LoadedImage, LoadError>;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

impl std::fmt::Debug for UseImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UseImage")
            .field("state", &self.state)
            .field("watching", &self.is_watching())
            .finish()
    }
}

/// Reactively load an image from the filesystem.
///
/// Shorthand for [`use_image_with`] using the default [`FsImageLoader`].
///
/// # Examples
///
/// ```no_run
/// use tincan_use::{use_image, ImageSource, Signal, UseImageOptions};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let source = Signal::new(ImageSource::new("a.png")?);
/// let image = use_image(&source, UseImageOptions::default())?;
///
/// image.settled().await;
/// if let Some(loaded) = image.state() {
///     println!("{}x{}", loaded.width(), loaded.height());
/// }
///
/// // Reloads, resetting `state` first.
/// source.set(ImageSource::new("b.png")?);
/// # Ok(())
/// # }
/// ```
pub fn use_image(
    source: impl Into<MaybeSignal<ImageSource>>,
    options: UseImageOptions,
) -> Result<UseImage, Error> {
    use_image_with(source, FsImageLoader::default(), options)
}

/// Reactively load an image through `loader`.
///
/// Each execution takes a snapshot of the source and performs exactly one
/// load. With the default options the first load starts immediately and
/// `state` is reset before every load. When `source` is a signal, any change
/// to it, nested fields included, triggers a new execution after
/// `options.delay`. Results of superseded loads are discarded.
///
/// Must be called inside a tokio runtime.
pub fn use_image_with<L: ImageLoader>(
    source: impl Into<MaybeSignal<ImageSource>>,
    loader: L,
    options: UseImageOptions,
) -> Result<UseImage, Error> {
    let source = source.into();
    let loader = Arc::new(loader);
    let delay = options.delay;

    let handle = Handle::try_current()?;
    let state = use_async_state(
        {
            let source = source.clone();
            move || loader.load(source.get())
        },
        options,
    )?;

    let watcher = source.as_signal().map(|signal| {
        let state = state.clone();
        watch(signal, move |new, _old| {
            tracing::debug!(src = new.src(), "image source changed, reloading");
            drop(state.spawn_execute(&handle, delay));
        })
    });

    Ok(UseImage { state, watcher })
}
