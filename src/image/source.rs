use super::srcset::{self, Candidate, SourceSize, Viewport};
use crate::error::SourceError;

/// Description of an image to load, mirroring the `src`, `srcset` and
/// `sizes` attributes of an `<img>` tag.
///
/// Always valid: the address is non-empty and the optional attributes parse.
/// Two sources are equal when all three attributes are equal, which is what
/// [`use_image`](super::use_image) watches for.
///
/// ```
/// use tincan_use::ImageSource;
///
/// let source = ImageSource::builder("photo.png")
///     .srcset("photo@2x.png 2x")
///     .build()
///     .unwrap();
/// assert_eq!(source.src(), "photo.png");
/// assert!(ImageSource::new("  ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSource {
    src: String,
    srcset: Option<String>,
    sizes: Option<String>,
    candidates: Vec<Candidate>,
    source_sizes: Vec<SourceSize>,
}

impl ImageSource {
    pub fn new(src: impl Into<String>) -> Result<Self, SourceError> {
        Self::builder(src).build()
    }

    pub fn builder(src: impl Into<String>) -> ImageSourceBuilder {
        ImageSourceBuilder {
            src: src.into(),
            srcset: None,
            sizes: None,
        }
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn srcset(&self) -> Option<&str> {
        self.srcset.as_deref()
    }

    pub fn sizes(&self) -> Option<&str> {
        self.sizes.as_deref()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn source_sizes(&self) -> &[SourceSize] {
        &self.source_sizes
    }

    /// The address a display described by `viewport` would load.
    pub fn select(&self, viewport: &Viewport) -> &str {
        srcset::select(&self.src, &self.candidates, &self.source_sizes, viewport)
    }

    /// Replace the address. The source is left untouched on error.
    pub fn set_src(&mut self, src: impl Into<String>) -> Result<(), SourceError> {
        let src = validate_src(src.into())?;
        self.src = src;
        Ok(())
    }

    pub fn set_srcset(&mut self, srcset: Option<&str>) -> Result<(), SourceError> {
        self.candidates = srcset.map(srcset::parse_srcset).transpose()?.unwrap_or_default();
        self.srcset = srcset.map(str::to_string);
        Ok(())
    }

    pub fn set_sizes(&mut self, sizes: Option<&str>) -> Result<(), SourceError> {
        self.source_sizes = sizes.map(srcset::parse_sizes).transpose()?.unwrap_or_default();
        self.sizes = sizes.map(str::to_string);
        Ok(())
    }
}

impl TryFrom<&str> for ImageSource {
    type Error = SourceError;

    fn try_from(src: &str) -> Result<Self, Self::Error> {
        Self::new(src)
    }
}

impl TryFrom<String> for ImageSource {
    type Error = SourceError;

    fn try_from(src: String) -> Result<Self, Self::Error> {
        Self::new(src)
    }
}

fn validate_src(src: String) -> Result<String, SourceError> {
    if src.trim().is_empty() {
        Err(SourceError::EmptySource)
    } else {
        Ok(src)
    }
}

/// Builder for [`ImageSource`]; validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ImageSourceBuilder {
    src: String,
    srcset: Option<String>,
    sizes: Option<String>,
}

impl ImageSourceBuilder {
    /// Alternative candidates, e.g. `"a@2x.png 2x, a@3x.png 3x"`.
    pub fn srcset(mut self, srcset: impl Into<String>) -> Self {
        self.srcset = Some(srcset.into());
        self
    }

    /// Layout hints, e.g. `"(max-width: 600px) 480px, 800px"`.
    pub fn sizes(mut self, sizes: impl Into<String>) -> Self {
        self.sizes = Some(sizes.into());
        self
    }

    pub fn build(self) -> Result<ImageSource, SourceError> {
        let src = validate_src(self.src)?;
        let candidates = self
            .srcset
            .as_deref()
            .map(srcset::parse_srcset)
            .transpose()?
            .unwrap_or_default();
        let source_sizes = self
            .sizes
            .as_deref()
            .map(srcset::parse_sizes)
            .transpose()?
            .unwrap_or_default();

        Ok(ImageSource {
            src,
            srcset: self.srcset,
            sizes: self.sizes,
            candidates,
            source_sizes,
        })
    }
}
