//! `srcset` and `sizes` parsing and candidate selection.
//!
//! Supports the subset of the HTML grammar that matters for picking a file:
//! density (`2x`) and width (`480w`) descriptors, and source sizes made of
//! an optional `(min-width: Npx)` / `(max-width: Npx)` condition followed by
//! a `px` or `vw` length.

use crate::error::SourceError;

/// Descriptor attached to a `srcset` candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Descriptor {
    /// Pixel density, e.g. `2x`.
    Density(f32),
    /// Intrinsic width in pixels, e.g. `480w`.
    Width(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub url: String,
    pub descriptor: Descriptor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaCondition {
    MinWidth(f32),
    MaxWidth(f32),
}

impl MediaCondition {
    fn matches(&self, viewport: &Viewport) -> bool {
        match *self {
            MediaCondition::MinWidth(px) => viewport.width >= px,
            MediaCondition::MaxWidth(px) => viewport.width <= px,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Px(f32),
    /// Percentage of the viewport width.
    Vw(f32),
}

impl Length {
    fn to_px(self, viewport: &Viewport) -> f32 {
        match self {
            Length::Px(px) => px,
            Length::Vw(vw) => vw / 100.0 * viewport.width,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceSize {
    pub condition: Option<MediaCondition>,
    pub length: Length,
}

/// The display an image is selected for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Width in CSS pixels.
    pub width: f32,
    pub device_pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: f32, device_pixel_ratio: f32) -> Self {
        Self {
            width,
            device_pixel_ratio,
        }
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    pub fn with_device_pixel_ratio(mut self, ratio: f32) -> Self {
        self.device_pixel_ratio = ratio;
        self
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1024.0, 1.0)
    }
}

/// Parse a `srcset` attribute.
///
/// Candidates without a descriptor default to `1x`. Mixing density and width
/// descriptors is rejected.
pub fn parse_srcset(input: &str) -> Result<Vec<Candidate>, SourceError> {
    let mut candidates = Vec::new();

    for part in input.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let invalid = || SourceError::InvalidSrcset(part.to_string());
        let mut tokens = part.split_whitespace();
        let url = tokens.next().ok_or_else(invalid)?;
        let descriptor = match tokens.next() {
            None => Descriptor::Density(1.0),
            Some(token) => parse_descriptor(token).ok_or_else(invalid)?,
        };
        if tokens.next().is_some() {
            return Err(invalid());
        }

        candidates.push(Candidate {
            url: url.to_string(),
            descriptor,
        });
    }

    let widths = candidates
        .iter()
        .filter(|c| matches!(c.descriptor, Descriptor::Width(_)))
        .count();
    if widths != 0 && widths != candidates.len() {
        return Err(SourceError::InvalidSrcset(input.trim().to_string()));
    }

    Ok(candidates)
}

fn parse_descriptor(token: &str) -> Option<Descriptor> {
    if let Some(density) = token.strip_suffix('x') {
        let density: f32 = density.parse().ok()?;
        (density.is_finite() && density > 0.0).then_some(Descriptor::Density(density))
    } else if let Some(width) = token.strip_suffix('w') {
        let width: u32 = width.parse().ok()?;
        (width > 0).then_some(Descriptor::Width(width))
    } else {
        None
    }
}

/// Parse a `sizes` attribute.
pub fn parse_sizes(input: &str) -> Result<Vec<SourceSize>, SourceError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            parse_source_size(part).ok_or_else(|| SourceError::InvalidSizes(part.to_string()))
        })
        .collect()
}

fn parse_source_size(part: &str) -> Option<SourceSize> {
    let (condition, length) = match part.strip_prefix('(') {
        Some(rest) => {
            let (condition, length) = rest.split_once(')')?;
            (Some(parse_condition(condition)?), length.trim())
        }
        None => (None, part),
    };

    Some(SourceSize {
        condition,
        length: parse_length(length)?,
    })
}

fn parse_condition(condition: &str) -> Option<MediaCondition> {
    let (feature, value) = condition.split_once(':')?;
    let px = parse_px(value.trim())?;
    match feature.trim() {
        "min-width" => Some(MediaCondition::MinWidth(px)),
        "max-width" => Some(MediaCondition::MaxWidth(px)),
        _ => None,
    }
}

fn parse_length(length: &str) -> Option<Length> {
    if let Some(vw) = length.strip_suffix("vw") {
        let vw: f32 = vw.trim().parse().ok()?;
        (vw.is_finite() && vw >= 0.0).then_some(Length::Vw(vw))
    } else {
        parse_px(length).map(Length::Px)
    }
}

fn parse_px(value: &str) -> Option<f32> {
    let px: f32 = value.strip_suffix("px")?.trim().parse().ok()?;
    (px.is_finite() && px >= 0.0).then_some(px)
}

/// Width of the layout slot the image occupies, in CSS pixels.
///
/// The first source size whose condition matches wins; without a match the
/// image fills the viewport.
pub fn slot_width(sizes: &[SourceSize], viewport: &Viewport) -> f32 {
    sizes
        .iter()
        .find(|size| size.condition.map_or(true, |c| c.matches(viewport)))
        .map_or(viewport.width, |size| size.length.to_px(viewport))
}

/// Pick the address to load for `viewport`.
///
/// `src` takes part as a `1x` candidate unless `srcset` already has one or
/// uses width descriptors. The winner is the candidate with the smallest
/// effective density that still covers the device pixel ratio, or the
/// densest candidate if none does.
pub fn select<'a>(
    src: &'a str,
    srcset: &'a [Candidate],
    sizes: &[SourceSize],
    viewport: &Viewport,
) -> &'a str {
    if srcset.is_empty() {
        return src;
    }

    let slot = slot_width(sizes, viewport);
    let mut densities: Vec<(&str, f32)> = srcset
        .iter()
        .map(|candidate| {
            let density = match candidate.descriptor {
                Descriptor::Density(density) => density,
                Descriptor::Width(width) if slot > 0.0 => width as f32 / slot,
                Descriptor::Width(_) => f32::INFINITY,
            };
            (candidate.url.as_str(), density)
        })
        .collect();

    let has_width = srcset
        .iter()
        .any(|c| matches!(c.descriptor, Descriptor::Width(_)));
    let has_1x = srcset
        .iter()
        .any(|c| c.descriptor == Descriptor::Density(1.0));
    if !has_width && !has_1x {
        densities.push((src, 1.0));
    }

    let target = viewport.device_pixel_ratio;
    let covering = densities
        .iter()
        .filter(|(_, density)| *density >= target)
        .fold(None::<(&str, f32)>, |best, &(url, density)| match best {
            Some((_, best_density)) if best_density <= density => best,
            _ => Some((url, density)),
        });

    let chosen = covering.or_else(|| {
        densities
            .iter()
            .fold(None::<(&str, f32)>, |best, &(url, density)| match best {
                Some((_, best_density)) if best_density >= density => best,
                _ => Some((url, density)),
            })
    });

    let url = chosen.map_or(src, |(url, _)| url);
    tracing::trace!(url, slot, target, "selected image candidate");
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_density_and_default_descriptors() {
        let candidates = parse_srcset("a.png, b.png 2x, c.png 1.5x,").unwrap();
        assert_eq!(
            candidates,
            vec![
                Candidate {
                    url: "a.png".into(),
                    descriptor: Descriptor::Density(1.0)
                },
                Candidate {
                    url: "b.png".into(),
                    descriptor: Descriptor::Density(2.0)
                },
                Candidate {
                    url: "c.png".into(),
                    descriptor: Descriptor::Density(1.5)
                },
            ]
        );
    }

    #[test]
    fn rejects_malformed_srcset() {
        assert_eq!(
            parse_srcset("a.png 2y"),
            Err(SourceError::InvalidSrcset("a.png 2y".into()))
        );
        assert!(parse_srcset("a.png 0x").is_err());
        assert!(parse_srcset("a.png 2x extra").is_err());
        assert!(parse_srcset("a.png 2x, b.png 300w").is_err());
    }

    #[test]
    fn parses_sizes() {
        let sizes =
            parse_sizes("(max-width: 600px) 480px, (min-width: 1200px) 50vw, 800px").unwrap();
        assert_eq!(sizes.len(), 3);
        assert_eq!(sizes[0].condition, Some(MediaCondition::MaxWidth(600.0)));
        assert_eq!(sizes[0].length, Length::Px(480.0));
        assert_eq!(sizes[1].length, Length::Vw(50.0));
        assert_eq!(sizes[2].condition, None);
    }

    #[test]
    fn rejects_malformed_sizes() {
        assert!(parse_sizes("(orientation: portrait) 100vw").is_err());
        assert!(parse_sizes("(max-width: 600px 480px").is_err());
        assert!(parse_sizes("50%").is_err());
    }

    #[test]
    fn slot_width_uses_first_matching_size() {
        let sizes = parse_sizes("(max-width: 600px) 480px, 50vw").unwrap();
        assert_eq!(slot_width(&sizes, &Viewport::new(500.0, 1.0)), 480.0);
        assert_eq!(slot_width(&sizes, &Viewport::new(1000.0, 1.0)), 500.0);
        assert_eq!(slot_width(&[], &Viewport::new(1000.0, 1.0)), 1000.0);
    }

    #[test]
    fn select_without_srcset_uses_src() {
        assert_eq!(select("a.png", &[], &[], &Viewport::default()), "a.png");
    }

    #[test]
    fn select_by_density() {
        let srcset = parse_srcset("a@2x.png 2x, a@3x.png 3x").unwrap();
        let low = Viewport::default();
        let high = Viewport::default().with_device_pixel_ratio(2.0);
        let huge = Viewport::default().with_device_pixel_ratio(4.0);

        assert_eq!(select("a.png", &srcset, &[], &low), "a.png");
        assert_eq!(select("a.png", &srcset, &[], &high), "a@2x.png");
        assert_eq!(select("a.png", &srcset, &[], &huge), "a@3x.png");
    }

    #[test]
    fn select_by_width_and_sizes() {
        let srcset = parse_srcset("small.png 480w, large.png 1080w").unwrap();
        let sizes = parse_sizes("(max-width: 600px) 480px, 1000px").unwrap();

        let phone = Viewport::new(400.0, 1.0);
        let desktop = Viewport::new(1400.0, 1.0);
        assert_eq!(select("fallback.png", &srcset, &sizes, &phone), "small.png");
        assert_eq!(select("fallback.png", &srcset, &sizes, &desktop), "large.png");
    }
}
