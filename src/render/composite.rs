use anyhow::Context;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::{RenderError, RenderResult};

/// Largest accepted overlay width or height in pixels.
pub const MAX_TARGET_DIMENSION: u32 = 10_000;
/// Resizes closer than this many pixels on both axes are skipped.
pub const RESIZE_TOLERANCE: u32 = 2;

/// Where an overlay goes on the canvas. Missing dimensions are derived from
/// the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMode {
    /// Scale to cover the target, then center-crop the overflow.
    Cover,
    /// Scale to fit inside the target, keeping aspect ratio.
    #[default]
    Contain,
    /// Stretch to the target, ignoring aspect ratio.
    Fill,
    /// Draw at native size.
    None,
}

impl FromStr for FitMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cover" => Ok(Self::Cover),
            "contain" => Ok(Self::Contain),
            "fill" => Ok(Self::Fill),
            "none" => Ok(Self::None),
            _ => Err(format!("invalid fit mode '{}'", value)),
        }
    }
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cover => "cover",
            Self::Contain => "contain",
            Self::Fill => "fill",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// A decoded overlay image with its resolved placement.
#[derive(Debug, Clone)]
pub struct OverlayStyle {
    pub image: RgbaImage,
    pub placement: Placement,
    pub fit: FitMode,
    /// Clamped to `[0, 1]` when used.
    pub opacity: f32,
}

impl OverlayStyle {
    pub fn new(image: RgbaImage, placement: Placement) -> Self {
        Self {
            image,
            placement,
            fit: FitMode::default(),
            opacity: 1.0,
        }
    }

    /// Decodes an encoded image (PNG, JPEG, ...) into an overlay.
    pub fn decode(bytes: &[u8], placement: Placement) -> RenderResult<Self> {
        let image = image::load_from_memory(bytes)
            .context("failed to decode overlay image")?
            .to_rgba8();
        Ok(Self::new(image, placement))
    }
}

/// Target size for an overlay: explicit dimensions win, a single dimension
/// derives the other from the source aspect ratio, none means native size.
pub fn resolve_dimensions(placement: &Placement, source: (u32, u32)) -> RenderResult<(u32, u32)> {
    let (sw, sh) = source;
    if sw == 0 || sh == 0 {
        return Err(RenderError::validation(format!(
            "source image has zero size ({}x{})",
            sw, sh
        )));
    }
    let (tw, th) = match (placement.width, placement.height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, scale_dimension(w, sh, sw)),
        (None, Some(h)) => (scale_dimension(h, sw, sh), h),
        (None, None) => (sw, sh),
    };
    validate_dimension("width", tw)?;
    validate_dimension("height", th)?;
    Ok((tw, th))
}

fn scale_dimension(known: u32, numerator: u32, denominator: u32) -> u32 {
    let value = (f64::from(known) * f64::from(numerator) / f64::from(denominator)).round();
    value.min(f64::from(u32::MAX)) as u32
}

fn validate_dimension(name: &str, value: u32) -> RenderResult<()> {
    if value == 0 || value > MAX_TARGET_DIMENSION {
        return Err(RenderError::validation(format!(
            "overlay {} {} out of range (1..={})",
            name, value, MAX_TARGET_DIMENSION
        )));
    }
    Ok(())
}

/// Applies `fit` to scale `source` towards `target`.
pub fn fit_image(source: &RgbaImage, target: (u32, u32), fit: FitMode) -> Cow<'_, RgbaImage> {
    let (tw, th) = target;
    let (sw, sh) = source.dimensions();
    if sw == 0 || sh == 0 || tw == 0 || th == 0 {
        return Cow::Borrowed(source);
    }
    let scale_x = f64::from(tw) / f64::from(sw);
    let scale_y = f64::from(th) / f64::from(sh);

    match fit {
        FitMode::Cover => {
            let cropped = crop_to_aspect(source, target);
            let (cw, ch) = cropped.dimensions();
            if cw >= tw && ch >= th && within_tolerance((cw, ch), target) {
                center_crop(cropped, target)
            } else {
                Cow::Owned(resize(&cropped, target))
            }
        }
        FitMode::Contain => {
            let scale = scale_x.min(scale_y);
            let wanted = (
                scaled(sw, scale).min(tw),
                scaled(sh, scale).min(th),
            );
            let inside = sw <= tw && sh <= th;
            if inside && within_tolerance((sw, sh), wanted) {
                Cow::Borrowed(source)
            } else {
                Cow::Owned(resize(source, wanted))
            }
        }
        FitMode::Fill => {
            if within_tolerance((sw, sh), target) {
                Cow::Borrowed(source)
            } else {
                Cow::Owned(resize(source, target))
            }
        }
        FitMode::None => Cow::Borrowed(source),
    }
}

fn scaled(value: u32, scale: f64) -> u32 {
    ((f64::from(value) * scale).round() as u32).max(1)
}

fn within_tolerance(current: (u32, u32), wanted: (u32, u32)) -> bool {
    current.0.abs_diff(wanted.0) <= RESIZE_TOLERANCE && current.1.abs_diff(wanted.1) <= RESIZE_TOLERANCE
}

fn resize(source: &RgbaImage, (width, height): (u32, u32)) -> RgbaImage {
    tracing::debug!(
        from_width = source.width(),
        from_height = source.height(),
        width,
        height,
        "resizing overlay"
    );
    imageops::resize(source, width, height, FilterType::Lanczos3)
}

/// Center-crops `source` to the aspect ratio of `target`, so scaling the
/// result never produces more than `target` pixels.
fn crop_to_aspect(source: &RgbaImage, (tw, th): (u32, u32)) -> Cow<'_, RgbaImage> {
    let (sw, sh) = source.dimensions();
    let wide = u64::from(sw) * u64::from(th);
    let tall = u64::from(sh) * u64::from(tw);
    let (crop_w, crop_h) = if wide > tall {
        (scale_dimension(sh, tw, th).clamp(1, sw), sh)
    } else if tall > wide {
        (sw, scale_dimension(sw, th, tw).clamp(1, sh))
    } else {
        (sw, sh)
    };
    center_crop(Cow::Borrowed(source), (crop_w, crop_h))
}

/// Crops symmetrically down to `target` on every axis that exceeds it.
fn center_crop(image: Cow<'_, RgbaImage>, (tw, th): (u32, u32)) -> Cow<'_, RgbaImage> {
    let (w, h) = image.dimensions();
    if w <= tw && h <= th {
        return image;
    }
    let crop_w = w.min(tw);
    let crop_h = h.min(th);
    let x = (w - crop_w) / 2;
    let y = (h - crop_h) / 2;
    Cow::Owned(imageops::crop_imm(image.as_ref(), x, y, crop_w, crop_h).to_image())
}

/// Blends one straight-alpha source pixel over `dst`.
///
/// `alpha = srcA × opacity / 255`, colour channels mix linearly by `alpha`,
/// and the result keeps the larger of `srcA × opacity` and `dstA`.
pub fn blend_pixel(dst: Rgba<u8>, src: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let opacity = clamp_opacity(opacity);
    let src_alpha = f32::from(src[3]) * opacity;
    let alpha = src_alpha / 255.0;
    if alpha <= 0.0 {
        return dst;
    }
    let mut out = dst;
    for channel in 0..3 {
        let mixed = f32::from(src[channel]) * alpha + f32::from(dst[channel]) * (1.0 - alpha);
        out[channel] = mixed.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = src_alpha.round().clamp(0.0, 255.0).max(f32::from(dst[3])) as u8;
    out
}

pub(crate) fn clamp_opacity(opacity: f32) -> f32 {
    if opacity.is_nan() {
        0.0
    } else {
        opacity.clamp(0.0, 1.0)
    }
}

/// Blends `image` onto `canvas` with its top-left corner at (`x`, `y`),
/// clipping whatever falls outside the canvas.
pub fn blend_onto(canvas: &mut RgbaImage, image: &RgbaImage, x: i32, y: i32, opacity: f32) {
    let opacity = clamp_opacity(opacity);
    if opacity <= 0.0 {
        return;
    }
    let (cw, ch) = canvas.dimensions();
    let x0 = i64::from(x).max(0);
    let y0 = i64::from(y).max(0);
    let x1 = (i64::from(x) + i64::from(image.width())).min(i64::from(cw));
    let y1 = (i64::from(y) + i64::from(image.height())).min(i64::from(ch));
    for dy in y0..y1 {
        for dx in x0..x1 {
            let src = *image.get_pixel((dx - i64::from(x)) as u32, (dy - i64::from(y)) as u32);
            let dst = canvas.get_pixel_mut(dx as u32, dy as u32);
            *dst = blend_pixel(*dst, src, opacity);
        }
    }
}

/// Resolves the target size, fits `source` and blends it onto `canvas`.
///
/// Fails with [`RenderError::Validation`] when the source or target size is
/// degenerate; the canvas is untouched in that case.
pub fn composite(
    canvas: &mut RgbaImage,
    source: &RgbaImage,
    placement: &Placement,
    fit: FitMode,
    opacity: f32,
) -> RenderResult<()> {
    let target = resolve_dimensions(placement, source.dimensions())?;
    let fitted = fit_image(source, target, fit);
    tracing::debug!(
        %fit,
        target_width = target.0,
        target_height = target.1,
        width = fitted.width(),
        height = fitted.height(),
        "compositing overlay"
    );
    blend_onto(canvas, &fitted, placement.x, placement.y, opacity);
    Ok(())
}

pub fn composite_overlay(canvas: &mut RgbaImage, overlay: &OverlayStyle) -> RenderResult<()> {
    composite(
        canvas,
        &overlay.image,
        &overlay.placement,
        overlay.fit,
        overlay.opacity,
    )
}
