use std::borrow::Cow;

use crate::error::RenderError;
use crate::layout::{Rect, TextStyle};
use crate::render::{
    Canvas, OverlayStyle, TextLayout, composite_overlay, draw_debug_frame, render_text,
};

/// Margin used for text areas left at all zeros.
pub const DEFAULT_AREA_MARGIN: u32 = 60;

/// One labelled text block (for example `title` or `description`).
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub label: String,
    pub text: String,
    pub style: TextStyle,
}

impl TextBlock {
    pub fn new(label: impl Into<String>, text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
            style,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Outline text areas and blocks and label them.
    pub debug: bool,
}

#[derive(Debug, Default)]
pub struct RenderOutcome {
    /// Layout per text block, `None` for blocks with no text.
    pub layouts: Vec<Option<TextLayout>>,
    /// Overlays that could not be composited, by index.
    pub overlay_errors: Vec<(usize, RenderError)>,
}

impl RenderOutcome {
    pub fn is_complete(&self) -> bool {
        self.overlay_errors.is_empty()
    }
}

/// Draws every text block, then every overlay in order, onto `canvas`.
///
/// A failing overlay is recorded in the outcome and the remaining overlays
/// are still drawn.
pub fn render_card(
    canvas: &mut Canvas,
    blocks: &[TextBlock],
    overlays: &[OverlayStyle],
    options: &RenderOptions,
) -> RenderOutcome {
    let mut outcome = RenderOutcome::default();

    for block in blocks {
        if block.text.trim().is_empty() {
            tracing::debug!(label = %block.label, "empty text, skipping block");
            outcome.layouts.push(None);
            continue;
        }
        let style = with_default_area(&block.style, canvas);
        let layout = render_text(canvas, &block.text, &style);
        tracing::debug!(
            label = %block.label,
            size = layout.size,
            lines = layout.lines.len(),
            "text block rendered"
        );
        if options.debug {
            draw_debug_frame(canvas, &layout, &style, &block.label);
        }
        outcome.layouts.push(Some(layout));
    }

    for (idx, overlay) in overlays.iter().enumerate() {
        if let Err(err) = composite_overlay(canvas, overlay) {
            tracing::warn!(overlay = idx, "failed to composite overlay: {err}");
            outcome.overlay_errors.push((idx, err));
        }
    }

    outcome
}

fn with_default_area<'a>(style: &'a TextStyle, canvas: &Canvas) -> Cow<'a, TextStyle> {
    if !style.area.is_zero() {
        return Cow::Borrowed(style);
    }
    let mut style = style.clone();
    style.area = Rect::inset(canvas.width(), canvas.height(), DEFAULT_AREA_MARGIN);
    Cow::Owned(style)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontFace;
    use crate::render::{FitMode, Placement};
    use image::{Rgba, RgbaImage};

    fn block(label: &str, text: &str, area: Rect) -> TextBlock {
        let mut style = TextStyle::new(FontFace::estimated(), 40.0, area);
        style.line_height = 1.5;
        TextBlock::new(label, text, style)
    }

    #[test]
    fn zero_area_becomes_margin_inset() {
        let mut canvas = RgbaImage::new(1200, 630);
        let outcome = render_card(
            &mut canvas,
            &[block("title", "日本語", Rect::default())],
            &[],
            &RenderOptions::default(),
        );
        let layout = outcome.layouts[0].as_ref().expect("layout");
        // 120x60 block centered in the 1080x510 inset at (60, 60).
        assert_eq!(layout.block, Rect::new(540, 285, 120, 60));
    }

    #[test]
    fn blank_blocks_are_skipped() {
        let mut canvas = RgbaImage::new(100, 100);
        let outcome = render_card(
            &mut canvas,
            &[block("description", "  \n ", Rect::new(0, 0, 100, 100))],
            &[],
            &RenderOptions::default(),
        );
        assert_eq!(outcome.layouts.len(), 1);
        assert!(outcome.layouts[0].is_none());
    }

    #[test]
    fn bad_overlay_does_not_stop_later_ones() {
        let mut canvas = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 255]));
        let red = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let broken = OverlayStyle {
            image: red.clone(),
            placement: Placement {
                x: 0,
                y: 0,
                width: Some(0),
                height: None,
            },
            fit: FitMode::Fill,
            opacity: 1.0,
        };
        let fine = OverlayStyle::new(red, Placement::default());
        let outcome = render_card(&mut canvas, &[], &[broken, fine], &RenderOptions::default());
        assert!(!outcome.is_complete());
        assert_eq!(outcome.overlay_errors.len(), 1);
        assert_eq!(outcome.overlay_errors[0].0, 0);
        assert_eq!(*canvas.get_pixel(1, 1), Rgba([255, 0, 0, 255]));
    }
}
