mod composite;
mod glyph;

use anyhow::{Result, anyhow};
use image::{Rgba, RgbaImage};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::layout::{
    Fitted, Line, Measurer, Overflow, Rect, TextStyle, block_origin, fit, line_x, wrap_at,
};

pub use composite::{
    FitMode, MAX_TARGET_DIMENSION, OverlayStyle, Placement, RESIZE_TOLERANCE, blend_onto,
    blend_pixel, composite, composite_overlay, fit_image, resolve_dimensions,
};

/// Caller-owned straight-alpha RGBA8 pixel buffer.
pub type Canvas = RgbaImage;

const DEBUG_AREA_COLOR: Rgba<u8> = Rgba([230, 30, 30, 255]);
const DEBUG_BLOCK_COLOR: Rgba<u8> = Rgba([30, 90, 230, 255]);
const DEBUG_LABEL_SIZE: f32 = 14.0;

/// A line with its pixel origin (top-left of its line box).
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedLine {
    pub line: Line,
    pub x: i32,
    pub y: i32,
    pub width: f32,
}

/// Final geometry of one text block.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub size: f32,
    pub block: Rect,
    pub lines: Vec<PositionedLine>,
}

/// Wraps (and, in shrink mode, fits) `text` into `style.area` and positions
/// every line.
pub fn layout_text(text: &str, style: &TextStyle) -> TextLayout {
    let area = style.area;
    let fitted = match style.overflow {
        Overflow::Shrink => fit(text, style, &area),
        Overflow::Clip => wrap_at(text, style, &area, style.size),
    };
    position_lines(fitted, style)
}

fn position_lines(fitted: Fitted, style: &TextStyle) -> TextLayout {
    let Fitted {
        size,
        lines,
        block_width,
        block_height,
    } = fitted;
    let block_w = block_width.ceil() as i32;
    let block_h = block_height.ceil() as i32;
    let (block_x, block_y) = block_origin(&style.area, style.block_position, block_w, block_h);
    let measurer = style.measurer(size);
    let line_box = style.line_box(size);

    let lines = lines
        .into_iter()
        .enumerate()
        .map(|(idx, line)| {
            let width = measurer.width(line.chars());
            let x = line_x(style.line_alignment, block_x, block_w, width.ceil() as i32);
            let y = block_y + (idx as f32 * line_box).round() as i32;
            PositionedLine { line, x, y, width }
        })
        .collect();

    TextLayout {
        size,
        block: Rect::new(block_x, block_y, block_w.max(0) as u32, block_h.max(0) as u32),
        lines,
    }
}

/// Draws every positioned line onto `canvas`. A line that fails to draw is
/// logged and skipped; returns how many lines were drawn.
pub fn draw_text(canvas: &mut Canvas, layout: &TextLayout, style: &TextStyle) -> usize {
    let Some(mut pixmap) = Pixmap::new(canvas.width(), canvas.height()) else {
        tracing::warn!("canvas has zero size, skipping text");
        return 0;
    };
    let measurer = style.measurer(layout.size);
    let line_box = style.line_box(layout.size);
    let paint = solid_paint(style.color);

    let mut drawn = 0;
    for positioned in &layout.lines {
        let baseline = baseline_y(style, layout.size, positioned.y, line_box);
        match draw_line(&mut pixmap, &measurer, positioned, baseline, &paint) {
            Ok(()) => drawn += 1,
            Err(err) => tracing::warn!(line = %positioned.line, "failed to draw line: {err}"),
        }
    }
    if drawn > 0 {
        blend_pixmap(canvas, &pixmap);
    }
    drawn
}

/// Lays out and draws one text block, returning its layout.
pub fn render_text(canvas: &mut Canvas, text: &str, style: &TextStyle) -> TextLayout {
    let layout = layout_text(text, style);
    draw_text(canvas, &layout, style);
    layout
}

fn baseline_y(style: &TextStyle, size: f32, line_top: i32, line_box: f32) -> f32 {
    let (ascender, descender) = style.font.vertical_extent_em();
    let glyph_height = (ascender - descender) * size;
    line_top as f32 + (line_box - glyph_height) / 2.0 + ascender * size
}

fn draw_line(
    pixmap: &mut Pixmap,
    measurer: &Measurer<'_>,
    positioned: &PositionedLine,
    baseline: f32,
    paint: &Paint<'_>,
) -> Result<()> {
    let face = measurer
        .glyph_face()
        .ok_or_else(|| anyhow!("font face has no glyph outlines"))?;
    let scale = measurer.scale();
    let mut pen_x = positioned.x as f32;
    for (idx, ch) in positioned.line.chars().iter().enumerate() {
        if idx > 0 {
            pen_x += measurer.letter_spacing();
        }
        if let Some(path) = glyph::glyph_path(face, *ch, pen_x, baseline, scale) {
            pixmap.fill_path(&path, paint, FillRule::Winding, Transform::identity(), None);
        }
        pen_x += measurer.advance(*ch);
    }
    Ok(())
}

/// Outlines the area and the text block, and labels the area with `label`.
pub fn draw_debug_frame(canvas: &mut Canvas, layout: &TextLayout, style: &TextStyle, label: &str) {
    let Some(mut pixmap) = Pixmap::new(canvas.width(), canvas.height()) else {
        return;
    };
    stroke_rect(&mut pixmap, &style.area, DEBUG_AREA_COLOR, 2.0);
    stroke_rect(&mut pixmap, &layout.block, DEBUG_BLOCK_COLOR, 1.0);

    let measurer = Measurer::new(&style.font, DEBUG_LABEL_SIZE, 0.0);
    let chars: Vec<char> = label.chars().collect();
    if !chars.is_empty() {
        let positioned = PositionedLine {
            width: measurer.width(&chars),
            line: Line::new(chars),
            x: style.area.x + 4,
            y: style.area.y + 2,
        };
        let baseline = positioned.y as f32 + DEBUG_LABEL_SIZE;
        let paint = solid_paint(DEBUG_AREA_COLOR);
        if let Err(err) = draw_line(&mut pixmap, &measurer, &positioned, baseline, &paint) {
            tracing::debug!(label, "debug label not drawn: {err}");
        }
    }
    blend_pixmap(canvas, &pixmap);
}

fn stroke_rect(pixmap: &mut Pixmap, rect: &Rect, color: Rgba<u8>, width: f32) {
    let Some(bounds) = tiny_skia::Rect::from_xywh(
        rect.x as f32,
        rect.y as f32,
        rect.width as f32,
        rect.height as f32,
    ) else {
        return;
    };
    let path = PathBuilder::from_rect(bounds);
    let stroke = Stroke {
        width,
        ..Stroke::default()
    };
    pixmap.stroke_path(
        &path,
        &solid_paint(color),
        &stroke,
        Transform::identity(),
        None,
    );
}

fn solid_paint(color: Rgba<u8>) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
    paint.anti_alias = true;
    paint
}

/// Blends a same-sized premultiplied pixmap onto the canvas at full opacity.
fn blend_pixmap(canvas: &mut Canvas, pixmap: &Pixmap) {
    let width = pixmap.width();
    for (idx, pixel) in pixmap.pixels().iter().enumerate() {
        if pixel.alpha() == 0 {
            continue;
        }
        let color = pixel.demultiply();
        let x = idx as u32 % width;
        let y = idx as u32 / width;
        let src = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
        let dst = canvas.get_pixel_mut(x, y);
        *dst = blend_pixel(*dst, src, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{FontFace, default_fallback_families, resolve_font};
    use crate::layout::{BlockPosition, LineAlignment};

    fn style(area: Rect) -> TextStyle {
        let mut style = TextStyle::new(FontFace::estimated(), 20.0, area);
        style.line_height = 1.5;
        style
    }

    #[test]
    fn lines_stack_by_line_height() {
        let style = style(Rect::new(0, 0, 1000, 1000));
        let layout = layout_text("一\n二二\n三", &style);
        assert_eq!(layout.size, 20.0);
        assert_eq!(layout.block, Rect::new(480, 455, 40, 90));
        let ys: Vec<i32> = layout.lines.iter().map(|l| l.y).collect();
        assert_eq!(ys, vec![455, 485, 515]);
    }

    #[test]
    fn ragged_lines_follow_line_alignment() {
        let mut style = style(Rect::new(100, 50, 400, 200));
        style.block_position = "top-left".parse::<BlockPosition>().unwrap();
        style.line_alignment = LineAlignment::Right;
        let layout = layout_text("一\n二二二", &style);
        assert_eq!(layout.block.x, 100);
        assert_eq!(layout.block.width, 60);
        assert_eq!(layout.lines[0].x, 140);
        assert_eq!(layout.lines[1].x, 100);

        style.line_alignment = LineAlignment::Center;
        let layout = layout_text("一\n二二二", &style);
        assert_eq!(layout.lines[0].x, 120);
    }

    #[test]
    fn clip_mode_keeps_size_and_every_line() {
        let mut style = style(Rect::new(0, 0, 40, 20));
        style.overflow = Overflow::Clip;
        let layout = layout_text("一二三四五六", &style);
        assert_eq!(layout.size, 20.0);
        assert_eq!(layout.lines.len(), 3);
        assert!(layout.block.height > style.area.height);
    }

    #[test]
    fn shrink_mode_reduces_size() {
        let style = style(Rect::new(0, 0, 40, 20));
        let layout = layout_text("一二三四五六", &style);
        assert!(layout.size < 20.0);
    }

    #[test]
    fn estimated_face_skips_every_line_without_touching_pixels() {
        let mut canvas = RgbaImage::from_pixel(64, 32, Rgba([255, 255, 255, 255]));
        let before = canvas.clone();
        let style = style(Rect::new(0, 0, 64, 32));
        let layout = layout_text("一二", &style);
        assert_eq!(draw_text(&mut canvas, &layout, &style), 0);
        assert_eq!(canvas, before);
    }

    #[test]
    fn debug_frame_outlines_area() {
        let mut canvas = RgbaImage::from_pixel(64, 32, Rgba([255, 255, 255, 255]));
        let style = style(Rect::new(4, 4, 50, 20));
        let layout = layout_text("一", &style);
        draw_debug_frame(&mut canvas, &layout, &style, "title");
        let red = canvas
            .pixels()
            .filter(|px| px[0] > 200 && px[1] < 120 && px[2] < 120)
            .count();
        assert!(red > 0);
    }

    #[test]
    fn draws_glyphs_with_system_font_when_available() {
        let Ok(font) = resolve_font(None, None, default_fallback_families()) else {
            return;
        };
        let mut canvas = RgbaImage::from_pixel(200, 80, Rgba([255, 255, 255, 255]));
        let mut style = TextStyle::new(font, 32.0, Rect::new(0, 0, 200, 80));
        style.color = Rgba([0, 0, 0, 255]);
        let layout = render_text(&mut canvas, "Hi", &style);
        assert_eq!(layout.lines.len(), 1);
        assert!(canvas.pixels().any(|px| px[0] < 128));
    }
}
