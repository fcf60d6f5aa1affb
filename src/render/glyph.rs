use tiny_skia::{Path, PathBuilder};
use ttf_parser::{Face, OutlineBuilder};

/// Outline of `ch` positioned with its origin on the baseline at
/// (`origin_x`, `baseline_y`). `None` for glyphs without contours (spaces) and
/// characters missing from the face.
pub(crate) fn glyph_path(
    face: &Face<'_>,
    ch: char,
    origin_x: f32,
    baseline_y: f32,
    scale: f32,
) -> Option<Path> {
    let glyph = face.glyph_index(ch)?;
    let mut builder = GlyphPathBuilder::new(origin_x, baseline_y, scale);
    face.outline_glyph(glyph, &mut builder)?;
    builder.finish()
}

struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    fn finish(self) -> Option<Path> {
        self.builder.finish()
    }

    // Font units grow upwards, pixmap rows grow downwards.
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.origin_y - y * self.scale)
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_flips_and_scales_font_units() {
        let mut builder = GlyphPathBuilder::new(10.0, 100.0, 0.5);
        builder.move_to(0.0, 0.0);
        builder.line_to(20.0, 0.0);
        builder.line_to(20.0, 40.0);
        builder.close();
        let path = builder.finish().expect("path");
        let bounds = path.bounds();
        assert_eq!(bounds.left(), 10.0);
        assert_eq!(bounds.right(), 20.0);
        assert_eq!(bounds.top(), 80.0);
        assert_eq!(bounds.bottom(), 100.0);
    }

    #[test]
    fn empty_outline_has_no_path() {
        let builder = GlyphPathBuilder::new(0.0, 0.0, 1.0);
        assert!(builder.finish().is_none());
    }
}
