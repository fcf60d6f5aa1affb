use ttf_parser::Face;

use crate::font::{FontFace, estimate_char_units};

/// Per-character width math shared by line breaking, fitting and placement.
///
/// Widths are summed glyph by glyph with `letter_spacing` between adjacent
/// characters (never after the last one), so measuring a prefix and extending
/// it one character at a time gives exactly the same result as measuring the
/// whole line.
pub struct Measurer<'a> {
    face: Option<Face<'a>>,
    units_per_em: f32,
    space_advance: u16,
    size: f32,
    letter_spacing: f32,
}

impl<'a> Measurer<'a> {
    pub fn new(font: &'a FontFace, size: f32, letter_spacing: f32) -> Self {
        Self {
            face: font.face(),
            units_per_em: font.units_per_em().max(1.0),
            space_advance: font.space_advance(),
            size,
            letter_spacing,
        }
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn letter_spacing(&self) -> f32 {
        self.letter_spacing
    }

    /// Rendered advance of a single character in pixels.
    pub fn advance(&self, ch: char) -> f32 {
        let Some(face) = self.face.as_ref() else {
            return estimate_char_units(ch) * self.size;
        };
        let units = if ch == ' ' {
            self.space_advance
        } else {
            face.glyph_index(ch)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
                .unwrap_or(self.space_advance)
        };
        f32::from(units) * (self.size / self.units_per_em)
    }

    /// Width of `line` with letter spacing between adjacent characters.
    pub fn width(&self, line: &[char]) -> f32 {
        let mut width = 0.0;
        for (idx, ch) in line.iter().enumerate() {
            width = self.extend(width, idx, *ch);
        }
        width
    }

    /// Width after appending `ch` to a prefix of `prefix_len` characters
    /// measuring `prefix_width`.
    pub(crate) fn extend(&self, prefix_width: f32, prefix_len: usize, ch: char) -> f32 {
        let gap = if prefix_len == 0 {
            0.0
        } else {
            self.letter_spacing
        };
        prefix_width + gap + self.advance(ch)
    }

    pub(crate) fn glyph_face(&self) -> Option<&Face<'a>> {
        self.face.as_ref()
    }

    pub(crate) fn scale(&self) -> f32 {
        self.size / self.units_per_em
    }
}
