mod fit;
mod linebreak;
mod measure;
mod position;

use image::Rgba;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::font::FontFace;

pub(crate) use fit::wrap_at;
pub use fit::{Fitted, MIN_SIZE_FLOOR, SHRINK_FACTOR, fit};
pub use linebreak::{
    DEFAULT_END_PROHIBITED, DEFAULT_START_PROHIBITED, LineBreaker, default_end_prohibited,
    default_start_prohibited, is_word_char,
};
pub use measure::Measurer;
pub use position::{block_origin, line_x};

/// Integer pixel area. Width and height are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0 && self.y == 0 && self.width == 0 && self.height == 0
    }

    /// The `canvas_width × canvas_height` rectangle shrunk by `margin` on every side.
    pub fn inset(canvas_width: u32, canvas_height: u32, margin: u32) -> Self {
        Self {
            x: margin as i32,
            y: margin as i32,
            width: canvas_width.saturating_sub(margin * 2),
            height: canvas_height.saturating_sub(margin * 2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAnchor {
    Top,
    #[default]
    Middle,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAnchor {
    Left,
    #[default]
    Center,
    Right,
}

/// Anchor of the whole text block within its area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockPosition {
    pub vertical: VerticalAnchor,
    pub horizontal: HorizontalAnchor,
}

impl BlockPosition {
    pub fn new(vertical: VerticalAnchor, horizontal: HorizontalAnchor) -> Self {
        Self {
            vertical,
            horizontal,
        }
    }
}

impl FromStr for BlockPosition {
    type Err = String;

    /// Accepts `vertical-horizontal` pairs such as `bottom-right`, or a single
    /// keyword (`top`, `left`, `center`, ...) leaving the other axis at its default.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut position = BlockPosition::default();
        let normalized = value.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err("empty block position".to_string());
        }
        let mut seen_vertical = false;
        let mut seen_horizontal = false;
        for part in normalized.split(['-', ' ', '_']).filter(|p| !p.is_empty()) {
            match part {
                "top" if !seen_vertical => {
                    position.vertical = VerticalAnchor::Top;
                    seen_vertical = true;
                }
                "middle" if !seen_vertical => {
                    position.vertical = VerticalAnchor::Middle;
                    seen_vertical = true;
                }
                "bottom" if !seen_vertical => {
                    position.vertical = VerticalAnchor::Bottom;
                    seen_vertical = true;
                }
                "left" if !seen_horizontal => {
                    position.horizontal = HorizontalAnchor::Left;
                    seen_horizontal = true;
                }
                "center" | "centre" if !seen_horizontal => {
                    position.horizontal = HorizontalAnchor::Center;
                    seen_horizontal = true;
                }
                "right" if !seen_horizontal => {
                    position.horizontal = HorizontalAnchor::Right;
                    seen_horizontal = true;
                }
                _ => return Err(format!("invalid block position '{}'", value)),
            }
        }
        Ok(position)
    }
}

impl fmt::Display for BlockPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vertical = match self.vertical {
            VerticalAnchor::Top => "top",
            VerticalAnchor::Middle => "middle",
            VerticalAnchor::Bottom => "bottom",
        };
        let horizontal = match self.horizontal {
            HorizontalAnchor::Left => "left",
            HorizontalAnchor::Center => "center",
            HorizontalAnchor::Right => "right",
        };
        write!(f, "{}-{}", vertical, horizontal)
    }
}

/// Horizontal alignment of each ragged line within the block's width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineAlignment {
    #[default]
    Left,
    Center,
    Right,
}

impl FromStr for LineAlignment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "center" | "centre" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            _ => Err(format!("invalid line alignment '{}'", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overflow {
    #[default]
    Shrink,
    /// Renders at the configured size even when the block overflows its area.
    /// Lines are not truncated.
    Clip,
}

impl FromStr for Overflow {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "shrink" => Ok(Self::Shrink),
            "clip" => Ok(Self::Clip),
            _ => Err(format!("invalid overflow policy '{}'", value)),
        }
    }
}

/// Fully resolved style for one text block.
#[derive(Debug, Clone)]
pub struct TextStyle {
    pub font: FontFace,
    pub size: f32,
    /// Floor for shrinking; values `<= 0` mean [`MIN_SIZE_FLOOR`].
    pub min_size: f32,
    pub color: Rgba<u8>,
    pub area: Rect,
    pub block_position: BlockPosition,
    pub line_alignment: LineAlignment,
    pub overflow: Overflow,
    pub line_height: f32,
    pub letter_spacing: i32,
    pub start_prohibited: HashSet<char>,
    pub end_prohibited: HashSet<char>,
}

impl TextStyle {
    pub fn new(font: FontFace, size: f32, area: Rect) -> Self {
        Self {
            font,
            size,
            min_size: MIN_SIZE_FLOOR,
            color: Rgba([0, 0, 0, 255]),
            area,
            block_position: BlockPosition::default(),
            line_alignment: LineAlignment::default(),
            overflow: Overflow::default(),
            line_height: 1.2,
            letter_spacing: 0,
            start_prohibited: default_start_prohibited(),
            end_prohibited: default_end_prohibited(),
        }
    }

    pub fn effective_min_size(&self) -> f32 {
        if self.min_size > 0.0 && self.min_size.is_finite() {
            self.min_size
        } else {
            MIN_SIZE_FLOOR
        }
    }

    pub fn effective_line_height(&self) -> f32 {
        if self.line_height > 0.0 && self.line_height.is_finite() {
            self.line_height
        } else {
            1.0
        }
    }

    /// Vertical advance of one line at `size`.
    pub fn line_box(&self, size: f32) -> f32 {
        size * self.effective_line_height()
    }

    pub fn measurer(&self, size: f32) -> Measurer<'_> {
        Measurer::new(&self.font, size, self.letter_spacing as f32)
    }

    pub fn line_breaker(&self, size: f32) -> LineBreaker<'_> {
        LineBreaker::new(
            self.measurer(size),
            &self.start_prohibited,
            &self.end_prohibited,
        )
    }
}

/// One visual row of code points. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    chars: Vec<char>,
}

impl Line {
    pub(crate) fn new(chars: Vec<char>) -> Self {
        debug_assert!(!chars.is_empty());
        Self { chars }
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn first(&self) -> Option<char> {
        self.chars.first().copied()
    }

    pub fn last(&self) -> Option<char> {
        self.chars.last().copied()
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in &self.chars {
            write!(f, "{}", ch)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_position_parses_pairs_and_single_keywords() {
        let parsed: BlockPosition = "bottom-right".parse().unwrap();
        assert_eq!(
            parsed,
            BlockPosition::new(VerticalAnchor::Bottom, HorizontalAnchor::Right)
        );
        let parsed: BlockPosition = "top".parse().unwrap();
        assert_eq!(
            parsed,
            BlockPosition::new(VerticalAnchor::Top, HorizontalAnchor::Center)
        );
        let parsed: BlockPosition = "Left".parse().unwrap();
        assert_eq!(
            parsed,
            BlockPosition::new(VerticalAnchor::Middle, HorizontalAnchor::Left)
        );
        assert_eq!(parsed.to_string(), "middle-left");
    }

    #[test]
    fn block_position_rejects_conflicts() {
        assert!("top-bottom".parse::<BlockPosition>().is_err());
        assert!("left-right".parse::<BlockPosition>().is_err());
        assert!("upper-left".parse::<BlockPosition>().is_err());
        assert!("".parse::<BlockPosition>().is_err());
    }

    #[test]
    fn min_size_and_line_height_fall_back() {
        let mut style = TextStyle::new(FontFace::estimated(), 40.0, Rect::new(0, 0, 10, 10));
        style.min_size = 0.0;
        style.line_height = -1.0;
        assert_eq!(style.effective_min_size(), MIN_SIZE_FLOOR);
        assert_eq!(style.effective_line_height(), 1.0);
        assert_eq!(style.line_box(40.0), 40.0);
    }

    #[test]
    fn inset_area_shrinks_on_every_side() {
        assert_eq!(Rect::inset(1200, 630, 60), Rect::new(60, 60, 1080, 510));
        assert_eq!(Rect::inset(100, 50, 60), Rect::new(60, 60, 0, 0));
        assert!(Rect::default().is_zero());
    }
}
