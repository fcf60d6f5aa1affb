use super::{Line, Rect, TextStyle};

/// Size floor used when a style leaves `min_size` unset.
pub const MIN_SIZE_FLOOR: f32 = 12.0;
/// Multiplier applied to the font size after each failed fit.
pub const SHRINK_FACTOR: f32 = 0.9;

/// Outcome of shrink-to-fit: the final size and the lines wrapped at it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fitted {
    pub size: f32,
    pub lines: Vec<Line>,
    pub block_width: f32,
    pub block_height: f32,
}

impl Fitted {
    pub fn fits(&self, area: &Rect) -> bool {
        self.block_height <= area.height as f32 && self.block_width <= area.width as f32
    }
}

/// Wraps `text` at `size` without any fitting.
pub(crate) fn wrap_at(text: &str, style: &TextStyle, area: &Rect, size: f32) -> Fitted {
    let breaker = style.line_breaker(size);
    let lines = breaker.split(text, area.width as f32);
    let block_width = lines
        .iter()
        .map(|line| breaker.measurer().width(line.chars()))
        .fold(0.0, f32::max);
    let block_height = lines.len() as f32 * style.line_box(size);
    Fitted {
        size,
        lines,
        block_width,
        block_height,
    }
}

/// Shrinks the font size by [`SHRINK_FACTOR`] until the wrapped block fits
/// `area`, stopping at the style's minimum size.
///
/// Overflow at the floor is accepted as is. A starting size below the floor
/// is raised to the floor first, so the result is never smaller than it.
pub fn fit(text: &str, style: &TextStyle, area: &Rect) -> Fitted {
    let min_size = style.effective_min_size();
    let mut size = if style.size.is_finite() {
        style.size.max(min_size)
    } else {
        min_size
    };

    let mut fitted = wrap_at(text, style, area, size);
    let mut iterations = 0u32;
    while !fitted.fits(area) && size > min_size {
        size = (size * SHRINK_FACTOR).max(min_size);
        fitted = wrap_at(text, style, area, size);
        iterations += 1;
    }

    if fitted.fits(area) {
        tracing::debug!(size, iterations, lines = fitted.lines.len(), "text fitted");
    } else {
        tracing::debug!(
            size,
            iterations,
            block_width = fitted.block_width,
            block_height = fitted.block_height,
            "text overflows area at minimum size"
        );
    }
    fitted
}
