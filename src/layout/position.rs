use super::{BlockPosition, HorizontalAnchor, LineAlignment, Rect, VerticalAnchor};

/// Top-left corner of a `block_width × block_height` block anchored in `area`.
///
/// Blocks larger than the area get negative offsets and overflow it evenly
/// (middle/center) or on the side opposite the anchor.
pub fn block_origin(
    area: &Rect,
    position: BlockPosition,
    block_width: i32,
    block_height: i32,
) -> (i32, i32) {
    let area_width = area.width as i32;
    let area_height = area.height as i32;
    let x = match position.horizontal {
        HorizontalAnchor::Left => area.x,
        HorizontalAnchor::Center => area.x + (area_width - block_width) / 2,
        HorizontalAnchor::Right => area.x + area_width - block_width,
    };
    let y = match position.vertical {
        VerticalAnchor::Top => area.y,
        VerticalAnchor::Middle => area.y + (area_height - block_height) / 2,
        VerticalAnchor::Bottom => area.y + area_height - block_height,
    };
    (x, y)
}

/// X coordinate of a line inside a block whose left edge is `block_x`.
pub fn line_x(alignment: LineAlignment, block_x: i32, block_width: i32, line_width: i32) -> i32 {
    match alignment {
        LineAlignment::Left => block_x,
        LineAlignment::Center => block_x + (block_width - line_width) / 2,
        LineAlignment::Right => block_x + block_width - line_width,
    }
}
