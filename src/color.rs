use image::Rgba;

pub const FALLBACK_TEXT_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Parses `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`. The leading `#` is optional.
pub fn parse_hex(value: &str) -> Option<Rgba<u8>> {
    let hex = value.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |idx: usize| u8::from_str_radix(&hex[idx..idx + 1], 16).ok().map(|v| v * 17);
    let byte = |idx: usize| u8::from_str_radix(&hex[idx..idx + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, 255])),
        4 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?])),
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

pub fn resolve_color(value: &str, fallback: Rgba<u8>) -> Rgba<u8> {
    match parse_hex(value) {
        Some(color) => color,
        None => {
            tracing::warn!(color = value, ?fallback, "unparsable color, using fallback");
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_forms() {
        assert_eq!(parse_hex("#ff8000"), Some(Rgba([255, 128, 0, 255])));
        assert_eq!(parse_hex("ff800080"), Some(Rgba([255, 128, 0, 128])));
        assert_eq!(parse_hex("#fff"), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(parse_hex("#0f08"), Some(Rgba([0, 255, 0, 136])));
    }

    #[test]
    fn rejects_malformed_values() {
        assert_eq!(parse_hex(""), None);
        assert_eq!(parse_hex("#12345"), None);
        assert_eq!(parse_hex("#gggggg"), None);
        assert_eq!(parse_hex("#ééé"), None);
    }

    #[test]
    fn resolve_substitutes_fallback() {
        let fallback = Rgba([1, 2, 3, 255]);
        assert_eq!(resolve_color("nope", fallback), fallback);
        assert_eq!(resolve_color("#000000", fallback), Rgba([0, 0, 0, 255]));
    }
}
